//! End-to-end pipeline runs through the public API, offline.

use chrono::NaiveDate;
use returnlab_core::data::{
    CsvProvider, DataError, DataProvider, DataSource, DownloadProgress, FetchResult, RawBar,
    SilentProgress,
};
use returnlab_core::{run, PipelineConfig, PipelineError, PriceField};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Ten weekdays of closes for three symbols, with:
/// - LATE listing on the third day (leading gap, 80% coverage)
/// - GAPPY missing one interior day (90% coverage)
/// - a duplicated row for STEADY
fn write_fixture(dir: &std::path::Path) -> std::path::PathBuf {
    let days = [
        "2025-01-02", "2025-01-03", "2025-01-06", "2025-01-07", "2025-01-08",
        "2025-01-09", "2025-01-10", "2025-01-13", "2025-01-14", "2025-01-15",
    ];
    let path = dir.join("quotes.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "date,symbol,open,high,low,close,adj_close,volume").unwrap();
    // newest first, the sanitizer must put it back in order
    for (i, day) in days.iter().enumerate().rev() {
        let steady = 100.0 + i as f64;
        writeln!(f, "{day},STEADY,,,,{steady},{steady},1000").unwrap();
        if i != 4 {
            writeln!(f, "{day},GAPPY,,,,{},,500", 20.0 * (1.0 + i as f64 / 100.0)).unwrap();
        }
        if i >= 2 {
            writeln!(f, "{day},LATE,,,,5.0,5.0,10").unwrap();
        }
    }
    writeln!(f, "2025-01-06,STEADY,,,,999.0,999.0,1").unwrap();
    path
}

fn config(tickers: &[&str], min_coverage: f64) -> PipelineConfig {
    PipelineConfig {
        tickers: tickers.iter().map(|s| s.to_string()).collect(),
        start: d("2025-01-01"),
        end: d("2025-01-16"),
        field: PriceField::Close,
        min_coverage,
    }
}

#[test]
fn csv_run_with_default_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::from_path(&write_fixture(dir.path())).unwrap();

    let out = run(
        &config(&["STEADY", "GAPPY", "LATE", "MISSING"], 0.95),
        &provider,
        &SilentProgress,
    )
    .unwrap();

    assert_eq!(out.fetch.requested, 4);
    assert_eq!(out.fetch.succeeded, 3);
    assert_eq!(out.fetch.failed.len(), 1);
    assert_eq!(out.fetch.failed[0].0, "MISSING");

    assert_eq!(out.sanitize.all_missing, vec!["MISSING"]);
    assert_eq!(out.sanitize.low_coverage, vec!["GAPPY", "LATE"]);
    assert_eq!(out.sanitize.duplicate_dates, 0);

    assert_eq!(out.prices.tickers(), &["STEADY".to_string()]);
    assert_eq!(out.prices.shape(), (10, 1));
    assert_eq!(out.align.first_date, Some(d("2025-01-02")));
    assert_eq!(out.align.last_date, Some(d("2025-01-15")));

    // the duplicate 999.0 row arrived last and lost
    assert_eq!(out.prices.column("STEADY").unwrap()[2], 102.0);

    assert_eq!(out.returns.shape(), (9, 1));
    let first = out.returns.column("STEADY").unwrap()[0];
    assert!((first - (101.0f64 / 100.0).ln()).abs() < 1e-12);
}

#[test]
fn csv_run_with_loose_threshold_fills_and_trims() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::from_path(&write_fixture(dir.path())).unwrap();

    let out = run(&config(&["STEADY", "GAPPY", "LATE"], 0.8), &provider, &SilentProgress).unwrap();

    assert!(out.sanitize.low_coverage.is_empty());
    // LATE has no value on the first two days
    assert_eq!(out.align.dropped_rows, 2);
    assert_eq!(out.prices.shape(), (8, 3));
    assert_eq!(out.align.first_date, Some(d("2025-01-06")));

    // GAPPY's hole on 2025-01-08 is forward-filled from 2025-01-07
    let gappy = out.prices.column("GAPPY").unwrap();
    assert_eq!(gappy[2], gappy[1]);
    assert_eq!(out.returns.column("GAPPY").unwrap()[1], 0.0);
    assert!(out.returns.column("LATE").unwrap().iter().all(|&r| r == 0.0));
}

#[test]
fn missing_adjusted_field_is_still_selectable() {
    // GAPPY has no adj_close at all: the column exists, the ticker is dropped
    let dir = tempfile::tempdir().unwrap();
    let provider = CsvProvider::from_path(&write_fixture(dir.path())).unwrap();

    let mut cfg = config(&["STEADY", "GAPPY"], 0.95);
    cfg.field = PriceField::AdjClose;
    let out = run(&cfg, &provider, &SilentProgress).unwrap();
    assert_eq!(out.field, PriceField::AdjClose);
    assert_eq!(out.sanitize.all_missing, vec!["GAPPY"]);
    assert_eq!(out.prices.tickers(), &["STEADY".to_string()]);
}

#[test]
fn lowercase_tickers_from_config_reach_the_csv_unchanged() {
    let csv = "\
date,symbol,open,high,low,close,adj_close,volume
2025-01-02,spy,,,,590.0,590.0,1
2025-01-03,spy,,,,595.0,595.0,1
2025-01-06,spy,,,,600.0,600.0,1
";
    let provider = CsvProvider::from_reader(csv.as_bytes()).unwrap();
    let cfg = PipelineConfig::from_toml(
        r#"
tickers = ["spy"]
start = "2025-01-01"
end = "2025-01-07"
field = "close"
"#,
    )
    .unwrap();

    let out = run(&cfg, &provider, &SilentProgress).unwrap();
    assert!(out.fetch.failed.is_empty());
    assert!(out.sanitize.all_missing.is_empty());
    assert_eq!(out.prices.tickers(), &["spy".to_string()]);
    assert_eq!(out.returns.shape(), (2, 1));
}

struct Unreachable;

impl DataProvider for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn fetch(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<FetchResult, DataError> {
        Err(DataError::NetworkUnreachable("dns failure".into()))
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[test]
fn unreachable_provider_fails_in_fetch_stage() {
    let err = run(&config(&["AAPL", "MSFT"], 0.95), &Unreachable, &SilentProgress).unwrap_err();
    match err {
        PipelineError::Fetch(DataError::ProviderUnavailable { provider, failed }) => {
            assert_eq!(provider, "unreachable");
            assert_eq!(failed, 2);
        }
        other => panic!("expected fetch failure, got {other:?}"),
    }
}

#[test]
fn invalid_config_fails_before_fetching() {
    let mut cfg = config(&["AAPL"], 0.95);
    cfg.end = cfg.start;
    let err = run(&cfg, &Unreachable, &SilentProgress).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

/// Records every progress event, from whichever worker thread sent it.
#[derive(Default)]
struct Recorder {
    completed: Mutex<Vec<(String, bool)>>,
    batch: Mutex<Option<(usize, usize, usize)>>,
}

impl DownloadProgress for Recorder {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, error: Option<&DataError>) {
        self.completed
            .lock()
            .unwrap()
            .push((symbol.to_string(), error.is_none()));
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        *self.batch.lock().unwrap() = Some((succeeded, failed, total));
    }
}

struct Fixed(HashMap<String, Vec<RawBar>>);

impl DataProvider for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch(&self, symbol: &str, _: NaiveDate, _: NaiveDate) -> Result<FetchResult, DataError> {
        self.0
            .get(symbol)
            .map(|bars| FetchResult {
                symbol: symbol.to_string(),
                bars: bars.clone(),
                source: DataSource::CsvImport,
            })
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[test]
fn progress_sees_every_symbol_and_columns_keep_request_order() {
    let bars: Vec<RawBar> = ["2025-01-02", "2025-01-03"]
        .iter()
        .map(|day| RawBar {
            date: d(day),
            close: Some(10.0),
            ..Default::default()
        })
        .collect();
    let tickers = ["ZETA", "ALPHA", "MU", "KLAC", "NOPE"];
    let provider = Fixed(
        tickers[..4]
            .iter()
            .map(|t| (t.to_string(), bars.clone()))
            .collect(),
    );
    let recorder = Recorder::default();

    let out = run(&config(&tickers, 0.95), &provider, &recorder).unwrap();

    let mut completed = recorder.completed.lock().unwrap().clone();
    completed.sort();
    assert_eq!(completed.len(), 5);
    assert!(completed.contains(&("NOPE".to_string(), false)));
    assert_eq!(*recorder.batch.lock().unwrap(), Some((4, 1, 5)));

    let kept: Vec<&str> = out.prices.tickers().iter().map(String::as_str).collect();
    assert_eq!(kept, vec!["ZETA", "ALPHA", "MU", "KLAC"]);
}
