//! Property tests for the cleaning stages.
//!
//! Uses proptest to verify:
//! 1. Sort/dedup yields strictly increasing dates and is idempotent
//! 2. Every ticker kept by the sanitizer meets the coverage threshold
//! 3. The aligner leaves no missing cell and only drops leading rows
//! 4. Constant prices produce all-zero returns, one row fewer

use chrono::NaiveDate;
use proptest::prelude::*;
use returnlab_core::pipeline::{align, forward_fill, log_returns, sanitize, sort_and_dedup};
use returnlab_core::{DenseTable, PriceTable};

// ── Strategies (proptest) ────────────────────────────────────────────

fn date(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(offset as u64)
}

fn arb_cell() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        3 => (1.0..500.0_f64).prop_map(Some),
    ]
}

/// Price table with shuffled, possibly repeated dates and random gaps.
fn arb_table() -> impl Strategy<Value = PriceTable> {
    (1usize..40, 0usize..6).prop_flat_map(|(rows, cols)| {
        (
            prop::collection::vec(0u32..30, rows),
            prop::collection::vec(prop::collection::vec(arb_cell(), rows), cols),
        )
            .prop_map(move |(offsets, columns)| {
                let dates = offsets.into_iter().map(date).collect();
                let tickers = (0..cols).map(|i| format!("T{i}")).collect();
                PriceTable::new(dates, tickers, columns).unwrap()
            })
    })
}

// ── 1. Sort + dedup ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn sorted_dates_strictly_increase(table in arb_table()) {
        let sorted = sort_and_dedup(&table);
        for w in sorted.dates().windows(2) {
            prop_assert!(w[0] < w[1]);
        }
        prop_assert_eq!(sorted.n_columns(), table.n_columns());
    }

    #[test]
    fn sort_and_dedup_is_idempotent(table in arb_table()) {
        let once = sort_and_dedup(&table);
        let twice = sort_and_dedup(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn dedup_keeps_first_occurrence(table in arb_table()) {
        let sorted = sort_and_dedup(&table);
        for (row, date) in sorted.dates().iter().enumerate() {
            let first = table.dates().iter().position(|d| d == date).unwrap();
            for (out_col, in_col) in sorted.columns().iter().zip(table.columns()) {
                prop_assert_eq!(out_col[row], in_col[first]);
            }
        }
    }
}

// ── 2. Coverage threshold ────────────────────────────────────────────

proptest! {
    #[test]
    fn kept_tickers_meet_threshold(table in arb_table(), min_coverage in 0.0..=1.0_f64) {
        let out = sanitize(&table, min_coverage);
        for (_, coverage) in out.table.coverage() {
            prop_assert!(coverage >= min_coverage);
        }
        // every input ticker is either kept or reported exactly once
        let kept = out.table.n_columns();
        let reported = out.report.all_missing.len() + out.report.low_coverage.len();
        prop_assert_eq!(kept + reported, table.n_columns());
        for t in &out.report.all_missing {
            prop_assert!(!out.report.low_coverage.contains(t));
        }
    }
}

// ── 3. Dense output ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn aligned_table_has_no_gaps(table in arb_table()) {
        let clean = sanitize(&table, 0.0).table;
        let aligned = align(&clean);

        // the dense type holds f64, so check it against the filled source
        prop_assert!(aligned.table.n_rows() <= clean.n_rows());
        for col in aligned.table.columns() {
            prop_assert!(col.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn only_leading_rows_are_dropped(table in arb_table()) {
        let clean = sanitize(&table, 0.0).table;
        let filled = forward_fill(&clean);
        let aligned = align(&clean);

        // once a row is complete after filling, every later row is too
        let dropped = aligned.report.dropped_rows;
        prop_assert_eq!(&filled.dates()[dropped..], aligned.table.dates());
        prop_assert_eq!(filled.take_rows(&(dropped..filled.n_rows()).collect::<Vec<_>>()).missing_cells(), 0);
    }
}

// ── 4. Returns ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn constant_prices_have_zero_returns(
        rows in 0usize..30,
        cols in 1usize..5,
        price in 1.0..1000.0_f64,
    ) {
        let dense = DenseTable::new(
            (0..rows as u32).map(date).collect(),
            (0..cols).map(|i| format!("T{i}")).collect(),
            vec![vec![price; rows]; cols],
        ).unwrap();
        let r = log_returns(&dense);

        prop_assert_eq!(r.n_rows(), rows.saturating_sub(1));
        prop_assert_eq!(r.n_columns(), cols);
        for col in r.columns() {
            prop_assert!(col.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn returns_sum_to_log_of_total_change(
        prices in prop::collection::vec(1.0..1000.0_f64, 2..50),
    ) {
        let n = prices.len();
        let dense = DenseTable::new(
            (0..n as u32).map(date).collect(),
            vec!["T".into()],
            vec![prices.clone()],
        ).unwrap();
        let r = log_returns(&dense);
        let total: f64 = r.column("T").unwrap().iter().sum();
        let expected = (prices[n - 1] / prices[0]).ln();
        prop_assert!((total - expected).abs() < 1e-9);
    }
}
