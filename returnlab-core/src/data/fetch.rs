//! Multi-symbol fetch: one parallel pass over the universe, assembled into a
//! single [`QuoteTable`].
//!
//! A symbol that fails becomes an all-missing column; only a provider that
//! could not serve a single symbol fails the whole fetch.

use super::provider::{DataError, DataProvider, DownloadProgress, RawBar};
use crate::table::{ColumnKey, PriceField, QuoteTable};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;

/// Outcome of fetching every symbol.
#[derive(Debug)]
pub struct FetchSummary {
    pub quotes: QuoteTable,
    pub succeeded: usize,
    pub failed: Vec<(String, DataError)>,
}

impl FetchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch every symbol over `[start, end)` and assemble the quote table.
///
/// Columns come out in `symbols` order regardless of completion order.
pub fn fetch_quotes(
    provider: &dyn DataProvider,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn DownloadProgress,
) -> Result<FetchSummary, DataError> {
    let total = symbols.len();

    let results: Vec<Result<Vec<RawBar>, DataError>> = symbols
        .par_iter()
        .enumerate()
        .map(|(i, symbol)| {
            progress.on_start(symbol, i, total);
            let result = if provider.is_available() {
                provider.fetch(symbol, start, end).map(|r| {
                    tracing::debug!(
                        symbol = symbol.as_str(),
                        source = ?r.source,
                        bars = r.bars.len(),
                        "bars received"
                    );
                    r.bars
                })
            } else {
                Err(DataError::CircuitBreakerTripped)
            };
            progress.on_complete(symbol, i, total, result.as_ref().err());
            result
        })
        .collect();

    let mut per_symbol: Vec<(&str, Vec<RawBar>)> = Vec::with_capacity(total);
    let mut failed = Vec::new();
    for (symbol, result) in symbols.iter().zip(results) {
        match result {
            Ok(bars) => per_symbol.push((symbol.as_str(), bars)),
            Err(e) => {
                per_symbol.push((symbol.as_str(), Vec::new()));
                failed.push((symbol.clone(), e));
            }
        }
    }

    let succeeded = total - failed.len();
    progress.on_batch_complete(succeeded, failed.len(), total);

    if total > 0 && succeeded == 0 && failed.iter().any(|(_, e)| e.is_transport()) {
        return Err(DataError::ProviderUnavailable {
            provider: provider.name().to_string(),
            failed: failed.len(),
        });
    }

    Ok(FetchSummary {
        quotes: assemble(&per_symbol),
        succeeded,
        failed,
    })
}

/// Lay per-symbol bars onto one row axis.
///
/// The row axis is every distinct date in first-seen order, walking symbols
/// in order. When a symbol reports the same date twice the first bar wins.
pub fn assemble(per_symbol: &[(&str, Vec<RawBar>)]) -> QuoteTable {
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut row_of: HashMap<NaiveDate, usize> = HashMap::new();
    for (_, bars) in per_symbol {
        for bar in bars {
            row_of.entry(bar.date).or_insert_with(|| {
                dates.push(bar.date);
                dates.len() - 1
            });
        }
    }

    let rows = dates.len();
    let mut columns = Vec::with_capacity(per_symbol.len() * PriceField::ALL.len());
    for field in PriceField::ALL {
        for (symbol, bars) in per_symbol {
            let mut cells = vec![None; rows];
            let mut seen = vec![false; rows];
            for bar in bars {
                let row = row_of[&bar.date];
                if !seen[row] {
                    seen[row] = true;
                    cells[row] = field_value(bar, field);
                }
            }
            columns.push((
                ColumnKey {
                    field,
                    ticker: symbol.to_string(),
                },
                cells,
            ));
        }
    }

    QuoteTable { dates, columns }
}

fn field_value(bar: &RawBar, field: PriceField) -> Option<f64> {
    let value = match field {
        PriceField::Open => bar.open,
        PriceField::High => bar.high,
        PriceField::Low => bar.low,
        PriceField::Close => bar.close,
        PriceField::AdjClose => bar.adj_close,
        PriceField::Volume => bar.volume,
    };
    // Providers occasionally send NaN for a missing print
    value.filter(|v| v.is_finite())
}
