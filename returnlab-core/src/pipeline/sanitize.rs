//! Sanitizer: chronological order, unique dates, and enough data per ticker.
//!
//! Steps run in a fixed order and each returns a fresh table:
//! 1. [`sort_and_dedup`]: stable sort by date, first row per date wins
//! 2. [`drop_all_missing`]: tickers with no value at all
//! 3. [`drop_low_coverage`]: tickers below the coverage threshold

use crate::table::PriceTable;

/// What the sanitizer removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizeReport {
    /// Rows discarded because an earlier row had the same date.
    pub duplicate_dates: usize,
    /// Tickers without a single value, in column order.
    pub all_missing: Vec<String>,
    /// Tickers whose coverage fell strictly below `min_coverage`.
    pub low_coverage: Vec<String>,
    pub min_coverage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub table: PriceTable,
    pub report: SanitizeReport,
}

/// Sort rows by date ascending and keep the first row of each date.
///
/// The sort is stable, so "first" means first in the input among rows
/// sharing a date. Applying this twice gives the same table as once.
pub fn sort_and_dedup(table: &PriceTable) -> PriceTable {
    let dates = table.dates();
    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&i| dates[i]);
    order.dedup_by_key(|i| dates[*i]);
    table.take_rows(&order)
}

/// Remove tickers whose column holds no value. Returns the removed names.
pub fn drop_all_missing(table: &PriceTable) -> (PriceTable, Vec<String>) {
    let mut dropped = Vec::new();
    let kept = table.retain_columns(|ticker, cells| {
        let any = cells.iter().any(Option::is_some);
        if !any {
            dropped.push(ticker.to_string());
        }
        any
    });
    (kept, dropped)
}

/// Remove tickers with coverage strictly below `min_coverage`.
pub fn drop_low_coverage(table: &PriceTable, min_coverage: f64) -> (PriceTable, Vec<String>) {
    let rows = table.n_rows();
    let mut dropped = Vec::new();
    let kept = table.retain_columns(|ticker, cells| {
        let present = cells.iter().filter(|v| v.is_some()).count();
        let coverage = if rows == 0 {
            0.0
        } else {
            present as f64 / rows as f64
        };
        let keep = coverage >= min_coverage;
        if !keep {
            dropped.push(ticker.to_string());
        }
        keep
    });
    (kept, dropped)
}

/// Run every sanitizer step and log what was removed.
pub fn sanitize(table: &PriceTable, min_coverage: f64) -> Sanitized {
    let sorted = sort_and_dedup(table);
    let duplicate_dates = table.n_rows() - sorted.n_rows();
    if duplicate_dates > 0 {
        tracing::debug!(duplicate_dates, "removed duplicate date rows");
    }

    let (present, all_missing) = drop_all_missing(&sorted);
    if !all_missing.is_empty() {
        tracing::info!(tickers = ?all_missing, "dropped tickers with no data");
    }

    let (table, low_coverage) = drop_low_coverage(&present, min_coverage);
    if !low_coverage.is_empty() {
        tracing::info!(
            tickers = ?low_coverage,
            min_coverage,
            "dropped tickers below coverage threshold"
        );
    }

    Sanitized {
        table,
        report: SanitizeReport {
            duplicate_dates,
            all_missing,
            low_coverage,
            min_coverage,
        },
    }
}
