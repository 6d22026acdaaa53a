//! Aligner: make the table dense.
//!
//! Two separate passes so each invariant can be checked on its own:
//! [`forward_fill`] closes interior gaps, then [`drop_incomplete_rows`]
//! removes the leading rows that still have no value for some ticker.

use crate::table::{DenseTable, PriceTable};
use chrono::NaiveDate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignReport {
    pub rows: usize,
    pub columns: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Rows removed by the completeness filter.
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aligned {
    pub table: DenseTable,
    pub report: AlignReport,
}

/// Carry the last observed value forward within each column.
///
/// Leading gaps (before a ticker's first observation) stay missing.
pub fn forward_fill(table: &PriceTable) -> PriceTable {
    let columns = table
        .columns()
        .iter()
        .map(|col| {
            let mut last = None;
            col.iter()
                .map(|&cell| {
                    if cell.is_some() {
                        last = cell;
                    }
                    last
                })
                .collect()
        })
        .collect();
    PriceTable::from_parts_unchecked(table.dates().to_vec(), table.tickers().to_vec(), columns)
}

/// Keep only the rows where every ticker has a value.
pub fn drop_incomplete_rows(table: &PriceTable) -> DenseTable {
    let columns = table.columns();
    let keep: Vec<usize> = (0..table.n_rows())
        .filter(|&row| columns.iter().all(|col| col[row].is_some()))
        .collect();

    let dates = keep.iter().map(|&row| table.dates()[row]).collect();
    let dense_columns = columns
        .iter()
        .map(|col| keep.iter().filter_map(|&row| col[row]).collect())
        .collect();
    DenseTable::from_parts_unchecked(dates, table.tickers().to_vec(), dense_columns)
}

/// Forward-fill, then drop incomplete rows. Logs the resulting shape.
pub fn align(table: &PriceTable) -> Aligned {
    let filled = forward_fill(table);
    let dense = drop_incomplete_rows(&filled);

    let report = AlignReport {
        rows: dense.n_rows(),
        columns: dense.n_columns(),
        first_date: dense.first_date(),
        last_date: dense.last_date(),
        dropped_rows: table.n_rows() - dense.n_rows(),
    };

    tracing::info!(
        rows = report.rows,
        columns = report.columns,
        dropped_rows = report.dropped_rows,
        first = ?report.first_date,
        last = ?report.last_date,
        "aligned price table"
    );

    Aligned {
        table: dense,
        report,
    }
}
