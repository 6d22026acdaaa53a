//! Daily log returns.

use crate::table::{DenseTable, ReturnTable};

/// `ln(p[t] / p[t-1])` for every adjacent pair of rows.
///
/// The first row has no predecessor and is dropped, so the result has one
/// row fewer than `prices`. Fewer than two rows gives an empty table with
/// the same tickers.
///
/// Prices must be non-zero; a zero yields an infinite or NaN return.
pub fn log_returns(prices: &DenseTable) -> ReturnTable {
    let tickers = prices.tickers().to_vec();
    if prices.n_rows() < 2 {
        let columns = vec![Vec::new(); tickers.len()];
        return ReturnTable::from_parts_unchecked(Vec::new(), tickers, columns);
    }

    let dates = prices.dates()[1..].to_vec();
    let columns = prices
        .columns()
        .iter()
        .map(|col| col.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
        .collect();
    ReturnTable::from_parts_unchecked(dates, tickers, columns)
}
