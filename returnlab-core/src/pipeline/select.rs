//! Field selection: cut one price field out of the raw quote table.

use super::PipelineError;
use crate::table::{PriceField, PriceTable, QuoteTable};

/// Date × ticker table of `field`, rows exactly as in `quotes`.
///
/// A quote table without any columns selects to an empty table; one that has
/// columns but none for `field` is a configuration error.
pub fn select_field(quotes: &QuoteTable, field: PriceField) -> Result<PriceTable, PipelineError> {
    if quotes.columns.is_empty() {
        return Ok(PriceTable::empty(Vec::new()));
    }

    let (tickers, columns): (Vec<String>, Vec<Vec<Option<f64>>>) = quotes
        .columns
        .iter()
        .filter(|(key, _)| key.field == field)
        .map(|(key, cells)| (key.ticker.clone(), cells.clone()))
        .unzip();

    if tickers.is_empty() {
        return Err(PipelineError::FieldNotFound {
            field,
            available: quotes.fields(),
        });
    }

    Ok(PriceTable::new(quotes.dates.clone(), tickers, columns)?)
}
