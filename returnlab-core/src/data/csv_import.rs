//! Offline quote provider backed by a long-format CSV file.
//!
//! Expected header: `date,symbol,open,high,low,close,adj_close,volume`.
//! Empty cells are missing values. Row order is preserved per symbol, so a
//! file with unsorted or duplicated dates reaches the sanitizer as-is.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    symbol: String,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    adj_close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

/// Provider serving bars from a CSV file parsed once at construction.
#[derive(Debug)]
pub struct CsvProvider {
    bars: HashMap<String, Vec<RawBar>>,
}

impl CsvProvider {
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let file = std::fs::File::open(path)
            .map_err(|e| DataError::CsvImport(format!("open {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut bars: HashMap<String, Vec<RawBar>> = HashMap::new();
        for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
            // +2: one for the header, one for 1-based numbering
            let row = row.map_err(|e| DataError::CsvImport(format!("line {}: {e}", line + 2)))?;
            bars.entry(row.symbol).or_default().push(RawBar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                adj_close: row.adj_close,
                volume: row.volume,
            });
        }

        Ok(Self { bars })
    }

    /// Symbols present in the file, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.bars.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars: Vec<RawBar> = self
            .bars
            .get(symbol)
            .into_iter()
            .flatten()
            .filter(|b| b.date >= start && b.date < end && !b.is_void())
            .cloned()
            .collect();

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
