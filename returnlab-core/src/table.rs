//! Date × ticker tables flowing through the pipeline.
//!
//! - [`QuoteTable`]: raw provider output, columns keyed by (field, ticker)
//! - [`PriceTable`]: one field, `None` marks a missing price
//! - [`DenseTable`]: no missing cells, enforced by its `f64` columns
//! - [`ReturnTable`]: day-over-day log returns of a dense table
//!
//! Stages never mutate their input; each one builds a new table.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quote field a provider can report per day.
///
/// Deserializes through [`FromStr`], so config files accept the same
/// spellings as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 6] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::AdjClose,
        PriceField::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::AdjClose => "Adj Close",
            PriceField::Volume => "Volume",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown price field '{0}' (expected Open, High, Low, Close, Adj Close or Volume)")]
pub struct UnknownField(pub String);

impl FromStr for PriceField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "adjclose" => Ok(PriceField::AdjClose),
            "volume" => Ok(PriceField::Volume),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

impl TryFrom<String> for PriceField {
    type Error = UnknownField;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PriceField> for String {
    fn from(field: PriceField) -> Self {
        field.as_str().to_string()
    }
}

/// Column key of a [`QuoteTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub field: PriceField,
    pub ticker: String,
}

/// Raw multi-field table as assembled from provider responses.
///
/// Rows are in arrival order and may repeat a date. Every column has
/// `dates.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<(ColumnKey, Vec<Option<f64>>)>,
}

impl QuoteTable {
    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Fields present in at least one column.
    pub fn fields(&self) -> Vec<PriceField> {
        let mut fields: Vec<PriceField> = self.columns.iter().map(|(k, _)| k.field).collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }

    pub fn column(&self, field: PriceField, ticker: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(k, _)| k.field == field && k.ticker == ticker)
            .map(|(_, v)| v.as_slice())
    }
}

/// Single-field price table. Rows are dates, columns are tickers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Shape mismatch while building a table by hand.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("{tickers} ticker(s) but {columns} column(s)")]
    ColumnCount { tickers: usize, columns: usize },

    #[error("column '{ticker}' has {len} cell(s), expected {rows}")]
    ColumnLength {
        ticker: String,
        len: usize,
        rows: usize,
    },

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),
}

fn check_shape<T>(rows: usize, tickers: &[String], columns: &[Vec<T>]) -> Result<(), TableError> {
    if tickers.len() != columns.len() {
        return Err(TableError::ColumnCount {
            tickers: tickers.len(),
            columns: columns.len(),
        });
    }
    for (i, ticker) in tickers.iter().enumerate() {
        if tickers[..i].contains(ticker) {
            return Err(TableError::DuplicateTicker(ticker.clone()));
        }
    }
    for (ticker, col) in tickers.iter().zip(columns) {
        if col.len() != rows {
            return Err(TableError::ColumnLength {
                ticker: ticker.clone(),
                len: col.len(),
                rows,
            });
        }
    }
    Ok(())
}

impl PriceTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, TableError> {
        check_shape(dates.len(), &tickers, &columns)?;
        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    /// Table with the given tickers and no rows.
    pub fn empty(tickers: Vec<String>) -> Self {
        let columns = vec![Vec::new(); tickers.len()];
        Self {
            dates: Vec::new(),
            tickers,
            columns,
        }
    }

    pub(crate) fn from_parts_unchecked(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Self {
        debug_assert!(check_shape(dates.len(), &tickers, &columns).is_ok());
        Self {
            dates,
            tickers,
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn columns(&self) -> &[Vec<Option<f64>>] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_columns(&self) -> usize {
        self.tickers.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_columns())
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn get(&self, row: usize, ticker: &str) -> Option<f64> {
        self.column(ticker).and_then(|c| c.get(row).copied().flatten())
    }

    /// Fraction of rows with a value, per ticker in column order.
    ///
    /// A table with no rows reports zero coverage for every ticker.
    pub fn coverage(&self) -> Vec<(&str, f64)> {
        let rows = self.n_rows();
        self.tickers
            .iter()
            .zip(&self.columns)
            .map(|(ticker, col)| {
                let ratio = if rows == 0 {
                    0.0
                } else {
                    col.iter().filter(|v| v.is_some()).count() as f64 / rows as f64
                };
                (ticker.as_str(), ratio)
            })
            .collect()
    }

    pub fn missing_cells(&self) -> usize {
        self.columns.iter().flatten().filter(|v| v.is_none()).count()
    }

    /// New table keeping the columns for which `keep` returns true.
    pub fn retain_columns(&self, mut keep: impl FnMut(&str, &[Option<f64>]) -> bool) -> Self {
        let (tickers, columns) = self
            .tickers
            .iter()
            .zip(&self.columns)
            .filter(|(t, c)| keep(t, c))
            .map(|(t, c)| (t.clone(), c.clone()))
            .unzip();
        Self::from_parts_unchecked(self.dates.clone(), tickers, columns)
    }

    /// New table made of the given row indices, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= self.n_rows()`.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let dates = rows.iter().map(|&r| self.dates[r]).collect();
        let columns = self
            .columns
            .iter()
            .map(|col| rows.iter().map(|&r| col[r]).collect())
            .collect();
        Self::from_parts_unchecked(dates, self.tickers.clone(), columns)
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        build_frame(&self.dates, value_columns(&self.tickers, &self.columns))
    }
}

/// Price table with no missing cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl DenseTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, TableError> {
        check_shape(dates.len(), &tickers, &columns)?;
        Ok(Self {
            dates,
            tickers,
            columns,
        })
    }

    pub(crate) fn from_parts_unchecked(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert!(check_shape(dates.len(), &tickers, &columns).is_ok());
        Self {
            dates,
            tickers,
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_columns(&self) -> usize {
        self.tickers.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_columns())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        build_frame(&self.dates, value_columns(&self.tickers, &self.columns))
    }
}

/// Daily log returns. Each row is dated by the later day of its pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl ReturnTable {
    pub(crate) fn from_parts_unchecked(
        dates: Vec<NaiveDate>,
        tickers: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert!(check_shape(dates.len(), &tickers, &columns).is_ok());
        Self {
            dates,
            tickers,
            columns,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_columns(&self) -> usize {
        self.tickers.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_columns())
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// Values of one row across all tickers, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        (row < self.n_rows()).then(|| self.columns.iter().map(|c| c[row]).collect())
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        build_frame(&self.dates, value_columns(&self.tickers, &self.columns))
    }
}

fn value_columns<T>(tickers: &[String], columns: &[Vec<T>]) -> Vec<Column>
where
    T: Copy,
    Series: NamedFrom<Vec<T>, [T]>,
{
    tickers
        .iter()
        .zip(columns)
        .map(|(ticker, col)| Column::new(ticker.as_str().into(), col.clone()))
        .collect()
}

/// `date` column followed by one Float64 column per ticker.
fn build_frame(dates: &[NaiveDate], values: Vec<Column>) -> PolarsResult<DataFrame> {
    let date_col: Column =
        DateChunked::from_naive_date("date".into(), dates.iter().copied()).into_series().into();

    let mut frame_cols = Vec::with_capacity(values.len() + 1);
    frame_cols.push(date_col);
    frame_cols.extend(values);
    DataFrame::new(frame_cols)
}
