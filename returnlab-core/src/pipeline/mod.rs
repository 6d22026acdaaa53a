//! Cleaning pipeline: fetch → select field → sanitize → align → log returns.
//!
//! Each stage reads the previous stage's table and builds a new one. Any
//! error stops the run and names the stage it came from.

pub mod align;
pub mod returns;
pub mod sanitize;
pub mod select;

pub use align::{align, drop_incomplete_rows, forward_fill, AlignReport, Aligned};
pub use returns::log_returns;
pub use sanitize::{
    drop_all_missing, drop_low_coverage, sanitize, sort_and_dedup, SanitizeReport, Sanitized,
};
pub use select::select_field;

use crate::config::{ConfigError, PipelineConfig};
use crate::data::fetch::fetch_quotes;
use crate::data::provider::{DataError, DataProvider, DownloadProgress};
use crate::table::{DenseTable, PriceField, QuoteTable, ReturnTable, TableError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch: {0}")]
    Fetch(#[from] DataError),

    #[error("select: field '{field}' not in fetched data (available: {available:?})")]
    FieldNotFound {
        field: PriceField,
        available: Vec<PriceField>,
    },

    #[error("select: malformed quote table: {0}")]
    Table(#[from] TableError),
}

/// Fetch-stage facts worth reporting alongside the tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub provider: String,
    pub requested: usize,
    pub succeeded: usize,
    /// Symbols the provider could not serve, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub field: PriceField,
    pub prices: DenseTable,
    pub returns: ReturnTable,
    pub fetch: FetchReport,
    pub sanitize: SanitizeReport,
    pub align: AlignReport,
}

/// Run the whole pipeline against `provider`.
pub fn run(
    config: &PipelineConfig,
    provider: &dyn DataProvider,
    progress: &dyn DownloadProgress,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;

    tracing::info!(
        provider = provider.name(),
        tickers = config.tickers.len(),
        start = %config.start,
        end = %config.end,
        field = %config.field,
        "fetching quotes"
    );
    let summary = fetch_quotes(provider, &config.tickers, config.start, config.end, progress)?;

    let fetch = FetchReport {
        provider: provider.name().to_string(),
        requested: config.tickers.len(),
        succeeded: summary.succeeded,
        failed: summary
            .failed
            .iter()
            .map(|(symbol, e)| (symbol.clone(), e.to_string()))
            .collect(),
    };

    let mut output = run_on_quotes(&summary.quotes, config.field, config.min_coverage)?;
    output.fetch = fetch;
    Ok(output)
}

/// Run every stage after the fetch on an already assembled quote table.
pub fn run_on_quotes(
    quotes: &QuoteTable,
    field: PriceField,
    min_coverage: f64,
) -> Result<PipelineOutput, PipelineError> {
    let prices = select_field(quotes, field)?;
    let sanitized = sanitize(&prices, min_coverage);
    let aligned = align(&sanitized.table);
    let returns = log_returns(&aligned.table);

    tracing::info!(
        rows = returns.n_rows(),
        columns = returns.n_columns(),
        "computed log returns"
    );

    Ok(PipelineOutput {
        field,
        prices: aligned.table,
        returns,
        fetch: FetchReport::default(),
        sanitize: sanitized.report,
        align: aligned.report,
    })
}
