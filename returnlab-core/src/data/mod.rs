//! Quote providers and multi-symbol fetch

pub mod circuit_breaker;
pub mod csv_import;
pub mod fetch;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use fetch::{fetch_quotes, FetchSummary};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, LogProgress, RawBar,
    SilentProgress,
};
pub use universe::Universe;
pub use yahoo::YahooProvider;
