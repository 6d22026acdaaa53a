//! Ticker universe.
//!
//! Stored as TOML (`tickers = ["AAPL", ...]`). Loading de-duplicates while
//! keeping first occurrence, so the column order of every table follows the
//! order written in the file. Tickers are opaque: only surrounding whitespace
//! is removed, case is kept as written.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered, duplicate-free list of tickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default)]
    pub name: Option<String>,
    pub tickers: Vec<String>,
}

impl Universe {
    pub fn new(name: Option<String>, tickers: impl IntoIterator<Item = String>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for ticker in tickers {
            let ticker = ticker.trim().to_string();
            if !ticker.is_empty() && !out.contains(&ticker) {
                out.push(ticker);
            }
        }
        Self { name, tickers: out }
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let raw: Universe =
            toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))?;
        Ok(Self::new(raw.name, raw.tickers))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// NASDAQ-100 constituents as of late 2025.
    pub fn nasdaq_100() -> Self {
        let tickers = [
            "NVDA", "AAPL", "MSFT", "AMZN", "GOOGL", "GOOG", "META", "AVGO", "TSLA", "PLTR",
            "ASML", "NFLX", "COST", "AMD", "MU", "CSCO", "AZN", "APP", "LRCX", "TMUS",
            "SHOP", "AMAT", "ISRG", "LIN", "PEP", "INTU", "QCOM", "AMGN", "BKNG", "INTC",
            "KLAC", "PDD", "TXN", "GILD", "ADBE", "ADI", "PANW", "HON", "CRWD", "ARM",
            "VRTX", "CEG", "CMCSA", "ADP", "MELI", "DASH", "SBUX", "SNPS", "CDNS", "MAR",
            "ABNB", "REGN", "ORLY", "CTAS", "MNST", "MRVL", "WBD", "MDLZ", "CSX", "ADSK",
            "AEP", "FTNT", "TRI", "ROST", "PCAR", "WDAY", "NXPI", "PYPL", "IDXX", "EA",
            "ROP", "DDOG", "FAST", "AXON", "TTWO", "MSTR", "BKR", "EXC", "XEL", "TEAM",
            "FANG", "CTSH", "PAYX", "CCEP", "KDP", "GEHC", "CPRT", "ZS", "MCHP", "ODFL",
            "VRSK", "KHC", "CSGP", "CHTR", "DXCM", "BIIB", "LULU", "ON", "GFS", "TTD",
            "CDW",
        ];
        Self::new(
            Some("nasdaq-100".into()),
            tickers.into_iter().map(String::from),
        )
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::nasdaq_100()
    }
}
