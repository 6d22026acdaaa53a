//! Run configuration.
//!
//! One `PipelineConfig` is built per run, from defaults, an optional TOML
//! file, and CLI overrides, then validated before anything is fetched.

use crate::data::universe::Universe;
use crate::table::PriceField;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MIN_COVERAGE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything a pipeline run needs to know.
///
/// `end` is exclusive: `start = 2024-12-24, end = 2025-12-25` covers
/// 2024-12-24 through 2025-12-24.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub field: PriceField,
    pub min_coverage: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: Universe::nasdaq_100().tickers,
            start: NaiveDate::from_ymd_opt(2024, 12, 24).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 12, 25).unwrap_or_default(),
            field: PriceField::Close,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: PipelineConfig = toml::from_str(content)?;
        config.tickers = Universe::new(None, config.tickers).tickers;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("ticker list is empty".into()));
        }
        if self.start >= self.end {
            return Err(ConfigError::Invalid(format!(
                "start {} must be before end {} (end is exclusive)",
                self.start, self.end
            )));
        }
        if !self.min_coverage.is_finite() || !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(ConfigError::Invalid(format!(
                "min_coverage must be within [0, 1], got {}",
                self.min_coverage
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn defaults_match_the_one_year_window() {
        let c = PipelineConfig::default();
        assert_eq!(c.tickers.len(), 101);
        assert_eq!(c.start, d("2024-12-24"));
        assert_eq!(c.end, d("2025-12-25"));
        assert_eq!(c.field, PriceField::Close);
        assert_eq!(c.min_coverage, 0.95);
        c.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = PipelineConfig::from_toml(
            r#"
tickers = ["AAPL", "MSFT", " AAPL "]
field = "Adj Close"
min_coverage = 0.9
"#,
        )
        .unwrap();
        assert_eq!(c.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(c.field, PriceField::AdjClose);
        assert_eq!(c.min_coverage, 0.9);
        assert_eq!(c.start, d("2024-12-24"));
    }

    #[test]
    fn field_names_in_toml_parse_like_the_cli() {
        let c = PipelineConfig::from_toml(r#"field = "close""#).unwrap();
        assert_eq!(c.field, PriceField::Close);
        let c = PipelineConfig::from_toml(r#"field = "adj-close""#).unwrap();
        assert_eq!(c.field, PriceField::AdjClose);
        let c = PipelineConfig::from_toml(r#"field = "adj_close""#).unwrap();
        assert_eq!(c.field, PriceField::AdjClose);
    }

    #[test]
    fn field_is_written_in_display_form() {
        let mut c = PipelineConfig::default();
        c.field = PriceField::AdjClose;
        assert!(c.to_toml().unwrap().contains(r#"field = "Adj Close""#));
    }

    #[test]
    fn ticker_case_is_kept() {
        let c = PipelineConfig::from_toml(r#"tickers = ["spy", "qqq"]"#).unwrap();
        assert_eq!(c.tickers, vec!["spy", "qqq"]);
    }

    #[test]
    fn toml_roundtrip() {
        let c = PipelineConfig::default();
        let parsed = PipelineConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(c, parsed);
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = PipelineConfig::from_toml(r#"field = "Last""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = PipelineConfig::default();
        c.min_coverage = 1.5;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.min_coverage = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.end = c.start;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.tickers.clear();
        assert!(c.validate().is_err());
    }
}
