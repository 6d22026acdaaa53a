//! ReturnLab Core — price download, table cleaning, and daily log returns.
//!
//! This crate contains:
//! - Quote providers (Yahoo Finance, CSV import) behind one trait
//! - Parallel multi-symbol fetch with per-symbol failure isolation
//! - Date × ticker table types with the dense invariant in the type system
//! - Pipeline stages: field selection, sanitizing, alignment, log returns
//! - TOML run configuration

pub mod config;
pub mod data;
pub mod pipeline;
pub mod table;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{run, run_on_quotes, PipelineError, PipelineOutput};
pub use table::{DenseTable, PriceField, PriceTable, QuoteTable, ReturnTable};
