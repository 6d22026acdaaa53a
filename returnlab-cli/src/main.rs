//! ReturnLab CLI: fetch daily prices, clean them, and preview log returns.
//!
//! Commands:
//! - `run`: fetch the universe (Yahoo Finance or a CSV file), clean, and print returns
//! - `universe`: print the default ticker universe as TOML
//! - `config`: print the effective configuration as TOML
//!
//! Settings resolve as: flag, then `RETURNLAB_*` environment variable, then
//! `--config` file, then built-in default.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use returnlab_core::data::{
    CircuitBreaker, CsvProvider, DataProvider, LogProgress, Universe, YahooProvider,
};
use returnlab_core::{PipelineConfig, PipelineOutput, PriceField};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "returnlab",
    about = "ReturnLab CLI: daily prices to clean log returns"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices, clean them, and print the log-return table.
    Run {
        #[command(flatten)]
        settings: Settings,

        /// Read quotes from a long-format CSV instead of Yahoo Finance.
        #[arg(long, env = "RETURNLAB_CSV")]
        csv: Option<PathBuf>,

        /// Yahoo retries per ticker after a transient failure.
        #[arg(long, env = "RETURNLAB_RETRIES", default_value_t = 3)]
        retries: u32,

        /// Number of leading return rows to print.
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },
    /// Print the default ticker universe as TOML.
    Universe,
    /// Print the effective configuration as TOML.
    Config {
        #[command(flatten)]
        settings: Settings,
    },
}

/// Pipeline settings shared by `run` and `config`.
#[derive(Args)]
struct Settings {
    /// TOML config file (tickers, start, end, field, min_coverage).
    #[arg(long, env = "RETURNLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated tickers. Defaults to the NASDAQ-100.
    #[arg(long, env = "RETURNLAB_TICKERS", value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// TOML universe file (`tickers = [...]`). Conflicts with --tickers.
    #[arg(long, env = "RETURNLAB_UNIVERSE")]
    universe: Option<PathBuf>,

    /// First date (YYYY-MM-DD). Defaults to 2024-12-24.
    #[arg(long, env = "RETURNLAB_START")]
    start: Option<NaiveDate>,

    /// End date, exclusive (YYYY-MM-DD). Defaults to 2025-12-25.
    #[arg(long, env = "RETURNLAB_END")]
    end: Option<NaiveDate>,

    /// Price field: Close or "Adj Close". Defaults to Close.
    #[arg(long, env = "RETURNLAB_FIELD")]
    field: Option<PriceField>,

    /// Minimum fraction of days a ticker must have. Defaults to 0.95.
    #[arg(long, env = "RETURNLAB_MIN_COVERAGE")]
    min_coverage: Option<f64>,
}

impl Settings {
    fn resolve(self) -> Result<PipelineConfig> {
        if self.tickers.is_some() && self.universe.is_some() {
            bail!("--tickers and --universe both set; pick one ticker source");
        }

        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(tickers) = self.tickers {
            config.tickers = Universe::new(None, tickers).tickers;
        } else if let Some(path) = &self.universe {
            config.tickers = Universe::from_file(path)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("loading universe {}", path.display()))?
                .tickers;
        }
        if let Some(start) = self.start {
            config.start = start;
        }
        if let Some(end) = self.end {
            config.end = end;
        }
        if let Some(field) = self.field {
            config.field = field;
        }
        if let Some(min_coverage) = self.min_coverage {
            config.min_coverage = min_coverage;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Run {
            settings,
            csv,
            retries,
            preview,
        } => run_pipeline(settings.resolve()?, csv, retries, preview),
        Commands::Universe => {
            let toml = Universe::nasdaq_100().to_toml().map_err(anyhow::Error::msg)?;
            print!("{toml}");
            Ok(())
        }
        Commands::Config { settings } => {
            print!("{}", settings.resolve()?.to_toml()?);
            Ok(())
        }
    }
}

/// Logs go to stderr so the report on stdout stays clean.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_pipeline(
    config: PipelineConfig,
    csv: Option<PathBuf>,
    retries: u32,
    preview: usize,
) -> Result<()> {
    let provider: Box<dyn DataProvider> = match csv {
        Some(path) => Box::new(
            CsvProvider::from_path(&path)
                .with_context(|| format!("loading quotes from {}", path.display()))?,
        ),
        None => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(
                YahooProvider::new(circuit_breaker)?
                    .with_retries(retries, Duration::from_millis(500)),
            )
        }
    };

    let output = returnlab_core::run(&config, provider.as_ref(), &LogProgress)?;

    if output.prices.n_columns() == 0 {
        tracing::warn!(
            all_missing = output.sanitize.all_missing.len(),
            low_coverage = output.sanitize.low_coverage.len(),
            "no ticker survived cleaning, return table is empty"
        );
    }
    print_report(&output, preview)
}

fn print_report(output: &PipelineOutput, preview: usize) -> Result<()> {
    println!();
    println!("=== {} prices ===", output.field);
    if !output.fetch.failed.is_empty() {
        println!(
            "Fetch failures ({}/{}):",
            output.fetch.failed.len(),
            output.fetch.requested
        );
        for (symbol, reason) in &output.fetch.failed {
            println!("  {symbol}: {reason}");
        }
    }
    if !output.sanitize.all_missing.is_empty() {
        println!(
            "Tickers without data (dropped): {:?}",
            output.sanitize.all_missing
        );
    }
    if !output.sanitize.low_coverage.is_empty() {
        println!(
            "Tickers dropped (coverage < {:.0}%): {:?}",
            output.sanitize.min_coverage * 100.0,
            output.sanitize.low_coverage
        );
    }

    let (rows, cols) = output.prices.shape();
    println!("Shape prices_clean: ({rows}, {cols})");
    match (output.align.first_date, output.align.last_date) {
        (Some(first), Some(last)) => println!("Effective period: {first} → {last}"),
        _ => println!("Effective period: (empty)"),
    }

    let (rows, cols) = output.returns.shape();
    println!("Shape log_returns: ({rows}, {cols})");
    if preview > 0 && rows > 0 {
        let df = output
            .returns
            .to_dataframe()
            .context("building return preview")?;
        println!("{}", df.head(Some(preview)));
    }
    println!();
    Ok(())
}
