//! rustsignal - headless multi-timeframe signal scanner
//!
//! Refreshes the configured symbol universe on a fixed cadence and prints one
//! report per cycle.
//!
//! # Usage
//! ```sh
//! PROVIDER=alpaca cargo run -- --interval 30 --format text
//! cargo run -- --once --format json --debug-symbol NVDA --debug-timeframe 4h
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use rustsignal::application::system::Application;
use rustsignal::config::{
    Config, LogFormat, ObservabilityEnvConfig, SignalEnvConfig, UniverseEnvConfig,
};
use rustsignal::domain::errors::ScanError;
use rustsignal::domain::market::report::ScanReport;
use rustsignal::domain::market::timeframe::Timeframe;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{Level, error, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-timeframe EMA/RSI/volume signal scanner", long_about = None)]
struct Cli {
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Report output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Refresh interval in seconds (10-300), overrides REFRESH_INTERVAL_SECS
    #[arg(long)]
    interval: Option<u64>,

    /// Symbol to trace in detail, overrides DEBUG_SYMBOL
    #[arg(long)]
    debug_symbol: Option<String>,

    /// Timeframe of the traced symbol, e.g. 1h
    #[arg(long, requires = "debug_symbol")]
    debug_timeframe: Option<Timeframe>,

    /// TOML universe file, overrides UNIVERSE_FILE
    #[arg(long)]
    universe: Option<PathBuf>,
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
            .init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .init(),
    }
}

fn apply_cli(mut config: Config, cli: &Cli) -> Result<Config> {
    if let Some(secs) = cli.interval {
        config.universe.refresh_interval =
            Duration::from_secs(UniverseEnvConfig::clamp_refresh(secs));
    }
    if let Some(path) = &cli.universe {
        config.universe.universe_file = Some(path.clone());
    }
    if let Some(symbol) = &cli.debug_symbol {
        let timeframe = cli
            .debug_timeframe
            .or(config.signal.debug_target.as_ref().map(|t| t.timeframe))
            .unwrap_or(Timeframe::OneHour);
        config.signal.debug_target =
            Some(SignalEnvConfig::validate_debug_target(symbol, timeframe)?);
    }
    Ok(config)
}

fn emit(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(ObservabilityEnvConfig::from_env()?.log_format);
    let config = apply_cli(Config::from_env()?, &cli)?;

    info!("rustsignal {} starting...", env!("CARGO_PKG_VERSION"));
    let app = Application::build(config).await?;

    if cli.once {
        let report = app.scan_once().await?;
        return emit(&report, cli.format);
    }

    let mut ticker = tokio::time::interval(app.config.universe.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match app.scan_once().await {
                    Ok(report) => emit(&report, cli.format)?,
                    Err(e @ ScanError::Authentication(_)) => {
                        error!("Scan aborted, check provider credentials: {}", e);
                        return Err(e.into());
                    }
                    Err(e) => warn!("Scan cycle failed, retrying next tick: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, exiting.");
                break;
            }
        }
    }
    Ok(())
}
