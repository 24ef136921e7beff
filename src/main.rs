//! CandleMill binary entrypoint
//!
//! Loads configuration, applies CLI overrides and runs the aggregation
//! pipeline once over the given trade file.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use candlemill::config::AppConfig;
use candlemill::pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "candlemill",
    version,
    about = "Aggregates a CSV trade stream into multi-resolution OHLC candles"
)]
struct Cli {
    /// Path of the CSV file containing trades
    #[arg(long)]
    file: Option<String>,

    /// Directory the candle files are written to
    #[arg(long)]
    out_dir: Option<String>,

    /// Wall-clock budget for the run, in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(file) = cli.file {
        config.source.path = file;
    }
    if let Some(out_dir) = cli.out_dir {
        config.sink.out_dir = out_dir;
    }
    if let Some(deadline_secs) = cli.deadline_secs {
        config.run.deadline_secs = deadline_secs;
    }

    info!(config = %config.digest(), "starting candle aggregation run");
    pipeline::run(&config).await?;
    info!("run complete");

    Ok(())
}
