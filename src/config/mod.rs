//! Configuration management for CandleMill
//!
//! Defaults → optional YAML/TOML files → environment variables via .env

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::session::SessionWindow;
use crate::types::Resolution;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub aggregation: AggregationConfig,
    pub session: SessionConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Path of the CSV file containing trades
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Directory the per-resolution candle files are written to
    pub out_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Resolutions to aggregate at (e.g. "5m", "30m", "240m")
    pub resolutions: Vec<String>,
    /// Initial window start for every aggregator, RFC 3339
    pub epoch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Start of the daily non-trading window, minutes of day (inclusive)
    pub closed_start_min: u32,
    /// End of the daily non-trading window, minutes of day (exclusive)
    pub closed_end_min: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Wall-clock budget for the whole run, in seconds
    pub deadline_secs: u64,
}

impl AggregationConfig {
    /// Parse the configured resolution names
    pub fn resolutions(&self) -> Result<Vec<Resolution>> {
        let mut parsed = Vec::with_capacity(self.resolutions.len());
        for name in &self.resolutions {
            match Resolution::from_str(name) {
                Some(resolution) => parsed.push(resolution),
                None => bail!("unknown resolution {:?} in aggregation.resolutions", name),
            }
        }
        if parsed.is_empty() {
            bail!("aggregation.resolutions must not be empty");
        }
        Ok(parsed)
    }

    /// Parse the configured epoch instant
    pub fn epoch(&self) -> Result<DateTime<Utc>> {
        let epoch = DateTime::parse_from_rfc3339(&self.epoch)
            .with_context(|| format!("aggregation.epoch {:?} is not RFC 3339", self.epoch))?;
        Ok(epoch.with_timezone(&Utc))
    }
}

impl SessionConfig {
    pub fn window(&self) -> SessionWindow {
        SessionWindow::new(self.closed_start_min, self.closed_end_min)
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("source.path", "trades.csv")?
            .set_default("sink.out_dir", ".")?
            .set_default("aggregation.resolutions", vec!["5m", "30m", "240m"])?
            .set_default("aggregation.epoch", "2019-01-30T07:00:00Z")?
            // Non-trading window [00:00, 07:00) UTC
            .set_default("session.closed_start_min", 0)?
            .set_default("session.closed_end_min", 7 * 60)?
            .set_default("run.deadline_secs", 5)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (CANDLEMILL_*)
            .add_source(Environment::with_prefix("CANDLEMILL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Generate a one-line digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "source={} out_dir={} resolutions={:?} epoch={} deadline={}s",
            self.source.path,
            self.sink.out_dir,
            self.aggregation.resolutions,
            self.aggregation.epoch,
            self.run.deadline_secs
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_aggregation(resolutions: &[&str], epoch: &str) -> AggregationConfig {
        AggregationConfig {
            resolutions: resolutions.iter().map(|s| s.to_string()).collect(),
            epoch: epoch.to_string(),
        }
    }

    #[test]
    fn test_resolutions_parse() {
        let cfg = make_aggregation(&["5m", "30m", "240m"], "2019-01-30T07:00:00Z");
        let parsed = cfg.resolutions().unwrap();
        assert_eq!(parsed, [Resolution::M5, Resolution::M30, Resolution::M240]);
    }

    #[test]
    fn test_unknown_resolution_rejected() {
        let cfg = make_aggregation(&["5m", "7m"], "2019-01-30T07:00:00Z");
        assert!(cfg.resolutions().is_err());
    }

    #[test]
    fn test_empty_resolutions_rejected() {
        let cfg = make_aggregation(&[], "2019-01-30T07:00:00Z");
        assert!(cfg.resolutions().is_err());
    }

    #[test]
    fn test_epoch_parses_as_utc() {
        let cfg = make_aggregation(&["5m"], "2019-01-30T07:00:00Z");
        let epoch = cfg.epoch().unwrap();
        assert_eq!(epoch.to_rfc3339(), "2019-01-30T07:00:00+00:00");
    }

    #[test]
    fn test_bad_epoch_rejected() {
        let cfg = make_aggregation(&["5m"], "2019-01-30 07:00:00");
        assert!(cfg.epoch().is_err());
    }
}
