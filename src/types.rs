//! Core types used throughout CandleMill
//!
//! Defines the trade event consumed by the aggregation engine and the
//! OHLC candle values it emits.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported aggregation resolutions (candle window widths)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    M5,
    M30,
    M240,
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::M5
    }
}

impl Resolution {
    /// All resolutions in ascending window-width order.
    ///
    /// This is the fixed order in which the orchestrator drives the
    /// aggregators, and therefore the per-trade emission order.
    pub fn all() -> [Resolution; 3] {
        [Resolution::M5, Resolution::M30, Resolution::M240]
    }

    /// Window width in minutes
    pub fn minutes(&self) -> i64 {
        match self {
            Resolution::M5 => 5,
            Resolution::M30 => 30,
            Resolution::M240 => 240,
        }
    }

    /// Window width as a chrono duration
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// File name of the CSV sink this resolution's candles are routed to
    pub fn output_file_name(&self) -> &'static str {
        match self {
            Resolution::M5 => "candles_5min.csv",
            Resolution::M30 => "candles_30min.csv",
            Resolution::M240 => "candles_240min.csv",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "5m" | "5min" => Some(Resolution::M5),
            "30m" | "30min" => Some(Resolution::M30),
            "240m" | "240min" | "4h" => Some(Resolution::M240),
            _ => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::M5 => write!(f, "5m"),
            Resolution::M30 => write!(f, "30m"),
            Resolution::M240 => write!(f, "240m"),
        }
    }
}

/// A single trade record, immutable once parsed.
///
/// The stream is assumed to arrive in non-decreasing timestamp order per
/// ticker; the engine never reorders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Non-empty instrument identifier
    pub ticker: String,
    /// Trade price (the only price value a trade carries)
    pub price: f64,
    /// Trade instant, UTC
    pub timestamp: DateTime<Utc>,
}

/// An OHLC candle for one ticker over one resolution window.
///
/// Mutable only while it is the current open candle inside an aggregator;
/// once emitted it is a plain value owned by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Start of the window this candle accumulated over
    pub window_start: DateTime<Utc>,
    pub resolution: Resolution,
}

impl Candle {
    /// Open a new candle from the first trade of a window
    pub fn new(trade: &TradeEvent, window_start: DateTime<Utc>, resolution: Resolution) -> Self {
        Self {
            ticker: trade.ticker.clone(),
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            window_start,
            resolution,
        }
    }

    /// Fold another trade price into the candle
    pub fn apply(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    /// Canonical CSV field order: ticker, window start, open, high, low, close
    pub fn to_record(&self) -> [String; 6] {
        [
            self.ticker.clone(),
            self.window_start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 30, 7, 0, 0).unwrap()
    }

    fn make_trade(ticker: &str, price: f64) -> TradeEvent {
        TradeEvent {
            ticker: ticker.to_string(),
            price,
            timestamp: window_start(),
        }
    }

    #[test]
    fn test_resolution_order() {
        let all = Resolution::all();
        assert!(all.windows(2).all(|w| w[0].minutes() < w[1].minutes()));
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!(Resolution::from_str("5m"), Some(Resolution::M5));
        assert_eq!(Resolution::from_str("240MIN"), Some(Resolution::M240));
        assert_eq!(Resolution::from_str("7m"), None);
    }

    #[test]
    fn test_candle_apply() {
        let mut candle = Candle::new(&make_trade("SBER", 10.0), window_start(), Resolution::M5);
        candle.apply(12.0);
        candle.apply(9.0);
        assert_eq!(candle.open, 10.0);
        assert_eq!(candle.high, 12.0);
        assert_eq!(candle.low, 9.0);
        assert_eq!(candle.close, 9.0);
    }

    #[test]
    fn test_candle_record_order() {
        let candle = Candle::new(&make_trade("SBER", 10.5), window_start(), Resolution::M30);
        let rec = candle.to_record();
        assert_eq!(rec[0], "SBER");
        assert_eq!(rec[1], "2019-01-30T07:00:00Z");
        assert_eq!(&rec[2..], ["10.5", "10.5", "10.5", "10.5"]);
    }
}
