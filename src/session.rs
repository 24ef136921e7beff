//! Trading session predicate
//!
//! Decides whether an instant falls inside the trading session. Trades
//! outside it are dropped before they reach the aggregators.

use chrono::{DateTime, Timelike, Utc};

/// Daily non-trading window expressed as a half-open minutes-of-day
/// interval `[closed_start, closed_end)`.
///
/// Only the time of day is compared; the date component is ignored.
/// Seconds are truncated, matching minute-granularity candle windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    closed_start_min: u32,
    closed_end_min: u32,
}

impl SessionWindow {
    pub fn new(closed_start_min: u32, closed_end_min: u32) -> Self {
        Self {
            closed_start_min,
            closed_end_min,
        }
    }

    /// True when the instant is eligible for aggregation.
    ///
    /// Pure and infallible.
    pub fn in_session(&self, t: DateTime<Utc>) -> bool {
        let minute_of_day = t.hour() * 60 + t.minute();
        !(minute_of_day >= self.closed_start_min && minute_of_day < self.closed_end_min)
    }
}

impl Default for SessionWindow {
    /// The reference exclusion window: [00:00, 07:00) UTC
    fn default() -> Self {
        Self::new(0, 7 * 60)
    }
}
