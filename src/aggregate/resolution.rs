//! Per-resolution windowing state machine
//!
//! One instance per configured resolution. Owns the accumulating candles
//! for its window width and decides when a window closes, when the window
//! start resyncs across a data gap, and when a rollover trade is dropped
//! because the next window would start inside the closed session.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::session::SessionWindow;
use crate::types::{Candle, Resolution, TradeEvent};

/// Aggregating state for a single resolution.
///
/// Invariants: at most one open candle per ticker; `window_start` is
/// monotonically non-decreasing for the lifetime of the instance.
pub struct ResolutionAggregator {
    resolution: Resolution,
    session: SessionWindow,
    window_start: DateTime<Utc>,
    open: HashMap<String, Candle>,
}

impl ResolutionAggregator {
    /// Create an aggregator seeded at the configured epoch.
    pub fn new(resolution: Resolution, epoch: DateTime<Utc>, session: SessionWindow) -> Self {
        Self {
            resolution,
            session,
            window_start: epoch,
            open: HashMap::new(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Start of the window currently accumulating
    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// Number of tickers with an open candle
    pub fn open_candles(&self) -> usize {
        self.open.len()
    }

    /// Ingest one trade, appending any candles closed by it to `out`.
    ///
    /// A trade at or past the end of the current window closes it. A trade
    /// more than one full window ahead is a resync: the window start jumps
    /// to the trade's own instant, skipping empty intermediate windows.
    /// Otherwise the window advances by exactly one width — unless the
    /// advanced start would fall inside the closed session, in which case
    /// the trade is dropped entirely for this resolution (no advance, no
    /// ingest). That drop mirrors the reference implementation and is kept
    /// deliberately; see DESIGN.md.
    ///
    /// A trade older than `window_start` (a data-quality concern, not an
    /// error) skips the window check and folds into the current window.
    pub fn ingest(&mut self, trade: &TradeEvent, out: &mut Vec<Candle>) {
        let width = self.resolution.duration();
        let diff = trade.timestamp.signed_duration_since(self.window_start);

        if diff >= width {
            self.drain_open(out);
            if diff >= width + width {
                debug!(
                    resolution = %self.resolution,
                    from = %self.window_start,
                    to = %trade.timestamp,
                    "gap detected, resyncing window start"
                );
                self.window_start = trade.timestamp;
            } else {
                let next = self.window_start + width;
                if !self.session.in_session(next) {
                    debug!(
                        resolution = %self.resolution,
                        ticker = %trade.ticker,
                        next_window = %next,
                        "next window outside session, dropping trade"
                    );
                    return;
                }
                self.window_start = next;
            }
        }

        match self.open.get_mut(&trade.ticker) {
            Some(candle) => candle.apply(trade.price),
            None => {
                self.open.insert(
                    trade.ticker.clone(),
                    Candle::new(trade, self.window_start, self.resolution),
                );
            }
        }
    }

    /// Emit every open candle tagged with the current window start.
    ///
    /// Idempotent: flushing an empty state emits nothing.
    pub fn flush(&mut self, out: &mut Vec<Candle>) {
        self.drain_open(out);
    }

    /// Drained candles are emitted in ascending ticker order so the output
    /// stream is deterministic.
    fn drain_open(&mut self, out: &mut Vec<Candle>) {
        if self.open.is_empty() {
            return;
        }
        let mut drained: Vec<Candle> = self.open.drain().map(|(_, candle)| candle).collect();
        drained.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        debug!(
            resolution = %self.resolution,
            window_start = %self.window_start,
            candles = drained.len(),
            "window closed"
        );
        out.extend(drained);
    }
}
