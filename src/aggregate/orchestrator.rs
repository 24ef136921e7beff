//! Fan-out orchestration across resolutions
//!
//! Drives every resolution aggregator with each admitted trade in a fixed
//! ascending-resolution order, and coordinates the end-of-stream flush in
//! that same order. Aggregator state is exclusively owned here; the
//! sequential calls make per-aggregator locking unnecessary.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::aggregate::ResolutionAggregator;
use crate::session::SessionWindow;
use crate::types::{Candle, Resolution, TradeEvent};

pub struct AggregationOrchestrator {
    session: SessionWindow,
    /// Ascending resolution order; this is the per-trade emission order
    aggregators: Vec<ResolutionAggregator>,
}

impl AggregationOrchestrator {
    pub fn new(
        resolutions: &[Resolution],
        epoch: DateTime<Utc>,
        session: SessionWindow,
    ) -> Self {
        let mut ordered = resolutions.to_vec();
        ordered.sort();
        ordered.dedup();

        let aggregators = ordered
            .into_iter()
            .map(|resolution| ResolutionAggregator::new(resolution, epoch, session))
            .collect();

        Self {
            session,
            aggregators,
        }
    }

    pub fn aggregators(&self) -> &[ResolutionAggregator] {
        &self.aggregators
    }

    /// Ingest one trade, returning every candle it closed.
    ///
    /// Trades outside the session are dropped before any aggregator sees
    /// them. Each aggregator is driven to completion before the next, so
    /// candles for one trade never interleave across resolutions and each
    /// resolution's slice of the output stays window-ordered.
    pub fn ingest(&mut self, trade: &TradeEvent) -> Vec<Candle> {
        let mut out = Vec::new();
        if !self.session.in_session(trade.timestamp) {
            debug!(
                ticker = %trade.ticker,
                timestamp = %trade.timestamp,
                "trade outside session, dropped"
            );
            return out;
        }
        for aggregator in &mut self.aggregators {
            aggregator.ingest(trade, &mut out);
        }
        out
    }

    /// Drain residual state from every aggregator exactly once, in the
    /// same fixed order as ingestion.
    pub fn flush(&mut self) -> Vec<Candle> {
        let mut out = Vec::new();
        for aggregator in &mut self.aggregators {
            aggregator.flush(&mut out);
        }
        debug!(candles = out.len(), "flushed residual candles");
        out
    }
}
