//! Pipeline error taxonomy
//!
//! Fail-fast: any error from any stage halts all stages and the host
//! reports at most one terminating error per run.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A record the reader could not turn into a valid trade.
    #[error("malformed trade record at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    /// The run deadline fired before the trade stream was exhausted.
    /// Residual aggregator state is discarded, not flushed.
    #[error("deadline of {0:?} exceeded before the trade stream was exhausted")]
    DeadlineExceeded(Duration),

    /// The trade source file could not be opened or read.
    #[error("unable to read trade source: {0}")]
    Source(#[source] std::io::Error),

    /// A candle sink could not be opened or written.
    #[error("candle sink failure: {0}")]
    Sink(#[source] csv::Error),

    /// A pipeline stage task failed to join.
    #[error("pipeline task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

impl PipelineError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}
