//! Aggregation engine - multi-resolution OHLC candle building
//!
//! One windowing state machine per resolution, fanned out to in a fixed
//! order by the orchestrator so the emitted candle stream is deterministic.

mod orchestrator;
mod resolution;

pub use orchestrator::AggregationOrchestrator;
pub use resolution::ResolutionAggregator;
