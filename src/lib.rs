//! CandleMill Library
//!
//! Multi-resolution OHLC candle aggregation for timestamped trade streams

pub mod aggregate;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod session;
pub mod types;
