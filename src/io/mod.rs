//! Pipeline edges - trade record parsing and per-resolution CSV sinks

pub mod reader;
pub mod writer;

pub use reader::{parse_trade, read_trades};
pub use writer::{write_candles, CandleSink};
