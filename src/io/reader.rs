//! Trade record source
//!
//! Reads the input file line by line and parses each record into a
//! `TradeEvent`. A record is comma-separated with the ticker in the first
//! column, the price in the second and the timestamp in the fourth; the
//! third column is carried by upstream exports but not used here.
//! Timestamps are `YYYY-MM-DD HH:MM:SS`, interpreted as UTC.

use chrono::{NaiveDateTime, TimeZone, Utc};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::PipelineError;
use crate::types::TradeEvent;

const COL_TICKER: usize = 0;
const COL_PRICE: usize = 1;
const COL_TIMESTAMP: usize = 3;
const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse one input line into a trade.
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_trade(line: &str, line_no: usize) -> Result<TradeEvent, PipelineError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() <= COL_TIMESTAMP {
        return Err(PipelineError::malformed(
            line_no,
            format!(
                "expected at least {} comma-separated fields, got {}",
                COL_TIMESTAMP + 1,
                fields.len()
            ),
        ));
    }

    let ticker = fields[COL_TICKER].trim();
    if ticker.is_empty() {
        return Err(PipelineError::malformed(line_no, "empty ticker"));
    }

    let price: f64 = fields[COL_PRICE].trim().parse().map_err(|e| {
        PipelineError::malformed(line_no, format!("bad price {:?}: {e}", fields[COL_PRICE]))
    })?;
    if !price.is_finite() {
        return Err(PipelineError::malformed(
            line_no,
            format!("non-finite price {:?}", fields[COL_PRICE]),
        ));
    }

    let naive = NaiveDateTime::parse_from_str(fields[COL_TIMESTAMP].trim(), TIMESTAMP_LAYOUT)
        .map_err(|e| {
            PipelineError::malformed(
                line_no,
                format!("bad timestamp {:?}: {e}", fields[COL_TIMESTAMP]),
            )
        })?;

    Ok(TradeEvent {
        ticker: ticker.to_string(),
        price,
        timestamp: Utc.from_utc_datetime(&naive),
    })
}

/// Source stage: stream parsed trades into the pipeline.
///
/// Stops producing as soon as the cancellation token fires. A malformed
/// record is fatal: the token is cancelled so downstream stages wind down
/// without flushing, and the error propagates to the host.
pub async fn read_trades(
    path: PathBuf,
    tx: Sender<TradeEvent>,
    cancel: CancellationToken,
) -> Result<(), PipelineError> {
    let file = File::open(&path).await.map_err(PipelineError::Source)?;
    info!(path = %path.display(), "reading trades");

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => {
                let Some(line) = line.map_err(PipelineError::Source)? else {
                    return Ok(());
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                let trade = match parse_trade(&line, line_no) {
                    Ok(trade) => trade,
                    Err(e) => {
                        cancel.cancel();
                        return Err(e);
                    }
                };
                // A closed channel means the receiving stage is gone; it
                // carries the terminating error itself.
                if tx.send(trade).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_valid_record() {
        let trade = parse_trade("SBER,100.5,120,2019-01-30 10:05:00", 1).unwrap();
        assert_eq!(trade.ticker, "SBER");
        assert_eq!(trade.price, 100.5);
        assert_eq!(
            trade.timestamp,
            Utc.with_ymd_and_hms(2019, 1, 30, 10, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_short_record() {
        let err = parse_trade("SBER,100.5", 3).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_parse_rejects_empty_ticker() {
        assert!(parse_trade(",100.5,120,2019-01-30 10:05:00", 1).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_price() {
        assert!(parse_trade("SBER,abc,120,2019-01-30 10:05:00", 1).is_err());
        assert!(parse_trade("SBER,NaN,120,2019-01-30 10:05:00", 1).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        assert!(parse_trade("SBER,100.5,120,2019-01-30T10:05:00", 1).is_err());
        assert!(parse_trade("SBER,100.5,120,30/01/2019", 1).is_err());
    }
}
