//! Per-resolution candle sinks
//!
//! Routes each emitted candle to a CSV file keyed by its resolution,
//! appending one record per candle in the canonical field order.

use csv::{Writer, WriterBuilder};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::Path;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::types::{Candle, Resolution};

/// One append-mode CSV writer per configured resolution.
pub struct CandleSink {
    writers: HashMap<Resolution, Writer<File>>,
}

impl CandleSink {
    /// Open (creating if absent) the output file for every resolution.
    pub fn open(out_dir: &Path, resolutions: &[Resolution]) -> Result<Self, PipelineError> {
        let mut writers = HashMap::new();
        for &resolution in resolutions {
            let path = out_dir.join(resolution.output_file_name());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| PipelineError::Sink(e.into()))?;
            writers.insert(resolution, WriterBuilder::new().from_writer(file));
        }
        info!(out_dir = %out_dir.display(), files = writers.len(), "opened candle sinks");
        Ok(Self { writers })
    }

    /// Append one candle to its resolution's file.
    ///
    /// Flushed per record so already-written output survives an abort.
    pub fn write(&mut self, candle: &Candle) -> Result<(), PipelineError> {
        let writer = self
            .writers
            .get_mut(&candle.resolution)
            .expect("sink opened for every configured resolution");
        writer
            .write_record(candle.to_record())
            .map_err(PipelineError::Sink)?;
        writer
            .flush()
            .map_err(|e| PipelineError::Sink(e.into()))?;
        debug!(
            ticker = %candle.ticker,
            resolution = %candle.resolution,
            window_start = %candle.window_start,
            "candle written"
        );
        Ok(())
    }
}

/// Sink stage: drain the candle channel into the CSV files.
///
/// Runs until the channel closes, so candles already in flight at
/// cancellation are still consumed; a write failure aborts the pipeline.
pub async fn write_candles(
    mut sink: CandleSink,
    mut rx: Receiver<Candle>,
) -> Result<(), PipelineError> {
    let mut written = 0usize;
    while let Some(candle) = rx.recv().await {
        sink.write(&candle)?;
        written += 1;
    }
    info!(candles = written, "candle sink drained");
    Ok(())
}
