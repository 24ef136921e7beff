//! Pipeline wiring - source, aggregation and sink stages
//!
//! Three tokio tasks joined by capacity-1 channels, so every handoff
//! blocks until the next stage is ready and backpressure reaches the
//! source. A root cancellation token, armed with the run deadline, stops
//! the source and makes the stages drain and exit; residual aggregator
//! state is discarded on cancellation, never flushed.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregate::AggregationOrchestrator;
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::io::{read_trades, write_candles, CandleSink};
use crate::types::{Candle, TradeEvent};

/// Run the whole pipeline to completion or first error.
///
/// Fail-fast: at most one terminating error per run. Output files already
/// written when a run aborts are left in place.
pub async fn run(config: &AppConfig) -> Result<()> {
    let resolutions = config.aggregation.resolutions()?;
    let epoch = config.aggregation.epoch()?;
    let session = config.session.window();
    let deadline = Duration::from_secs(config.run.deadline_secs);

    let orchestrator = AggregationOrchestrator::new(&resolutions, epoch, session);
    let sink = CandleSink::open(Path::new(&config.sink.out_dir), &resolutions)?;

    info!(
        resolutions = ?resolutions.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        epoch = %epoch,
        deadline_secs = config.run.deadline_secs,
        "pipeline started"
    );

    let cancel = CancellationToken::new();
    let (trade_tx, trade_rx) = mpsc::channel::<TradeEvent>(1);
    let (candle_tx, candle_rx) = mpsc::channel::<Candle>(1);

    let source = tokio::spawn(read_trades(
        PathBuf::from(&config.source.path),
        trade_tx,
        cancel.clone(),
    ));
    let aggregation = tokio::spawn(aggregate_trades(
        orchestrator,
        trade_rx,
        candle_tx,
        cancel.clone(),
    ));
    let sink_task = tokio::spawn(write_candles(sink, candle_rx));

    // Deadline watchdog: reports whether it fired before the stages ended
    let deadline_cancel = cancel.clone();
    let watchdog = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(deadline) => {
                deadline_cancel.cancel();
                true
            }
            _ = deadline_cancel.cancelled() => false,
        }
    });

    let (source_res, aggregation_res, sink_res) =
        tokio::try_join!(source, aggregation, sink_task).map_err(PipelineError::Task)?;
    cancel.cancel();
    let expired = watchdog.await.map_err(PipelineError::Task)?;

    source_res?;
    aggregation_res?;
    sink_res?;

    if expired {
        return Err(PipelineError::DeadlineExceeded(deadline).into());
    }

    info!("pipeline finished");
    Ok(())
}

/// Aggregation stage: drive the orchestrator with each trade, forward the
/// candles it closes, and flush exactly once on clean end of input.
///
/// On cancellation the stage exits without flushing; whatever was still
/// open inside the aggregators is discarded.
async fn aggregate_trades(
    mut orchestrator: AggregationOrchestrator,
    mut rx: Receiver<TradeEvent>,
    tx: Sender<Candle>,
    cancel: CancellationToken,
) -> Result<(), PipelineError> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            trade = rx.recv() => match trade {
                Some(trade) => {
                    for candle in orchestrator.ingest(&trade) {
                        if tx.send(candle).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                None => break,
            },
        }
    }

    // The channel also closes when the source aborts after cancelling the
    // token; only a clean end of input flushes.
    if cancel.is_cancelled() {
        return Ok(());
    }
    for candle in orchestrator.flush() {
        if tx.send(candle).await.is_err() {
            return Ok(());
        }
    }
    Ok(())
}
