//! End-to-end pipeline tests over small trade fixtures

use std::io::Write;
use std::path::Path;

use candlemill::config::{
    AggregationConfig, AppConfig, RunConfig, SessionConfig, SinkConfig, SourceConfig,
};
use candlemill::error::PipelineError;
use candlemill::pipeline;
use tempfile::tempdir;

fn make_config(input: &Path, out_dir: &Path, deadline_secs: u64) -> AppConfig {
    AppConfig {
        source: SourceConfig {
            path: input.to_string_lossy().into_owned(),
        },
        sink: SinkConfig {
            out_dir: out_dir.to_string_lossy().into_owned(),
        },
        aggregation: AggregationConfig {
            resolutions: vec!["5m".into(), "30m".into(), "240m".into()],
            epoch: "2019-01-30T07:00:00Z".into(),
        },
        session: SessionConfig {
            closed_start_min: 0,
            closed_end_min: 7 * 60,
        },
        run: RunConfig { deadline_secs },
    }
}

fn write_fixture(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join("trades.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

fn read_output(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

#[tokio::test]
async fn test_end_to_end_aggregation() {
    let dir = tempdir().unwrap();
    let input = write_fixture(
        dir.path(),
        &[
            "SBER,10,100,2019-01-30 10:00:00",
            "SBER,12,100,2019-01-30 10:02:00",
            "GAZP,20,100,2019-01-30 10:03:00",
            "SBER,9,100,2019-01-30 10:06:00",
        ],
    );
    let out = tempdir().unwrap();

    pipeline::run(&make_config(&input, out.path(), 30))
        .await
        .unwrap();

    // 5m: the 10:06 trade closes the 10:00 window, the rest flushes
    assert_eq!(
        read_output(out.path(), "candles_5min.csv"),
        "GAZP,2019-01-30T10:00:00Z,20,20,20,20\n\
         SBER,2019-01-30T10:00:00Z,10,12,10,12\n\
         SBER,2019-01-30T10:05:00Z,9,9,9,9\n"
    );

    // 30m: both aggregators resynced to 10:00, everything flushes at end
    assert_eq!(
        read_output(out.path(), "candles_30min.csv"),
        "GAZP,2019-01-30T10:00:00Z,20,20,20,20\n\
         SBER,2019-01-30T10:00:00Z,10,12,9,9\n"
    );

    // 240m: 10:00 is within the first window of the 07:00 epoch
    assert_eq!(
        read_output(out.path(), "candles_240min.csv"),
        "GAZP,2019-01-30T07:00:00Z,20,20,20,20\n\
         SBER,2019-01-30T07:00:00Z,10,12,9,9\n"
    );
}

#[tokio::test]
async fn test_out_of_session_trades_produce_nothing() {
    let dir = tempdir().unwrap();
    let input = write_fixture(
        dir.path(),
        &[
            "SBER,10,100,2019-01-30 00:00:00",
            "SBER,11,100,2019-01-30 03:30:00",
            "SBER,12,100,2019-01-30 06:59:59",
        ],
    );
    let out = tempdir().unwrap();

    pipeline::run(&make_config(&input, out.path(), 30))
        .await
        .unwrap();

    for name in [
        "candles_5min.csv",
        "candles_30min.csv",
        "candles_240min.csv",
    ] {
        assert_eq!(read_output(out.path(), name), "", "{name} should be empty");
    }
}

#[tokio::test]
async fn test_malformed_record_aborts_without_flush() {
    let dir = tempdir().unwrap();
    let input = write_fixture(
        dir.path(),
        &[
            "SBER,10,100,2019-01-30 10:00:00",
            "SBER,not-a-price,100,2019-01-30 10:01:00",
            "SBER,12,100,2019-01-30 10:02:00",
        ],
    );
    let out = tempdir().unwrap();

    let err = pipeline::run(&make_config(&input, out.path(), 30))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MalformedInput { line: 2, .. })
    ));

    // The open candle from line 1 is discarded, not flushed
    assert_eq!(read_output(out.path(), "candles_5min.csv"), "");
}

#[tokio::test]
async fn test_missing_input_file_is_a_source_error() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();

    let err = pipeline::run(&make_config(&dir.path().join("absent.csv"), out.path(), 30))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Source(_))
    ));
}

#[tokio::test]
async fn test_deadline_discards_residual_state() {
    let dir = tempdir().unwrap();
    // Enough records that a zero-second deadline always fires mid-stream
    let lines: Vec<String> = (0..50_000)
        .map(|i| format!("SBER,{},100,2019-01-30 10:00:{:02}", 10 + i % 5, i % 60))
        .collect();
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let input = write_fixture(dir.path(), &refs);
    let out = tempdir().unwrap();

    let err = pipeline::run(&make_config(&input, out.path(), 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::DeadlineExceeded(_))
    ));
}
