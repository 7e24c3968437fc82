// End-to-end tests for logfanout
//
// These drive the library the way the CLI does: lines from a reader or a
// file, through an IngestPool of in-memory sessions, into both views.

use std::io::Write;
use std::sync::Arc;

use logfanout::config::RuntimeConfig;
use logfanout::writer::{
    IngestOutcome, IngestPool, LogWriter, MemorySession, View, WriterConfig,
};
use logfanout::{ingest_reader, Input};

fn access_log(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                "nginx|2024-06-30 23:{:02}:{:02}|10.0.0.{} GET /index.html 200\n",
                (i / 60) % 60,
                i % 60,
                i % 255
            )
        })
        .collect()
}

#[tokio::test]
async fn test_reader_is_split_into_calls() {
    let session = Arc::new(MemorySession::new());
    let writer = LogWriter::new(Arc::clone(&session), WriterConfig::default());
    let pool = Arc::new(IngestPool::new(vec![writer], 4).unwrap());

    let input = access_log(450);
    let report = ingest_reader(input.as_bytes(), Arc::clone(&pool), 150)
        .await
        .expect("ingestion failed");

    // three calls of 150 lines, one batch per view each
    assert_eq!(report.by_id.lines, 450);
    assert_eq!(report.by_id.rows_written, 450);
    assert_eq!(report.by_day.rows_written, 450);
    assert_eq!(report.batches_submitted(), 6);
    assert_eq!(report.outcome(), IngestOutcome::Complete);

    let by_id = session.batches_for(View::ById);
    assert_eq!(by_id.len(), 3);
    assert!(by_id.iter().all(|b| b.len() == 150));
    assert!(by_id[0].rows.iter().all(|r| r.logdate == "2024-06-30"));
    assert!(session
        .batches_for(View::ByDay)
        .iter()
        .all(|b| b.rows.iter().all(|r| r.logdate == "20240630")));
}

#[tokio::test]
async fn test_bad_lines_are_counted_not_fatal() {
    let session = Arc::new(MemorySession::new());
    let writer = LogWriter::new(Arc::clone(&session), WriterConfig::default());
    let pool = Arc::new(IngestPool::new(vec![writer], 1).unwrap());

    let input = "app|2024-01-01 00:00:00|ok\n\
                 only|two\n\
                 app|yesterday|bad time\n\
                 app|2024-01-01 00:00:01|also ok\r\n";
    let report = ingest_reader(input.as_bytes(), pool, 10_000).await.unwrap();

    assert_eq!(report.by_id.rows_written, 2);
    assert_eq!(report.by_id.parse_skipped, 1);
    assert_eq!(report.by_id.time_skipped, 1);
    assert_eq!(report.by_day.records_skipped(), 2);
    assert!(report.outcome().is_complete());

    let rows = &session.batches_for(View::ById)[0].rows;
    assert_eq!(rows[1].raw_data, "also ok");
}

#[tokio::test]
async fn test_invalid_utf8_line_is_skipped() {
    let session = Arc::new(MemorySession::new());
    let writer = LogWriter::new(Arc::clone(&session), WriterConfig::default());
    let pool = Arc::new(IngestPool::new(vec![writer], 1).unwrap());

    let mut input = b"app|2024-01-01 00:00:00|first\n".to_vec();
    input.extend_from_slice(b"app|2024-01-01 00:00:01|\xff\xfe broken\n");
    input.extend_from_slice(b"app|2024-01-01 00:00:02|third\n");

    let report = ingest_reader(input.as_slice(), pool, 10_000)
        .await
        .expect("a bad line must not abort ingestion");

    for pass in [&report.by_id, &report.by_day] {
        assert_eq!(pass.lines, 3);
        assert_eq!(pass.rows_written, 2);
        assert_eq!(pass.parse_skipped, 1);
    }
    assert!(report.outcome().is_complete());

    let raw: Vec<String> = session.batches_for(View::ById)[0]
        .rows
        .iter()
        .map(|r| r.raw_data.clone())
        .collect();
    assert_eq!(raw, vec!["first", "third"]);
}

#[tokio::test]
async fn test_failures_surface_in_report() {
    let session = Arc::new(MemorySession::new().fail_view(View::ByDay));
    let writer = LogWriter::new(Arc::clone(&session), WriterConfig::default());
    let pool = Arc::new(IngestPool::new(vec![writer], 2).unwrap());

    let report = ingest_reader(access_log(300).as_bytes(), pool, 100)
        .await
        .unwrap();

    assert_eq!(report.outcome(), IngestOutcome::ByDayFailed);
    assert_eq!(report.by_day.batches_failed, 3);
    assert!(report.legacy_status().is_err());
    assert!(report.into_result().is_err());
}

#[tokio::test]
async fn test_dry_run_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(access_log(25).as_bytes()).unwrap();
    file.flush().unwrap();

    let mut config = RuntimeConfig::default();
    config.ingest.batch_size = 10;
    config.ingest.workers = 2;
    config.ingest.lines_per_call = 5;

    let input = Input::File(file.path().to_path_buf());
    let report = logfanout::run(&config, &input, true).await.unwrap();

    assert_eq!(report.by_id.lines, 25);
    assert_eq!(report.by_id.rows_written, 25);
    assert_eq!(report.by_day.rows_written, 25);
    // five calls of five lines, one batch per view each
    assert_eq!(report.batches_submitted(), 10);
}

#[tokio::test]
async fn test_missing_input_file_is_an_error() {
    let input = Input::File("/nonexistent/access.log".into());
    let err = logfanout::run(&RuntimeConfig::default(), &input, true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to open input file"));
}

#[cfg(not(feature = "scylla"))]
#[tokio::test]
async fn test_real_cluster_needs_driver_feature() {
    let input = Input::Stdin;
    let err = logfanout::run(&RuntimeConfig::default(), &input, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("scylla"));
}
