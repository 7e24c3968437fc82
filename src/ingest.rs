// Line ingestion driver
//
// Reads input line by line, groups lines into calls of `lines_per_call`
// and hands the calls to an IngestPool. Reports from all calls are folded
// into one IngestReport.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use logfanout_config::RuntimeConfig;
use logfanout_writer::{IngestPool, IngestReport, LogWriter, WriterConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::init::connect_session;

/// Where input lines come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// `None` or `-` means stdin.
    pub fn from_arg(arg: Option<PathBuf>) -> Self {
        match arg {
            Some(path) if path.as_os_str() != "-" => Input::File(path),
            _ => Input::Stdin,
        }
    }

    async fn open(&self) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
        match self {
            Input::Stdin => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
            Input::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open input file {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Connect one session per worker, ingest `input` and shut the pool down.
pub async fn run(config: &RuntimeConfig, input: &Input, dry_run: bool) -> Result<IngestReport> {
    let writer_config = WriterConfig::from_runtime(config)?;
    let reader = input.open().await?;

    let mut writers = Vec::with_capacity(config.ingest.workers);
    for _ in 0..config.ingest.workers {
        let session = connect_session(&config.storage, dry_run).await?;
        writers.push(LogWriter::new(session, writer_config.clone()));
    }
    let pool = Arc::new(IngestPool::new(writers, config.ingest.queue_depth)?);

    let result = ingest_reader(reader, Arc::clone(&pool), config.ingest.lines_per_call).await;

    match Arc::try_unwrap(pool) {
        Ok(pool) => pool.shutdown().await,
        Err(_) => debug!("Ingest pool still referenced, dropping without drain"),
    }

    result
}

/// Feed every line of `reader` through `pool`, `lines_per_call` lines per call.
///
/// At most two calls per worker are in flight. Reading pauses until one of
/// them finishes. Lines that are not valid UTF-8 never reach the writer; they
/// are logged and counted as parse skips in both views.
pub async fn ingest_reader<R>(
    mut reader: R,
    pool: Arc<IngestPool>,
    lines_per_call: usize,
) -> Result<IngestReport>
where
    R: AsyncBufRead + Unpin,
{
    let lines_per_call = lines_per_call.max(1);
    let max_in_flight = pool.workers() * 2;

    let mut total = IngestReport::empty();
    let mut in_flight = JoinSet::new();
    let mut calls = 0usize;
    let mut line_no = 0usize;
    let mut undecodable = 0usize;

    let mut buf = Vec::new();
    let mut chunk = Vec::with_capacity(lines_per_call);
    loop {
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read input")?;
        let done = read == 0;
        if !done {
            line_no += 1;
            trim_line_ending(&mut buf);
            match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) => chunk.push(line),
                Err(e) => {
                    warn!(line = line_no, error = %e.utf8_error(), "Record skipped: not valid UTF-8");
                    undecodable += 1;
                }
            }
        }

        if chunk.len() == lines_per_call || (done && !chunk.is_empty()) {
            let call = std::mem::replace(&mut chunk, Vec::with_capacity(lines_per_call));
            calls += 1;
            debug!(call = calls, lines = call.len(), "Submitting ingestion call");

            let pool = Arc::clone(&pool);
            in_flight.spawn(async move { pool.submit(call).await });

            while in_flight.len() >= max_in_flight {
                if let Some(joined) = in_flight.join_next().await {
                    total.absorb(&joined.context("Ingestion task failed")??);
                }
            }
        }

        if done {
            break;
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        total.absorb(&joined.context("Ingestion task failed")??);
    }

    for pass in [&mut total.by_id, &mut total.by_day] {
        pass.lines += undecodable;
        pass.parse_skipped += undecodable;
    }

    info!(
        calls,
        lines = total.by_id.lines,
        by_id_rows = total.by_id.rows_written,
        by_day_rows = total.by_day.rows_written,
        skipped = total.by_id.records_skipped(),
        batches_failed = total.batches_failed(),
        "Ingestion finished"
    );
    Ok(total)
}

fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn dash_means_stdin() {
        assert_eq!(Input::from_arg(None), Input::Stdin);
        assert_eq!(Input::from_arg(Some(PathBuf::from("-"))), Input::Stdin);
        assert_eq!(
            Input::from_arg(Some(PathBuf::from("access.log"))),
            Input::File(Path::new("access.log").to_path_buf())
        );
    }

    #[test]
    fn strips_unix_and_windows_line_endings() {
        let mut unix = b"a|b|c\n".to_vec();
        trim_line_ending(&mut unix);
        assert_eq!(unix, b"a|b|c");

        let mut windows = b"a|b|c\r\n".to_vec();
        trim_line_ending(&mut windows);
        assert_eq!(windows, b"a|b|c");

        let mut last = b"a|b|c".to_vec();
        trim_line_ending(&mut last);
        assert_eq!(last, b"a|b|c");
    }
}
