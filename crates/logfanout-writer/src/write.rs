//! Dual-view fan-out writer.
//!
//! Every call runs two independent passes over the same input lines, first
//! for the by-id view and then for the by-day view. Each pass re-parses the
//! lines, chunks them, builds one logged batch per chunk and submits the
//! batches in input order. A bad line skips only itself and a failed batch
//! skips only itself: the pass always continues to the end.

use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;

use logfanout_config::{RuntimeConfig, ShardStrategy};
use logfanout_core::{
    parse_line, partition, DatePrecision, Deriver, RecordError, BATCH_SIZE, SHARD_COUNT,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StorageError, WriterError};
use crate::report::{IngestReport, PassReport};
use crate::session::{Ack, Session};
use crate::view::{PartitionValue, View, ViewRow, ViewTarget, WriteBatch};

/// Writer settings resolved from configuration
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub batch_size: NonZeroUsize,
    pub shard_count: u32,
    pub shard_strategy: ShardStrategy,
    pub by_id: ViewTarget,
    pub by_day: ViewTarget,
    /// Applied to every storage call; `None` waits for as long as the driver does
    pub request_timeout: Option<Duration>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            shard_count: SHARD_COUNT,
            shard_strategy: ShardStrategy::PerBatch,
            by_id: ViewTarget::by_id("nginx.t_nginx_log_by_id", DatePrecision::Day),
            by_day: ViewTarget::by_day(DatePrecision::DayKey),
            request_timeout: None,
        }
    }
}

impl WriterConfig {
    pub fn from_runtime(config: &RuntimeConfig) -> Result<Self> {
        let ingest = &config.ingest;

        let batch_size = NonZeroUsize::new(ingest.batch_size).ok_or_else(|| {
            WriterError::invalid_config("ingest.batch_size must be greater than 0".to_string())
        })?;
        if ingest.shard_count == 0 || i32::try_from(ingest.shard_count).is_err() {
            return Err(WriterError::invalid_config(format!(
                "ingest.shard_count {} is out of range",
                ingest.shard_count
            )));
        }
        let by_id_precision = ingest.by_id_precision().ok_or_else(|| {
            WriterError::invalid_config(format!(
                "ingest.by_id_precision {} is not between 1 and 6",
                ingest.by_id_precision
            ))
        })?;
        let by_day_precision = ingest.by_day_precision().ok_or_else(|| {
            WriterError::invalid_config(format!(
                "ingest.by_day_precision {} is not between 1 and 6",
                ingest.by_day_precision
            ))
        })?;

        Ok(Self {
            batch_size,
            shard_count: ingest.shard_count,
            shard_strategy: ingest.shard_strategy,
            by_id: ViewTarget::by_id(&config.storage.by_id_table, by_id_precision),
            by_day: ViewTarget::by_day(by_day_precision),
            request_timeout: config.storage.request_timeout(),
        })
    }

    fn target(&self, view: View) -> &ViewTarget {
        match view {
            View::ById => &self.by_id,
            View::ByDay => &self.by_day,
        }
    }
}

/// Writes raw log lines into both views through one exclusively owned session.
pub struct LogWriter<S> {
    session: S,
    config: WriterConfig,
    deriver: Deriver,
    rng: StdRng,
    next_shard: u32,
}

impl<S: Session> LogWriter<S> {
    pub fn new(session: S, config: WriterConfig) -> Self {
        Self {
            session,
            config,
            deriver: Deriver::new(),
            rng: StdRng::from_entropy(),
            next_shard: 0,
        }
    }

    /// Make shard selection reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Run a single statement, logging the cluster's message on failure.
    pub async fn execute_query(&self, query: &str) -> std::result::Result<Ack, StorageError> {
        let result = self.call(self.session.execute(query), None).await;
        if let Err(e) = &result {
            error!(error = %e, query, "Storage error");
        }
        result
    }

    /// Write `lines` to the by-id view and then to the by-day view.
    pub async fn insert_log_batch<L: AsRef<str>>(&mut self, lines: &[L]) -> IngestReport {
        self.fan_out(lines, None).await
    }

    /// Like [`insert_log_batch`](Self::insert_log_batch), but no storage call
    /// may run past `deadline`. Batches that would start or finish late fail
    /// with [`StorageError::DeadlineExceeded`].
    pub async fn insert_log_batch_until<L: AsRef<str>>(
        &mut self,
        lines: &[L],
        deadline: Instant,
    ) -> IngestReport {
        self.fan_out(lines, Some(deadline)).await
    }

    pub async fn insert_by_id<L: AsRef<str>>(&mut self, lines: &[L]) -> PassReport {
        self.run_pass(View::ById, lines, None).await
    }

    pub async fn insert_by_day<L: AsRef<str>>(&mut self, lines: &[L]) -> PassReport {
        self.run_pass(View::ByDay, lines, None).await
    }

    /// Close the underlying session.
    pub async fn close(&self) -> std::result::Result<(), StorageError> {
        self.session.close().await
    }

    async fn fan_out<L: AsRef<str>>(
        &mut self,
        lines: &[L],
        deadline: Option<Instant>,
    ) -> IngestReport {
        let by_id = self.run_pass(View::ById, lines, deadline).await;
        let by_day = self.run_pass(View::ByDay, lines, deadline).await;
        IngestReport { by_id, by_day }
    }

    async fn run_pass<L: AsRef<str>>(
        &mut self,
        view: View,
        lines: &[L],
        deadline: Option<Instant>,
    ) -> PassReport {
        let started = Instant::now();
        let target = self.config.target(view).clone();
        let mut report = PassReport::new(view, lines.len());

        for chunk in partition(lines, self.config.batch_size) {
            debug!(view = %view, from = chunk.start, to = chunk.end, "batch insert");

            let batch_shard = match (view, self.config.shard_strategy) {
                (View::ByDay, ShardStrategy::PerBatch) => Some(self.random_shard()),
                _ => None,
            };

            let mut batch = WriteBatch::new(&target, chunk.len());
            for line in chunk.items {
                let line = line.as_ref();
                let partition = match view {
                    View::ById => None,
                    View::ByDay => Some(batch_shard.unwrap_or_else(|| self.round_robin_shard())),
                };

                match self.build_row(&target, line, partition) {
                    Ok(row) => batch.push(row),
                    Err(e) => {
                        warn!(view = %view, kind = e.kind(), error = %e, line, "Record skipped");
                        report.record_skip(&e);
                    }
                }
            }

            if batch.is_empty() {
                debug!(view = %view, from = chunk.start, "No valid records in chunk, nothing to submit");
                continue;
            }

            let rows = batch.len();
            let status = self
                .call(self.session.execute_batch(&batch), deadline)
                .await
                .map(|_| ());
            if let Err(e) = &status {
                error!(
                    view = %view,
                    table = %target.table,
                    from = chunk.start,
                    to = chunk.end,
                    rows,
                    error = %e,
                    "Storage error, batch dropped"
                );
            }
            report.record_batch(rows, status);
        }

        report.elapsed = started.elapsed();
        if lines.len() > self.config.batch_size.get() {
            info!(
                view = %view,
                records = lines.len(),
                batches = report.batches_submitted,
                failed = report.batches_failed,
                cost_ms = report.elapsed.as_secs_f64() * 1_000.0,
                "Wrote log records"
            );
        }

        report
    }

    fn build_row(
        &self,
        target: &ViewTarget,
        line: &str,
        shard: Option<i32>,
    ) -> std::result::Result<ViewRow, RecordError> {
        let fields = parse_line(line)?;
        let derived = self.deriver.derive(fields.event_time, target.precision)?;

        let partition = match shard {
            Some(shard) => PartitionValue::Shard(shard),
            None => PartitionValue::LogType(fields.log_type.to_string()),
        };

        Ok(ViewRow {
            logdate: derived.logdate,
            partition,
            log_id: derived.id,
            create_time: derived.create_time_ms,
            raw_data: fields.raw_data.to_string(),
        })
    }

    fn random_shard(&mut self) -> i32 {
        self.rng.gen_range(0..self.config.shard_count) as i32
    }

    fn round_robin_shard(&mut self) -> i32 {
        let shard = self.next_shard % self.config.shard_count;
        self.next_shard = (shard + 1) % self.config.shard_count;
        shard as i32
    }

    /// Await a storage call under the per-call timeout and the optional deadline,
    /// whichever is tighter.
    async fn call<F>(&self, fut: F, deadline: Option<Instant>) -> std::result::Result<Ack, StorageError>
    where
        F: Future<Output = std::result::Result<Ack, StorageError>>,
    {
        let per_call = self.config.request_timeout;

        let remaining = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(StorageError::DeadlineExceeded);
                }
                Some(deadline - now)
            }
            None => None,
        };

        match (per_call, remaining) {
            (None, None) => fut.await,
            (Some(limit), None) => limited(limit, StorageError::Timeout(limit), fut).await,
            (Some(limit), Some(remaining)) if limit < remaining => {
                limited(limit, StorageError::Timeout(limit), fut).await
            }
            (_, Some(remaining)) => limited(remaining, StorageError::DeadlineExceeded, fut).await,
        }
    }
}

async fn limited<F>(
    limit: Duration,
    on_elapsed: StorageError,
    fut: F,
) -> std::result::Result<Ack, StorageError>
where
    F: Future<Output = std::result::Result<Ack, StorageError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed),
    }
}
