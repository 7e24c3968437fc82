//! A fixed set of writers, each with its own session, fed by bounded queues.
//!
//! A single [`LogWriter`] is not shareable: it owns its session and its shard
//! cursor. Concurrency comes from running several writers side by side, one
//! tokio task each. Submissions are dealt out round-robin and every worker
//! processes its queue in order.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::error::{Result, WriterError};
use crate::report::IngestReport;
use crate::session::Session;
use crate::write::LogWriter;

struct Job {
    lines: Vec<String>,
    deadline: Option<Instant>,
    reply: oneshot::Sender<IngestReport>,
}

pub struct IngestPool {
    queues: Vec<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    next: AtomicUsize,
}

impl IngestPool {
    /// Start one worker task per writer. Must be called inside a tokio runtime.
    pub fn new<S>(writers: Vec<LogWriter<S>>, queue_depth: usize) -> Result<Self>
    where
        S: Session + 'static,
    {
        if writers.is_empty() {
            return Err(WriterError::invalid_config(
                "ingest pool needs at least one writer".to_string(),
            ));
        }
        if queue_depth == 0 {
            return Err(WriterError::invalid_config(
                "ingest.queue_depth must be greater than 0".to_string(),
            ));
        }

        let mut queues = Vec::with_capacity(writers.len());
        let mut workers = Vec::with_capacity(writers.len());
        for (index, writer) in writers.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(queue_depth);
            queues.push(tx);
            workers.push(tokio::spawn(run_worker(index, writer, rx)));
        }

        info!(workers = workers.len(), queue_depth, "Ingest pool started");
        Ok(Self {
            queues,
            workers,
            next: AtomicUsize::new(0),
        })
    }

    /// Build `workers` writers with `factory` and start the pool.
    pub fn spawn<S, F>(workers: usize, queue_depth: usize, factory: F) -> Result<Self>
    where
        S: Session + 'static,
        F: FnMut(usize) -> LogWriter<S>,
    {
        Self::new((0..workers).map(factory).collect(), queue_depth)
    }

    pub fn workers(&self) -> usize {
        self.queues.len()
    }

    /// Queue `lines` on the next worker and wait for its report.
    ///
    /// Waits for queue space when the worker is busy.
    pub async fn submit(&self, lines: Vec<String>) -> Result<IngestReport> {
        self.dispatch(lines, None).await
    }

    pub async fn submit_until(&self, lines: Vec<String>, deadline: Instant) -> Result<IngestReport> {
        self.dispatch(lines, Some(deadline)).await
    }

    async fn dispatch(&self, lines: Vec<String>, deadline: Option<Instant>) -> Result<IngestReport> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.queues.len();
        let (reply, response) = oneshot::channel();

        self.queues[index]
            .send(Job {
                lines,
                deadline,
                reply,
            })
            .await
            .map_err(|_| WriterError::pool_closed())?;

        response.await.map_err(|_| WriterError::pool_closed())
    }

    /// Stop accepting work, drain every queue and close each session.
    pub async fn shutdown(self) {
        let Self { queues, workers, .. } = self;
        drop(queues);

        for (index, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = index, error = %e, "Ingest worker panicked");
            }
        }
        info!("Ingest pool stopped");
    }
}

async fn run_worker<S: Session>(index: usize, mut writer: LogWriter<S>, mut rx: mpsc::Receiver<Job>) {
    debug!(worker = index, "Ingest worker started");

    while let Some(job) = rx.recv().await {
        let report = match job.deadline {
            Some(deadline) => writer.insert_log_batch_until(&job.lines, deadline).await,
            None => writer.insert_log_batch(&job.lines).await,
        };
        // the submitter may have given up waiting
        let _ = job.reply.send(report);
    }

    if let Err(e) = writer.close().await {
        error!(worker = index, error = %e, "Failed to close session");
    }
    debug!(worker = index, "Ingest worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySession;
    use crate::view::View;
    use crate::write::WriterConfig;
    use std::sync::Arc;

    fn line(i: usize) -> String {
        format!("web|2024-03-01 10:00:{:02}|request {}", i % 60, i)
    }

    #[tokio::test]
    async fn deals_work_round_robin_and_closes_sessions() {
        let sessions: Vec<Arc<MemorySession>> = (0..3).map(|_| Arc::new(MemorySession::new())).collect();
        let writers = sessions
            .iter()
            .map(|s| LogWriter::new(Arc::clone(s), WriterConfig::default()))
            .collect();
        let pool = IngestPool::new(writers, 2).unwrap();
        assert_eq!(pool.workers(), 3);

        for i in 0..6 {
            let report = pool.submit(vec![line(i)]).await.unwrap();
            assert!(report.outcome().is_complete());
        }
        pool.shutdown().await;

        for session in &sessions {
            assert_eq!(session.batches_for(View::ById).len(), 2);
            assert_eq!(session.batches_for(View::ByDay).len(), 2);
            assert!(session.is_closed());
        }
    }

    #[tokio::test]
    async fn concurrent_submissions_all_complete() {
        let pool = IngestPool::spawn(4, 1, |_| {
            LogWriter::new(MemorySession::new(), WriterConfig::default())
        })
        .unwrap();
        let pool = Arc::new(pool);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.submit((0..10).map(|j| line(i * 10 + j)).collect()).await })
            })
            .collect();

        let mut written = 0;
        for task in tasks {
            let report = task.await.unwrap().unwrap();
            written += report.by_id.rows_written;
        }
        assert_eq!(written, 160);
    }

    #[tokio::test]
    async fn rejects_empty_pool() {
        let writers: Vec<LogWriter<MemorySession>> = Vec::new();
        assert!(IngestPool::new(writers, 4).is_err());

        let writers = vec![LogWriter::new(MemorySession::new(), WriterConfig::default())];
        assert!(IngestPool::new(writers, 0).is_err());
    }
}
