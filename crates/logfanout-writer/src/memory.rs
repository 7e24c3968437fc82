//! In-process session that records writes instead of sending them.
//!
//! Backs the test suites and the CLI's dry-run mode. Failures and latency
//! can be injected to exercise the writer's error paths.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StorageError;
use crate::session::{Ack, Session};
use crate::view::{View, WriteBatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureRule {
    /// Every batch for this view fails
    View(View),
    /// The nth `execute_batch` call (0-based, across views) fails
    Submission(usize),
}

#[derive(Debug, Default)]
struct MemoryState {
    applied: Vec<WriteBatch>,
    queries: Vec<String>,
    rules: Vec<FailureRule>,
    latency: Option<Duration>,
    submissions: usize,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct MemorySession {
    state: Mutex<MemoryState>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every batch written to `view`.
    pub fn fail_view(self, view: View) -> Self {
        self.state.lock().rules.push(FailureRule::View(view));
        self
    }

    /// Reject the nth batch submission (0-based, counted across both views).
    pub fn fail_submission(self, index: usize) -> Self {
        self.state.lock().rules.push(FailureRule::Submission(index));
        self
    }

    /// Delay every call by `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = Some(latency);
        self
    }

    /// Batches the session accepted, in submission order.
    pub fn batches(&self) -> Vec<WriteBatch> {
        self.state.lock().applied.clone()
    }

    pub fn batches_for(&self, view: View) -> Vec<WriteBatch> {
        self.state
            .lock()
            .applied
            .iter()
            .filter(|b| b.view == view)
            .cloned()
            .collect()
    }

    /// Number of `execute_batch` calls, accepted or not.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().queries.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&self, query: &str) -> Result<Ack, StorageError> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.closed {
            return Err(StorageError::Closed);
        }
        state.queries.push(query.to_string());
        Ok(Ack { statements: 1 })
    }

    async fn execute_batch(&self, batch: &WriteBatch) -> Result<Ack, StorageError> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if state.closed {
            return Err(StorageError::Closed);
        }

        let index = state.submissions;
        state.submissions += 1;

        let rejected = state.rules.iter().any(|rule| match rule {
            FailureRule::View(view) => *view == batch.view,
            FailureRule::Submission(n) => *n == index,
        });
        if rejected {
            return Err(StorageError::Batch(format!(
                "injected failure for {} batch #{} ({} rows)",
                batch.view,
                index,
                batch.len()
            )));
        }

        state.applied.push(batch.clone());
        Ok(Ack {
            statements: batch.len(),
        })
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.state.lock().closed = true;
        Ok(())
    }
}
