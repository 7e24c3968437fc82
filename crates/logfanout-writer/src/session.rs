//! The narrow storage contract the writer depends on.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::view::WriteBatch;

/// Acknowledgement of a completed storage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Statements applied by the call
    pub statements: usize,
}

/// A connected session to the storage cluster.
///
/// Calls resolve only once the cluster has acknowledged or rejected the
/// request. A writer awaits each call before issuing the next, so an
/// implementation never sees overlapping requests from the same writer.
#[async_trait]
pub trait Session: Send + Sync {
    /// Execute a single unbound statement.
    async fn execute(&self, query: &str) -> Result<Ack, StorageError>;

    /// Execute every row of `batch` as one logged batch.
    async fn execute_batch(&self, batch: &WriteBatch) -> Result<Ack, StorageError>;

    /// Release the session. Safe to call more than once.
    async fn close(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: Session + ?Sized> Session for std::sync::Arc<S> {
    async fn execute(&self, query: &str) -> Result<Ack, StorageError> {
        (**self).execute(query).await
    }

    async fn execute_batch(&self, batch: &WriteBatch) -> Result<Ack, StorageError> {
        (**self).execute_batch(batch).await
    }

    async fn close(&self) -> Result<(), StorageError> {
        (**self).close().await
    }
}
