//! Dual-view batched writer for pipe-delimited log lines.
//!
//! Each ingestion call writes every valid line twice: once partitioned by
//! `(logdate, log_type)` and once partitioned by `(logdate, shardid)`.
//! Storage access goes through the [`Session`] trait; [`MemorySession`] is
//! always available and `ScyllaSession` comes with the `scylla` feature.

mod error;
mod memory;
mod pool;
mod report;
#[cfg(feature = "scylla")]
mod scylla;
mod session;
mod view;
mod write;

pub use error::{ErrorCode, Result, StorageError, WriterError};
pub use memory::MemorySession;
pub use pool::IngestPool;
pub use report::{IngestOutcome, IngestReport, PassReport};
#[cfg(feature = "scylla")]
pub use scylla::ScyllaSession;
pub use session::{Ack, Session};
pub use view::{BoundValue, PartitionValue, View, ViewRow, ViewTarget, WriteBatch, BOUND_VALUES};
pub use write::{LogWriter, WriterConfig};

pub use logfanout_core;
