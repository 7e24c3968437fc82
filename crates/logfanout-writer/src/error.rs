//! Error types for storage sessions and the fan-out writer.

use std::time::Duration;

use thiserror::Error;

use crate::view::View;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Cluster or session could not be established
    E001ConnectionSetup,
    /// E004: Configuration missing or invalid
    E004InvalidConfig,
    /// E005: One or more views did not receive every batch
    E005PartialWrite,
    /// E006: Ingest pool no longer accepts work
    E006PoolClosed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001ConnectionSetup => "E001",
            Self::E004InvalidConfig => "E004",
            Self::E005PartialWrite => "E005",
            Self::E006PoolClosed => "E006",
        }
    }
}

/// Failure of a single storage call.
///
/// Never retried. The writer logs it, records it in the pass report and
/// carries on with the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("statement execution failed: {0}")]
    Execute(String),

    #[error("batch execution failed: {0}")]
    Batch(String),

    /// The per-call timeout expired before the cluster answered.
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's deadline for the whole ingestion call had passed.
    #[error("ingestion deadline exceeded")]
    DeadlineExceeded,

    #[error("session is closed")]
    Closed,
}

impl StorageError {
    /// True when the error came from a local time limit rather than the cluster.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::DeadlineExceeded)
    }
}

/// Errors surfaced by the writer and its setup
#[derive(Debug, Error)]
pub enum WriterError {
    /// Cluster or session setup failed; no writes were attempted
    #[error("[{code}] Connection setup failed for hosts [{hosts}]: {reason}")]
    ConnectionSetup {
        code: &'static str,
        hosts: String,
        reason: String,
    },

    /// Invalid configuration provided
    #[error("[{code}] Invalid configuration: {message}")]
    InvalidConfig { code: &'static str, message: String },

    /// At least one view had a failed batch
    #[error("[{code}] Partial write: {} view(s) failed ({})", .failures.len(), describe(.failures))]
    PartialWrite {
        code: &'static str,
        failures: Vec<(View, StorageError)>,
    },

    /// The ingest pool has shut down or a worker exited
    #[error("[{code}] Ingest pool closed")]
    PoolClosed { code: &'static str },
}

fn describe(failures: &[(View, StorageError)]) -> String {
    failures
        .iter()
        .map(|(view, err)| format!("{}: {}", view, err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl WriterError {
    /// Create a connection setup error with error code
    pub fn connection_setup(hosts: &[String], reason: String) -> Self {
        Self::ConnectionSetup {
            code: ErrorCode::E001ConnectionSetup.as_str(),
            hosts: hosts.join(","),
            reason,
        }
    }

    /// Create an invalid config error with error code
    pub fn invalid_config(message: String) -> Self {
        Self::InvalidConfig {
            code: ErrorCode::E004InvalidConfig.as_str(),
            message,
        }
    }

    /// Create a partial write error with error code
    pub fn partial_write(failures: Vec<(View, StorageError)>) -> Self {
        Self::PartialWrite {
            code: ErrorCode::E005PartialWrite.as_str(),
            failures,
        }
    }

    pub fn pool_closed() -> Self {
        Self::PoolClosed {
            code: ErrorCode::E006PoolClosed.as_str(),
        }
    }
}

/// Result type alias for WriterError
pub type Result<T> = std::result::Result<T, WriterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_codes() {
        let err = WriterError::connection_setup(
            &["a:9042".to_string(), "b:9042".to_string()],
            "refused".to_string(),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("[E001]"));
        assert!(msg.contains("a:9042,b:9042"));

        let err = WriterError::partial_write(vec![(
            View::ByDay,
            StorageError::Batch("write timeout".to_string()),
        )]);
        let msg = err.to_string();
        assert!(msg.starts_with("[E005]"));
        assert!(msg.contains("by_day: batch execution failed: write timeout"));
    }

    #[test]
    fn timeout_classification() {
        assert!(StorageError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(StorageError::DeadlineExceeded.is_timeout());
        assert!(!StorageError::Batch("x".to_string()).is_timeout());
    }
}
