//! Reload error types.

use crate::domain::SourceId;
use crate::schedule::SnapshotError;

/// Errors that refuse a reload outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReloadError {
    /// Another reload has not finished yet
    #[error("a reload is already in progress")]
    AlreadyInProgress,
}

/// Errors from one ingester. These are recorded, never fatal to a reload.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Reading or validating the dataset failed
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The snapshot holds no dataset for this source
    #[error("source {0} not found in snapshot")]
    MissingSource(SourceId),

    /// The ingester panicked while fetching
    #[error("ingester panicked: {0}")]
    Panicked(String),
}
