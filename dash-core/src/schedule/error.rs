//! Schedule loading error types.

use crate::domain::SourceId;

/// Errors that can occur when loading dataset rows.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading the snapshot failed
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot text is not valid JSON for the expected layout
    #[error("failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// Rows are internally inconsistent (dangling or duplicate ids)
    #[error("invalid dataset for source {source_id}: {message}")]
    Invalid { source_id: SourceId, message: String },
}
