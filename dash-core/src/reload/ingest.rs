//! Dataset ingesters.

use std::future::Future;
use std::path::PathBuf;

use crate::domain::SourceId;
use crate::schedule::{Dataset, Snapshot, SnapshotError};

use super::error::IngestError;

/// Trait for fetching the replacement dataset of one source.
///
/// Fetching may be slow (downloads, parsing); it runs without holding any
/// lock. The coordinator swaps the returned rows into the timetable.
pub trait DatasetIngester: Send + Sync {
    /// Source whose rows this ingester replaces.
    fn source(&self) -> SourceId;

    /// Produce the complete new dataset for [`Self::source`].
    fn fetch(&self) -> impl Future<Output = Result<Dataset, IngestError>> + Send;
}

/// Ingester that reads one source out of a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotIngester {
    source: SourceId,
    path: PathBuf,
}

impl SnapshotIngester {
    /// Create an ingester for `source` reading `path`.
    pub fn new(source: SourceId, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            path: path.into(),
        }
    }
}

impl DatasetIngester for SnapshotIngester {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch(&self) -> Result<Dataset, IngestError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(SnapshotError::from)?;
        let snapshot = Snapshot::from_json(&json)?;

        snapshot
            .sources
            .into_iter()
            .find(|s| s.source == self.source)
            .map(|s| s.dataset)
            .ok_or(IngestError::MissingSource(self.source))
    }
}
