//! Dataset reload orchestration.
//!
//! A reload unlinks every leg, swaps each ingester's fetched dataset into
//! the timetable, then relinks every leg against whatever dataset state is left
//! and reports what could not be resolved. Failures along the way are
//! collected into the [`ReloadReport`]; only a concurrent reload is refused.

mod coordinator;
mod error;
mod ingest;
mod report;

pub use coordinator::{ReloadCoordinator, ReloadPhase};
pub use error::{IngestError, ReloadError};
pub use ingest::{DatasetIngester, SnapshotIngester};
pub use report::{IngestFailure, LegIssue, ReloadReport};
