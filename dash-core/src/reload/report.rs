//! Reload outcome reported to operators.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{DashboardId, LegId, SourceId};
use crate::linking::LinkFailure;

use super::error::IngestError;

/// One ingester that failed during a reload.
#[derive(Debug)]
pub struct IngestFailure {
    pub source: SourceId,
    pub error: IngestError,
}

impl fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source {}: {}", self.source, self.error)
    }
}

/// A leg that needs operator attention after a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegIssue {
    pub dashboard: DashboardId,
    pub leg: LegId,
    pub reason: String,
}

impl fmt::Display for LegIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dashboard {} leg {}: {}", self.dashboard, self.leg, self.reason)
    }
}

/// Everything a reload could not do cleanly.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Dataset version the legs were relinked against.
    pub dataset_version: u64,
    /// Ingesters that failed; their sources keep their previous rows.
    pub ingest_failures: Vec<IngestFailure>,
    /// Per-leg resolution failures from relinking.
    pub failures: Vec<LinkFailure>,
    /// Legs with a durable reference that is still unresolved.
    pub unresolved: Vec<LegIssue>,
    /// Linked legs that no route connects.
    pub without_routes: Vec<LegIssue>,
}

impl ReloadReport {
    /// Returns true if nothing needs attention.
    pub fn is_clean(&self) -> bool {
        self.ingest_failures.is_empty()
            && self.failures.is_empty()
            && self.unresolved.is_empty()
            && self.without_routes.is_empty()
    }

    /// Dashboards owning at least one unresolved leg.
    pub fn unresolved_dashboards(&self) -> BTreeSet<DashboardId> {
        self.unresolved.iter().map(|issue| issue.dashboard).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(dashboard: u64, leg: u64) -> LegIssue {
        LegIssue {
            dashboard: DashboardId(dashboard),
            leg: LegId(leg),
            reason: "unresolved".into(),
        }
    }

    #[test]
    fn empty_report_is_clean() {
        let report = ReloadReport::default();
        assert!(report.is_clean());
        assert!(report.unresolved_dashboards().is_empty());
    }

    #[test]
    fn unresolved_dashboards_are_deduplicated() {
        let report = ReloadReport {
            unresolved: vec![issue(2, 1), issue(1, 2), issue(2, 3)],
            ..ReloadReport::default()
        };
        assert!(!report.is_clean());
        assert_eq!(
            report.unresolved_dashboards().into_iter().collect::<Vec<_>>(),
            vec![DashboardId(1), DashboardId(2)]
        );
        assert_eq!(issue(2, 3).to_string(), "dashboard 2 leg 3: unresolved");
    }
}
