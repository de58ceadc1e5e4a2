//! Domain error types.
//!
//! These errors represent validation failures in the dashboard model.
//! Link failures and schedule loading errors live with their modules.

use super::{DashboardId, LegId};

/// Domain-level errors for dashboard validation.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A leg id is used twice
    #[error("duplicate leg id {0}")]
    DuplicateLeg(LegId),

    /// No leg with this id on the dashboard
    #[error("unknown leg id {0}")]
    UnknownLeg(LegId),

    /// A dashboard id is used twice
    #[error("duplicate dashboard id {0}")]
    DuplicateDashboard(DashboardId),

    /// Stored dashboards are not valid JSON for the expected layout
    #[error("failed to parse dashboards: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::DuplicateLeg(LegId(3));
        assert_eq!(err.to_string(), "duplicate leg id 3");

        let err = DomainError::UnknownLeg(LegId(9));
        assert_eq!(err.to_string(), "unknown leg id 9");

        let err = DomainError::DuplicateDashboard(DashboardId(2));
        assert_eq!(err.to_string(), "duplicate dashboard id 2");

        let err: DomainError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(err.to_string().starts_with("failed to parse dashboards: "));
    }
}
