//! Dashboard type.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{DashboardLeg, DomainError, LegId};

/// Minutes of warning shown before a departure, unless configured.
pub const DEFAULT_WARNING_TIME: u32 = 10;

fn default_warning_time() -> u32 {
    DEFAULT_WARNING_TIME
}

/// Dashboard identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardId(pub u64);

impl fmt::Display for DashboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered collection of legs plus display settings.
///
/// Leg order is significant: it breaks ties when departures of
/// different legs rank equally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    pub name: String,
    /// Minutes to alert before departure
    #[serde(default = "default_warning_time")]
    pub warning_time: u32,
    #[serde(default)]
    legs: Vec<DashboardLeg>,
    /// Last time the board was loaded
    #[serde(default)]
    pub last_viewed: Option<NaiveDateTime>,
}

impl Dashboard {
    /// Create an empty dashboard with the default warning time.
    pub fn new(id: DashboardId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            warning_time: DEFAULT_WARNING_TIME,
            legs: Vec::new(),
            last_viewed: None,
        }
    }

    /// Legs in display order.
    pub fn legs(&self) -> &[DashboardLeg] {
        &self.legs
    }

    /// Mutable access to the legs. The set of legs cannot change through
    /// this slice.
    pub fn legs_mut(&mut self) -> &mut [DashboardLeg] {
        &mut self.legs
    }

    /// Look up a leg.
    pub fn leg(&self, id: LegId) -> Option<&DashboardLeg> {
        self.legs.iter().find(|l| l.id == id)
    }

    /// Look up a leg for editing.
    pub fn leg_mut(&mut self, id: LegId) -> Result<&mut DashboardLeg, DomainError> {
        self.legs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(DomainError::UnknownLeg(id))
    }

    /// Append a leg.
    pub fn add_leg(&mut self, leg: DashboardLeg) -> Result<(), DomainError> {
        if self.leg(leg.id).is_some() {
            return Err(DomainError::DuplicateLeg(leg.id));
        }
        self.legs.push(leg);
        Ok(())
    }

    /// Remove a leg, returning it.
    pub fn remove_leg(&mut self, id: LegId) -> Result<DashboardLeg, DomainError> {
        let pos = self
            .legs
            .iter()
            .position(|l| l.id == id)
            .ok_or(DomainError::UnknownLeg(id))?;
        Ok(self.legs.remove(pos))
    }

    /// Record that the board was viewed at `at`.
    pub fn touch(&mut self, at: NaiveDateTime) {
        self.last_viewed = Some(at);
    }
}

/// Parse a stored list of dashboards.
///
/// Dashboard ids and leg ids must each be unique across the whole list.
/// Parsed legs are unlinked; they become queryable after relinking.
pub fn parse_dashboards(json: &str) -> Result<Vec<Dashboard>, DomainError> {
    let dashboards: Vec<Dashboard> = serde_json::from_str(json)?;

    let mut dashboard_ids = HashSet::new();
    let mut leg_ids = HashSet::new();
    for dashboard in &dashboards {
        if !dashboard_ids.insert(dashboard.id) {
            return Err(DomainError::DuplicateDashboard(dashboard.id));
        }
        for leg in dashboard.legs() {
            if !leg_ids.insert(leg.id) {
                return Err(DomainError::DuplicateLeg(leg.id));
            }
        }
    }

    Ok(dashboards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LegSide;
    use crate::testing::{at, date};

    #[test]
    fn add_and_remove_legs() {
        let mut dashboard = Dashboard::new(DashboardId(1), "Home");
        dashboard.add_leg(DashboardLeg::new(LegId(1), "a")).unwrap();
        dashboard.add_leg(DashboardLeg::new(LegId(2), "b")).unwrap();

        assert!(matches!(
            dashboard.add_leg(DashboardLeg::new(LegId(1), "again")),
            Err(DomainError::DuplicateLeg(LegId(1)))
        ));
        assert_eq!(dashboard.legs().len(), 2);

        dashboard.leg_mut(LegId(2)).unwrap().walk_time_start = 4;
        assert_eq!(dashboard.leg(LegId(2)).unwrap().walk_time_start, 4);

        let removed = dashboard.remove_leg(LegId(1)).unwrap();
        assert_eq!(removed.name, "a");
        assert!(matches!(
            dashboard.remove_leg(LegId(1)),
            Err(DomainError::UnknownLeg(LegId(1)))
        ));
        assert!(dashboard.leg_mut(LegId(5)).is_err());
    }

    #[test]
    fn touch_records_view() {
        let mut dashboard = Dashboard::new(DashboardId(1), "Home");
        assert_eq!(dashboard.last_viewed, None);

        let when = at(date(2024, 3, 1), 7, 30, 0);
        dashboard.touch(when);
        assert_eq!(dashboard.last_viewed, Some(when));
    }

    #[test]
    fn parse_stored_dashboards() {
        let json = r#"[
            {"id": 1, "name": "Home", "legs": [
                {"id": 10, "name": "Bus", "from_ref": "1:A", "to_ref": "1:B", "walk_time_start": 5}
            ]},
            {"id": 2, "name": "Work", "warning_time": 3}
        ]"#;
        let dashboards = parse_dashboards(json).unwrap();

        assert_eq!(dashboards.len(), 2);
        assert_eq!(dashboards[0].warning_time, DEFAULT_WARNING_TIME);
        assert_eq!(dashboards[1].warning_time, 3);
        assert!(dashboards[1].legs().is_empty());

        let leg = &dashboards[0].legs()[0];
        assert_eq!(leg.stop_ref(LegSide::From), "1:A");
        assert_eq!(leg.walk_time_start, 5);
    }

    #[test]
    fn parse_rejects_duplicate_ids() {
        let json = r#"[
            {"id": 1, "name": "a", "legs": [{"id": 10}]},
            {"id": 2, "name": "b", "legs": [{"id": 10}]}
        ]"#;
        assert!(matches!(
            parse_dashboards(json),
            Err(DomainError::DuplicateLeg(LegId(10)))
        ));

        let json = r#"[{"id": 1, "name": "a"}, {"id": 1, "name": "b"}]"#;
        assert!(matches!(
            parse_dashboards(json),
            Err(DomainError::DuplicateDashboard(DashboardId(1)))
        ));

        assert!(matches!(
            parse_dashboards("{"),
            Err(DomainError::Parse(_))
        ));
    }
}
