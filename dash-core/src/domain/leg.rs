//! Dashboard leg type.
//!
//! A `DashboardLeg` is one origin/destination pair pinned to a dashboard.
//! It owns two kinds of stop identity: durable references that survive a
//! dataset reload, and resolved (volatile) stop ids that are only valid for
//! the dataset version they were linked against.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schedule::{RouteId, ScheduleStore, Stop, StopId};

/// Identity of a leg, stable across dataset reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegId(pub u64);

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegSide {
    From,
    To,
}

impl fmt::Display for LegSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegSide::From => f.write_str("from"),
            LegSide::To => f.write_str("to"),
        }
    }
}

/// Link state of a leg against the current dataset.
///
/// `PartiallyLinked` is never a valid resting state: queries treat it
/// exactly like `Unlinked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Linked,
    PartiallyLinked,
    Unlinked,
}

/// A user-configured origin/destination pair with walking offsets.
///
/// Only the durable references, name and walk times are persisted. The
/// resolved stops and linked routes are derived state and are rebuilt by
/// relinking after every load.
///
/// # Invariants
///
/// - `linked_routes` is empty unless both resolved stops are present
/// - `linked_routes` is recomputed whenever a resolved stop changes
/// - durable references change only through [`DashboardLeg::assign_stops`]
///   (or when first constructed), never through unlinking
///
/// # Examples
///
/// ```
/// use dash_core::domain::{DashboardLeg, LegId, LegSide, Linkage};
///
/// let leg = DashboardLeg::new(LegId(1), "To work")
///     .with_refs("1:A", "1:B")
///     .with_walk_times(5, 2);
///
/// assert_eq!(leg.stop_ref(LegSide::From), "1:A");
/// assert_eq!(leg.linkage(), Linkage::Unlinked);
/// assert!(!leg.has_routes());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardLeg {
    pub id: LegId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    from_ref: String,
    #[serde(default)]
    to_ref: String,
    #[serde(skip)]
    from_stop: Option<StopId>,
    #[serde(skip)]
    to_stop: Option<StopId>,
    #[serde(skip)]
    linked_routes: BTreeSet<RouteId>,
    #[serde(skip)]
    linked_version: Option<u64>,
    /// Minutes to walk to the origin stop
    #[serde(default)]
    pub walk_time_start: u32,
    /// Minutes to walk from the destination stop
    #[serde(default)]
    pub walk_time_end: u32,
}

impl DashboardLeg {
    /// Create an unlinked leg with no stop references.
    pub fn new(id: LegId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            from_ref: String::new(),
            to_ref: String::new(),
            from_stop: None,
            to_stop: None,
            linked_routes: BTreeSet::new(),
            linked_version: None,
            walk_time_start: 0,
            walk_time_end: 0,
        }
    }

    /// Set the durable references as stored text (`"<source>:<stop>"`).
    ///
    /// The text is not validated here; a malformed reference surfaces as a
    /// link failure when the leg is relinked.
    pub fn with_refs(mut self, from_ref: impl Into<String>, to_ref: impl Into<String>) -> Self {
        self.from_ref = from_ref.into();
        self.to_ref = to_ref.into();
        self
    }

    /// Set the walk times (minutes).
    pub fn with_walk_times(mut self, start: u32, end: u32) -> Self {
        self.walk_time_start = start;
        self.walk_time_end = end;
        self
    }

    /// Durable reference text for one side (empty if never assigned).
    pub fn stop_ref(&self, side: LegSide) -> &str {
        match side {
            LegSide::From => &self.from_ref,
            LegSide::To => &self.to_ref,
        }
    }

    /// Resolved stop for one side, if linked.
    pub fn resolved_stop(&self, side: LegSide) -> Option<StopId> {
        match side {
            LegSide::From => self.from_stop,
            LegSide::To => self.to_stop,
        }
    }

    /// Both resolved stops, if the leg is fully linked.
    pub fn resolved_stops(&self) -> Option<(StopId, StopId)> {
        Some((self.from_stop?, self.to_stop?))
    }

    /// Routes connecting the resolved stops.
    pub fn linked_routes(&self) -> &BTreeSet<RouteId> {
        &self.linked_routes
    }

    /// Dataset version the routes were computed against.
    pub fn linked_version(&self) -> Option<u64> {
        self.linked_version
    }

    /// Returns true if at least one route connects the stops.
    pub fn has_routes(&self) -> bool {
        !self.linked_routes.is_empty()
    }

    /// Current link state.
    pub fn linkage(&self) -> Linkage {
        match (self.from_stop, self.to_stop) {
            (Some(_), Some(_)) => Linkage::Linked,
            (None, None) => Linkage::Unlinked,
            _ => Linkage::PartiallyLinked,
        }
    }

    /// Returns true if the leg is linked against exactly this dataset
    /// version and can be queried.
    pub fn is_linked_to(&self, dataset_version: u64) -> bool {
        self.linkage() == Linkage::Linked && self.linked_version == Some(dataset_version)
    }

    /// User action: point both ends of the leg at concrete stops.
    ///
    /// Durable references are rewritten from the stops and the linked
    /// routes are recomputed before returning.
    pub fn assign_stops<S: ScheduleStore + ?Sized>(&mut self, store: &S, from: &Stop, to: &Stop) {
        self.from_stop = Some(from.id);
        self.to_stop = Some(to.id);
        self.update_durable_refs(store);
        self.recompute_linked_routes(store);
    }

    /// User action: point one end of the leg at a concrete stop.
    pub fn assign_stop<S: ScheduleStore + ?Sized>(&mut self, store: &S, side: LegSide, stop: &Stop) {
        self.set_resolved(side, Some(stop.id));
        self.update_durable_refs(store);
        self.recompute_linked_routes(store);
    }

    /// Rewrite the durable references from the resolved stops.
    ///
    /// Sides without a resolved stop keep their current reference.
    pub fn update_durable_refs<S: ScheduleStore + ?Sized>(&mut self, store: &S) {
        if let Some(stop) = self.from_stop.and_then(|id| store.stop(id)) {
            self.from_ref = stop.stop_ref.to_string();
        }
        if let Some(stop) = self.to_stop.and_then(|id| store.stop(id)) {
            self.to_ref = stop.stop_ref.to_string();
        }
    }

    /// Recompute `linked_routes` from the resolved stops.
    ///
    /// Clears the routes (and the version stamp) unless both sides are
    /// resolved.
    pub fn recompute_linked_routes<S: ScheduleStore + ?Sized>(&mut self, store: &S) {
        match self.resolved_stops() {
            Some((from, to)) => {
                self.linked_routes = store.routes_between(from, to);
                self.linked_version = Some(store.dataset_version());
            }
            None => {
                self.linked_routes.clear();
                self.linked_version = None;
            }
        }
    }

    /// Set or clear the resolved stop for one side.
    ///
    /// Callers must follow up with [`Self::recompute_linked_routes`].
    pub(crate) fn set_resolved(&mut self, side: LegSide, stop: Option<StopId>) {
        match side {
            LegSide::From => self.from_stop = stop,
            LegSide::To => self.to_stop = stop,
        }
    }

    /// Drop all derived state. Durable references are kept.
    pub(crate) fn unlink(&mut self) {
        self.from_stop = None;
        self.to_stop = None;
        self.linked_routes.clear();
        self.linked_version = None;
    }
}
