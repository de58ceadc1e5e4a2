//! Read access to the current dataset version.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::StopRef;

use super::model::{Route, RouteId, ServiceId, Stop, StopId, StopVisit, Trip, TripId};

/// Trait for answering schedule queries against one dataset version.
///
/// This abstraction lets the linking and departure code run against any
/// backing store; the crate ships the in-memory [`Timetable`](super::Timetable).
pub trait ScheduleStore {
    /// Version stamp of the loaded dataset. Increases on every replacement.
    fn dataset_version(&self) -> u64;

    /// Look up a stop by its volatile id.
    fn stop(&self, id: StopId) -> Option<&Stop>;

    /// Look up a stop by exact durable reference.
    fn stop_by_ref(&self, stop_ref: &StopRef) -> Option<&Stop>;

    /// Look up a route.
    fn route(&self, id: RouteId) -> Option<&Route>;

    /// Look up a trip.
    fn trip(&self, id: TripId) -> Option<&Trip>;

    /// All visits made at a stop, in no particular order.
    fn visits_at_stop(&self, stop: StopId) -> &[StopVisit];

    /// All visits of a trip, ordered by ascending sequence.
    fn visits_for_trip(&self, trip: TripId) -> &[StopVisit];

    /// Returns true if the service calendar includes `date`.
    fn service_runs_on(&self, service: ServiceId, date: NaiveDate) -> bool;

    /// Connectivity query: routes with a trip that picks up at `from` and
    /// later drops off at `to`.
    ///
    /// Returns an empty set (never an error) if nothing connects the stops.
    fn routes_between(&self, from: StopId, to: StopId) -> BTreeSet<RouteId>;
}
