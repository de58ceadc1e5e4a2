//! Schedule dataset access.
//!
//! The dataset (stops, routes, trips, stop visits, service calendars) is
//! owned by an external collaborator and replaced wholesale on reload.
//! Departure and linking code reads it only through [`ScheduleStore`].

mod error;
mod model;
mod snapshot;
mod store;
mod timetable;

pub use error::SnapshotError;
pub use model::{
    InvalidRouteMode, Route, RouteId, RouteMode, ServiceId, Stop, StopId, StopVisit, Trip, TripId,
};
pub use snapshot::{CalendarRow, Dataset, RouteRow, Snapshot, SourceSnapshot, StopRow, TripRow, VisitRow};
pub use store::ScheduleStore;
pub use timetable::Timetable;
