//! Serializable dashboard boards.
//!
//! A board is the flat view handed to whatever renders a dashboard: leg
//! summaries plus the ranked departures with their route display
//! attributes and ISO-8601 times.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::departures::{DashboardDeparture, next_for_dashboard};
use crate::domain::{Dashboard, DashboardLeg, LegId};
use crate::schedule::{RouteMode, ScheduleStore, StopId, TripId};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A rendered dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardBoard {
    pub name: String,
    pub warning_time: u32,
    /// Legs with at least one connecting route, in dashboard order.
    pub legs: Vec<LegSummary>,
    pub departures: Vec<DepartureRecord>,
}

/// One end of a leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopSummary {
    pub id: StopId,
    pub stop_ref: String,
    pub name: String,
    /// Minutes of walking at this end
    pub walk_time: u32,
}

/// A leg as shown on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegSummary {
    pub id: LegId,
    pub name: String,
    pub from: StopSummary,
    pub to: StopSummary,
}

/// Trip and route display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripRecord {
    pub id: TripId,
    pub headsign: Option<String>,
    pub short_name: String,
    pub long_name: String,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub mode: RouteMode,
    pub mode_label: &'static str,
}

/// One ranked departure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureRecord {
    pub leg: LegId,
    pub trip: TripRecord,
    pub departs: String,
    pub arrives: String,
    pub walk_time_start: u32,
}

/// Rank the dashboard's departures and render them as a board.
pub fn build_board<S: ScheduleStore + ?Sized>(
    store: &S,
    dashboard: &Dashboard,
    from: NaiveDateTime,
    count: usize,
) -> DashboardBoard {
    let departures = next_for_dashboard(store, dashboard, from, count);

    DashboardBoard {
        name: dashboard.name.clone(),
        warning_time: dashboard.warning_time,
        legs: dashboard
            .legs()
            .iter()
            .filter(|leg| leg.is_linked_to(store.dataset_version()) && leg.has_routes())
            .filter_map(|leg| leg_summary(store, leg))
            .collect(),
        departures: departures
            .iter()
            .filter_map(|d| departure_record(store, d))
            .collect(),
    }
}

fn leg_summary<S: ScheduleStore + ?Sized>(store: &S, leg: &DashboardLeg) -> Option<LegSummary> {
    let (from, to) = leg.resolved_stops()?;
    let from = store.stop(from)?;
    let to = store.stop(to)?;

    Some(LegSummary {
        id: leg.id,
        name: leg.name.clone(),
        from: StopSummary {
            id: from.id,
            stop_ref: from.stop_ref.to_string(),
            name: from.name.clone(),
            walk_time: leg.walk_time_start,
        },
        to: StopSummary {
            id: to.id,
            stop_ref: to.stop_ref.to_string(),
            name: to.name.clone(),
            walk_time: leg.walk_time_end,
        },
    })
}

fn departure_record<S: ScheduleStore + ?Sized>(
    store: &S,
    departure: &DashboardDeparture,
) -> Option<DepartureRecord> {
    let trip = store.trip(departure.trip)?;
    let route = store.route(trip.route)?;

    Some(DepartureRecord {
        leg: departure.leg,
        trip: TripRecord {
            id: trip.id,
            headsign: trip.headsign.clone(),
            short_name: route.short_name.clone(),
            long_name: route.long_name.clone(),
            color: route.color.clone(),
            text_color: route.text_color.clone(),
            mode: route.mode,
            mode_label: route.mode.label(),
        },
        departs: departure.departure.format(ISO_FORMAT).to_string(),
        arrives: departure.arrival.format(ISO_FORMAT).to_string(),
        walk_time_start: departure.walk_time_start,
    })
}
