//! Fixtures shared by unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{DashboardLeg, LegId, SourceId, TimeOfDay};
use crate::schedule::{CalendarRow, Dataset, RouteRow, RouteMode, StopRow, Timetable, TripRow, VisitRow};

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(crate) fn at(date: NaiveDate, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, min, sec).unwrap()
}

pub(crate) fn stop_row(stop_id: &str, name: &str) -> StopRow {
    StopRow {
        stop_id: stop_id.to_string(),
        name: name.to_string(),
    }
}

pub(crate) fn route_row(route_id: &str, short_name: &str) -> RouteRow {
    RouteRow {
        route_id: route_id.to_string(),
        short_name: short_name.to_string(),
        long_name: String::new(),
        color: None,
        text_color: None,
        mode: RouteMode::Bus,
    }
}

pub(crate) fn calendar_row(service_id: &str, dates: &[NaiveDate]) -> CalendarRow {
    CalendarRow {
        service_id: service_id.to_string(),
        dates: dates.to_vec(),
    }
}

pub(crate) fn trip_row(trip_id: &str, route_id: &str, service_id: &str) -> TripRow {
    TripRow {
        trip_id: trip_id.to_string(),
        route_id: route_id.to_string(),
        service_id: service_id.to_string(),
        headsign: None,
    }
}

/// A visit open for pickup and drop-off at `time` (`HH:MM:SS`).
pub(crate) fn visit_row(trip_id: &str, stop_id: &str, sequence: u32, time: &str) -> VisitRow {
    VisitRow {
        trip_id: trip_id.to_string(),
        stop_id: stop_id.to_string(),
        sequence,
        departure: TimeOfDay::parse_hms(time).unwrap(),
        arrival: None,
        pickup: true,
        dropoff: true,
    }
}

/// Stops A and B, route R, and trip T1 leaving A at 08:00:00 and reaching
/// B at 08:10:00 on 1-3 March 2024.
pub(crate) fn scenario_dataset() -> Dataset {
    let mut departure = visit_row("T1", "A", 1, "08:00:00");
    departure.dropoff = false;
    let mut arrival = visit_row("T1", "B", 2, "08:10:00");
    arrival.pickup = false;

    Dataset {
        stops: vec![stop_row("A", "Alpha"), stop_row("B", "Beta")],
        routes: vec![route_row("R", "10")],
        calendars: vec![calendar_row(
            "WK",
            &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)],
        )],
        trips: vec![trip_row("T1", "R", "WK")],
        visits: vec![departure, arrival],
    }
}

/// The scenario dataset loaded as source 1.
pub(crate) fn scenario_timetable() -> Timetable {
    let mut timetable = Timetable::new();
    timetable
        .replace_source(SourceId(1), scenario_dataset())
        .unwrap();
    timetable
}

/// A leg from `1:A` to `1:B` with no walking time.
pub(crate) fn scenario_leg(id: u64) -> DashboardLeg {
    DashboardLeg::new(LegId(id), "A to B").with_refs("1:A", "1:B")
}
