//! Per-leg departure search.
//!
//! Departures are looked up from the stop visits at the leg's origin. A
//! visit qualifies on a service date when its trip's calendar includes that
//! date: today (only visits still ahead of the query time) or tomorrow (any
//! visit, which also picks up trips that roll past midnight).

use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::domain::{DashboardLeg, resolve, seconds_since_midnight};
use crate::schedule::{ScheduleStore, StopId, StopVisit, TripId};

/// A trip leaving a leg's origin stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub trip: TripId,
    pub departure: NaiveDateTime,
    /// Service date the trip's times are relative to.
    pub service_date: NaiveDate,
    /// Sequence of the origin visit within the trip.
    pub origin_sequence: u32,
}

/// A departure together with its arrival at the leg's destination stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegDeparture {
    pub trip: TripId,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub service_date: NaiveDate,
}

/// Finds upcoming departures for single legs.
///
/// Legs that are not fully linked against the store's current dataset
/// version, or that no route connects, produce no departures rather than
/// an error.
pub struct DepartureFinder<'a, S: ScheduleStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ScheduleStore + ?Sized> DepartureFinder<'a, S> {
    /// Create a finder reading from `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The next `count` departures from the leg's origin at or after `from`.
    ///
    /// Results are ordered by departure instant (then service date, then
    /// trip), and every instant is at or after `from`.
    pub fn next_departures(&self, leg: &DashboardLeg, from: NaiveDateTime, count: usize) -> Vec<Departure> {
        if count == 0 {
            return Vec::new();
        }
        let Some((origin, _)) = self.queryable_stops(leg) else {
            return Vec::new();
        };

        let today = from.date();
        let tomorrow = today.checked_add_days(Days::new(1));
        let now = seconds_since_midnight(from);

        let mut departures: Vec<Departure> = self
            .store
            .visits_at_stop(origin)
            .iter()
            .filter(|visit| visit.pickup)
            .filter_map(|visit| {
                let trip = self.store.trip(visit.trip)?;
                if !leg.linked_routes().contains(&trip.route) {
                    return None;
                }

                // Earliest matching service date wins
                let runs_on = |date: NaiveDate| self.store.service_runs_on(trip.service, date);
                let service_date = if visit.departure >= now && runs_on(today) {
                    today
                } else {
                    tomorrow.filter(|&d| runs_on(d))?
                };

                Some(Departure {
                    trip: trip.id,
                    departure: resolve(service_date, visit.departure),
                    service_date,
                    origin_sequence: visit.sequence,
                })
            })
            .collect();

        departures.sort_by_key(|d| (d.departure, d.service_date, d.trip));
        departures.truncate(count);
        departures
    }

    /// Like [`Self::next_departures`], with the arrival at the leg's
    /// destination.
    ///
    /// The arrival is the first visit at the destination that allows
    /// drop-off and comes later in the trip than the origin visit. A
    /// departure whose trip has no such visit is dropped, so fewer than
    /// `count` results may be returned.
    pub fn next_departures_with_arrivals(
        &self,
        leg: &DashboardLeg,
        from: NaiveDateTime,
        count: usize,
    ) -> Vec<LegDeparture> {
        let Some((_, destination)) = self.queryable_stops(leg) else {
            return Vec::new();
        };

        self.next_departures(leg, from, count)
            .into_iter()
            .filter_map(|departure| {
                let arrival = self.destination_visit(departure, destination)?;
                Some(LegDeparture {
                    trip: departure.trip,
                    departure: departure.departure,
                    arrival: resolve(departure.service_date, arrival.arrival),
                    service_date: departure.service_date,
                })
            })
            .collect()
    }

    fn destination_visit(&self, departure: Departure, destination: StopId) -> Option<&'a StopVisit> {
        self.store
            .visits_for_trip(departure.trip)
            .iter()
            .find(|v| v.stop == destination && v.dropoff && v.sequence > departure.origin_sequence)
    }

    fn queryable_stops(&self, leg: &DashboardLeg) -> Option<(StopId, StopId)> {
        if !leg.is_linked_to(self.store.dataset_version()) {
            debug!(leg = %leg.id, linkage = ?leg.linkage(), "Leg not linked to current dataset");
            return None;
        }
        if !leg.has_routes() {
            debug!(leg = %leg.id, "Leg has no connecting routes");
            return None;
        }
        leg.resolved_stops()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::{SECONDS_PER_DAY, SourceId, TimeOfDay};
    use crate::linking::relink_all;
    use crate::schedule::{Dataset, Timetable, VisitRow};
    use crate::testing::{at, calendar_row, date, route_row, scenario_leg, stop_row, trip_row};
    use proptest::prelude::*;

    /// Build a dataset of trips from A to B. Each trip is (departure
    /// seconds, calendar mask over [yesterday, today, tomorrow]).
    fn build(trips: &[(u32, u8)]) -> Timetable {
        let base = date(2024, 3, 10);
        let days = [base.pred_opt().unwrap(), base, base.succ_opt().unwrap()];

        let mut dataset = Dataset {
            stops: vec![stop_row("A", "Alpha"), stop_row("B", "Beta")],
            routes: vec![route_row("R", "1")],
            ..Dataset::default()
        };
        for mask in 0u8..8 {
            let dates: Vec<NaiveDate> = (0..3).filter(|b| mask & (1 << b) != 0).map(|b| days[b]).collect();
            dataset.calendars.push(calendar_row(&format!("S{mask}"), &dates));
        }
        for (i, &(secs, mask)) in trips.iter().enumerate() {
            let trip = format!("T{i}");
            dataset.trips.push(trip_row(&trip, "R", &format!("S{mask}")));
            for (stop, sequence, offset) in [("A", 1, 0), ("B", 2, 600)] {
                dataset.visits.push(VisitRow {
                    trip_id: trip.clone(),
                    stop_id: stop.to_string(),
                    sequence,
                    departure: TimeOfDay::from_seconds(secs + offset),
                    arrival: None,
                    pickup: true,
                    dropoff: true,
                });
            }
        }

        let mut store = Timetable::new();
        store.replace_source(SourceId(1), dataset).unwrap();
        store
    }

    proptest! {
        #[test]
        fn departures_are_ordered_and_not_in_the_past(
            trips in prop::collection::vec((0u32..(SECONDS_PER_DAY + 7200), 0u8..8), 1..30),
            now in 0u32..SECONDS_PER_DAY,
            count in 1usize..15,
        ) {
            let store = build(&trips);
            let mut legs = vec![scenario_leg(1)];
            relink_all(&store, &mut legs);
            let from = at(date(2024, 3, 10), 0, 0, 0) + chrono::Duration::seconds(i64::from(now));

            let results = DepartureFinder::new(&store).next_departures(&legs[0], from, count);

            prop_assert!(results.len() <= count);
            prop_assert!(results.windows(2).all(|w| w[0].departure <= w[1].departure));
            prop_assert!(results.iter().all(|d| d.departure >= from));

            let with_arrivals = DepartureFinder::new(&store).next_departures_with_arrivals(&legs[0], from, count);
            prop_assert_eq!(with_arrivals.len(), results.len());
            prop_assert!(with_arrivals.iter().all(|d| d.arrival - d.departure == chrono::Duration::minutes(10)));
        }
    }
}
