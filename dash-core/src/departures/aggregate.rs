//! Cross-leg departure ranking for a dashboard.
//!
//! Each leg contributes up to `count` departures of its own; the merged
//! list is ranked by when the traveller must set off (departure minus the
//! leg's walk to the stop) and cut back to `count`.

use chrono::{Duration, NaiveDateTime};

use crate::domain::{Dashboard, LegId};
use crate::schedule::{ScheduleStore, TripId};

use super::finder::DepartureFinder;

/// One ranked departure on a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardDeparture {
    pub leg: LegId,
    pub trip: TripId,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    /// Minutes of walking to the origin stop, already applied to ranking.
    pub walk_time_start: u32,
}

impl DashboardDeparture {
    /// When the traveller has to leave to catch this departure.
    pub fn leave_by(&self) -> NaiveDateTime {
        self.departure - Duration::minutes(i64::from(self.walk_time_start))
    }
}

/// The next `count` departures across every leg of a dashboard, ranked by
/// [`DashboardDeparture::leave_by`].
///
/// Legs that cannot be queried contribute nothing; they never fail the
/// whole dashboard.
pub fn next_for_dashboard<S: ScheduleStore + ?Sized>(
    store: &S,
    dashboard: &Dashboard,
    from: NaiveDateTime,
    count: usize,
) -> Vec<DashboardDeparture> {
    let finder = DepartureFinder::new(store);

    let candidates = dashboard
        .legs()
        .iter()
        .flat_map(|leg| {
            finder
                .next_departures_with_arrivals(leg, from, count)
                .into_iter()
                .map(move |d| DashboardDeparture {
                    leg: leg.id,
                    trip: d.trip,
                    departure: d.departure,
                    arrival: d.arrival,
                    walk_time_start: leg.walk_time_start,
                })
        })
        .collect();

    rank_departures(candidates, count)
}

/// Earliest departure instant at or after `from` across the dashboard's
/// legs, before any count or arrival filtering.
///
/// Until this instant, a later query time on the same date sees exactly
/// the same candidate departures. `None` if no leg has any.
pub fn next_departure_instant<S: ScheduleStore + ?Sized>(
    store: &S,
    dashboard: &Dashboard,
    from: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let finder = DepartureFinder::new(store);
    dashboard
        .legs()
        .iter()
        .filter_map(|leg| finder.next_departures(leg, from, 1).first().map(|d| d.departure))
        .min()
}

/// Sort departures by leave-by time and keep the first `count`.
///
/// The sort is stable: equal leave-by times keep their input order, which
/// is leg order followed by per-leg departure order.
pub fn rank_departures(mut departures: Vec<DashboardDeparture>, count: usize) -> Vec<DashboardDeparture> {
    departures.sort_by_key(|d| d.leave_by());
    departures.truncate(count);
    departures
}
