//! In-memory schedule store.
//!
//! The timetable keeps the raw rows of every loaded source and a derived
//! index. Replacing a source rebuilds the whole index with freshly
//! allocated ids, so nothing resolved against an older version survives.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{SourceId, StopRef};

use super::error::SnapshotError;
use super::model::{Route, RouteId, ServiceId, Stop, StopId, StopVisit, Trip, TripId};
use super::snapshot::{Dataset, Snapshot};
use super::store::ScheduleStore;

/// In-memory dataset holding any number of sources.
#[derive(Debug, Default)]
pub struct Timetable {
    version: u64,
    next_id: u64,
    datasets: BTreeMap<SourceId, Dataset>,
    index: Index,
}

/// Lookup tables derived from the loaded datasets.
#[derive(Debug, Default)]
struct Index {
    stops: HashMap<StopId, Stop>,
    stop_refs: HashMap<StopRef, StopId>,
    routes: HashMap<RouteId, Route>,
    trips: HashMap<TripId, Trip>,
    calendars: HashMap<ServiceId, BTreeSet<NaiveDate>>,
    visits_by_stop: HashMap<StopId, Vec<StopVisit>>,
    visits_by_trip: HashMap<TripId, Vec<StopVisit>>,
}

impl Timetable {
    /// Create an empty timetable (version 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every source of a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let mut timetable = Self::new();
        for source in &snapshot.sources {
            timetable.replace_source(source.source, source.dataset.clone())?;
        }
        Ok(timetable)
    }

    /// Replace all rows of one source and return the new dataset version.
    ///
    /// The dataset is validated before anything is swapped in: on error the
    /// timetable is left exactly as it was.
    pub fn replace_source(
        &mut self,
        source: SourceId,
        dataset: Dataset,
    ) -> Result<u64, SnapshotError> {
        let others = self.datasets.iter().filter(|(s, _)| **s != source);
        let (index, next_id) =
            Index::build(others.chain(std::iter::once((&source, &dataset))), self.next_id)?;

        self.datasets.insert(source, dataset);
        self.commit(index, next_id);
        debug!(
            source = %source,
            version = self.version,
            stops = self.index.stops.len(),
            trips = self.index.trips.len(),
            "Replaced source"
        );
        Ok(self.version)
    }

    /// Drop every row of one source. Returns false if it was not loaded.
    ///
    /// The remaining sources are re-indexed first; on error the timetable is
    /// left exactly as it was.
    pub fn remove_source(&mut self, source: SourceId) -> Result<bool, SnapshotError> {
        if !self.datasets.contains_key(&source) {
            return Ok(false);
        }
        let remaining = self.datasets.iter().filter(|(s, _)| **s != source);
        let (index, next_id) = Index::build(remaining, self.next_id)?;

        self.datasets.remove(&source);
        self.commit(index, next_id);
        debug!(source = %source, version = self.version, "Removed source");
        Ok(true)
    }

    fn commit(&mut self, index: Index, next_id: u64) {
        self.index = index;
        self.next_id = next_id;
        self.version += 1;
    }

    /// Loaded sources, in ascending order.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.datasets.keys().copied()
    }

    /// Number of stops across all sources.
    pub fn stop_count(&self) -> usize {
        self.index.stops.len()
    }

    /// Number of trips across all sources.
    pub fn trip_count(&self) -> usize {
        self.index.trips.len()
    }
}

impl ScheduleStore for Timetable {
    fn dataset_version(&self) -> u64 {
        self.version
    }

    fn stop(&self, id: StopId) -> Option<&Stop> {
        self.index.stops.get(&id)
    }

    fn stop_by_ref(&self, stop_ref: &StopRef) -> Option<&Stop> {
        let id = self.index.stop_refs.get(stop_ref)?;
        self.index.stops.get(id)
    }

    fn route(&self, id: RouteId) -> Option<&Route> {
        self.index.routes.get(&id)
    }

    fn trip(&self, id: TripId) -> Option<&Trip> {
        self.index.trips.get(&id)
    }

    fn visits_at_stop(&self, stop: StopId) -> &[StopVisit] {
        self.index
            .visits_by_stop
            .get(&stop)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn visits_for_trip(&self, trip: TripId) -> &[StopVisit] {
        self.index
            .visits_by_trip
            .get(&trip)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn service_runs_on(&self, service: ServiceId, date: NaiveDate) -> bool {
        self.index
            .calendars
            .get(&service)
            .is_some_and(|dates| dates.contains(&date))
    }

    fn routes_between(&self, from: StopId, to: StopId) -> BTreeSet<RouteId> {
        self.visits_at_stop(from)
            .iter()
            .filter(|origin| origin.pickup)
            .filter(|origin| {
                self.visits_for_trip(origin.trip)
                    .iter()
                    .any(|v| v.stop == to && v.dropoff && v.sequence > origin.sequence)
            })
            .filter_map(|origin| self.trip(origin.trip).map(|t| t.route))
            .collect()
    }
}

/// Hands out ids that are never reused across versions.
struct IdAllocator(u64);

impl IdAllocator {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

impl Index {
    fn build<'a>(
        datasets: impl Iterator<Item = (&'a SourceId, &'a Dataset)>,
        next_id: u64,
    ) -> Result<(Self, u64), SnapshotError> {
        let mut ids = IdAllocator(next_id);
        let mut index = Index::default();

        for (&source, dataset) in datasets {
            index.add_dataset(source, dataset, &mut ids)?;
        }

        for visits in index.visits_by_trip.values_mut() {
            visits.sort_by_key(|v| v.sequence);
        }

        Ok((index, ids.0))
    }

    fn add_dataset(
        &mut self,
        source: SourceId,
        dataset: &Dataset,
        ids: &mut IdAllocator,
    ) -> Result<(), SnapshotError> {
        let invalid = |message: String| SnapshotError::Invalid {
            source_id: source,
            message,
        };

        let mut stop_ids: HashMap<&str, StopId> = HashMap::new();
        for row in &dataset.stops {
            if row.stop_id.is_empty() {
                return Err(invalid("stop with empty stop_id".to_string()));
            }
            let id = StopId(ids.next());
            if stop_ids.insert(row.stop_id.as_str(), id).is_some() {
                return Err(invalid(format!("duplicate stop {:?}", row.stop_id)));
            }
            let stop_ref = StopRef::new(source, row.stop_id.clone());
            self.stop_refs.insert(stop_ref.clone(), id);
            self.stops.insert(
                id,
                Stop {
                    id,
                    stop_ref,
                    name: row.name.clone(),
                },
            );
        }

        let mut route_ids: HashMap<&str, RouteId> = HashMap::new();
        for row in &dataset.routes {
            let id = RouteId(ids.next());
            if route_ids.insert(row.route_id.as_str(), id).is_some() {
                return Err(invalid(format!("duplicate route {:?}", row.route_id)));
            }
            self.routes.insert(
                id,
                Route {
                    id,
                    short_name: row.short_name.clone(),
                    long_name: row.long_name.clone(),
                    color: row.color.clone(),
                    text_color: row.text_color.clone(),
                    mode: row.mode,
                },
            );
        }

        let mut service_ids: HashMap<&str, ServiceId> = HashMap::new();
        for row in &dataset.calendars {
            let id = *service_ids
                .entry(row.service_id.as_str())
                .or_insert_with(|| ServiceId(ids.next()));
            self.calendars
                .entry(id)
                .or_default()
                .extend(row.dates.iter().copied());
        }

        let mut trip_ids: HashMap<&str, TripId> = HashMap::new();
        for row in &dataset.trips {
            let route = *route_ids.get(row.route_id.as_str()).ok_or_else(|| {
                invalid(format!(
                    "trip {:?} references unknown route {:?}",
                    row.trip_id, row.route_id
                ))
            })?;
            // A trip on a service with no calendar rows simply never runs
            let service = *service_ids
                .entry(row.service_id.as_str())
                .or_insert_with(|| ServiceId(ids.next()));

            let id = TripId(ids.next());
            if trip_ids.insert(row.trip_id.as_str(), id).is_some() {
                return Err(invalid(format!("duplicate trip {:?}", row.trip_id)));
            }
            self.trips.insert(
                id,
                Trip {
                    id,
                    local_id: row.trip_id.clone(),
                    route,
                    service,
                    headsign: row.headsign.clone(),
                },
            );
        }

        for row in &dataset.visits {
            let trip = *trip_ids.get(row.trip_id.as_str()).ok_or_else(|| {
                invalid(format!("visit references unknown trip {:?}", row.trip_id))
            })?;
            let stop = *stop_ids.get(row.stop_id.as_str()).ok_or_else(|| {
                invalid(format!("visit references unknown stop {:?}", row.stop_id))
            })?;

            let visit = StopVisit {
                trip,
                stop,
                sequence: row.sequence,
                arrival: row.arrival.unwrap_or(row.departure),
                departure: row.departure,
                pickup: row.pickup,
                dropoff: row.dropoff,
            };
            self.visits_by_stop.entry(stop).or_default().push(visit);
            self.visits_by_trip.entry(trip).or_default().push(visit);
        }

        Ok(())
    }
}
