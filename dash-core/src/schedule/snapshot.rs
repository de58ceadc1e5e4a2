//! JSON snapshot of normalized dataset rows.
//!
//! Provider files are parsed elsewhere; a snapshot carries the already
//! normalized rows of one or more sources so that a [`Timetable`] can be
//! filled without a database. Ids in a snapshot are the provider's own
//! (local) ids; volatile ids are assigned when the rows are loaded.
//!
//! [`Timetable`]: super::Timetable

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{SourceId, TimeOfDay};

use super::error::SnapshotError;
use super::model::RouteMode;

/// A stop row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRow {
    pub stop_id: String,
    #[serde(default)]
    pub name: String,
}

/// A route row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRow {
    pub route_id: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub mode: RouteMode,
}

/// A pre-expanded service calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRow {
    pub service_id: String,
    pub dates: Vec<NaiveDate>,
}

/// A trip row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRow {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    #[serde(default)]
    pub headsign: Option<String>,
}

/// A stop visit row. `arrival` defaults to `departure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRow {
    pub trip_id: String,
    pub stop_id: String,
    pub sequence: u32,
    pub departure: TimeOfDay,
    #[serde(default)]
    pub arrival: Option<TimeOfDay>,
    #[serde(default = "allowed")]
    pub pickup: bool,
    #[serde(default = "allowed")]
    pub dropoff: bool,
}

fn allowed() -> bool {
    true
}

/// All rows of one dataset source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub stops: Vec<StopRow>,
    #[serde(default)]
    pub routes: Vec<RouteRow>,
    #[serde(default)]
    pub calendars: Vec<CalendarRow>,
    #[serde(default)]
    pub trips: Vec<TripRow>,
    #[serde(default)]
    pub visits: Vec<VisitRow>,
}

/// The dataset of one source inside a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub source: SourceId,
    pub dataset: Dataset,
}

/// A snapshot file: datasets for any number of sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sources: Vec<SourceSnapshot>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns the dataset published for `source`, if any.
    pub fn dataset(&self, source: SourceId) -> Option<&Dataset> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .map(|s| &s.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "sources": [{
            "source": 1,
            "dataset": {
                "stops": [{"stop_id": "A", "name": "Alpha"}, {"stop_id": "B"}],
                "routes": [{"route_id": "R", "short_name": "10", "mode": 0}],
                "calendars": [{"service_id": "WK", "dates": ["2024-03-01"]}],
                "trips": [{"trip_id": "T1", "route_id": "R", "service_id": "WK"}],
                "visits": [
                    {"trip_id": "T1", "stop_id": "A", "sequence": 1, "departure": "08:00:00", "dropoff": false},
                    {"trip_id": "T1", "stop_id": "B", "sequence": 2, "departure": "08:12:00", "arrival": "08:10:00"}
                ]
            }
        }]
    }"#;

    #[test]
    fn parse_sample_with_defaults() {
        let snapshot = Snapshot::from_json(SAMPLE).unwrap();
        let dataset = snapshot.dataset(SourceId(1)).unwrap();

        assert_eq!(dataset.stops.len(), 2);
        assert_eq!(dataset.stops[1].name, "");
        assert_eq!(dataset.routes[0].mode, RouteMode::Tram);
        assert_eq!(dataset.routes[0].color, None);

        let first = &dataset.visits[0];
        assert!(first.pickup);
        assert!(!first.dropoff);
        assert_eq!(first.arrival, None);

        let second = &dataset.visits[1];
        assert_eq!(second.arrival, Some(TimeOfDay::from_hms(8, 10, 0)));
        assert_eq!(second.departure, TimeOfDay::from_hms(8, 12, 0));
    }

    #[test]
    fn missing_source_is_none() {
        let snapshot = Snapshot::from_json(SAMPLE).unwrap();
        assert!(snapshot.dataset(SourceId(2)).is_none());
    }

    #[test]
    fn reject_bad_time() {
        let json = SAMPLE.replace("08:12:00", "8h12");
        assert!(matches!(
            Snapshot::from_json(&json),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let snapshot = Snapshot::load(file.path()).unwrap();
        assert_eq!(snapshot.sources.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Snapshot::load("/nonexistent/snapshot.json"),
            Err(SnapshotError::Io(_))
        ));
    }
}
