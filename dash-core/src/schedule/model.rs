//! Rows of one loaded dataset version.
//!
//! Every id in this module is volatile: it is handed out when a dataset is
//! loaded and never reused, so an id held across a reload points at nothing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{StopRef, TimeOfDay};

/// Volatile stop identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(pub u64);

/// Route identity, stable within one dataset version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u64);

/// Trip identity, stable within one dataset version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(pub u64);

/// Service calendar identity, stable within one dataset version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub u64);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_id!(StopId, RouteId, TripId, ServiceId);

/// A stop in the current dataset version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stop {
    pub id: StopId,
    pub stop_ref: StopRef,
    pub name: String,
}

/// Error returned for an unknown route type code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown route type {0}")]
pub struct InvalidRouteMode(pub u16);

/// Vehicle type serving a route, using the GTFS `route_type` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RouteMode {
    Tram,
    Subway,
    Rail,
    #[default]
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Funicular,
    Trolleybus,
    Monorail,
}

impl RouteMode {
    /// The GTFS `route_type` code.
    pub fn code(self) -> u16 {
        match self {
            RouteMode::Tram => 0,
            RouteMode::Subway => 1,
            RouteMode::Rail => 2,
            RouteMode::Bus => 3,
            RouteMode::Ferry => 4,
            RouteMode::CableTram => 5,
            RouteMode::AerialLift => 6,
            RouteMode::Funicular => 7,
            RouteMode::Trolleybus => 11,
            RouteMode::Monorail => 12,
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            RouteMode::Tram => "Tram",
            RouteMode::Subway => "Subway",
            RouteMode::Rail => "Rail",
            RouteMode::Bus => "Bus",
            RouteMode::Ferry => "Ferry",
            RouteMode::CableTram => "Cable car",
            RouteMode::AerialLift => "Gondola",
            RouteMode::Funicular => "Funicular",
            RouteMode::Trolleybus => "Trolleybus",
            RouteMode::Monorail => "Monorail",
        }
    }
}

impl TryFrom<u16> for RouteMode {
    type Error = InvalidRouteMode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => RouteMode::Tram,
            1 => RouteMode::Subway,
            2 => RouteMode::Rail,
            3 => RouteMode::Bus,
            4 => RouteMode::Ferry,
            5 => RouteMode::CableTram,
            6 => RouteMode::AerialLift,
            7 => RouteMode::Funicular,
            11 => RouteMode::Trolleybus,
            12 => RouteMode::Monorail,
            other => return Err(InvalidRouteMode(other)),
        })
    }
}

impl From<RouteMode> for u16 {
    fn from(mode: RouteMode) -> Self {
        mode.code()
    }
}

/// A route and the attributes shown next to its departures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub short_name: String,
    pub long_name: String,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub mode: RouteMode,
}

/// A scheduled trip along one route, running on one service calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    /// Trip id as published by the provider.
    pub local_id: String,
    pub route: RouteId,
    pub service: ServiceId,
    pub headsign: Option<String>,
}

/// One scheduled call of a trip at a stop.
///
/// Times are relative to the trip's service date and may exceed 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopVisit {
    pub trip: TripId,
    pub stop: StopId,
    pub sequence: u32,
    pub arrival: TimeOfDay,
    pub departure: TimeOfDay,
    pub pickup: bool,
    pub dropoff: bool,
}

impl StopVisit {
    /// A visit where arrival and departure coincide, open for both pickup
    /// and drop-off.
    pub fn new(trip: TripId, stop: StopId, sequence: u32, time: TimeOfDay) -> Self {
        Self {
            trip,
            stop,
            sequence,
            arrival: time,
            departure: time,
            pickup: true,
            dropoff: true,
        }
    }
}
