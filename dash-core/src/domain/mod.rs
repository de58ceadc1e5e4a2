//! Domain types for the departure dashboards.
//!
//! This module contains the user-owned model (dashboards and their legs)
//! and the value types shared with the schedule layer. Value types enforce
//! their invariants at construction time, so code that receives them can
//! trust their validity.

mod dashboard;
mod error;
mod leg;
mod stop_ref;
mod time;

pub use dashboard::{DEFAULT_WARNING_TIME, Dashboard, DashboardId, parse_dashboards};
pub use error::DomainError;
pub use leg::{DashboardLeg, LegId, LegSide, Linkage};
pub use stop_ref::{InvalidStopRef, SourceId, StopRef};
pub use time::{SECONDS_PER_DAY, TimeError, TimeOfDay, resolve, seconds_since_midnight};
