//! Next-departure queries.
//!
//! [`DepartureFinder`] answers "what leaves next" for one leg;
//! [`next_for_dashboard`] merges the answers of every leg on a dashboard
//! and ranks them by the time the traveller has to leave.

mod aggregate;
mod config;
mod finder;

pub use aggregate::{DashboardDeparture, next_departure_instant, next_for_dashboard, rank_departures};
pub use config::DepartureConfig;
pub use finder::{Departure, DepartureFinder, LegDeparture};
