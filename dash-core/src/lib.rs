//! Departure dashboard engine.
//!
//! Answers "what are my next departures?" for dashboards of user-pinned
//! legs, against a schedule dataset that is replaced wholesale from time
//! to time. Legs keep durable stop references so they can be relinked
//! after every reload.

pub mod board;
pub mod cache;
pub mod config;
pub mod departures;
pub mod domain;
pub mod linking;
pub mod reload;
pub mod schedule;
pub mod state;

#[cfg(test)]
mod testing;
