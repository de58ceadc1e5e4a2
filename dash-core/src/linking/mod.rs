//! Stop linking across dataset reloads.
//!
//! Legs hold durable stop references. Before a dataset is replaced every
//! leg is unlinked, and afterwards the references are resolved again
//! against the new dataset. Resolution failures are collected per leg and
//! never stop the remaining legs from being linked.

mod error;
mod resolver;

pub use error::{LinkError, LinkFailure};
pub use resolver::{find_unlinked, find_without_routes, relink_all, resolve_ref, unlink_all};
