//! Unlink/relink protocol over a collection of legs.
//!
//! All operations are single passes over the legs with no external waits.
//! They take any iterator of legs so callers can link one dashboard or
//! every dashboard at once.

use tracing::debug;

use crate::domain::{DashboardLeg, LegId, LegSide, Linkage, StopRef};
use crate::schedule::{ScheduleStore, StopId};

use super::error::{LinkError, LinkFailure};

/// Clear the resolved stops and linked routes of every leg.
///
/// Durable references are untouched. Always succeeds and is idempotent.
/// Returns the number of legs processed.
pub fn unlink_all<'a>(legs: impl IntoIterator<Item = &'a mut DashboardLeg>) -> usize {
    let mut count = 0;
    for leg in legs {
        leg.unlink();
        count += 1;
    }
    debug!(legs = count, "Unlinked legs");
    count
}

/// Resolve one durable reference against the current dataset.
pub fn resolve_ref<S: ScheduleStore + ?Sized>(store: &S, reference: &str) -> Result<StopId, LinkError> {
    let stop_ref = StopRef::parse(reference).map_err(|reason| LinkError::Malformed {
        reference: reference.to_string(),
        reason,
    })?;

    store
        .stop_by_ref(&stop_ref)
        .map(|stop| stop.id)
        .ok_or(LinkError::StopNotFound(stop_ref))
}

/// Resolve every leg's durable references against the current dataset and
/// recompute its linked routes.
///
/// A side with an empty reference is left unresolved without being
/// reported. A side whose reference is malformed or matches no stop is left
/// unresolved and reported; processing always continues with the next side
/// and the next leg. Each failing leg yields exactly one [`LinkFailure`].
pub fn relink_all<'a, S: ScheduleStore + ?Sized>(
    store: &S,
    legs: impl IntoIterator<Item = &'a mut DashboardLeg>,
) -> Vec<LinkFailure> {
    let mut failures = Vec::new();
    let mut linked = 0usize;

    for leg in legs {
        let mut errors = Vec::new();
        for side in [LegSide::From, LegSide::To] {
            let reference = leg.stop_ref(side);
            let resolved = if reference.is_empty() {
                None
            } else {
                match resolve_ref(store, reference) {
                    Ok(stop) => Some(stop),
                    Err(error) => {
                        debug!(leg = %leg.id, side = %side, error = %error, "Failed to resolve stop");
                        errors.push((side, error));
                        None
                    }
                }
            };
            leg.set_resolved(side, resolved);
        }
        if !errors.is_empty() {
            failures.push(LinkFailure { leg: leg.id, errors });
        }

        leg.recompute_linked_routes(store);
        if leg.linkage() == Linkage::Linked {
            linked += 1;
        }
    }

    debug!(
        version = store.dataset_version(),
        linked,
        failures = failures.len(),
        "Relinked legs"
    );
    failures
}

/// Legs with a non-empty durable reference whose stop is still unresolved.
pub fn find_unlinked<'a>(legs: impl IntoIterator<Item = &'a DashboardLeg>) -> Vec<LegId> {
    legs.into_iter()
        .filter(|leg| {
            [LegSide::From, LegSide::To]
                .into_iter()
                .any(|side| !leg.stop_ref(side).is_empty() && leg.resolved_stop(side).is_none())
        })
        .map(|leg| leg.id)
        .collect()
}

/// Fully linked legs that no route connects.
///
/// Such legs are valid but will never show departures.
pub fn find_without_routes<'a>(legs: impl IntoIterator<Item = &'a DashboardLeg>) -> Vec<LegId> {
    legs.into_iter()
        .filter(|leg| leg.linkage() == Linkage::Linked && !leg.has_routes())
        .map(|leg| leg.id)
        .collect()
}
