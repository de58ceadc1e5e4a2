//! Link error types.

use std::fmt;

use crate::domain::{InvalidStopRef, LegId, LegSide, StopRef};

/// Why a durable reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// Reference text is not `"<sourceId>:<localStopId>"`
    #[error("malformed stop reference {reference:?}: {reason}")]
    Malformed {
        reference: String,
        reason: InvalidStopRef,
    },

    /// No stop in the current dataset carries this reference
    #[error("can't find stop with source_id={} stop_id={:?}", .0.source, .0.local_id)]
    StopNotFound(StopRef),
}

/// Every side of one leg that failed to resolve during relinking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    pub leg: LegId,
    /// One entry per failed side, `From` before `To`. Never empty.
    pub errors: Vec<(LegSide, LinkError)>,
}

impl LinkFailure {
    /// The error for `side`, if that side failed.
    pub fn error(&self, side: LegSide) -> Option<&LinkError> {
        self.errors.iter().find(|(s, _)| *s == side).map(|(_, e)| e)
    }
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leg {}: ", self.leg)?;
        for (i, (side, error)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{side} stop: {error}")?;
        }
        Ok(())
    }
}
