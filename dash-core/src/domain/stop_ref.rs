//! Durable stop references.
//!
//! Stop identities inside a dataset are reassigned on every reload. The only
//! key that survives a reload is the pair of the dataset source and the stop
//! id the provider published, written as `"<sourceId>:<localStopId>"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid durable stop reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop reference: {reason}")]
pub struct InvalidStopRef {
    reason: &'static str,
}

/// Identifier of a dataset source (one provider feed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = InvalidStopRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidStopRef {
                reason: "source id must be a non-negative integer",
            });
        }
        s.parse().map(SourceId).map_err(|_| InvalidStopRef {
            reason: "source id out of range",
        })
    }
}

/// A durable `(source, local stop id)` reference.
///
/// Only the first `:` separates the two components, so provider stop ids
/// that themselves contain colons are preserved.
///
/// # Examples
///
/// ```
/// use dash_core::domain::{SourceId, StopRef};
///
/// let r: StopRef = "1:A".parse().unwrap();
/// assert_eq!(r.source, SourceId(1));
/// assert_eq!(r.local_id, "A");
/// assert_eq!(r.to_string(), "1:A");
///
/// // Both components must be present
/// assert!("1:".parse::<StopRef>().is_err());
/// assert!(":A".parse::<StopRef>().is_err());
/// assert!("A".parse::<StopRef>().is_err());
///
/// // The source must be numeric
/// assert!("S1:A".parse::<StopRef>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopRef {
    pub source: SourceId,
    pub local_id: String,
}

impl StopRef {
    /// Create a reference from its components.
    pub fn new(source: SourceId, local_id: impl Into<String>) -> Self {
        Self {
            source,
            local_id: local_id.into(),
        }
    }

    /// Parse the textual `"<sourceId>:<localStopId>"` form.
    pub fn parse(s: &str) -> Result<Self, InvalidStopRef> {
        let (source, local_id) = s.split_once(':').ok_or(InvalidStopRef {
            reason: "expected <source>:<stop_id>",
        })?;

        if source.is_empty() {
            return Err(InvalidStopRef {
                reason: "source id is empty",
            });
        }
        if local_id.is_empty() {
            return Err(InvalidStopRef {
                reason: "stop id is empty",
            });
        }

        Ok(Self {
            source: source.parse()?,
            local_id: local_id.to_string(),
        })
    }
}

impl FromStr for StopRef {
    type Err = InvalidStopRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.local_id)
    }
}

impl TryFrom<String> for StopRef {
    type Error = InvalidStopRef;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StopRef> for String {
    fn from(value: StopRef) -> Self {
        value.to_string()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_parse_roundtrip(source in any::<u32>(), local in "[A-Za-z0-9:_-]{1,12}") {
            let r = StopRef::new(SourceId(source), local);
            prop_assert_eq!(StopRef::parse(&r.to_string()).unwrap(), r);
        }

        #[test]
        fn parse_never_panics(s in "\\PC*") {
            let _ = StopRef::parse(&s);
        }
    }
}
