//! Binary configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::cache::CacheConfig;
use crate::departures::DepartureConfig;
use crate::domain::SourceId;

/// Path of the dataset snapshot (required).
pub const DATASET_VAR: &str = "DASH_DATASET";
/// Path of the stored dashboards (required).
pub const DASHBOARDS_VAR: &str = "DASH_DASHBOARDS";
/// Comma-separated sources to load; all snapshot sources when unset.
pub const SOURCES_VAR: &str = "DASH_SOURCES";
/// Departures per dashboard.
pub const COUNT_VAR: &str = "DASH_COUNT";
/// Query time as `YYYY-MM-DDTHH:MM:SS`; the current local time when unset.
pub const AT_VAR: &str = "DASH_AT";
/// Board cache TTL in seconds.
pub const CACHE_TTL_VAR: &str = "DASH_CACHE_TTL_SECS";

/// Errors reading the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable could not be parsed
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the binary needs to run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dataset: PathBuf,
    pub dashboards: PathBuf,
    /// Sources to load; empty means every source in the snapshot.
    pub sources: Vec<SourceId>,
    /// Fixed query time; `None` means now.
    pub at: Option<NaiveDateTime>,
    pub departures: DepartureConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let sources = match get(SOURCES_VAR) {
            Some(value) => value
                .split(',')
                .map(|s| {
                    s.trim().parse::<SourceId>().map_err(|e| ConfigError::Invalid {
                        var: SOURCES_VAR,
                        value: value.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let mut departures = DepartureConfig::default();
        if let Some(value) = get(COUNT_VAR) {
            departures.count = parse(COUNT_VAR, &value)?;
        }

        let mut cache = CacheConfig::default();
        if let Some(value) = get(CACHE_TTL_VAR) {
            cache.ttl = Duration::from_secs(parse(CACHE_TTL_VAR, &value)?);
        }

        let at = get(AT_VAR)
            .map(|value| {
                NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S").map_err(|e| {
                    ConfigError::Invalid {
                        var: AT_VAR,
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .transpose()?;

        Ok(Self {
            dataset: required(DATASET_VAR)?.into(),
            dashboards: required(DASHBOARDS_VAR)?.into(),
            sources,
            at,
            departures,
            cache,
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
