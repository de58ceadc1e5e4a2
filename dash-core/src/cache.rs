//! Caching layer for rendered boards.
//!
//! Boards depend only on the dashboard, the dataset version, the requested
//! count and the query time. Entries are keyed by the query time truncated
//! to a bucket (one minute by default), and each entry records the range of
//! query times it is exact for: from the time it was built up to the first
//! departure it considered. A request outside that range rebuilds the
//! board. Including the dataset version in the key means a reload can never
//! serve a board built from an older dataset, and the reload coordinator
//! also clears the cache so stale entries don't sit around until the TTL
//! expires.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use moka::future::Cache as MokaCache;

use crate::board::DashboardBoard;
use crate::domain::DashboardId;

/// Cache key: (dashboard, dataset version, count, date, time bucket).
/// Time bucket is minutes from midnight divided by the bucket size.
pub type BoardKey = (DashboardId, u64, usize, NaiveDate, u16);

/// Cached board entry.
pub type BoardEntry = Arc<CachedBoard>;

/// A rendered board and the query times it answers exactly.
#[derive(Debug)]
pub struct CachedBoard {
    pub board: Arc<DashboardBoard>,
    /// Query time the board was built for.
    pub built_at: NaiveDateTime,
    /// Earliest departure instant the board considered. Past it, that
    /// departure would be dropped. `None` if no leg had any departure.
    pub valid_until: Option<NaiveDateTime>,
}

impl CachedBoard {
    /// Returns true if querying at `from` would build the same board.
    ///
    /// Only meaningful for query times on the same date as `built_at`; the
    /// cache key guarantees that.
    pub fn covers(&self, from: NaiveDateTime) -> bool {
        self.built_at <= from && self.valid_until.is_none_or(|until| from <= until)
    }
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Time bucket size in minutes.
    pub bucket_mins: u16,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 1000,
            bucket_mins: 1,
        }
    }
}

/// Cache for rendered dashboard boards.
pub struct BoardCache {
    boards: MokaCache<BoardKey, BoardEntry>,

    /// Time bucket size in minutes.
    bucket_mins: u16,
}

impl BoardCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let boards = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            boards,
            bucket_mins: config.bucket_mins.max(1),
        }
    }

    /// Cache key for a query.
    pub fn key(&self, dashboard: DashboardId, dataset_version: u64, count: usize, from: NaiveDateTime) -> BoardKey {
        let mins = (from.hour() * 60 + from.minute()) as u16;
        (dashboard, dataset_version, count, from.date(), mins / self.bucket_mins)
    }

    /// Get a cached board.
    pub async fn get(&self, key: &BoardKey) -> Option<BoardEntry> {
        self.boards.get(key).await
    }

    /// Insert a board into the cache.
    pub async fn insert(&self, key: BoardKey, entry: BoardEntry) {
        self.boards.insert(key, entry).await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.boards.invalidate_all();
    }
}
