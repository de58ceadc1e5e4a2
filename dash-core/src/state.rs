//! Shared application state.
//!
//! Lock order is always timetable before dashboards. Board reads take both
//! read locks; the reload coordinator takes write locks phase by phase.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::board::{DashboardBoard, build_board};
use crate::cache::{BoardCache, CacheConfig, CachedBoard};
use crate::departures::{DashboardDeparture, DepartureConfig, next_departure_instant, next_for_dashboard};
use crate::domain::{Dashboard, DashboardId, DomainError, LegId, StopRef};
use crate::reload::{DatasetIngester, ReloadCoordinator, ReloadError, ReloadPhase, ReloadReport};
use crate::schedule::{ScheduleStore, Timetable};

/// Errors from user edits through the state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// No dashboard with this id
    #[error("unknown dashboard id {0}")]
    UnknownDashboard(DashboardId),

    /// Stop reference does not match any stop in the current dataset
    #[error("stop {0} not found")]
    StopNotFound(StopRef),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Shared state: timetable, dashboards, board cache and reload coordinator.
///
/// Cheap to clone; all clones share the same data.
#[derive(Clone)]
pub struct DashState {
    timetable: Arc<RwLock<Timetable>>,
    dashboards: Arc<RwLock<Vec<Dashboard>>>,
    cache: Arc<BoardCache>,
    reload: Arc<ReloadCoordinator>,

    /// Departure query configuration
    pub config: Arc<DepartureConfig>,
}

impl DashState {
    /// Create a new state.
    ///
    /// Dashboards start out as given; call [`Self::reload`] to link their
    /// legs against the timetable.
    pub fn new(
        timetable: Timetable,
        dashboards: Vec<Dashboard>,
        config: DepartureConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            timetable: Arc::new(RwLock::new(timetable)),
            dashboards: Arc::new(RwLock::new(dashboards)),
            cache: Arc::new(BoardCache::new(cache_config)),
            reload: Arc::new(ReloadCoordinator::new()),
            config: Arc::new(config),
        }
    }

    /// Rendered board for a dashboard as of `from`, served from the cache
    /// when a cached board answers `from` exactly.
    ///
    /// Returns `None` for an unknown dashboard.
    pub async fn board(&self, id: DashboardId, from: NaiveDateTime) -> Option<Arc<DashboardBoard>> {
        self.ensure_linked().await;
        let timetable = self.timetable.read().await;
        let dashboards = self.dashboards.read().await;
        let dashboard = dashboards.iter().find(|d| d.id == id)?;

        let count = self.config.count;
        let key = self.cache.key(id, timetable.dataset_version(), count, from);
        if let Some(cached) = self.cache.get(&key).await.filter(|c| c.covers(from)) {
            return Some(cached.board.clone());
        }

        debug!(dashboard = %id, at = %from, "Building board");
        let board = Arc::new(build_board(&*timetable, dashboard, from, count));
        let cached = CachedBoard {
            board: board.clone(),
            built_at: from,
            valid_until: next_departure_instant(&*timetable, dashboard, from),
        };
        // Inserted while still holding the read locks, so a reload can't
        // clear the cache between building and inserting
        self.cache.insert(key, Arc::new(cached)).await;
        Some(board)
    }

    /// Ranked departures for a dashboard, uncached.
    pub async fn departures(
        &self,
        id: DashboardId,
        from: NaiveDateTime,
        count: usize,
    ) -> Option<Vec<DashboardDeparture>> {
        self.ensure_linked().await;
        let timetable = self.timetable.read().await;
        let dashboards = self.dashboards.read().await;
        let dashboard = dashboards.iter().find(|d| d.id == id)?;
        Some(next_for_dashboard(&*timetable, dashboard, from, count))
    }

    /// Record that a dashboard was viewed.
    pub async fn touch(&self, id: DashboardId, at: NaiveDateTime) -> Result<(), StateError> {
        let mut dashboards = self.dashboards.write().await;
        let dashboard = dashboards
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StateError::UnknownDashboard(id))?;
        dashboard.touch(at);
        Ok(())
    }

    /// User action: point a leg at two stops of the current dataset.
    pub async fn assign_stops(
        &self,
        dashboard_id: DashboardId,
        leg: LegId,
        from_ref: &StopRef,
        to_ref: &StopRef,
    ) -> Result<(), StateError> {
        let timetable = self.timetable.read().await;
        let from = timetable
            .stop_by_ref(from_ref)
            .ok_or_else(|| StateError::StopNotFound(from_ref.clone()))?;
        let to = timetable
            .stop_by_ref(to_ref)
            .ok_or_else(|| StateError::StopNotFound(to_ref.clone()))?;

        let mut dashboards = self.dashboards.write().await;
        let dashboard = dashboards
            .iter_mut()
            .find(|d| d.id == dashboard_id)
            .ok_or(StateError::UnknownDashboard(dashboard_id))?;
        dashboard.leg_mut(leg)?.assign_stops(&*timetable, from, to);

        self.cache.invalidate_all();
        Ok(())
    }

    /// Copy of the dashboards, e.g. for persisting.
    pub async fn dashboards(&self) -> Vec<Dashboard> {
        self.dashboards.read().await.clone()
    }

    /// Current dataset version.
    pub async fn dataset_version(&self) -> u64 {
        self.timetable.read().await.dataset_version()
    }

    /// Replace the datasets of `ingesters` and relink every leg.
    pub async fn reload<I: DatasetIngester>(&self, ingesters: &[I]) -> Result<ReloadReport, ReloadError> {
        self.reload
            .reload(&self.timetable, &self.dashboards, &self.cache, ingesters)
            .await
    }

    /// Current reload phase.
    pub fn reload_phase(&self) -> ReloadPhase {
        self.reload.phase()
    }

    /// Relink legs left unlinked by a reload that was dropped midway.
    async fn ensure_linked(&self) {
        if let Some(report) = self
            .reload
            .recover(&self.timetable, &self.dashboards, &self.cache)
            .await
        {
            debug!(version = report.dataset_version, clean = report.is_clean(), "Recovered relink");
        }
    }
}
