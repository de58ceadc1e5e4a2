//! Reload state machine.
//!
//! `Idle -> Unlinking -> Ingesting -> Relinking -> Idle`. Relinking always
//! runs, whatever the ingesters did: an ingester that errors or panics is
//! recorded as a failure. The phase always returns to `Idle`, since a guard
//! resets it however the reload ends.
//!
//! A reload whose future is dropped before relinking leaves the legs
//! unlinked. The coordinator remembers this, and [`ReloadCoordinator::recover`]
//! (called by the shared state before every read) finishes the relink.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::cache::BoardCache;
use crate::domain::{Dashboard, DashboardLeg, LegSide};
use crate::linking::{find_unlinked, find_without_routes, relink_all, unlink_all};
use crate::schedule::{ScheduleStore, Timetable};

use super::error::{IngestError, ReloadError};
use super::ingest::DatasetIngester;
use super::report::{IngestFailure, LegIssue, ReloadReport};

/// Where a reload currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadPhase {
    #[default]
    Idle,
    Unlinking,
    Ingesting,
    Relinking,
}

/// Runs reloads one at a time.
#[derive(Debug, Default)]
pub struct ReloadCoordinator {
    phase: Mutex<ReloadPhase>,
    /// Set from unlinking until a relink has run to completion
    relink_pending: AtomicBool,
}

/// Resets the phase to `Idle` when the reload ends, however it ends.
struct PhaseGuard<'a> {
    phase: &'a Mutex<ReloadPhase>,
}

impl PhaseGuard<'_> {
    fn advance(&self, next: ReloadPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.advance(ReloadPhase::Idle);
    }
}

impl ReloadCoordinator {
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> ReloadPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if legs were unlinked and not yet relinked.
    pub fn relink_pending(&self) -> bool {
        self.relink_pending.load(Ordering::Acquire)
    }

    fn begin(&self, first: ReloadPhase) -> Result<PhaseGuard<'_>, ReloadError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != ReloadPhase::Idle {
            return Err(ReloadError::AlreadyInProgress);
        }
        *phase = first;
        Ok(PhaseGuard { phase: &self.phase })
    }

    /// Replace the datasets of all `ingesters` and relink every leg.
    ///
    /// Locks are taken phase by phase (dashboards, then timetable, then
    /// timetable read with dashboards write), so readers are blocked only
    /// while rows are actually being swapped. Between unlinking and
    /// relinking, readers see legs with no departures.
    pub async fn reload<I: DatasetIngester>(
        &self,
        timetable: &RwLock<Timetable>,
        dashboards: &RwLock<Vec<Dashboard>>,
        cache: &BoardCache,
        ingesters: &[I],
    ) -> Result<ReloadReport, ReloadError> {
        let guard = self.begin(ReloadPhase::Unlinking)?;
        info!(sources = ingesters.len(), "Starting reload");

        {
            let mut dashboards = dashboards.write().await;
            self.relink_pending.store(true, Ordering::Release);
            unlink_all(all_legs_mut(&mut dashboards));
            cache.invalidate_all();
        }

        guard.advance(ReloadPhase::Ingesting);
        let mut report = ReloadReport::default();
        for ingester in ingesters {
            let source = ingester.source();
            let fetched = AssertUnwindSafe(ingester.fetch())
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(IngestError::Panicked(panic_message(payload.as_ref()))));
            let result = match fetched {
                Ok(dataset) => timetable
                    .write()
                    .await
                    .replace_source(source, dataset)
                    .map_err(IngestError::from),
                Err(e) => Err(e),
            };

            match result {
                Ok(version) => info!(source = %source, version, "Replaced dataset"),
                Err(e) => {
                    error!(source = %source, error = %e, "Failed to replace dataset");
                    report.ingest_failures.push(IngestFailure { source, error: e });
                }
            }
        }

        guard.advance(ReloadPhase::Relinking);
        self.relink(timetable, dashboards, cache, &mut report).await;

        info!(
            version = report.dataset_version,
            ingest_failures = report.ingest_failures.len(),
            failures = report.failures.len(),
            unresolved = report.unresolved.len(),
            without_routes = report.without_routes.len(),
            "Reload finished"
        );
        drop(guard);
        Ok(report)
    }

    /// Finish the relink of a reload that was dropped before relinking.
    ///
    /// Returns `None` when no relink is pending or a reload is running.
    pub async fn recover(
        &self,
        timetable: &RwLock<Timetable>,
        dashboards: &RwLock<Vec<Dashboard>>,
        cache: &BoardCache,
    ) -> Option<ReloadReport> {
        if !self.relink_pending() {
            return None;
        }
        let guard = self.begin(ReloadPhase::Relinking).ok()?;
        // Another caller may have finished it while we waited
        if !self.relink_pending() {
            return None;
        }

        warn!("Relinking legs left unlinked by an interrupted reload");
        let mut report = ReloadReport::default();
        self.relink(timetable, dashboards, cache, &mut report).await;
        drop(guard);
        Some(report)
    }

    async fn relink(
        &self,
        timetable: &RwLock<Timetable>,
        dashboards: &RwLock<Vec<Dashboard>>,
        cache: &BoardCache,
        report: &mut ReloadReport,
    ) {
        let timetable = timetable.read().await;
        let mut dashboards = dashboards.write().await;

        report.dataset_version = timetable.dataset_version();
        report.failures = relink_all(&*timetable, all_legs_mut(&mut dashboards));
        for failure in &report.failures {
            error!(leg = %failure.leg, sides = failure.errors.len(), error = %failure, "Failed to relink stops");
        }

        for dashboard in dashboards.iter() {
            for leg in find_unlinked(dashboard.legs()) {
                let reason = dashboard
                    .leg(leg)
                    .map(unresolved_reason)
                    .unwrap_or_default();
                warn!(dashboard = %dashboard.id, leg = %leg, reason = %reason, "Leg is unlinked");
                report.unresolved.push(LegIssue {
                    dashboard: dashboard.id,
                    leg,
                    reason,
                });
            }
            for leg in find_without_routes(dashboard.legs()) {
                report.without_routes.push(LegIssue {
                    dashboard: dashboard.id,
                    leg,
                    reason: "no route connects the stops".to_string(),
                });
            }
        }

        // Boards rendered while legs were unlinked are worthless now
        cache.invalidate_all();
        self.relink_pending.store(false, Ordering::Release);
        info!(
            version = report.dataset_version,
            stops = timetable.stop_count(),
            trips = timetable.trip_count(),
            "Relinked legs"
        );
    }
}

fn all_legs_mut(dashboards: &mut [Dashboard]) -> impl Iterator<Item = &mut DashboardLeg> {
    dashboards.iter_mut().flat_map(|d| d.legs_mut().iter_mut())
}

fn unresolved_reason(leg: &DashboardLeg) -> String {
    let sides: Vec<String> = [LegSide::From, LegSide::To]
        .into_iter()
        .filter(|&side| !leg.stop_ref(side).is_empty() && leg.resolved_stop(side).is_none())
        .map(|side| format!("{side} stop {:?} not found", leg.stop_ref(side)))
        .collect();
    sides.join(", ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::domain::{DashboardId, LegId, Linkage, SourceId};
    use crate::schedule::Dataset;
    use crate::testing::{scenario_dataset, scenario_leg};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Ingester serving a fixed dataset, or failing when there is none.
    struct FixedIngester {
        source: SourceId,
        dataset: Option<Dataset>,
    }

    impl DatasetIngester for FixedIngester {
        fn source(&self) -> SourceId {
            self.source
        }

        async fn fetch(&self) -> Result<Dataset, IngestError> {
            self.dataset
                .clone()
                .ok_or(IngestError::MissingSource(self.source))
        }
    }

    fn fixed(source: u32, dataset: Option<Dataset>) -> FixedIngester {
        FixedIngester {
            source: SourceId(source),
            dataset,
        }
    }

    struct Fixture {
        timetable: RwLock<Timetable>,
        dashboards: RwLock<Vec<Dashboard>>,
        cache: BoardCache,
        coordinator: ReloadCoordinator,
    }

    impl Fixture {
        fn new(legs: Vec<DashboardLeg>) -> Self {
            let mut dashboard = Dashboard::new(DashboardId(1), "Home");
            for leg in legs {
                dashboard.add_leg(leg).unwrap();
            }
            Self {
                timetable: RwLock::new(Timetable::new()),
                dashboards: RwLock::new(vec![dashboard]),
                cache: BoardCache::new(&CacheConfig::default()),
                coordinator: ReloadCoordinator::new(),
            }
        }

        async fn reload<I: DatasetIngester>(&self, ingesters: &[I]) -> Result<ReloadReport, ReloadError> {
            self.coordinator
                .reload(&self.timetable, &self.dashboards, &self.cache, ingesters)
                .await
        }

        async fn recover(&self) -> Option<ReloadReport> {
            self.coordinator
                .recover(&self.timetable, &self.dashboards, &self.cache)
                .await
        }

        async fn linkage(&self, leg: u64) -> Linkage {
            self.dashboards.read().await[0].leg(LegId(leg)).unwrap().linkage()
        }
    }

    #[tokio::test]
    async fn clean_reload_links_legs() {
        let fixture = Fixture::new(vec![scenario_leg(1)]);

        let report = fixture.reload(&[fixed(1, Some(scenario_dataset()))]).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.dataset_version, 1);
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
        assert_eq!(fixture.coordinator.phase(), ReloadPhase::Idle);
    }

    #[tokio::test]
    async fn unresolved_leg_is_reported() {
        let fixture = Fixture::new(vec![
            scenario_leg(1),
            DashboardLeg::new(LegId(2), "gone").with_refs("1:Z", "1:B"),
            DashboardLeg::new(LegId(3), "back").with_refs("1:B", "1:A"),
        ]);

        let report = fixture.reload(&[fixed(1, Some(scenario_dataset()))]).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].leg, LegId(2));
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].leg, LegId(2));
        assert_eq!(report.unresolved[0].reason, r#"from stop "1:Z" not found"#);
        assert_eq!(
            report.unresolved_dashboards().into_iter().collect::<Vec<_>>(),
            vec![DashboardId(1)]
        );
        assert_eq!(report.without_routes.len(), 1);
        assert_eq!(report.without_routes[0].leg, LegId(3));
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
    }

    #[tokio::test]
    async fn failed_ingest_still_relinks() {
        let fixture = Fixture::new(vec![scenario_leg(1)]);
        fixture.reload(&[fixed(1, Some(scenario_dataset()))]).await.unwrap();

        let report = fixture.reload(&[fixed(1, None)]).await.unwrap();

        assert_eq!(report.ingest_failures.len(), 1);
        assert_eq!(report.ingest_failures[0].source, SourceId(1));
        // Old rows remain and the leg is linked against them again
        assert_eq!(report.dataset_version, 1);
        assert!(report.failures.is_empty());
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
    }

    #[tokio::test]
    async fn invalid_dataset_is_an_ingest_failure() {
        let fixture = Fixture::new(vec![scenario_leg(1)]);
        let mut broken = scenario_dataset();
        broken.trips[0].route_id = "missing".into();

        let report = fixture
            .reload(&[fixed(1, Some(broken)), fixed(2, Some(scenario_dataset()))])
            .await
            .unwrap();

        assert_eq!(report.ingest_failures.len(), 1);
        assert_eq!(report.ingest_failures[0].source, SourceId(1));
        // Source 2 still loaded; the leg points at source 1
        assert_eq!(fixture.timetable.read().await.sources().collect::<Vec<_>>(), vec![SourceId(2)]);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(fixture.linkage(1).await, Linkage::Unlinked);
    }

    #[tokio::test]
    async fn empty_reload_relinks_against_current_state() {
        let fixture = Fixture::new(vec![scenario_leg(1)]);
        let report = fixture.reload::<FixedIngester>(&[]).await.unwrap();

        assert_eq!(report.dataset_version, 0);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].errors.len(), 2);
    }

    /// Ingester that blocks until released.
    struct GatedIngester {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl DatasetIngester for GatedIngester {
        fn source(&self) -> SourceId {
            SourceId(1)
        }

        async fn fetch(&self) -> Result<Dataset, IngestError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(scenario_dataset())
        }
    }

    #[tokio::test]
    async fn second_reload_is_refused() {
        let fixture = Arc::new(Fixture::new(vec![scenario_leg(1)]));
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let running = {
            let fixture = fixture.clone();
            let gate = GatedIngester {
                entered: entered.clone(),
                release: release.clone(),
            };
            tokio::spawn(async move { fixture.reload(&[gate]).await })
        };

        entered.notified().await;
        assert_eq!(fixture.coordinator.phase(), ReloadPhase::Ingesting);
        // Legs are unlinked while the ingester runs
        assert_eq!(fixture.linkage(1).await, Linkage::Unlinked);

        let second = fixture.reload(&[fixed(1, Some(scenario_dataset()))]).await;
        assert!(matches!(second, Err(ReloadError::AlreadyInProgress)));

        release.notify_one();
        let report = running.await.unwrap().unwrap();
        assert!(report.is_clean());
        assert_eq!(fixture.coordinator.phase(), ReloadPhase::Idle);
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
    }

    struct PanickingIngester;

    impl DatasetIngester for PanickingIngester {
        fn source(&self) -> SourceId {
            SourceId(1)
        }

        async fn fetch(&self) -> Result<Dataset, IngestError> {
            panic!("ingester exploded");
        }
    }

    #[tokio::test]
    async fn panicking_ingester_is_a_failure_and_legs_relink() {
        let fixture = Fixture::new(vec![scenario_leg(1)]);
        fixture.reload(&[fixed(1, Some(scenario_dataset()))]).await.unwrap();

        let report = fixture.reload(&[PanickingIngester]).await.unwrap();

        assert_eq!(report.ingest_failures.len(), 1);
        assert!(matches!(
            &report.ingest_failures[0].error,
            IngestError::Panicked(message) if message == "ingester exploded"
        ));
        assert_eq!(report.dataset_version, 1);
        assert!(report.failures.is_empty());
        assert_eq!(fixture.coordinator.phase(), ReloadPhase::Idle);
        assert!(!fixture.coordinator.relink_pending());
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
    }

    #[tokio::test]
    async fn dropped_reload_is_finished_by_recover() {
        let fixture = Arc::new(Fixture::new(vec![scenario_leg(1)]));
        fixture.reload(&[fixed(1, Some(scenario_dataset()))]).await.unwrap();
        assert!(fixture.recover().await.is_none());

        let entered = Arc::new(Notify::new());
        let running = {
            let fixture = fixture.clone();
            let gate = GatedIngester {
                entered: entered.clone(),
                release: Arc::new(Notify::new()),
            };
            tokio::spawn(async move { fixture.reload(&[gate]).await })
        };
        entered.notified().await;
        running.abort();
        assert!(running.await.unwrap_err().is_cancelled());

        assert_eq!(fixture.coordinator.phase(), ReloadPhase::Idle);
        assert!(fixture.coordinator.relink_pending());
        assert_eq!(fixture.linkage(1).await, Linkage::Unlinked);

        let report = fixture.recover().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.dataset_version, 1);
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
        assert!(!fixture.coordinator.relink_pending());
        assert!(fixture.recover().await.is_none());
    }

    #[tokio::test]
    async fn recover_does_not_run_during_reload() {
        let fixture = Arc::new(Fixture::new(vec![scenario_leg(1)]));
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let running = {
            let fixture = fixture.clone();
            let gate = GatedIngester {
                entered: entered.clone(),
                release: release.clone(),
            };
            tokio::spawn(async move { fixture.reload(&[gate]).await })
        };
        entered.notified().await;

        assert!(fixture.coordinator.relink_pending());
        assert!(fixture.recover().await.is_none());
        assert_eq!(fixture.linkage(1).await, Linkage::Unlinked);

        release.notify_one();
        running.await.unwrap().unwrap();
        assert_eq!(fixture.linkage(1).await, Linkage::Linked);
    }
}
