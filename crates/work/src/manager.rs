//! Tracking manager: the operation contract over the repository.
//!
//! Every write follows the same cycle: take the per-item lock, load the
//! versioned item, apply a pure transition, save against the loaded version.
//! The lock makes in-process callers queue up so the loser sees the winner's
//! result; the version check catches writers in other processes, in which
//! case the cycle is re-run on fresh state.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use optrack_core::{
    Clock, PartNumber, Phase, PhaseId, PhaseOperation, Subphase, SubphaseId, SystemClock, Time,
    WorkItem,
};
use optrack_progress::{progress_report, ProgressReport};
use optrack_storage::{EmployeeDirectory, Repository, StorageError, Versioned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::config::TrackingConfig;
use crate::error::{Result, TrackingError};
use crate::gate::{evaluate_completion, GateDecision};
use crate::{ledger, phase_machine};

/// Operations exposed to the presentation layer.
#[async_trait]
pub trait TrackingManager: Send + Sync {
    /// Start a phase's clock.
    async fn start_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase>;

    /// Pause a running phase.
    async fn pause_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase>;

    /// Resume a paused phase.
    async fn resume_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase>;

    /// Stop a running phase whose subphases are all complete.
    async fn stop_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase>;

    /// Reset a touched phase's timer.
    async fn reset_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase>;

    /// Mark a subphase complete or incomplete.
    async fn toggle_subphase(&self, subphase_id: SubphaseId, completed: bool) -> Result<Subphase>;

    /// Set a subphase's produced quantity.
    async fn update_quantity(&self, subphase_id: SubphaseId, quantity: i64) -> Result<Subphase>;

    /// Assign the worker behind a scanned badge to a subphase.
    async fn assign_worker(&self, subphase_id: SubphaseId, scanned_code: &str) -> Result<Subphase>;

    /// Per-phase and per-item progress.
    async fn get_progress(&self, part_number: &PartNumber) -> Result<ProgressReport>;

    /// Current state of a work item.
    async fn load_item(&self, part_number: &PartNumber) -> Result<WorkItem>;

    /// Whether a subphase could be marked complete right now.
    async fn can_complete(&self, subphase_id: SubphaseId) -> Result<GateDecision>;
}

/// Basic tracking manager implementation.
pub struct BasicTrackingManager<R: Repository, D: EmployeeDirectory> {
    storage: Arc<R>,
    directory: Arc<D>,
    clock: Arc<dyn Clock>,
    config: TrackingConfig,
    locks: Mutex<HashMap<PartNumber, Arc<Mutex<()>>>>,
}

impl<R: Repository, D: EmployeeDirectory> BasicTrackingManager<R, D> {
    /// Create a new tracking manager.
    pub fn new(storage: Arc<R>, directory: Arc<D>) -> Self {
        Self {
            storage,
            directory,
            clock: Arc::new(SystemClock),
            config: TrackingConfig::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a reference to the storage.
    pub fn storage(&self) -> &Arc<R> {
        &self.storage
    }

    async fn item_lock(&self, part_number: &PartNumber) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Drop locks nobody is holding or waiting on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(part_number.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, part_number: &PartNumber) -> Result<Versioned<WorkItem>> {
        self.storage
            .load_item(part_number)
            .await?
            .ok_or_else(|| TrackingError::NotFound(format!("work item {part_number}")))
    }

    async fn locate(&self, subphase_id: SubphaseId) -> Result<PartNumber> {
        self.storage
            .locate_subphase(subphase_id)
            .await?
            .ok_or_else(|| TrackingError::NotFound(format!("subphase {subphase_id}")))
    }

    /// Run one locked load-apply-save cycle, re-running it on version conflicts.
    async fn mutate<T, F>(&self, part_number: &PartNumber, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut WorkItem, Time) -> Result<T> + Send,
        T: Send,
    {
        let lock = self.item_lock(part_number).await;
        let _guard = lock.lock().await;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let Versioned { value: mut item, version } = self.load(part_number).await?;
            let now = self.clock.now();

            let out = match apply(&mut item, now) {
                Ok(out) => out,
                Err(e) => {
                    debug!(part_number = %part_number, error = %e, "transition rejected");
                    return Err(e);
                }
            };
            item.updated_at = now;

            match self.storage.save_item(&item, Some(version)).await {
                Ok(_) => return Ok(out),
                Err(StorageError::Conflict { .. }) if attempts <= self.config.max_conflict_retries => {
                    warn!(part_number = %part_number, attempts, "version conflict, re-running on fresh state");
                }
                Err(StorageError::Conflict { .. }) => {
                    return Err(TrackingError::Conflict {
                        part_number: part_number.clone(),
                        attempts,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn transition(
        &self,
        part_number: &PartNumber,
        phase_id: PhaseId,
        operation: PhaseOperation,
    ) -> Result<Phase> {
        let phase = self
            .mutate(part_number, |item, now| {
                let phase = item
                    .phase_mut(phase_id)
                    .ok_or_else(|| TrackingError::NotFound(format!("phase {phase_id}")))?;
                phase_machine::apply(phase, operation, now)?;
                Ok(phase.clone())
            })
            .await?;
        info!(
            part_number = %part_number,
            phase_id = %phase_id,
            %operation,
            state = %phase.state(),
            "phase transition applied"
        );
        Ok(phase)
    }

    async fn update_subphase<F>(&self, subphase_id: SubphaseId, mut apply: F) -> Result<Subphase>
    where
        F: FnMut(&mut Phase, Time) -> Result<Subphase> + Send,
    {
        let part_number = self.locate(subphase_id).await?;
        self.mutate(&part_number, |item, now| {
            let phase = item
                .phase_of_subphase_mut(subphase_id)
                .ok_or_else(|| TrackingError::NotFound(format!("subphase {subphase_id}")))?;
            apply(phase, now)
        })
        .await
    }
}

#[async_trait]
impl<R, D> TrackingManager for BasicTrackingManager<R, D>
where
    R: Repository + 'static,
    D: EmployeeDirectory + 'static,
{
    async fn start_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase> {
        self.transition(part_number, phase_id, PhaseOperation::Start).await
    }

    async fn pause_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase> {
        self.transition(part_number, phase_id, PhaseOperation::Pause).await
    }

    async fn resume_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase> {
        self.transition(part_number, phase_id, PhaseOperation::Resume).await
    }

    async fn stop_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase> {
        self.transition(part_number, phase_id, PhaseOperation::Stop).await
    }

    async fn reset_phase(&self, part_number: &PartNumber, phase_id: PhaseId) -> Result<Phase> {
        self.transition(part_number, phase_id, PhaseOperation::Reset).await
    }

    async fn toggle_subphase(&self, subphase_id: SubphaseId, completed: bool) -> Result<Subphase> {
        let sub = self
            .update_subphase(subphase_id, |phase, now| {
                ledger::toggle_completion(phase, subphase_id, completed, now)
            })
            .await?;
        info!(subphase_id = %subphase_id, completed = sub.completed, "subphase toggled");
        Ok(sub)
    }

    async fn update_quantity(&self, subphase_id: SubphaseId, quantity: i64) -> Result<Subphase> {
        let sub = self
            .update_subphase(subphase_id, |phase, _| {
                ledger::update_completed_quantity(phase, subphase_id, quantity)
            })
            .await?;
        info!(
            subphase_id = %subphase_id,
            quantity = sub.current_completed_quantity,
            completed = sub.completed,
            "subphase quantity updated"
        );
        Ok(sub)
    }

    async fn assign_worker(&self, subphase_id: SubphaseId, scanned_code: &str) -> Result<Subphase> {
        let employee = self
            .directory
            .resolve_by_barcode(scanned_code)
            .await?
            .ok_or_else(|| TrackingError::NotFound(format!("worker code {}", scanned_code.trim())))?;

        let sub = self
            .update_subphase(subphase_id, |phase, _| {
                ledger::assign_worker(phase, subphase_id, &employee)
            })
            .await?;
        info!(subphase_id = %subphase_id, employee = %employee.name, "worker assigned");
        Ok(sub)
    }

    async fn get_progress(&self, part_number: &PartNumber) -> Result<ProgressReport> {
        let item = self.load(part_number).await?;
        Ok(progress_report(&item.value))
    }

    async fn load_item(&self, part_number: &PartNumber) -> Result<WorkItem> {
        Ok(self.load(part_number).await?.value)
    }

    async fn can_complete(&self, subphase_id: SubphaseId) -> Result<GateDecision> {
        let part_number = self.locate(subphase_id).await?;
        let item = self.load(&part_number).await?.value;
        let not_found = || TrackingError::NotFound(format!("subphase {subphase_id}"));
        let phase = item.phase_of_subphase(subphase_id).ok_or_else(not_found)?;
        let subphase = phase.subphase(subphase_id).ok_or_else(not_found)?;
        Ok(evaluate_completion(phase, subphase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use chrono::{TimeZone, Utc};
    use optrack_core::{Employee, ManualClock, PhaseState};
    use optrack_storage::{MemoryDirectory, MemoryStorage};
    use crate::gate::GateDenial;

    type Manager = BasicTrackingManager<MemoryStorage, MemoryDirectory>;

    struct Fixture {
        manager: Arc<Manager>,
        clock: Arc<ManualClock>,
        part: PartNumber,
        item: WorkItem,
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::from_employees(vec![
            Employee::new("e1", "Ana", "EMP-001"),
            Employee::new("e2", "Ben", "EMP-002"),
        ])
    }

    fn sample_item() -> WorkItem {
        let timed = Phase::new("Assembly", 0)
            .with_subphase(Subphase::time_tracked("Fit", 0))
            .with_subphase(Subphase::time_tracked("Fasten", 1));
        let counted = Phase::new("Drilling", 1)
            .with_subphase(Subphase::quantity_tracked("Holes", 0, 10));
        WorkItem::new(PartNumber::new("PN-100").unwrap(), "Bracket")
            .with_phase(timed)
            .with_phase(counted)
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let item = sample_item();
        storage.save_item(&item, None).await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
        let manager = BasicTrackingManager::new(storage, Arc::new(directory()))
            .with_clock(clock.clone());
        Fixture {
            manager: Arc::new(manager),
            clock,
            part: item.part_number.clone(),
            item,
        }
    }

    #[tokio::test]
    async fn test_time_tracked_chain_scenario() {
        let f = fixture().await;
        let phase_id = f.item.phases[0].id;
        let step1 = f.item.phases[0].subphases[0].id;
        let step2 = f.item.phases[0].subphases[1].id;

        f.manager.start_phase(&f.part, phase_id).await.unwrap();
        f.manager.assign_worker(step1, "EMP-001").await.unwrap();
        f.clock.advance(120);
        let sub = f.manager.toggle_subphase(step1, true).await.unwrap();
        assert!(sub.completed);
        assert_eq!(sub.time_duration, Some(120));

        let err = f.manager.toggle_subphase(step2, true).await.unwrap_err();
        match err {
            TrackingError::GateNotSatisfied { reasons, .. } => {
                assert_eq!(reasons, vec![GateDenial::Unassigned]);
            }
            other => panic!("expected GateNotSatisfied, got {other:?}"),
        }

        let stored = f.manager.load_item(&f.part).await.unwrap();
        assert!(stored.phases[0].subphases[0].completed);
        assert!(!stored.phases[0].subphases[1].completed);
    }

    #[tokio::test]
    async fn test_quantity_scenario() {
        let f = fixture().await;
        let holes = f.item.phases[1].subphases[0].id;
        f.manager.assign_worker(holes, "EMP-002").await.unwrap();

        f.manager.update_quantity(holes, 7).await.unwrap();
        assert!(matches!(
            f.manager.toggle_subphase(holes, true).await,
            Err(TrackingError::GateNotSatisfied { .. })
        ));

        f.manager.update_quantity(holes, 10).await.unwrap();
        assert!(f.manager.toggle_subphase(holes, true).await.unwrap().completed);

        let sub = f.manager.update_quantity(holes, 5).await.unwrap();
        assert!(!sub.completed);

        let stored = f.manager.load_item(&f.part).await.unwrap();
        let stored = stored.subphase(holes).unwrap();
        assert!(!stored.completed);
        assert_eq!(stored.current_completed_quantity, 5);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let f = fixture().await;
        let phase_id = f.item.phases[0].id;

        assert!(matches!(
            f.manager.pause_phase(&f.part, phase_id).await,
            Err(TrackingError::InvalidTransition { state: PhaseState::NotStarted, .. })
        ));
        f.manager.start_phase(&f.part, phase_id).await.unwrap();
        assert!(matches!(
            f.manager.resume_phase(&f.part, phase_id).await,
            Err(TrackingError::InvalidTransition { state: PhaseState::Running, .. })
        ));
        assert!(matches!(
            f.manager.stop_phase(&f.part, phase_id).await,
            Err(TrackingError::IncompletePrerequisite { incomplete: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_phase_lifecycle_persists_timer() {
        let f = fixture().await;
        let phase_id = f.item.phases[0].id;
        let steps: Vec<_> = f.item.phases[0].subphases.iter().map(|s| s.id).collect();

        f.manager.start_phase(&f.part, phase_id).await.unwrap();
        f.clock.advance(60);
        f.manager.pause_phase(&f.part, phase_id).await.unwrap();
        f.clock.advance(30);
        let phase = f.manager.resume_phase(&f.part, phase_id).await.unwrap();
        assert_eq!(phase.paused_duration, 30);

        for step in &steps {
            f.manager.assign_worker(*step, "EMP-001").await.unwrap();
            f.manager.toggle_subphase(*step, true).await.unwrap();
        }
        f.clock.advance(10);
        let phase = f.manager.stop_phase(&f.part, phase_id).await.unwrap();
        assert_eq!(phase.state(), PhaseState::Completed);
        assert_eq!(phase.elapsed(f.clock.now()), 70);

        let phase = f.manager.reset_phase(&f.part, phase_id).await.unwrap();
        assert_eq!(phase.state(), PhaseState::NotStarted);
        assert!(phase.subphases.iter().all(|s| s.completed));
    }

    #[tokio::test]
    async fn test_get_progress() {
        let f = fixture().await;
        let holes = f.item.phases[1].subphases[0].id;
        f.manager.assign_worker(holes, "EMP-001").await.unwrap();
        f.manager.update_quantity(holes, 10).await.unwrap();
        f.manager.toggle_subphase(holes, true).await.unwrap();

        let report = f.manager.get_progress(&f.part).await.unwrap();
        assert_eq!(report.phases[0].percentage, 0);
        assert_eq!(report.phases[1].percentage, 100);
        assert_eq!(report.item.percentage, 33);
    }

    #[tokio::test]
    async fn test_not_found_cases() {
        let f = fixture().await;
        let step = f.item.phases[0].subphases[0].id;
        let missing = PartNumber::new("PN-404").unwrap();

        assert!(matches!(
            f.manager.start_phase(&missing, f.item.phases[0].id).await,
            Err(TrackingError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.start_phase(&f.part, PhaseId::new()).await,
            Err(TrackingError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.toggle_subphase(SubphaseId::new(), true).await,
            Err(TrackingError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.assign_worker(step, "EMP-999").await,
            Err(TrackingError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.get_progress(&missing).await,
            Err(TrackingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_can_complete_reflects_gate() {
        let f = fixture().await;
        let step = f.item.phases[0].subphases[0].id;
        assert!(!f.manager.can_complete(step).await.unwrap().is_allowed());

        f.manager.start_phase(&f.part, f.item.phases[0].id).await.unwrap();
        f.manager.assign_worker(step, "EMP-001").await.unwrap();
        assert!(f.manager.can_complete(step).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_rejected_write_saves_nothing() {
        let f = fixture().await;
        let before = f.manager.storage().load_item(&f.part).await.unwrap().unwrap().version;
        let err = f.manager.pause_phase(&f.part, f.item.phases[0].id).await.unwrap_err();
        assert!(matches!(
            err,
            TrackingError::InvalidTransition { operation: PhaseOperation::Pause, state: PhaseState::NotStarted, .. }
        ));
        let after = f.manager.storage().load_item(&f.part).await.unwrap().unwrap().version;
        assert_eq!(before, after);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pause_has_one_winner() {
        let f = fixture().await;
        let phase_id = f.item.phases[0].id;
        f.manager.start_phase(&f.part, phase_id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = f.manager.clone();
            let part = f.part.clone();
            handles.push(tokio::spawn(async move { manager.pause_phase(&part, phase_id).await }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(TrackingError::InvalidTransition { state, .. }) => {
                    assert_eq!(state, PhaseState::Paused)
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_quantity_updates_are_not_lost() {
        let f = fixture().await;
        let holes = f.item.phases[1].subphases[0].id;

        let mut handles = Vec::new();
        for q in 1..=10 {
            let manager = f.manager.clone();
            handles.push(tokio::spawn(async move { manager.update_quantity(holes, q).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let version = f.manager.storage().load_item(&f.part).await.unwrap().unwrap().version;
        assert_eq!(version, 11);
    }

    /// Store that lets another writer pause the first phase just before the
    /// first save, as a second process would.
    struct RacingStorage {
        inner: MemoryStorage,
        raced: AtomicBool,
        at: Time,
    }

    #[async_trait]
    impl Repository for RacingStorage {
        async fn load_item(&self, part_number: &PartNumber) -> optrack_storage::Result<Option<Versioned<WorkItem>>> {
            self.inner.load_item(part_number).await
        }

        async fn save_item(&self, item: &WorkItem, expected_version: Option<u64>) -> optrack_storage::Result<u64> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let current = self.inner.load_item(&item.part_number).await?.unwrap();
                let mut theirs = current.value;
                phase_machine::pause(&mut theirs.phases[0], self.at).unwrap();
                self.inner.save_item(&theirs, Some(current.version)).await?;
            }
            self.inner.save_item(item, expected_version).await
        }

        async fn list_items(&self) -> optrack_storage::Result<Vec<WorkItem>> {
            self.inner.list_items().await
        }
    }

    #[tokio::test]
    async fn test_cross_process_conflict_reruns_on_fresh_state() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut item = sample_item();
        phase_machine::start(&mut item.phases[0], now).unwrap();
        let inner = MemoryStorage::new();
        inner.save_item(&item, None).await.unwrap();
        let storage = Arc::new(RacingStorage {
            inner,
            raced: AtomicBool::new(false),
            at: now,
        });
        let manager = BasicTrackingManager::new(storage.clone(), Arc::new(directory()))
            .with_clock(Arc::new(ManualClock::new(now)));

        let err = manager
            .pause_phase(&item.part_number, item.phases[0].id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackingError::InvalidTransition { state: PhaseState::Paused, .. }
        ));
    }

    #[tokio::test]
    async fn test_conflict_gives_up_after_retries() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let item = sample_item();
        let inner = MemoryStorage::new();
        inner.save_item(&item, None).await.unwrap();
        let storage = Arc::new(RacingStorage {
            inner,
            raced: AtomicBool::new(false),
            at: now,
        });
        // The racing writer pauses phase 0, which requires it to be running.
        let mut started = storage.inner.load_item(&item.part_number).await.unwrap().unwrap();
        phase_machine::start(&mut started.value.phases[0], now).unwrap();
        storage.inner.save_item(&started.value, Some(started.version)).await.unwrap();

        let manager = BasicTrackingManager::new(storage, Arc::new(directory()))
            .with_clock(Arc::new(ManualClock::new(now)))
            .with_config(TrackingConfig {
                max_conflict_retries: 0,
                ..Default::default()
            });

        let holes = item.phases[1].subphases[0].id;
        assert!(matches!(
            manager.update_quantity(holes, 3).await,
            Err(TrackingError::Conflict { attempts: 1, .. })
        ));
    }
}
