//! The sync engine.
//!
//! Local-first queueing with bounded-retry flushing:
//!
//! ```text
//! add_operation ──► queue (Pending) ──┐
//!                                     │ flush pass (FIFO, non-reentrant)
//!                                     ▼
//!                            push to RemoteStore
//!                   ┌───────────┬────┴────────┬──────────────┐
//!                   ▼           ▼             ▼              │
//!               Accepted    Conflict      transient error    │
//!              dequeued,   recorded;     retry_count++,      │
//!              Completed   id blocked    Failed at budget ───┘
//! ```
//!
//! Rules the pass upholds:
//! - operations on an annotation with an unresolved conflict are
//!   skipped until the conflict is settled
//! - a pass is non-reentrant; overlapping calls return immediately
//! - permanently Failed operations stay queued and are only revived
//!   by a network recovery (Pending again, retry budget reset)
//!
//! `sync_full` additionally pulls the complete remote data set and
//! runs conflict detection against the local cache before flushing.

use crate::{
    ConflictStrategy, FileStateStore, OpKind, OpStatus, PersistedState, PushOutcome, RemoteStore,
    Resolution, SyncConflict, SyncError, SyncOperation, SyncStats,
};
use framelink_event::Emitter;
use framelink_types::{AnnotationData, AnnotationId, OperationId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where the engine is right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Nothing in flight.
    Idle,
    /// A flush pass is running.
    Syncing,
    /// Network loss signalled; flushing is halted.
    Offline,
    /// At least one operation is permanently Failed.
    Error,
}

/// Sync engine notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// An operation was accepted by the remote store.
    OperationCompleted(OperationId),
    /// An operation exhausted its retry budget.
    OperationFailed(OperationId),
    /// A conflict was detected for an annotation.
    ConflictDetected(AnnotationId),
    /// A conflict was resolved (automatically or manually).
    ConflictResolved(AnnotationId),
    /// The engine status changed.
    StatusChanged(SyncStatus),
}

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Spacing between periodic flush passes.
    pub interval: Duration,
    /// Transient failures an operation may accumulate before it is
    /// permanently Failed.
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

#[derive(Default)]
struct EngineState {
    queue: VecDeque<SyncOperation>,
    cache: HashMap<AnnotationId, AnnotationData>,
    conflicts: Vec<SyncConflict>,
    stats: SyncStats,
}

impl EngineState {
    fn blocked(&self, id: &AnnotationId) -> bool {
        self.conflicts.iter().any(|c| !c.resolved && c.id == *id)
    }
}

struct Core<R> {
    remote: R,
    config: SyncConfig,
    strategy: Box<dyn ConflictStrategy>,
    state: Mutex<EngineState>,
    status: RwLock<SyncStatus>,
    syncing: AtomicBool,
    emitter: Emitter<SyncEvent>,
    persist: Option<FileStateStore>,
    alive: AtomicBool,
}

impl<R: RemoteStore> Core<R> {
    fn set_status(&self, next: SyncStatus) {
        let changed = {
            let mut status = self.status.write();
            let changed = *status != next;
            *status = next;
            changed
        };
        if changed {
            self.emitter.emit(&SyncEvent::StatusChanged(next));
        }
    }

    /// One flush pass. Non-reentrant; a no-op while offline.
    async fn flush(&self) {
        if self.syncing.swap(true, Ordering::SeqCst) {
            return;
        }
        if *self.status.read() == SyncStatus::Offline {
            self.syncing.store(false, Ordering::SeqCst);
            return;
        }
        self.set_status(SyncStatus::Syncing);

        // Snapshot the pass up front; operations enqueued mid-pass
        // wait for the next one.
        let pass: Vec<OperationId> = self
            .state
            .lock()
            .queue
            .iter()
            .filter(|op| op.status == OpStatus::Pending)
            .map(|op| op.id)
            .collect();

        for op_id in pass {
            if !self.alive.load(Ordering::SeqCst) {
                break;
            }

            let op = {
                let mut state = self.state.lock();
                let Some(op) = state.queue.iter().position(|o| o.id == op_id) else {
                    continue;
                };
                if state.queue[op].status != OpStatus::Pending {
                    continue;
                }
                if state.blocked(&state.queue[op].data.id) {
                    debug!(op = %op_id, "skipped, annotation has an unresolved conflict");
                    continue;
                }
                state.queue[op].status = OpStatus::Syncing;
                state.queue[op].clone()
            };

            let outcome = self.remote.push(&op).await;
            let mut events = Vec::new();
            match outcome {
                Ok(PushOutcome::Accepted) => {
                    let mut state = self.state.lock();
                    state.queue.retain(|o| o.id != op_id);
                    state.stats.completed += 1;
                    drop(state);
                    debug!(op = %op_id, "operation completed");
                    events.push(SyncEvent::OperationCompleted(op_id));
                }
                Ok(PushOutcome::Conflict { remote }) => {
                    {
                        let mut state = self.state.lock();
                        if let Some(queued) = state.queue.iter_mut().find(|o| o.id == op_id) {
                            queued.status = OpStatus::Pending;
                        }
                    }
                    events.extend(self.record_conflict(op.data.clone(), remote));
                }
                Err(err) => {
                    let mut state = self.state.lock();
                    if let Some(queued) = state.queue.iter_mut().find(|o| o.id == op_id) {
                        queued.retry_count += 1;
                        if queued.retry_count >= self.config.max_retries {
                            queued.status = OpStatus::Failed;
                            state.stats.failed += 1;
                            warn!(op = %op_id, error = %err, "operation permanently failed");
                            events.push(SyncEvent::OperationFailed(op_id));
                        } else {
                            queued.status = OpStatus::Pending;
                            debug!(
                                op = %op_id,
                                retries = queued.retry_count,
                                error = %err,
                                "transient failure, will retry"
                            );
                        }
                    }
                }
            }
            for event in &events {
                self.emitter.emit(event);
            }
        }

        let has_failed = {
            let mut state = self.state.lock();
            state.stats.last_sync = Some(chrono::Utc::now());
            state.queue.iter().any(|o| o.status == OpStatus::Failed)
        };
        self.syncing.store(false, Ordering::SeqCst);

        // A network-loss signal raised mid-pass takes precedence.
        if *self.status.read() != SyncStatus::Offline {
            self.set_status(if has_failed {
                SyncStatus::Error
            } else {
                SyncStatus::Idle
            });
        }
    }

    /// Records a conflict and applies the automatic strategy.
    /// Returns the events to emit (outside the state lock).
    fn record_conflict(&self, local: AnnotationData, remote: AnnotationData) -> Vec<SyncEvent> {
        let conflict = SyncConflict::detect(local, remote);
        let id = conflict.id.clone();
        warn!(annotation = %id, kind = ?conflict.kind, "conflict detected");

        let mut events = vec![SyncEvent::ConflictDetected(id.clone())];
        let resolution = self.strategy.resolve(&conflict);
        {
            let mut state = self.state.lock();
            state.stats.conflicts += 1;
            state.conflicts.push(conflict);
        }

        if let Some(resolution) = resolution {
            debug!(annotation = %id, strategy = self.strategy.name(), "auto-resolving");
            if self.apply_resolution(&id, resolution).is_ok() {
                events.push(SyncEvent::ConflictResolved(id));
            }
        }
        events
    }

    /// Settles the oldest unresolved conflict for `id`.
    fn apply_resolution(&self, id: &AnnotationId, resolution: Resolution) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        let Some(index) = state
            .conflicts
            .iter()
            .position(|c| !c.resolved && c.id == *id)
        else {
            return Err(SyncError::UnknownConflict { id: id.clone() });
        };

        let (local, remote) = {
            let conflict = &mut state.conflicts[index];
            conflict.resolved = true;
            (conflict.local.clone(), conflict.remote.clone())
        };

        match resolution {
            Resolution::UseLocal => {
                let mut winning = local;
                winning.version = remote.version + 1;
                winning.timestamp = chrono::Utc::now();
                Self::requeue(&mut state, winning);
            }
            Resolution::UseRemote => {
                state.cache.insert(id.clone(), remote);
                // Local writes for this id lost the conflict.
                state.queue.retain(|o| o.data.id != *id);
            }
            Resolution::Merge(merged) => {
                let mut winning = local.clone();
                winning.data = merged;
                winning.version = local.version.max(remote.version) + 1;
                winning.timestamp = chrono::Utc::now();
                Self::requeue(&mut state, winning);
            }
        }
        Ok(())
    }

    /// Caches `winning` and makes sure exactly one pending operation
    /// will push it.
    fn requeue(state: &mut EngineState, winning: AnnotationData) {
        state.cache.insert(winning.id.clone(), winning.clone());
        if let Some(op) = state.queue.iter_mut().find(|o| o.data.id == winning.id) {
            op.data = winning;
            op.status = OpStatus::Pending;
            op.retry_count = 0;
        } else {
            state
                .queue
                .push_back(SyncOperation::new(OpKind::Update, winning));
        }
    }

    fn snapshot(&self) -> PersistedState {
        let state = self.state.lock();
        PersistedState::new(
            state.queue.iter().cloned().collect(),
            state.cache.values().cloned().collect(),
            state.conflicts.clone(),
            state.stats,
        )
    }
}

/// Offline-tolerant write queue against a [`RemoteStore`].
pub struct SyncManager<R: RemoteStore> {
    core: Arc<Core<R>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<R: RemoteStore> SyncManager<R> {
    /// Creates an idle engine.
    ///
    /// `persist` enables state restoration across restarts; call
    /// [`restore`](Self::restore) before [`start`](Self::start) to
    /// pick up a previous snapshot.
    #[must_use]
    pub fn new(
        remote: R,
        strategy: Box<dyn ConflictStrategy>,
        config: SyncConfig,
        persist: Option<FileStateStore>,
    ) -> Self {
        Self {
            core: Arc::new(Core {
                remote,
                config,
                strategy,
                state: Mutex::new(EngineState::default()),
                status: RwLock::new(SyncStatus::Idle),
                syncing: AtomicBool::new(false),
                emitter: Emitter::new(),
                persist,
                alive: AtomicBool::new(true),
            }),
            ticker: Mutex::new(None),
        }
    }

    /// Loads the persisted snapshot, if one is usable.
    ///
    /// Operations persisted mid-push come back as Pending. Returns
    /// the number of restored operations.
    pub async fn restore(&self) -> Result<usize, SyncError> {
        let Some(store) = &self.core.persist else {
            return Ok(0);
        };
        let Some(snapshot) = store.load().await? else {
            return Ok(0);
        };

        let restored = snapshot.operations.len();
        let mut state = self.core.state.lock();
        state.queue = snapshot
            .operations
            .into_iter()
            .map(|mut op| {
                if op.status == OpStatus::Syncing {
                    op.status = OpStatus::Pending;
                }
                op
            })
            .collect();
        state.cache = snapshot
            .cache
            .into_iter()
            .map(|data| (data.id.clone(), data))
            .collect();
        state.conflicts = snapshot.conflicts;
        state.stats = snapshot.stats;
        drop(state);

        info!(operations = restored, "sync state restored");
        Ok(restored)
    }

    /// Starts the periodic flush task.
    ///
    /// Each tick flushes when the engine is Idle and has pending
    /// work; Offline and Error states are left alone.
    pub fn start(&self) {
        let core = Arc::clone(&self.core);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(core.config.interval).await;
                if !core.alive.load(Ordering::SeqCst) {
                    return;
                }
                let idle_with_work = *core.status.read() == SyncStatus::Idle
                    && core
                        .state
                        .lock()
                        .queue
                        .iter()
                        .any(|o| o.status == OpStatus::Pending);
                if idle_with_work {
                    core.flush().await;
                }
            }
        });
        if let Some(previous) = self.ticker.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Enqueues a write. Never blocks on the network.
    pub fn add_operation(&self, kind: OpKind, data: AnnotationData) -> OperationId {
        let op = SyncOperation::new(kind, data.clone());
        let id = op.id;
        let mut state = self.core.state.lock();
        state.cache.insert(data.id.clone(), data);
        state.queue.push_back(op);
        debug!(op = %id, queued = state.queue.len(), "operation enqueued");
        id
    }

    /// Runs one flush pass now (FIFO, non-reentrant).
    pub async fn sync_incremental(&self) {
        self.core.flush().await;
    }

    /// Full sync: fetch everything remote, detect conflicts against
    /// the local cache, then flush.
    ///
    /// # Errors
    ///
    /// Transport errors from the fetch; the engine goes to Error and
    /// the queue is left untouched.
    pub async fn sync_full(&self) -> Result<(), SyncError> {
        let remote_records = match self.core.remote.fetch_all().await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "full sync fetch failed");
                self.core.set_status(SyncStatus::Error);
                return Err(err);
            }
        };

        let mut events = Vec::new();
        for remote in remote_records {
            let local = self.core.state.lock().cache.get(&remote.id).cloned();
            match local {
                Some(local) if local.version != remote.version => {
                    events.extend(self.core.record_conflict(local, remote));
                }
                _ => {
                    let mut state = self.core.state.lock();
                    state.cache.insert(remote.id.clone(), remote);
                }
            }
        }
        for event in &events {
            self.core.emitter.emit(event);
        }

        self.core.flush().await;
        Ok(())
    }

    /// Manually settles an unresolved conflict.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownConflict`] when no unresolved conflict
    /// exists for `id`.
    pub fn resolve_conflict_manually(
        &self,
        id: &AnnotationId,
        resolution: Resolution,
    ) -> Result<(), SyncError> {
        self.core.apply_resolution(id, resolution)?;
        info!(annotation = %id, "conflict resolved manually");
        self.core.emitter.emit(&SyncEvent::ConflictResolved(id.clone()));
        Ok(())
    }

    /// Signals network loss: flushing halts until recovery.
    pub fn handle_network_loss(&self) {
        warn!("network lost, sync halted");
        self.core.set_status(SyncStatus::Offline);
    }

    /// Signals network recovery: Failed operations become Pending
    /// with a fresh retry budget, and a flush pass replays the queue.
    pub async fn handle_network_recovery(&self) {
        let revived = {
            let mut state = self.core.state.lock();
            let mut revived = 0;
            for op in state.queue.iter_mut() {
                if op.status == OpStatus::Failed {
                    op.status = OpStatus::Pending;
                    op.retry_count = 0;
                    revived += 1;
                }
            }
            revived
        };
        info!(revived, "network recovered, replaying queue");
        self.core.set_status(SyncStatus::Idle);
        self.core.flush().await;
    }

    /// Persists the current snapshot, when persistence is configured.
    pub async fn persist_now(&self) -> Result<(), SyncError> {
        if let Some(store) = &self.core.persist {
            store.save(&self.core.snapshot()).await?;
        }
        Ok(())
    }

    /// Tears the engine down: persists the snapshot, stops the
    /// periodic task, clears in-memory state.
    pub async fn destroy(&self) {
        if let Err(err) = self.persist_now().await {
            warn!(error = %err, "state persistence on destroy failed");
        }
        self.core.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
        let mut state = self.core.state.lock();
        state.queue.clear();
        state.cache.clear();
        state.conflicts.clear();
        drop(state);
        self.core.emitter.clear();
        info!("sync engine destroyed");
    }

    /// Current engine status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.core.status.read()
    }

    /// Accumulated counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.core.state.lock().stats
    }

    /// Operations waiting for a flush (Pending or mid-push).
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.core
            .state
            .lock()
            .queue
            .iter()
            .filter(|o| o.status != OpStatus::Failed)
            .count()
    }

    /// Operations that exhausted their retry budget.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.core
            .state
            .lock()
            .queue
            .iter()
            .filter(|o| o.status == OpStatus::Failed)
            .count()
    }

    /// Snapshot of all detected conflicts.
    #[must_use]
    pub fn conflicts(&self) -> Vec<SyncConflict> {
        self.core.state.lock().conflicts.clone()
    }

    /// Unresolved conflicts only.
    #[must_use]
    pub fn unresolved_conflicts(&self) -> Vec<SyncConflict> {
        self.core
            .state
            .lock()
            .conflicts
            .iter()
            .filter(|c| !c.resolved)
            .cloned()
            .collect()
    }

    /// Cached annotation state for `id`.
    #[must_use]
    pub fn cached(&self, id: &AnnotationId) -> Option<AnnotationData> {
        self.core.state.lock().cache.get(id).cloned()
    }

    /// Hub for [`SyncEvent`] subscriptions.
    #[must_use]
    pub fn events(&self) -> &Emitter<SyncEvent> {
        &self.core.emitter
    }
}

impl<R: RemoteStore> Drop for SyncManager<R> {
    fn drop(&mut self) {
        self.core.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }
}
