use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use shared_config::SyncConfig;

use crate::services::gateway::QueueBackend;
use crate::services::store::{FetchKind, QueueStore, StateUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Applied { seq: u64 },
    /// A newer update of the same kind was applied first.
    Stale { seq: u64 },
    AlreadyInFlight,
    Failed { error: String },
    /// Completed after the scheduler was torn down.
    Discarded,
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub snapshot: RefreshOutcome,
    pub aggregate: RefreshOutcome,
    pub completed: RefreshOutcome,
}

/// Decides when the backend is polled and feeds results into the store
/// with increasing sequence numbers.
pub struct SyncScheduler {
    backend: Arc<dyn QueueBackend>,
    store: Arc<QueueStore>,
    config: SyncConfig,
    seq: AtomicU64,
    /// Held for the duration of one fetch of that kind.
    snapshot_slot: Mutex<()>,
    aggregate_slot: Mutex<()>,
    completed_slot: Mutex<()>,
    torn_down: AtomicBool,
}

impl SyncScheduler {
    pub fn new(backend: Arc<dyn QueueBackend>, store: Arc<QueueStore>, config: SyncConfig) -> Self {
        Self {
            backend,
            store,
            config,
            seq: AtomicU64::new(0),
            snapshot_slot: Mutex::new(()),
            aggregate_slot: Mutex::new(()),
            completed_slot: Mutex::new(()),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn fetch_slot(&self, kind: FetchKind) -> &Mutex<()> {
        match kind {
            FetchKind::Snapshot => &self.snapshot_slot,
            FetchKind::Aggregate => &self.aggregate_slot,
            FetchKind::Completed => &self.completed_slot,
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    fn tear_down(&self) {
        self.torn_down.store(true, Ordering::Release);
    }

    #[instrument(skip(self))]
    pub async fn probe_health(&self) -> bool {
        let online = self.backend.probe_health().await;
        if self.is_torn_down() {
            return online;
        }
        if !online {
            warn!("Health probe failed, marking queue service offline");
        }
        self.store.set_online(online);
        online
    }

    /// Fetches one kind and applies it. A trigger while the same kind is
    /// already outstanding does nothing.
    #[instrument(skip(self))]
    pub async fn refresh(&self, kind: FetchKind) -> RefreshOutcome {
        let Ok(_slot) = self.fetch_slot(kind).try_lock() else {
            debug!("{:?} fetch already in flight, skipping", kind);
            return RefreshOutcome::AlreadyInFlight;
        };

        self.fetch_and_apply(kind).await
    }

    /// Waits for any outstanding fetch of this kind to land, then issues a
    /// new one with a later sequence number.
    #[instrument(skip(self))]
    pub async fn refresh_after_action(&self, kind: FetchKind) -> RefreshOutcome {
        let _slot = self.fetch_slot(kind).lock().await;
        self.fetch_and_apply(kind).await
    }

    async fn fetch_and_apply(&self, kind: FetchKind) -> RefreshOutcome {
        let seq = self.next_seq();
        debug!("Issuing {:?} fetch with seq {}", kind, seq);

        let result = match kind {
            FetchKind::Snapshot => self.backend.fetch_queue_snapshot().await.map(StateUpdate::Snapshot),
            FetchKind::Aggregate => self.backend.fetch_admin_aggregate().await.map(StateUpdate::Aggregate),
            FetchKind::Completed => self.backend.fetch_completed_patients().await.map(StateUpdate::Completed),
        };

        if self.is_torn_down() {
            debug!("Dropping {:?} result for seq {} after teardown", kind, seq);
            return RefreshOutcome::Discarded;
        }

        match result {
            Ok(update) => {
                if self.store.apply(seq, update) {
                    RefreshOutcome::Applied { seq }
                } else {
                    RefreshOutcome::Stale { seq }
                }
            }
            Err(e) => {
                warn!("{:?} fetch failed, keeping cached value: {}", kind, e);
                if e.is_connectivity() {
                    self.store.set_online(false);
                }
                RefreshOutcome::Failed { error: e.to_string() }
            }
        }
    }

    /// Snapshot, aggregate and completed list, fetched concurrently.
    pub async fn resync(&self) -> ResyncReport {
        let (snapshot, aggregate, completed) = tokio::join!(
            self.refresh(FetchKind::Snapshot),
            self.refresh(FetchKind::Aggregate),
            self.refresh(FetchKind::Completed),
        );

        ResyncReport { snapshot, aggregate, completed }
    }

    /// Full resync for after a mutation. Never collapses into a fetch that
    /// was issued before it.
    pub async fn resync_after_action(&self) -> ResyncReport {
        let (snapshot, aggregate, completed) = tokio::join!(
            self.refresh_after_action(FetchKind::Snapshot),
            self.refresh_after_action(FetchKind::Aggregate),
            self.refresh_after_action(FetchKind::Completed),
        );

        ResyncReport { snapshot, aggregate, completed }
    }

    /// One probe, then a full fetch if the service answered.
    pub async fn initial_sync(&self) -> bool {
        let online = self.probe_health().await;
        if online {
            self.resync().await;
        } else {
            info!("Queue service offline at startup, waiting for the next probe");
        }
        online
    }

    /// Runs the initial sync and then the periodic cadence until the
    /// returned handle is shut down or dropped.
    pub fn start(self: &Arc<Self>) -> SyncHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let config = self.config;

        let task = tokio::spawn(async move {
            scheduler.initial_sync().await;

            let started = Instant::now();
            let mut health = interval_at(started + config.health_probe_interval, config.health_probe_interval);
            health.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut refresh = interval_at(
                started + config.snapshot_refresh_interval + config.snapshot_refresh_offset,
                config.snapshot_refresh_interval,
            );
            refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                "Sync scheduler running: probe every {:?}, refresh every {:?}",
                config.health_probe_interval, config.snapshot_refresh_interval
            );

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        break;
                    }
                    _ = health.tick() => {
                        let scheduler = Arc::clone(&scheduler);
                        tokio::spawn(async move {
                            scheduler.probe_health().await;
                        });
                    }
                    _ = refresh.tick() => {
                        if scheduler.store.is_online() {
                            let scheduler = Arc::clone(&scheduler);
                            tokio::spawn(async move {
                                scheduler.resync().await;
                            });
                        } else {
                            debug!("Skipping periodic refresh while offline");
                        }
                    }
                }
            }

            info!("Sync scheduler stopped");
        });

        SyncHandle {
            stop: stop_tx,
            task: Some(task),
            scheduler: Arc::clone(self),
        }
    }
}

/// Owns the periodic timers. Dropping it cancels them; fetches already
/// in flight finish but their results are discarded.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    scheduler: Arc<SyncScheduler>,
}

impl SyncHandle {
    pub async fn shutdown(mut self) {
        self.scheduler.tear_down();
        let _ = self.stop.send(true);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Sync scheduler task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.scheduler.tear_down();
        let _ = self.stop.send(true);
    }
}
