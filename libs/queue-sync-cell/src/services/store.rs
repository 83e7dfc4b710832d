use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::{AdminAggregate, CachedState, Patient, QueueSnapshot};

/// The independently fetched parts of the cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Snapshot,
    Aggregate,
    Completed,
}

#[derive(Debug, Clone)]
pub enum StateUpdate {
    Snapshot(QueueSnapshot),
    Aggregate(AdminAggregate),
    Completed(Vec<Patient>),
}

impl StateUpdate {
    pub fn kind(&self) -> FetchKind {
        match self {
            StateUpdate::Snapshot(_) => FetchKind::Snapshot,
            StateUpdate::Aggregate(_) => FetchKind::Aggregate,
            StateUpdate::Completed(_) => FetchKind::Completed,
        }
    }
}

/// Sole writer of `CachedState`. Readers get clones or a watch receiver.
pub struct QueueStore {
    state: watch::Sender<CachedState>,
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CachedState::default());
        Self { state }
    }

    /// Applies `update` only if `seq` is newer than the last update of the
    /// same kind. Returns whether it was applied; stale updates are dropped.
    pub fn apply(&self, seq: u64, update: StateUpdate) -> bool {
        let kind = update.kind();

        let applied = self.state.send_if_modified(|state| {
            let last = match kind {
                FetchKind::Snapshot => state.snapshot_seq,
                FetchKind::Aggregate => state.aggregate_seq,
                FetchKind::Completed => state.completed_seq,
            };
            if seq <= last {
                return false;
            }

            match update {
                StateUpdate::Snapshot(snapshot) => {
                    state.snapshot = snapshot;
                    state.snapshot_seq = seq;
                    state.last_refresh = Some(Utc::now());
                }
                StateUpdate::Aggregate(aggregate) => {
                    state.aggregate = aggregate;
                    state.aggregate_seq = seq;
                }
                StateUpdate::Completed(completed) => {
                    state.completed = completed;
                    state.completed_seq = seq;
                }
            }
            true
        });

        if !applied {
            debug!("Discarded stale {:?} update with seq {}", kind, seq);
        }
        applied
    }

    pub fn read(&self) -> CachedState {
        self.state.borrow().clone()
    }

    /// Returns whether the flag changed. The cached data is left alone.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            true
        });

        if changed {
            info!("Queue service is now {}", if online { "online" } else { "offline" });
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    pub fn subscribe(&self) -> watch::Receiver<CachedState> {
        self.state.subscribe()
    }
}
