use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::error::QueueSyncError;
use crate::models::{BookingConfirmation, BookingRequest, Notice};
use crate::services::gateway::QueueBackend;
use crate::services::scheduler::{ResyncReport, SyncScheduler};

/// Single flag shared by every mutating queue action.
#[derive(Default)]
pub struct ActionLock {
    busy: AtomicBool,
}

impl ActionLock {
    pub fn try_acquire(&self) -> Option<ActionGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActionGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the lock when dropped, including on early return and panic.
pub struct ActionGuard<'a> {
    lock: &'a ActionLock,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
        debug!("Action lock released");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub notice: Notice,
    pub resync: ResyncReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReport {
    pub confirmation: BookingConfirmation,
    pub resync: ResyncReport,
}

pub struct ActionCoordinator {
    backend: Arc<dyn QueueBackend>,
    scheduler: Arc<SyncScheduler>,
    lock: ActionLock,
}

impl ActionCoordinator {
    pub fn new(backend: Arc<dyn QueueBackend>, scheduler: Arc<SyncScheduler>) -> Self {
        Self {
            backend,
            scheduler,
            lock: ActionLock::default(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock.is_held()
    }

    /// Completes the current patient and promotes the next one. The cache is
    /// resynced afterwards whether or not the remote call succeeded, and the
    /// lock is held until that resync finishes.
    #[instrument(skip(self))]
    pub async fn advance_queue(&self) -> Result<ActionReport, QueueSyncError> {
        let _guard = self.lock.try_acquire().ok_or(QueueSyncError::ActionInProgress)?;

        let cached = self.scheduler.store().read();
        let current = cached.snapshot.current().map(|p| p.name.clone());
        let next = cached.snapshot.next().map(|p| p.name.clone());

        let result = self.backend.advance_queue().await;
        let resync = self.scheduler.resync_after_action().await;

        let outcome = result.map_err(|e| {
            error!("Advancing the queue failed: {}", e);
            e
        })?;

        let message = match (outcome.completed_patient.or(current), next) {
            (Some(done), Some(next)) => format!("{} completed. Now serving {}.", done, next),
            (Some(done), None) => format!("{} completed. The queue is now empty.", done),
            (None, _) => outcome.message,
        };
        info!("{}", message);

        Ok(ActionReport {
            notice: Notice::success(message),
            resync,
        })
    }

    /// Asks the remote optimizer to re-rank the queue. A declined reorder is
    /// informational, not an error.
    #[instrument(skip(self))]
    pub async fn trigger_reorder(&self) -> Result<ActionReport, QueueSyncError> {
        let _guard = self.lock.try_acquire().ok_or(QueueSyncError::ActionInProgress)?;

        let result = self.backend.trigger_reorder().await;
        let resync = self.scheduler.resync_after_action().await;

        let outcome = result.map_err(|e| {
            error!("Queue reorder failed: {}", e);
            e
        })?;

        let notice = if outcome.accepted {
            info!("Queue reordered: {}", outcome.message);
            match outcome.new_size {
                Some(size) => Notice::success(format!("{} ({} patients)", outcome.message, size)),
                None => Notice::success(outcome.message),
            }
        } else {
            info!("Queue reorder declined: {}", outcome.message);
            Notice::info(outcome.message)
        };

        Ok(ActionReport { notice, resync })
    }

    /// Enqueues a new patient. Not covered by the action lock.
    #[instrument(skip(self, request), fields(category = ?request.category, emergency = request.emergency))]
    pub async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingReport, QueueSyncError> {
        let result = self.backend.submit_booking(request).await;
        let resync = self.scheduler.resync_after_action().await;

        let confirmation = result.map_err(|e| {
            error!("Booking for {} failed: {}", request.patient_name, e);
            e
        })?;

        Ok(BookingReport { confirmation, resync })
    }
}
