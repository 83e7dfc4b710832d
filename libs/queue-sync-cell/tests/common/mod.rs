#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Notify;

use queue_sync_cell::*;
use shared_config::SyncConfig;

pub fn patient(id: i64, name: &str, category: AppointmentCategory) -> Patient {
    Patient {
        id,
        name: name.to_string(),
        phone: None,
        email: None,
        age: Some(40),
        gender: None,
        category: Some(category),
        priority: Some(compute_priority(category, false)),
        emergency: false,
        status: Some(PatientStatus::Waiting),
        queued_at: Some(Utc::now() - Duration::minutes(60 - id)),
        completion_order: None,
        completed_at: None,
        symptoms: None,
        estimated_wait_minutes: None,
        source: PatientSource::Queue,
    }
}

pub fn default_patients() -> Vec<Patient> {
    vec![
        patient(1, "Alice Walker", AppointmentCategory::GeneralCheckup),
        patient(2, "Bob Stone", AppointmentCategory::ConsultationUrgent),
        patient(3, "Carol Diaz", AppointmentCategory::Diagnostics),
    ]
}

/// In-memory scheduling service. Advancing removes the first entry, the
/// same one the snapshot reports as current.
#[derive(Default)]
pub struct FakeBackend {
    pub queue: Mutex<Vec<Patient>>,
    pub completed: Mutex<Vec<Patient>>,
    pub healthy: AtomicBool,
    pub fail_snapshot: AtomicBool,
    pub advance_error: Mutex<Option<QueueSyncError>>,
    pub reorder_accepted: AtomicBool,
    pub snapshot_gate: Mutex<Option<Arc<Notify>>>,
    pub advance_gate: Mutex<Option<Arc<Notify>>>,
    pub last_booking: Mutex<Option<BookingRequest>>,
    pub probe_calls: AtomicUsize,
    pub snapshot_calls: AtomicUsize,
    pub aggregate_calls: AtomicUsize,
    pub completed_calls: AtomicUsize,
    pub advance_calls: AtomicUsize,
    pub reorder_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn with_queue(patients: Vec<Patient>) -> Arc<Self> {
        let backend = Self::default();
        *backend.queue.lock().unwrap() = patients;
        backend.healthy.store(true, Ordering::SeqCst);
        backend.reorder_accepted.store(true, Ordering::SeqCst);
        Arc::new(backend)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn gate_snapshots(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.snapshot_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_advances(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.advance_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueBackend for FakeBackend {
    async fn probe_health(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.healthy.load(Ordering::SeqCst)
    }

    async fn fetch_queue_snapshot(&self) -> Result<QueueSnapshot, QueueSyncError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);

        // Answered now, delivered whenever the gate opens.
        let entries = self.queue.lock().unwrap().clone();

        let gate = self.snapshot_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_snapshot.load(Ordering::SeqCst) {
            return Err(QueueSyncError::Network("connection refused".to_string()));
        }

        Ok(QueueSnapshot::from_entries(entries, true, Some(Utc::now())))
    }

    async fn fetch_admin_aggregate(&self) -> Result<AdminAggregate, QueueSyncError> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        let queue = self.queue.lock().unwrap();
        let completed = self.completed.lock().unwrap();
        Ok(AdminAggregate {
            total_patients: (queue.len() + completed.len()) as u64,
            waiting_patients: queue.len().saturating_sub(1) as u64,
            emergency_cases: queue.iter().filter(|p| p.emergency).count() as u64,
            emergency_in_queue: queue.iter().filter(|p| p.emergency).count() as u64,
            total_completed: completed.len() as u64,
            current_queue_size: queue.len() as u64,
        })
    }

    async fn fetch_completed_patients(&self) -> Result<Vec<Patient>, QueueSyncError> {
        self.completed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.completed.lock().unwrap().clone())
    }

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, QueueSyncError> {
        Ok(vec![Doctor {
            id: 1,
            name: "Dr. Smith".to_string(),
            specialty: Some("Cardiology".to_string()),
            availability: Some("Available".to_string()),
            rating: Some(4.8),
        }])
    }

    async fn fetch_public_patients(&self) -> Result<Vec<Patient>, QueueSyncError> {
        Err(QueueSyncError::Network("public listing unavailable".to_string()))
    }

    async fn fetch_authenticated_patients(&self) -> Result<Vec<Patient>, QueueSyncError> {
        Err(QueueSyncError::Auth("No session credential".to_string()))
    }

    async fn trigger_reorder(&self) -> Result<ReorderOutcome, QueueSyncError> {
        self.reorder_calls.fetch_add(1, Ordering::SeqCst);
        let size = self.queue.lock().unwrap().len();

        if self.reorder_accepted.load(Ordering::SeqCst) && size > 0 {
            Ok(ReorderOutcome {
                accepted: true,
                message: "Queue reordered using RL optimization".to_string(),
                new_size: Some(size),
            })
        } else {
            Ok(ReorderOutcome {
                accepted: false,
                message: "Queue is empty".to_string(),
                new_size: None,
            })
        }
    }

    async fn advance_queue(&self) -> Result<AdvanceOutcome, QueueSyncError> {
        self.advance_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.advance_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.advance_error.lock().unwrap().clone() {
            return Err(error);
        }

        let mut queue = self.queue.lock().unwrap();
        if queue.is_empty() {
            return Err(QueueSyncError::Rejected("Queue is empty".to_string()));
        }

        let mut done = queue.remove(0);
        let mut completed = self.completed.lock().unwrap();
        done.status = Some(PatientStatus::Completed);
        done.completion_order = Some(completed.len() as u32 + 1);
        done.completed_at = Some(Utc::now());
        let name = done.name.clone();
        completed.push(done);

        Ok(AdvanceOutcome {
            message: "RL model optimization".to_string(),
            completed_patient: Some(name),
            remaining: Some(queue.len()),
        })
    }

    async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation, QueueSyncError> {
        *self.last_booking.lock().unwrap() = Some(request.clone());

        let mut queue = self.queue.lock().unwrap();
        let id = 100 + queue.len() as i64;
        let mut entry = patient(id, &request.patient_name, request.category);
        entry.emergency = request.emergency;
        entry.priority = Some(compute_priority(request.category, request.emergency));
        entry.queued_at = Some(Utc::now());
        queue.push(entry);

        Ok(BookingConfirmation {
            patient_id: Some(id),
            message: format!("Appointment booked successfully for {}", request.patient_name),
            queue_position: queue.len() as u32,
            estimated_wait_minutes: if request.emergency { 5 } else { 30 },
            queue_size: Some(queue.len()),
            emergency: request.emergency,
        })
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<QueueStore>,
    pub scheduler: Arc<SyncScheduler>,
    pub coordinator: Arc<ActionCoordinator>,
}

impl Harness {
    pub fn new(backend: Arc<FakeBackend>) -> Self {
        let store = Arc::new(QueueStore::new());
        let dyn_backend: Arc<dyn QueueBackend> = backend.clone();
        let scheduler = Arc::new(SyncScheduler::new(
            Arc::clone(&dyn_backend),
            Arc::clone(&store),
            SyncConfig::default(),
        ));
        let coordinator = Arc::new(ActionCoordinator::new(dyn_backend, Arc::clone(&scheduler)));

        Self {
            backend,
            store,
            scheduler,
            coordinator,
        }
    }
}

/// Lets spawned tasks run until `done` holds, without moving the clock.
pub async fn settle_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(done(), "condition not reached");
}
