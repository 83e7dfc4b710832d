use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::{AppConfig, SyncConfig};
use shared_remote::SchedulingClient;
use shared_utils::SessionCredentials;

use crate::error::QueueSyncError;
use crate::models::{
    AdminAggregate, AdvanceOutcome, BookingConfirmation, BookingRequest, Doctor, Patient,
    PatientSource, QueueSnapshot, ReorderOutcome,
};
use crate::priority::compute_priority;
use crate::services::wire::{
    RawAdminStatistics, RawAdvance, RawBooking, RawCompletedList, RawDirectoryPatient, RawDoctor,
    RawQueueSnapshot, RawReorder,
};

/// Every call the dashboard makes against the scheduling service.
///
/// Implementations convert all transport failures into `QueueSyncError` so
/// nothing above this trait sees a raw HTTP error.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Liveness. Never fails: any error or timeout is `false`.
    async fn probe_health(&self) -> bool;

    async fn fetch_queue_snapshot(&self) -> Result<QueueSnapshot, QueueSyncError>;

    async fn fetch_admin_aggregate(&self) -> Result<AdminAggregate, QueueSyncError>;

    async fn fetch_completed_patients(&self) -> Result<Vec<Patient>, QueueSyncError>;

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, QueueSyncError>;

    async fn fetch_public_patients(&self) -> Result<Vec<Patient>, QueueSyncError>;

    async fn fetch_authenticated_patients(&self) -> Result<Vec<Patient>, QueueSyncError>;

    async fn trigger_reorder(&self) -> Result<ReorderOutcome, QueueSyncError>;

    async fn advance_queue(&self) -> Result<AdvanceOutcome, QueueSyncError>;

    async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation, QueueSyncError>;

    /// Public listing, then the authenticated listing, then the patients of
    /// the last known snapshot. Each step runs only after the previous one
    /// failed; exhausting the chain yields an empty list.
    async fn fetch_patient_directory(&self, last_snapshot: &QueueSnapshot) -> Vec<Patient> {
        match self.fetch_public_patients().await {
            Ok(patients) => return patients,
            Err(e) => warn!("Public patient listing failed, trying authenticated listing: {}", e),
        }

        match self.fetch_authenticated_patients().await {
            Ok(patients) => return patients,
            Err(e) => warn!("Authenticated patient listing failed, using cached queue: {}", e),
        }

        last_snapshot
            .entries
            .iter()
            .cloned()
            .map(|mut patient| {
                patient.source = PatientSource::CachedQueue;
                patient
            })
            .collect()
    }
}

/// `QueueBackend` over HTTP.
pub struct HttpQueueGateway {
    client: SchedulingClient,
    credentials: Arc<SessionCredentials>,
    timeouts: SyncConfig,
}

impl HttpQueueGateway {
    pub fn new(config: &AppConfig, credentials: Arc<SessionCredentials>) -> Self {
        Self {
            client: SchedulingClient::new(config),
            credentials,
            timeouts: config.sync_config(),
        }
    }

    async fn call<T>(&self, method: Method, path: &str, body: Option<Value>,
                     timeout: Duration, mutating: bool)
                     -> Result<T, QueueSyncError>
    where T: DeserializeOwned {
        let token = self.credentials.bearer().await;
        self.client
            .request(method, path, token.as_deref(), body, timeout)
            .await
            .map_err(|e| QueueSyncError::from_remote(e, mutating))
    }

    async fn read<T: DeserializeOwned>(&self, path: &str) -> Result<T, QueueSyncError> {
        self.call(Method::GET, path, None, self.timeouts.snapshot_fetch_timeout, false).await
    }
}

#[async_trait]
impl QueueBackend for HttpQueueGateway {
    async fn probe_health(&self) -> bool {
        let result: Result<Value, _> = self
            .call(Method::GET, "/health", None, self.timeouts.health_probe_timeout, false)
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }

    async fn fetch_queue_snapshot(&self) -> Result<QueueSnapshot, QueueSyncError> {
        let raw: RawQueueSnapshot = self.read("/queue/current").await?;
        Ok(raw.into_snapshot())
    }

    async fn fetch_admin_aggregate(&self) -> Result<AdminAggregate, QueueSyncError> {
        let raw: RawAdminStatistics = self.read("/admin/statistics").await?;
        Ok(raw.into())
    }

    async fn fetch_completed_patients(&self) -> Result<Vec<Patient>, QueueSyncError> {
        let raw: RawCompletedList = self.read("/completed_patients").await?;
        Ok(raw.into_patients())
    }

    async fn fetch_doctors(&self) -> Result<Vec<Doctor>, QueueSyncError> {
        let raw: Vec<RawDoctor> = self.read("/doctors").await?;
        Ok(raw.into_iter().map(Doctor::from).collect())
    }

    async fn fetch_public_patients(&self) -> Result<Vec<Patient>, QueueSyncError> {
        let raw: Vec<RawDirectoryPatient> = self.read("/patients/public").await?;
        Ok(raw
            .into_iter()
            .map(|p| p.into_patient(PatientSource::PublicDirectory))
            .collect())
    }

    async fn fetch_authenticated_patients(&self) -> Result<Vec<Patient>, QueueSyncError> {
        if self.credentials.bearer().await.is_none() {
            return Err(QueueSyncError::Auth("No session credential".to_string()));
        }

        let raw: Vec<RawDirectoryPatient> = self.read("/patients").await?;
        Ok(raw
            .into_iter()
            .map(|p| p.into_patient(PatientSource::AuthenticatedDirectory))
            .collect())
    }

    async fn trigger_reorder(&self) -> Result<ReorderOutcome, QueueSyncError> {
        let raw: RawReorder = self
            .call(Method::POST, "/queue/reorder_rl", None, self.timeouts.action_timeout, true)
            .await?;
        Ok(raw.into())
    }

    async fn advance_queue(&self) -> Result<AdvanceOutcome, QueueSyncError> {
        let raw: RawAdvance = self
            .call(Method::GET, "/next_patient", None, self.timeouts.action_timeout, true)
            .await?;
        Ok(raw.into())
    }

    async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation, QueueSyncError> {
        let priority = compute_priority(request.category, request.emergency);
        let body = json!({
            "patient_name": request.patient_name,
            "patient_email": request.patient_email.clone().unwrap_or_default(),
            "patient_phone": request.patient_phone.clone().unwrap_or_default(),
            "age": request.age,
            "gender": request.gender.clone().unwrap_or_else(|| "Not specified".to_string()),
            "appointment_type": request.category.as_wire(),
            "symptoms": request.symptoms.clone().unwrap_or_default(),
            "priority": priority.label.as_wire(),
            "priority_score": priority.score,
            "is_emergency": request.emergency,
            "preferred_doctor_id": request.preferred_doctor_id,
            "notes": request.notes.clone().unwrap_or_default(),
        });

        let raw: RawBooking = self
            .call(Method::POST, "/book_appointment_rl", Some(body), self.timeouts.action_timeout, true)
            .await?;

        let confirmation = BookingConfirmation::from(raw);
        info!(
            "Booking accepted for {} at queue position {}",
            request.patient_name, confirmation.queue_position
        );
        Ok(confirmation)
    }
}
