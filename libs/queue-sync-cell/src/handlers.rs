use std::sync::Arc;

use axum::{
    extract::State,
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::SessionCredentials;

use crate::models::BookingRequest;
use crate::services::{
    dashboard_view, ActionCoordinator, HttpQueueGateway, QueueBackend, QueueStore, SyncScheduler,
};

/// Everything the dashboard routes share. Built once at startup.
pub struct DashboardState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn QueueBackend>,
    pub store: Arc<QueueStore>,
    pub scheduler: Arc<SyncScheduler>,
    pub coordinator: Arc<ActionCoordinator>,
    pub credentials: Arc<SessionCredentials>,
}

impl DashboardState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let credentials = Arc::new(SessionCredentials::from_config(&config));
        let backend: Arc<dyn QueueBackend> = Arc::new(HttpQueueGateway::new(&config, Arc::clone(&credentials)));
        Self::with_backend(config, backend, credentials)
    }

    pub fn with_backend(
        config: Arc<AppConfig>,
        backend: Arc<dyn QueueBackend>,
        credentials: Arc<SessionCredentials>,
    ) -> Self {
        let store = Arc::new(QueueStore::new());
        let scheduler = Arc::new(SyncScheduler::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            config.sync_config(),
        ));
        let coordinator = Arc::new(ActionCoordinator::new(Arc::clone(&backend), Arc::clone(&scheduler)));

        Self {
            config,
            backend,
            store,
            scheduler,
            coordinator,
            credentials,
        }
    }
}

pub async fn service_status(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let cached = state.store.read();
    let credential = state.credentials.status().await;

    Json(json!({
        "online": cached.online,
        "action_in_progress": state.coordinator.is_busy(),
        "apply_sequence": cached.apply_sequence(),
        "last_refresh": cached.last_refresh,
        "queue_service_configured": state.config.is_configured(),
        "session": {
            "present": credential.present,
            "issued_at": credential.issued_at,
            "expires_in_seconds": credential.expires_in_seconds
        },
        "timestamp": Utc::now()
    }))
}

/// Current dashboard view from the cache. Never calls the backend.
pub async fn get_queue_view(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let view = dashboard_view(&state.store.read(), state.config.offline_sample_view);
    Json(json!(view))
}

pub async fn refresh_queue(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    debug!("Manual refresh requested");
    let online = state.scheduler.probe_health().await;
    let report = if online { Some(state.scheduler.resync().await) } else { None };
    let view = dashboard_view(&state.store.read(), state.config.offline_sample_view);

    Json(json!({
        "online": online,
        "refresh": report,
        "view": view
    }))
}

pub async fn advance_queue(State(state): State<Arc<DashboardState>>) -> Result<Json<Value>, AppError> {
    let report = state.coordinator.advance_queue().await?;
    let view = dashboard_view(&state.store.read(), state.config.offline_sample_view);

    Ok(Json(json!({
        "notice": report.notice,
        "resync": report.resync,
        "view": view
    })))
}

pub async fn reorder_queue(State(state): State<Arc<DashboardState>>) -> Result<Json<Value>, AppError> {
    let report = state.coordinator.trigger_reorder().await?;
    let view = dashboard_view(&state.store.read(), state.config.offline_sample_view);

    Ok(Json(json!({
        "notice": report.notice,
        "resync": report.resync,
        "view": view
    })))
}

pub async fn get_patient_directory(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let last_snapshot = state.store.read().snapshot;
    let patients = state.backend.fetch_patient_directory(&last_snapshot).await;

    Json(json!({
        "patients": patients,
        "total": patients.len()
    }))
}

/// Completed patients as last synced.
pub async fn get_completed_patients(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let cached = state.store.read();

    Json(json!({
        "completed_patients": cached.completed,
        "total_completed": cached.completed.len(),
        "online": cached.online
    }))
}

pub async fn get_doctors(State(state): State<Arc<DashboardState>>) -> Result<Json<Value>, AppError> {
    let doctors = state.backend.fetch_doctors().await?;
    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

pub async fn submit_booking(
    State(state): State<Arc<DashboardState>>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    if request.patient_name.trim().is_empty() {
        return Err(AppError::BadRequest("patient_name is required".to_string()));
    }
    if request.age > 150 {
        return Err(AppError::BadRequest("age is out of range".to_string()));
    }

    let report = state.coordinator.submit_booking(&request).await?;

    Ok(Json(json!({
        "booking": report.confirmation,
        "resync": report.resync
    })))
}

pub async fn store_session_token(
    State(state): State<Arc<DashboardState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Json<Value> {
    state.credentials.store(auth.token()).await;
    let status = state.credentials.status().await;
    info!("Session token updated");

    Json(json!({
        "stored": true,
        "expires_in_seconds": status.expires_in_seconds
    }))
}

pub async fn clear_session_token(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    state.credentials.clear().await;
    Json(json!({ "stored": false }))
}
