use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers::{
    advance_queue,
    clear_session_token,
    get_completed_patients,
    get_doctors,
    get_patient_directory,
    get_queue_view,
    refresh_queue,
    reorder_queue,
    service_status,
    store_session_token,
    submit_booking,
    DashboardState,
};

pub fn create_queue_router(state: Arc<DashboardState>) -> Router {
    let queue_routes = Router::new()
        .route("/", get(get_queue_view))
        .route("/refresh", post(refresh_queue))
        .route("/advance", post(advance_queue))
        .route("/reorder", post(reorder_queue));

    Router::new()
        .route("/", get(|| async { "Queue dashboard is running!" }))
        .route("/status", get(service_status))
        .nest("/queue", queue_routes)
        .route("/patients/directory", get(get_patient_directory))
        .route("/patients/completed", get(get_completed_patients))
        .route("/doctors", get(get_doctors))
        .route("/bookings", post(submit_booking))
        .route("/session/token", put(store_session_token).delete(clear_session_token))
        .with_state(state)
}
