use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    AdminAggregate, AppointmentCategory, CachedState, Patient, PatientSource, PatientStatus,
    QueueSnapshot,
};
use crate::priority::compute_priority;

pub const OFFLINE_SAMPLE_LABEL: &str = "Sample data: the queue service is offline and no live queue has been loaded";
const STALE_LABEL: &str = "Queue service offline: showing the last known queue, counts may be out of date";
const NOT_LOADED_LABEL: &str = "Queue not loaded yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Live,
    /// Last known data, or nothing yet. Counts are not authoritative.
    Stale,
    /// Placeholder data, never mixed with real data.
    OfflineSample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub mode: ViewMode,
    pub online: bool,
    pub authoritative: bool,
    pub label: Option<String>,
    pub snapshot: QueueSnapshot,
    pub aggregate: AdminAggregate,
    pub completed: Vec<Patient>,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Picks what the dashboard shows for `state`. The sample view is used only
/// when `allow_sample` is set, the service is offline and no real snapshot
/// was ever applied.
pub fn dashboard_view(state: &CachedState, allow_sample: bool) -> DashboardView {
    if state.online && state.has_snapshot() {
        return DashboardView {
            mode: ViewMode::Live,
            online: true,
            authoritative: true,
            label: None,
            snapshot: state.snapshot.clone(),
            aggregate: state.aggregate.clone(),
            completed: state.completed.clone(),
            last_refresh: state.last_refresh,
        };
    }

    if !state.online && !state.has_snapshot() && allow_sample {
        let snapshot = sample_snapshot();
        let aggregate = AdminAggregate {
            total_patients: snapshot.entries.len() as u64,
            waiting_patients: snapshot.total_waiting as u64,
            emergency_cases: snapshot.entries.iter().filter(|p| p.emergency).count() as u64,
            emergency_in_queue: snapshot.entries.iter().filter(|p| p.emergency).count() as u64,
            total_completed: 0,
            current_queue_size: snapshot.entries.len() as u64,
        };

        return DashboardView {
            mode: ViewMode::OfflineSample,
            online: false,
            authoritative: false,
            label: Some(OFFLINE_SAMPLE_LABEL.to_string()),
            snapshot,
            aggregate,
            completed: Vec::new(),
            last_refresh: None,
        };
    }

    let label = if state.has_snapshot() { STALE_LABEL } else { NOT_LOADED_LABEL };

    DashboardView {
        mode: ViewMode::Stale,
        online: state.online,
        authoritative: false,
        label: Some(label.to_string()),
        snapshot: state.snapshot.clone(),
        aggregate: state.aggregate.clone(),
        completed: state.completed.clone(),
        last_refresh: state.last_refresh,
    }
}

fn sample_patient(id: i64, name: &str, category: AppointmentCategory, emergency: bool) -> Patient {
    Patient {
        id,
        name: name.to_string(),
        phone: None,
        email: None,
        age: None,
        gender: None,
        category: Some(category),
        priority: Some(compute_priority(category, emergency)),
        emergency,
        status: Some(PatientStatus::Waiting),
        queued_at: None,
        completion_order: None,
        completed_at: None,
        symptoms: None,
        estimated_wait_minutes: None,
        source: PatientSource::OfflineSample,
    }
}

fn sample_snapshot() -> QueueSnapshot {
    QueueSnapshot::from_entries(
        vec![
            sample_patient(-1, "Sample Patient A", AppointmentCategory::ConsultationRoutine, false),
            sample_patient(-2, "Sample Patient B", AppointmentCategory::Followup, false),
            sample_patient(-3, "Sample Patient C", AppointmentCategory::Diagnostics, false),
            sample_patient(-4, "Sample Patient D", AppointmentCategory::GeneralCheckup, true),
        ],
        false,
        None,
    )
}
