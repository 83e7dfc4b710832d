//! Raw response shapes of the scheduling service and their normalization into
//! the crate's own types. Nothing outside the gateway sees these structs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{
    AdminAggregate, AdvanceOutcome, AppointmentCategory, BookingConfirmation, Doctor, Patient,
    PatientSource, PatientStatus, QueueSnapshot, ReorderOutcome,
};
use crate::priority::compute_priority;

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueueEntry {
    patient_id: Option<i64>,
    id: Option<i64>,
    name: Option<String>,
    age: Option<u32>,
    gender: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    appointment_type: Option<String>,
    priority_score: Option<f64>,
    #[serde(default)]
    is_emergency: bool,
    #[serde(default)]
    emergency: bool,
    symptoms: Option<String>,
    queue_timestamp: Option<String>,
    status: Option<String>,
    completed_at: Option<String>,
    completion_order: Option<u32>,
}

impl RawQueueEntry {
    pub(crate) fn into_patient(self, source: PatientSource) -> Patient {
        let category = self
            .appointment_type
            .as_deref()
            .map(AppointmentCategory::from_wire)
            .unwrap_or(AppointmentCategory::GeneralCheckup);
        let emergency = self.is_emergency || self.emergency || category == AppointmentCategory::Emergency;
        let priority = compute_priority(category, emergency);

        if let Some(remote_score) = self.priority_score {
            if (remote_score - priority.score).abs() > f64::EPSILON {
                debug!(
                    "Remote score {} for patient {:?} differs from local {}, using local",
                    remote_score, self.name, priority.score
                );
            }
        }

        let status = match self.status.as_deref() {
            Some("current") | Some("in_consultation") => Some(PatientStatus::Current),
            Some("completed") => Some(PatientStatus::Completed),
            _ if source == PatientSource::CompletedList => Some(PatientStatus::Completed),
            _ => Some(PatientStatus::Waiting),
        };

        Patient {
            id: self.patient_id.or(self.id).unwrap_or_default(),
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
            phone: non_empty(self.phone),
            email: non_empty(self.email),
            age: self.age,
            gender: non_empty(self.gender),
            category: Some(category),
            priority: Some(priority),
            emergency,
            status,
            queued_at: self.queue_timestamp.as_deref().and_then(parse_timestamp),
            completion_order: self.completion_order,
            completed_at: self.completed_at.as_deref().and_then(parse_timestamp),
            symptoms: non_empty(self.symptoms),
            estimated_wait_minutes: None,
            source,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueueSnapshot {
    #[serde(default)]
    queue: Vec<RawQueueEntry>,
    average_wait_time: Option<Value>,
    #[serde(default)]
    rl_optimized: bool,
    last_updated: Option<String>,
}

impl RawQueueSnapshot {
    pub(crate) fn into_snapshot(self) -> QueueSnapshot {
        let entries = self
            .queue
            .into_iter()
            .map(|entry| entry.into_patient(PatientSource::Queue))
            .collect();

        let mut snapshot = QueueSnapshot::from_entries(
            entries,
            self.rl_optimized,
            self.last_updated.as_deref().and_then(parse_timestamp),
        );

        if let Some(minutes) = self.average_wait_time.as_ref().and_then(parse_minutes) {
            snapshot.average_wait_minutes = minutes;
        }

        snapshot
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCompletedList {
    #[serde(default)]
    completed_patients: Vec<RawQueueEntry>,
}

impl RawCompletedList {
    pub(crate) fn into_patients(self) -> Vec<Patient> {
        let mut patients: Vec<Patient> = self
            .completed_patients
            .into_iter()
            .map(|entry| entry.into_patient(PatientSource::CompletedList))
            .collect();
        patients.sort_by_key(|p| p.completion_order.unwrap_or(u32::MAX));
        patients
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAdminStatistics {
    #[serde(default)]
    total_patients: u64,
    #[serde(default)]
    waiting_patients: u64,
    #[serde(default)]
    emergency_cases_total: u64,
    #[serde(default)]
    emergency_in_queue: u64,
    #[serde(default)]
    total_completed: u64,
    #[serde(default)]
    current_queue_size: u64,
}

impl From<RawAdminStatistics> for AdminAggregate {
    fn from(raw: RawAdminStatistics) -> Self {
        Self {
            total_patients: raw.total_patients,
            waiting_patients: raw.waiting_patients,
            emergency_cases: raw.emergency_cases_total,
            emergency_in_queue: raw.emergency_in_queue,
            total_completed: raw.total_completed,
            current_queue_size: raw.current_queue_size,
        }
    }
}

/// A row from either patient listing. The public listing sends `age`, the
/// protected one sends `date_of_birth`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDirectoryPatient {
    id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    age: Option<u32>,
    date_of_birth: Option<String>,
    gender: Option<String>,
    conditions: Option<String>,
}

impl RawDirectoryPatient {
    pub(crate) fn into_patient(self, source: PatientSource) -> Patient {
        let age = self
            .age
            .or_else(|| self.date_of_birth.as_deref().and_then(age_from_birth_date));

        Patient {
            id: self.id,
            name: self.name,
            phone: non_empty(self.phone),
            email: non_empty(self.email),
            age,
            gender: non_empty(self.gender),
            category: None,
            priority: None,
            emergency: false,
            status: None,
            queued_at: None,
            completion_order: None,
            completed_at: None,
            symptoms: non_empty(self.conditions).filter(|c| !c.eq_ignore_ascii_case("none")),
            estimated_wait_minutes: None,
            source,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDoctor {
    id: i64,
    name: String,
    specialty: Option<String>,
    availability: Option<String>,
    rating: Option<f64>,
}

impl From<RawDoctor> for Doctor {
    fn from(raw: RawDoctor) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            specialty: raw.specialty,
            availability: raw.availability,
            rating: raw.rating,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReorder {
    #[serde(default)]
    message: String,
    #[serde(default)]
    reordered: bool,
    new_queue_size: Option<usize>,
}

impl From<RawReorder> for ReorderOutcome {
    fn from(raw: RawReorder) -> Self {
        Self {
            accepted: raw.reordered,
            message: raw.message,
            new_size: raw.new_queue_size,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAssignedPatient {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAdvance {
    message: Option<String>,
    assigned_patient: Option<RawAssignedPatient>,
    selection_reason: Option<String>,
    remaining_queue_size: Option<usize>,
}

impl From<RawAdvance> for AdvanceOutcome {
    fn from(raw: RawAdvance) -> Self {
        let completed_patient = raw.assigned_patient.and_then(|p| p.name);
        let message = raw
            .message
            .or(raw.selection_reason)
            .unwrap_or_else(|| "Queue advanced".to_string());

        Self {
            message,
            completed_patient,
            remaining: raw.remaining_queue_size,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBooking {
    patient_id: Option<i64>,
    #[serde(default)]
    message: String,
    queue_position: u32,
    #[serde(default)]
    estimated_wait_minutes: u32,
    queue_size: Option<usize>,
    #[serde(default)]
    is_emergency: bool,
}

impl From<RawBooking> for BookingConfirmation {
    fn from(raw: RawBooking) -> Self {
        Self {
            patient_id: raw.patient_id,
            message: raw.message,
            queue_position: raw.queue_position,
            estimated_wait_minutes: raw.estimated_wait_minutes,
            queue_size: raw.queue_size,
            emergency: raw.is_emergency,
        }
    }
}

/// Accepts RFC 3339 and the service's naive ISO timestamps (read as UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Reads `"15 minutes"` or a bare number.
fn parse_minutes(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_f64().map(|m| m.max(0.0).round() as u32),
        Value::String(s) => s
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<f64>().ok())
            .map(|m| m.max(0.0).round() as u32),
        _ => None,
    }
}

fn age_from_birth_date(raw: &str) -> Option<u32> {
    let born = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Utc::now().date_naive().years_since(born)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
