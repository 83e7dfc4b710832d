use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::priority::{compare_queue_order, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentCategory {
    #[serde(alias = "checkup")]
    GeneralCheckup,
    #[serde(alias = "follow_up")]
    Followup,
    Diagnostics,
    #[serde(alias = "consultation")]
    ConsultationRoutine,
    #[serde(alias = "urgent")]
    ConsultationUrgent,
    Emergency,
}

impl AppointmentCategory {
    /// Decodes a remote category name. Unknown names fall back to a general
    /// checkup, which is what the scheduling service itself assumes.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "general_checkup" | "checkup" => AppointmentCategory::GeneralCheckup,
            "followup" | "follow_up" => AppointmentCategory::Followup,
            "diagnostics" => AppointmentCategory::Diagnostics,
            "consultation_routine" | "consultation" => AppointmentCategory::ConsultationRoutine,
            "consultation_urgent" | "urgent" => AppointmentCategory::ConsultationUrgent,
            "emergency" => AppointmentCategory::Emergency,
            _ => AppointmentCategory::GeneralCheckup,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            AppointmentCategory::GeneralCheckup => "general_checkup",
            AppointmentCategory::Followup => "followup",
            AppointmentCategory::Diagnostics => "diagnostics",
            AppointmentCategory::ConsultationRoutine => "consultation_routine",
            AppointmentCategory::ConsultationUrgent => "consultation_urgent",
            AppointmentCategory::Emergency => "emergency",
        }
    }

    /// Expected consultation length in minutes.
    pub fn consultation_minutes(&self) -> u32 {
        match self {
            AppointmentCategory::GeneralCheckup => 15,
            AppointmentCategory::Followup => 12,
            AppointmentCategory::Diagnostics => 30,
            AppointmentCategory::ConsultationRoutine => 25,
            AppointmentCategory::ConsultationUrgent => 40,
            AppointmentCategory::Emergency => 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
    Critical,
}

impl PriorityLevel {
    pub fn as_wire(&self) -> &'static str {
        match self {
            PriorityLevel::VeryLow => "very_low",
            PriorityLevel::Low => "low",
            PriorityLevel::Medium => "medium",
            PriorityLevel::High => "high",
            PriorityLevel::VeryHigh => "very_high",
            PriorityLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Waiting,
    Current,
    Completed,
}

/// Where a patient record came from. Every remote shape is normalized into
/// `Patient` at the gateway, and this tag keeps the origin visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientSource {
    Queue,
    CompletedList,
    PublicDirectory,
    AuthenticatedDirectory,
    CachedQueue,
    OfflineSample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    /// Absent for directory listings, which carry no appointment.
    pub category: Option<AppointmentCategory>,
    pub priority: Option<Priority>,
    pub emergency: bool,
    pub status: Option<PatientStatus>,
    pub queued_at: Option<DateTime<Utc>>,
    pub completion_order: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
    pub symptoms: Option<String>,
    pub estimated_wait_minutes: Option<u32>,
    pub source: PatientSource,
}

impl Patient {
    pub fn priority_score(&self) -> f64 {
        self.priority.map(|p| p.score).unwrap_or(0.0)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, Some(PatientStatus::Waiting) | Some(PatientStatus::Current))
    }

    pub fn consultation_minutes(&self) -> u32 {
        self.category
            .unwrap_or(AppointmentCategory::GeneralCheckup)
            .consultation_minutes()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub entries: Vec<Patient>,
    /// Patients waiting behind the one currently being seen.
    pub total_waiting: usize,
    pub average_wait_minutes: u32,
    pub optimizer_active: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl QueueSnapshot {
    /// Builds a snapshot in display order.
    ///
    /// The remote service decides who is being seen: an entry it marks
    /// `current`, or else its first entry. Everyone else is ranked by
    /// descending priority score with first-in-first-out among equal scores.
    /// Completed entries are dropped, statuses are rewritten so only position 0
    /// is `current`, and per-entry waits are the cumulative consultation time
    /// of everyone ahead.
    pub fn from_entries(
        entries: Vec<Patient>,
        optimizer_active: bool,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        let mut active: Vec<Patient> = entries
            .into_iter()
            .filter(|p| p.status != Some(PatientStatus::Completed))
            .collect();

        let current_index = active
            .iter()
            .position(|p| p.status == Some(PatientStatus::Current))
            .unwrap_or(0);

        let mut ordered = Vec::with_capacity(active.len());
        if !active.is_empty() {
            ordered.push(active.remove(current_index));
        }
        active.sort_by(compare_queue_order);
        ordered.extend(active);

        let mut ahead_minutes = 0;
        for (position, patient) in ordered.iter_mut().enumerate() {
            patient.status = Some(if position == 0 {
                PatientStatus::Current
            } else {
                PatientStatus::Waiting
            });
            patient.estimated_wait_minutes = Some(ahead_minutes);
            ahead_minutes += patient.consultation_minutes();
        }

        let average_wait_minutes = ordered
            .get(1)
            .and_then(|next| next.estimated_wait_minutes)
            .unwrap_or(0);

        Self {
            total_waiting: ordered.len().saturating_sub(1),
            entries: ordered,
            average_wait_minutes,
            optimizer_active,
            last_updated,
        }
    }

    pub fn current(&self) -> Option<&Patient> {
        self.entries
            .first()
            .filter(|p| p.status == Some(PatientStatus::Current))
    }

    pub fn next(&self) -> Option<&Patient> {
        self.entries
            .iter()
            .find(|p| p.status == Some(PatientStatus::Waiting))
    }

    /// Waiting plus current patients.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|p| p.is_active()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dashboard counters. Fetched separately from the snapshot, so they may lag
/// or lead it briefly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAggregate {
    pub total_patients: u64,
    pub waiting_patients: u64,
    pub emergency_cases: u64,
    pub emergency_in_queue: u64,
    pub total_completed: u64,
    pub current_queue_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    pub snapshot: QueueSnapshot,
    pub aggregate: AdminAggregate,
    pub completed: Vec<Patient>,
    pub snapshot_seq: u64,
    pub aggregate_seq: u64,
    pub completed_seq: u64,
    pub online: bool,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl CachedState {
    /// Highest sequence number applied so far across all fetch kinds.
    pub fn apply_sequence(&self) -> u64 {
        self.snapshot_seq.max(self.aggregate_seq).max(self.completed_seq)
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot_seq > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialty: Option<String>,
    pub availability: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderOutcome {
    /// `false` is a normal answer, e.g. when the queue is too small to reorder.
    pub accepted: bool,
    pub message: String,
    pub new_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    pub message: String,
    pub completed_patient: Option<String>,
    pub remaining: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub age: u32,
    pub gender: Option<String>,
    pub category: AppointmentCategory,
    #[serde(default)]
    pub emergency: bool,
    pub symptoms: Option<String>,
    pub preferred_doctor_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub patient_id: Option<i64>,
    pub message: String,
    pub queue_position: u32,
    pub estimated_wait_minutes: u32,
    pub queue_size: Option<usize>,
    pub emergency: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
}

/// Transient, user-facing outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }
}
