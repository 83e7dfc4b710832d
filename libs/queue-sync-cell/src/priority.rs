use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{AppointmentCategory, Patient, PriorityLevel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub label: PriorityLevel,
    pub score: f64,
}

/// Maps an appointment category to its priority. An emergency flag always
/// wins over the stated category.
pub fn compute_priority(category: AppointmentCategory, emergency_override: bool) -> Priority {
    let category = if emergency_override {
        AppointmentCategory::Emergency
    } else {
        category
    };

    let (label, score) = match category {
        AppointmentCategory::GeneralCheckup => (PriorityLevel::VeryLow, 1.0),
        AppointmentCategory::Followup => (PriorityLevel::Low, 2.0),
        AppointmentCategory::Diagnostics => (PriorityLevel::Medium, 3.5),
        AppointmentCategory::ConsultationRoutine => (PriorityLevel::High, 4.0),
        AppointmentCategory::ConsultationUrgent => (PriorityLevel::VeryHigh, 5.0),
        AppointmentCategory::Emergency => (PriorityLevel::Critical, 7.0),
    };

    Priority { label, score }
}

/// Descending score, then earliest queue entry first. Entries without a
/// timestamp sort after those with one.
pub fn compare_queue_order(a: &Patient, b: &Patient) -> Ordering {
    b.priority_score()
        .total_cmp(&a.priority_score())
        .then_with(|| match (a.queued_at, b.queued_at) {
            (Some(a_at), Some(b_at)) => a_at.cmp(&b_at),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatientSource, PatientStatus};
    use chrono::{Duration, Utc};

    const ALL: [AppointmentCategory; 6] = [
        AppointmentCategory::GeneralCheckup,
        AppointmentCategory::Followup,
        AppointmentCategory::Diagnostics,
        AppointmentCategory::ConsultationRoutine,
        AppointmentCategory::ConsultationUrgent,
        AppointmentCategory::Emergency,
    ];

    #[test]
    fn table_values() {
        let expected = [
            (PriorityLevel::VeryLow, 1.0),
            (PriorityLevel::Low, 2.0),
            (PriorityLevel::Medium, 3.5),
            (PriorityLevel::High, 4.0),
            (PriorityLevel::VeryHigh, 5.0),
            (PriorityLevel::Critical, 7.0),
        ];

        for (category, (label, score)) in ALL.iter().zip(expected) {
            let priority = compute_priority(*category, false);
            assert_eq!(priority.label, label, "label for {:?}", category);
            assert_eq!(priority.score, score, "score for {:?}", category);
        }
    }

    #[test]
    fn emergency_flag_preempts_every_category() {
        let emergency = compute_priority(AppointmentCategory::Emergency, false);
        for category in ALL {
            assert_eq!(compute_priority(category, true), emergency);
        }
        assert_eq!(emergency.label, PriorityLevel::Critical);
        assert_eq!(emergency.score, 7.0);
    }

    #[test]
    fn equal_scores_keep_arrival_order() {
        let start = Utc::now();
        let entry = |id: i64, category: AppointmentCategory, offset: i64| Patient {
            id,
            name: format!("P{}", id),
            phone: None,
            email: None,
            age: None,
            gender: None,
            category: Some(category),
            priority: Some(compute_priority(category, false)),
            emergency: false,
            status: Some(PatientStatus::Waiting),
            queued_at: Some(start + Duration::seconds(offset)),
            completion_order: None,
            completed_at: None,
            symptoms: None,
            estimated_wait_minutes: None,
            source: PatientSource::Queue,
        };

        let mut entries = vec![
            entry(3, AppointmentCategory::Diagnostics, 3),
            entry(2, AppointmentCategory::ConsultationUrgent, 2),
            entry(1, AppointmentCategory::ConsultationUrgent, 1),
        ];
        entries.sort_by(compare_queue_order);

        let ids: Vec<i64> = entries.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
