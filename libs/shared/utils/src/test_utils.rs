use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use shared_config::AppConfig;

pub struct TestConfig {
    pub queue_service_url: String,
    pub queue_service_token: Option<String>,
    pub offline_sample_view: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            queue_service_url: "http://localhost:8000".to_string(),
            queue_service_token: None,
            offline_sample_view: false,
        }
    }
}

impl TestConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            queue_service_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            queue_service_url: self.queue_service_url.clone(),
            queue_service_token: self.queue_service_token.clone(),
            health_probe_timeout_seconds: 1,
            snapshot_fetch_timeout_seconds: 2,
            action_timeout_seconds: 2,
            offline_sample_view: self.offline_sample_view,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A queue entry as the remote service serializes it.
pub struct TestQueueEntry {
    pub patient_id: i64,
    pub name: String,
    pub appointment_type: String,
    pub priority: String,
    pub priority_score: f64,
    pub is_emergency: bool,
    pub queued_at: DateTime<Utc>,
}

impl TestQueueEntry {
    pub fn new(patient_id: i64, name: &str, appointment_type: &str, priority: &str, priority_score: f64) -> Self {
        Self {
            patient_id,
            name: name.to_string(),
            appointment_type: appointment_type.to_string(),
            priority: priority.to_string(),
            priority_score,
            is_emergency: appointment_type == "emergency",
            queued_at: Utc::now() - Duration::minutes(60 - patient_id),
        }
    }

    pub fn emergency(mut self) -> Self {
        self.is_emergency = true;
        self
    }

    pub fn queued_at(mut self, at: DateTime<Utc>) -> Self {
        self.queued_at = at;
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "patient_id": self.patient_id,
            "name": self.name,
            "age": 40,
            "gender": "female",
            "appointment_type": self.appointment_type,
            "priority": self.priority,
            "priority_score": self.priority_score,
            "is_emergency": self.is_emergency,
            "symptoms": "",
            "phone": "555-0100",
            "email": format!("patient{}@example.com", self.patient_id),
            "queue_timestamp": self.queued_at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "status": "waiting"
        })
    }
}

pub struct MockQueueResponses;

impl MockQueueResponses {
    pub fn health_response() -> Value {
        json!({
            "status": "healthy",
            "timestamp": "2024-01-01T00:00:00"
        })
    }

    pub fn queue_response(entries: &[TestQueueEntry]) -> Value {
        let queue: Vec<Value> = entries.iter().map(TestQueueEntry::to_json).collect();
        let waiting = entries.len().saturating_sub(1);
        let average_wait = if entries.len() > 1 { "15 minutes" } else { "0 minutes" };
        json!({
            "queue": queue,
            "total_patients": waiting,
            "average_wait_time": average_wait,
            "rl_optimized": true,
            "last_updated": "2024-01-01T10:00:00.000000"
        })
    }

    pub fn default_queue() -> Vec<TestQueueEntry> {
        vec![
            TestQueueEntry::new(1, "Alice Walker", "general_checkup", "very_low", 1.0),
            TestQueueEntry::new(2, "Bob Stone", "consultation_urgent", "very_high", 5.0),
            TestQueueEntry::new(3, "Carol Diaz", "diagnostics", "medium", 3.5),
        ]
    }

    pub fn admin_statistics_response(total: u64, waiting: u64, emergency: u64) -> Value {
        json!({
            "total_patients": total,
            "waiting_patients": waiting,
            "emergency_cases_total": emergency,
            "emergency_in_queue": emergency,
            "emergency_completed": 0,
            "total_completed": 0,
            "current_queue_size": waiting + 1,
            "timestamp": "2024-01-01T10:00:00"
        })
    }

    pub fn public_patients_response() -> Value {
        json!([
            {
                "id": 11,
                "name": "Public Patient",
                "email": "public@example.com",
                "phone": "555-0111",
                "age": 52,
                "gender": "male",
                "risk_level": "low",
                "status": "active",
                "conditions": "None"
            }
        ])
    }

    pub fn authenticated_patients_response() -> Value {
        json!([
            {
                "id": 21,
                "name": "Protected Patient",
                "email": "protected@example.com",
                "phone": "555-0121",
                "date_of_birth": "1980-05-04",
                "gender": "female",
                "status": "active",
                "risk_level": "medium",
                "conditions": "hypertension",
                "notes": null
            }
        ])
    }

    pub fn completed_patients_response(names: &[&str]) -> Value {
        let completed: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                json!({
                    "patient_id": 100 + index as i64,
                    "id": 100 + index as i64,
                    "name": name,
                    "appointment_type": "followup",
                    "priority": "low",
                    "priority_score": 2.0,
                    "is_emergency": false,
                    "queue_timestamp": "2024-01-01T08:00:00",
                    "status": "waiting",
                    "completed_at": "2024-01-01T09:00:00",
                    "completion_order": index + 1
                })
            })
            .collect();
        json!({
            "completed_patients": completed,
            "total_completed": names.len(),
            "last_updated": "2024-01-01T10:00:00"
        })
    }

    pub fn doctors_response() -> Value {
        json!([
            {
                "id": 1,
                "name": "Dr. Smith",
                "specialty": "Cardiology",
                "availability": "Available",
                "rating": 4.8
            },
            {
                "id": 2,
                "name": "Dr. Johnson",
                "specialty": "Pediatrics"
            }
        ])
    }

    pub fn reorder_response(reordered: bool, size: usize) -> Value {
        if reordered {
            json!({
                "message": "Queue reordered using RL optimization",
                "reordered": true,
                "new_queue_size": size,
                "optimization_method": "RL-based"
            })
        } else {
            json!({
                "message": "Queue is empty",
                "reordered": false
            })
        }
    }

    pub fn next_patient_response(name: &str, remaining: usize) -> Value {
        json!({
            "assigned_patient": {
                "id": 1,
                "name": name,
                "appointment_type": "general_checkup",
                "score": 1.0
            },
            "rl_decision": true,
            "selection_reason": "RL model optimization",
            "remaining_queue_size": remaining
        })
    }

    pub fn booking_response(name: &str, position: u32, wait: u32) -> Value {
        json!({
            "message": format!("Appointment booked successfully for {}", name),
            "patient_id": 42,
            "queue_position": position,
            "estimated_wait_minutes": wait,
            "appointment_type": "diagnostics",
            "is_emergency": false,
            "rl_optimized": true,
            "is_first_appointment": position == 1,
            "queue_size": position,
            "email_sent": false
        })
    }

    pub fn error_response(detail: &str) -> Value {
        json!({
            "detail": detail
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_url("http://127.0.0.1:9999").to_app_config();

        assert_eq!(config.queue_service_url, "http://127.0.0.1:9999");
        assert!(config.queue_service_token.is_none());
        assert_eq!(config.health_probe_timeout_seconds, 1);
    }

    #[test]
    fn queue_response_counts_waiting_patients() {
        let response = MockQueueResponses::queue_response(&MockQueueResponses::default_queue());
        assert_eq!(response["queue"].as_array().map(Vec::len), Some(3));
        assert_eq!(response["total_patients"], 2);
    }
}
