use std::time::Duration;

use thiserror::Error;

use shared_models::AppError;
use shared_remote::RemoteError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueSyncError {
    #[error("Queue service unreachable: {0}")]
    Network(String),

    #[error("Queue service timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Unexpected response from queue service: {0}")]
    Decode(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Not authorized: {0}")]
    Auth(String),

    #[error("Another queue action is already in progress")]
    ActionInProgress,
}

impl QueueSyncError {
    /// Network and timeout failures mean the backend should be treated as offline.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, QueueSyncError::Network(_) | QueueSyncError::Timeout { .. })
    }

    /// Converts a transport failure at the gateway boundary. Client errors on
    /// mutating calls are the remote declining the action.
    pub fn from_remote(error: RemoteError, mutating: bool) -> Self {
        let auth = error.is_auth();
        let declined = mutating && error.is_client_error();

        match error {
            RemoteError::Timeout { timeout } => QueueSyncError::Timeout { timeout },
            RemoteError::Transport(msg) => QueueSyncError::Network(msg),
            RemoteError::Decode(msg) => QueueSyncError::Decode(msg),
            RemoteError::Status { detail, .. } if auth => QueueSyncError::Auth(detail),
            RemoteError::Status { detail, .. } if declined => QueueSyncError::Rejected(detail),
            RemoteError::Status { status, detail } => {
                QueueSyncError::Network(format!("status {}: {}", status, detail))
            }
        }
    }
}

impl From<QueueSyncError> for AppError {
    fn from(error: QueueSyncError) -> Self {
        match error {
            QueueSyncError::ActionInProgress => AppError::Conflict(error.to_string()),
            QueueSyncError::Rejected(detail) => AppError::Rejected(detail),
            QueueSyncError::Auth(detail) => AppError::Auth(detail),
            QueueSyncError::Network(_) | QueueSyncError::Timeout { .. } => {
                AppError::Unavailable(error.to_string())
            }
            QueueSyncError::Decode(_) => AppError::ExternalService(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_on_mutation_is_rejection() {
        let error = QueueSyncError::from_remote(
            RemoteError::Status { status: 400, detail: "Queue is empty".to_string() },
            true,
        );
        assert_eq!(error, QueueSyncError::Rejected("Queue is empty".to_string()));
    }

    #[test]
    fn client_error_on_read_is_not_rejection() {
        let error = QueueSyncError::from_remote(
            RemoteError::Status { status: 404, detail: "missing".to_string() },
            false,
        );
        assert!(error.is_connectivity());
    }

    #[test]
    fn forbidden_is_auth() {
        let error = QueueSyncError::from_remote(
            RemoteError::Status { status: 403, detail: "Not authorized".to_string() },
            false,
        );
        assert_eq!(error, QueueSyncError::Auth("Not authorized".to_string()));
    }

    #[test]
    fn sub_second_timeout_keeps_its_precision() {
        let error = QueueSyncError::from_remote(
            RemoteError::Timeout { timeout: Duration::from_millis(500) },
            false,
        );
        assert!(error.is_connectivity());
        assert_eq!(error.to_string(), "Queue service timed out after 500ms");
    }
}
