use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use shared_config::AppConfig;

struct StoredToken {
    token: String,
    stored_at: Instant,
    issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStatus {
    pub present: bool,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_in_seconds: Option<u64>,
}

/// Session-scoped bearer storage. A token lives until it is replaced,
/// cleared, or its TTL runs out; an expired token is evicted on the next read.
pub struct SessionCredentials {
    slot: RwLock<Option<StoredToken>>,
    ttl: Duration,
}

impl SessionCredentials {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let initial = config.queue_service_token.clone().map(|token| StoredToken {
            token,
            stored_at: Instant::now(),
            issued_at: Utc::now(),
        });

        Self {
            slot: RwLock::new(initial),
            ttl: config.session_token_ttl(),
        }
    }

    pub async fn store(&self, token: impl Into<String>) {
        let mut slot = self.slot.write().await;
        *slot = Some(StoredToken {
            token: token.into(),
            stored_at: Instant::now(),
            issued_at: Utc::now(),
        });
        info!("Session bearer credential stored");
    }

    /// Current bearer token, or `None` when absent or expired.
    pub async fn bearer(&self) -> Option<String> {
        {
            let slot = self.slot.read().await;
            match slot.as_ref() {
                None => return None,
                Some(stored) if stored.stored_at.elapsed() < self.ttl => {
                    return Some(stored.token.clone());
                }
                Some(_) => {}
            }
        }

        let mut slot = self.slot.write().await;
        if slot.as_ref().is_some_and(|stored| stored.stored_at.elapsed() >= self.ttl) {
            debug!("Session bearer credential expired, evicting");
            *slot = None;
        }
        slot.as_ref().map(|stored| stored.token.clone())
    }

    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        if slot.take().is_some() {
            info!("Session bearer credential cleared");
        }
    }

    pub async fn status(&self) -> CredentialStatus {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            Some(stored) if stored.stored_at.elapsed() < self.ttl => CredentialStatus {
                present: true,
                issued_at: Some(stored.issued_at),
                expires_in_seconds: Some((self.ttl - stored.stored_at.elapsed()).as_secs()),
            },
            _ => CredentialStatus {
                present: false,
                issued_at: None,
                expires_in_seconds: None,
            },
        }
    }
}
