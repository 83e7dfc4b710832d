use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub queue_service_url: String,
    pub queue_service_token: Option<String>,
    pub session_token_ttl_minutes: u64,
    pub health_probe_timeout_seconds: u64,
    pub snapshot_fetch_timeout_seconds: u64,
    pub action_timeout_seconds: u64,
    pub health_probe_interval_seconds: u64,
    pub snapshot_refresh_interval_seconds: u64,
    pub snapshot_refresh_offset_seconds: u64,
    pub offline_sample_view: bool,
    pub dashboard_bind_addr: String,
}

/// Timing knobs consumed by the sync scheduler and the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub health_probe_timeout: Duration,
    pub snapshot_fetch_timeout: Duration,
    pub action_timeout: Duration,
    pub health_probe_interval: Duration,
    pub snapshot_refresh_interval: Duration,
    pub snapshot_refresh_offset: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            health_probe_timeout: Duration::from_secs(5),
            snapshot_fetch_timeout: Duration::from_secs(10),
            action_timeout: Duration::from_secs(15),
            health_probe_interval: Duration::from_secs(30),
            snapshot_refresh_interval: Duration::from_secs(30),
            snapshot_refresh_offset: Duration::from_secs(15),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            queue_service_url: "http://localhost:8000".to_string(),
            queue_service_token: None,
            session_token_ttl_minutes: 30,
            health_probe_timeout_seconds: 5,
            snapshot_fetch_timeout_seconds: 10,
            action_timeout_seconds: 15,
            health_probe_interval_seconds: 30,
            snapshot_refresh_interval_seconds: 30,
            snapshot_refresh_offset_seconds: 15,
            offline_sample_view: false,
            dashboard_bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            queue_service_url: env::var("QUEUE_SERVICE_URL")
                .unwrap_or_else(|_| {
                    warn!("QUEUE_SERVICE_URL not set, using default");
                    defaults.queue_service_url.clone()
                }),
            queue_service_token: env::var("QUEUE_SERVICE_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            session_token_ttl_minutes: parse_var("SESSION_TOKEN_TTL_MINUTES", defaults.session_token_ttl_minutes),
            health_probe_timeout_seconds: parse_var("HEALTH_PROBE_TIMEOUT_SECONDS", defaults.health_probe_timeout_seconds),
            snapshot_fetch_timeout_seconds: parse_var("SNAPSHOT_FETCH_TIMEOUT_SECONDS", defaults.snapshot_fetch_timeout_seconds),
            action_timeout_seconds: parse_var("ACTION_TIMEOUT_SECONDS", defaults.action_timeout_seconds),
            health_probe_interval_seconds: parse_var("HEALTH_PROBE_INTERVAL_SECONDS", defaults.health_probe_interval_seconds),
            snapshot_refresh_interval_seconds: parse_var("SNAPSHOT_REFRESH_INTERVAL_SECONDS", defaults.snapshot_refresh_interval_seconds),
            snapshot_refresh_offset_seconds: parse_var("SNAPSHOT_REFRESH_OFFSET_SECONDS", defaults.snapshot_refresh_offset_seconds),
            offline_sample_view: parse_var("OFFLINE_SAMPLE_VIEW", defaults.offline_sample_view),
            dashboard_bind_addr: env::var("DASHBOARD_BIND_ADDR")
                .unwrap_or(defaults.dashboard_bind_addr),
        };

        if !config.is_configured() {
            warn!("Queue service URL is empty - dashboard will stay offline");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.queue_service_url.trim().is_empty()
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            health_probe_timeout: Duration::from_secs(self.health_probe_timeout_seconds),
            snapshot_fetch_timeout: Duration::from_secs(self.snapshot_fetch_timeout_seconds),
            action_timeout: Duration::from_secs(self.action_timeout_seconds),
            health_probe_interval: Duration::from_secs(self.health_probe_interval_seconds.max(1)),
            snapshot_refresh_interval: Duration::from_secs(self.snapshot_refresh_interval_seconds.max(1)),
            snapshot_refresh_offset: Duration::from_secs(self.snapshot_refresh_offset_seconds),
        }
    }

    pub fn session_token_ttl(&self) -> Duration {
        Duration::from_secs(self.session_token_ttl_minutes.saturating_mul(60))
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
