use std::time::Duration;

use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote service returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::Status { status: 401 | 403, .. })
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, RemoteError::Status { status, .. } if (400..500).contains(status))
    }
}

/// HTTP transport to the remote scheduling service.
#[derive(Clone)]
pub struct SchedulingClient {
    client: Client,
    base_url: String,
}

impl SchedulingClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.queue_service_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Bearer token contains invalid header characters, sending unauthenticated"),
            }
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>,
                            timeout: Duration)
                            -> Result<T, RemoteError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers(auth_token))
            .timeout(timeout);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            debug!("Remote error ({}): {}", status, error_text);

            return Err(RemoteError::Status {
                status: status.as_u16(),
                detail: extract_detail(&error_text),
            });
        }

        let bytes = response.bytes().await
            .map_err(|e| classify(e, timeout))?;

        serde_json::from_slice::<T>(&bytes)
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout { timeout }
    } else if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else {
        RemoteError::Transport(error.to_string())
    }
}

/// Pulls the human-readable reason out of an error body, falling back to the raw text.
fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SchedulingClient {
        let config = AppConfig {
            queue_service_url: server.uri(),
            ..AppConfig::default()
        };
        SchedulingClient::new(&config)
    }

    #[test]
    fn detail_prefers_structured_fields() {
        assert_eq!(extract_detail(r#"{"detail": "Queue is empty"}"#), "Queue is empty");
        assert_eq!(extract_detail(r#"{"error": "nope"}"#), "nope");
        assert_eq!(extract_detail("plain failure\n"), "plain failure");
    }

    #[tokio::test]
    async fn attaches_bearer_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/patients"))
            .and(header("Authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Vec<Value>, _> = client
            .request(Method::GET, "/patients", Some("secret-token"), None, Duration::from_secs(2))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn maps_status_and_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/next_patient"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Queue is empty"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Value, _> = client
            .request(Method::GET, "/next_patient", None, None, Duration::from_secs(2))
            .await;

        assert_matches!(result, Err(RemoteError::Status { status: 400, ref detail }) if detail == "Queue is empty");
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy"}))
                .set_delay(Duration::from_millis(1500)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Value, _> = client
            .request(Method::GET, "/health", None, None, Duration::from_millis(200))
            .await;

        let error = result.unwrap_err();
        assert_matches!(error, RemoteError::Timeout { timeout } if timeout == Duration::from_millis(200));
        assert_eq!(error.to_string(), "Request timed out after 200ms");
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Value, _> = client
            .request(Method::GET, "/queue/current", None, None, Duration::from_secs(2))
            .await;

        assert_matches!(result, Err(RemoteError::Decode(_)));
    }
}
