//! HTTP backend for remote dispatch

use super::types::{DispatchRequest, DispatchResponse};
use super::{DispatchError, ReplyBackend};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// JSON-over-HTTP chat backend
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> DispatchError {
        match status.as_u16() {
            429 => DispatchError::rate_limit(format!("Rate limited: {body}")),
            400 => DispatchError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => DispatchError::server_error(format!("Server error: {body}")),
            _ => DispatchError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl ReplyBackend for HttpBackend {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    DispatchError::network(format!("Connection failed: {e}"))
                } else {
                    DispatchError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let mut parsed: DispatchResponse = serde_json::from_str(&body).map_err(|e| {
            DispatchError::invalid_response(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        if parsed.reply.trim().is_empty() {
            return Err(DispatchError::invalid_response("Response carried no reply text"));
        }

        // Blank redirects mean "no redirect"
        parsed.redirect = parsed
            .redirect
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(parsed)
    }
}
