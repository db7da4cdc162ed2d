use crate::{config::BackendConfig, error::AppError};
use axum::http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the single configured backend.
///
/// Every call is one attempt; retries are the caller's problem (and nobody's,
/// per the health-check contract).
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            // No client-level timeout: streaming calls must be unbounded.
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            probe_timeout: Duration::from_secs(config.probe_timeout_seconds),
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
        }
    }

    pub fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    /// One probe attempt against the model-listing endpoint, returning the
    /// backend's status and body text.
    pub async fn probe_models(&self) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self
            .with_auth(self.client.get(self.models_url()))
            .timeout(self.probe_timeout)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Probe the backend's model-listing endpoint. Success iff HTTP 200;
    /// transport errors and timeouts map to `false`.
    pub async fn check_health(&self) -> bool {
        match self.probe_models().await {
            Ok((status, _)) => status == StatusCode::OK,
            Err(err) => {
                tracing::warn!(url = %self.models_url(), error = %err, "Backend health probe failed");
                false
            }
        }
    }

    /// POST a buffered chat completion and parse the backend's JSON body.
    /// The backend's HTTP status is passed through untouched, including
    /// non-2xx statuses with a JSON body.
    pub async fn forward_buffered(&self, body: &Value) -> Result<(StatusCode, Value), AppError> {
        let response = self
            .with_auth(self.client.post(self.chat_completions_url()))
            .header("Content-Type", "application/json")
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::BackendUnreachable(e.to_string()))?;

        let status = response.status();
        let json: Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse backend JSON");
            AppError::BackendBadResponse {
                status: StatusCode::BAD_GATEWAY,
                message: "Backend returned non-JSON response".to_string(),
            }
        })?;

        Ok((status, json))
    }

    /// POST a streaming chat completion with no timeout. Returns the raw
    /// response; status checks and byte relaying are the relay's job.
    pub async fn forward_streaming(&self, body: &Value) -> Result<reqwest::Response, AppError> {
        self.with_auth(self.client.post(self.chat_completions_url()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::BackendUnreachable(e.to_string()))
    }

    /// GET the backend's model listing, for proxying.
    pub async fn fetch_models(&self) -> Result<reqwest::Response, AppError> {
        self.with_auth(self.client.get(self.models_url()))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| AppError::BackendUnreachable(e.to_string()))
    }
}
