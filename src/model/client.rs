//! Minimal client for an OpenAI-compatible chat-completion endpoint.
//!
//! The controller never runs the model itself; it only sends a single
//! one-token request to prove the endpoint, model and key work together.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Timeout for the reachability probe.
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Key sent when the user leaves the API key empty.
pub const PLACEHOLDER_API_KEY: &str = "EMPTY";

/// Model client errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Could not connect to {0}")]
    Unreachable(String),
    #[error("API error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl ModelError {
    fn from_reqwest(error: reqwest::Error, url: &str) -> Self {
        if error.is_timeout() {
            ModelError::Timeout(PROBE_TIMEOUT_SECS)
        } else if error.is_connect() {
            ModelError::Unreachable(url.to_string())
        } else {
            ModelError::RequestFailed(error)
        }
    }
}

/// Endpoint configuration for the probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
}

impl ModelConfig {
    pub fn new(
        base_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_name: model_name.into(),
        }
    }

    /// Key to send, substituting the placeholder for an empty key.
    pub fn effective_api_key(&self) -> &str {
        if self.api_key.is_empty() {
            PLACEHOLDER_API_KEY
        } else {
            &self.api_key
        }
    }

    /// Full chat-completions URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Client that issues the one-token probe.
pub struct ModelClient {
    config: ModelConfig,
    client: Client,
}

impl ModelClient {
    /// Create a client with the fixed probe timeout.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .map_err(ModelError::Client)?;
        Ok(Self { config, client })
    }

    /// Request body for the probe.
    pub fn probe_body(&self) -> Value {
        json!({
            "model": self.config.model_name,
            "messages": [{ "role": "user", "content": "Hi" }],
            "max_tokens": 1,
            "stream": false,
        })
    }

    /// Send one minimal completion request. Never retried.
    pub async fn probe(&self) -> Result<(), ModelError> {
        let url = self.config.completions_url();

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.effective_api_key()),
            )
            .header("Content-Type", "application/json")
            .json(&self.probe_body())
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        Ok(())
    }
}
