//! Credential checks with de-duplication and failure classification.

use reqwest::StatusCode;
use serde_json::json;
use std::fmt;

use super::client::{ModelClient, ModelConfig, ModelError};
use crate::settings::SettingsStore;

/// User-facing failure categories for a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    Timeout,
    Unauthorized,
    NotFound,
    Other(String),
}

impl CheckFailure {
    /// Classify an error by inspecting its text.
    pub fn classify(error_text: &str) -> Self {
        let lower = error_text.to_lowercase();
        if error_text.contains("ConnectTimeout") || lower.contains("timed out") {
            CheckFailure::Timeout
        } else if error_text.contains("401") {
            CheckFailure::Unauthorized
        } else if error_text.contains("404") {
            CheckFailure::NotFound
        } else {
            CheckFailure::Other(error_text.to_string())
        }
    }
}

impl From<&ModelError> for CheckFailure {
    fn from(error: &ModelError) -> Self {
        match error {
            ModelError::Timeout(_) | ModelError::Unreachable(_) => CheckFailure::Timeout,
            ModelError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                CheckFailure::Unauthorized
            }
            ModelError::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
                CheckFailure::NotFound
            }
            ModelError::Status { .. } => CheckFailure::Other(error.to_string()),
            ModelError::RequestFailed(_) | ModelError::Client(_) => {
                CheckFailure::classify(&error.to_string())
            }
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::Timeout => write!(f, "Connection Timed Out"),
            CheckFailure::Unauthorized => write!(f, "Authentication Failed (401)"),
            CheckFailure::NotFound => write!(f, "Model/Endpoint Not Found (404)"),
            CheckFailure::Other(text) => write!(f, "{}", text),
        }
    }
}

/// Result of a completed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Endpoint answered; settings were saved (`save_error` set if that failed).
    Verified { save_error: Option<String> },
    Failed(CheckFailure),
}

/// Tracks the last checked triple so unchanged fields are not re-checked.
#[derive(Debug, Clone, Default)]
pub struct CredentialValidator {
    last_checked: Option<ModelConfig>,
}

impl CredentialValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a blur on any of the API fields.
    ///
    /// Returns the config to check, or `None` when URL or model is empty or
    /// the triple matches the last one checked.
    pub fn on_blur(&mut self, base_url: &str, model: &str, api_key: &str) -> Option<ModelConfig> {
        let (base_url, model, api_key) = (base_url.trim(), model.trim(), api_key.trim());
        if base_url.is_empty() || model.is_empty() {
            return None;
        }

        let config = ModelConfig::new(base_url, model, api_key);
        if self.last_checked.as_ref() == Some(&config) {
            return None;
        }

        self.last_checked = Some(config.clone());
        Some(config)
    }
}

/// Probe the endpoint and persist the triple on success.
pub async fn check_credentials(config: ModelConfig, store: &SettingsStore) -> CheckOutcome {
    let result = match ModelClient::new(config.clone()) {
        Ok(client) => client.probe().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            tracing::info!(base_url = %config.base_url, model = %config.model_name, "API connection verified");
            let save_error = store
                .save(json!({
                    "base_url": config.base_url,
                    "model": config.model_name,
                    "api_key": config.api_key,
                }))
                .err()
                .map(|e| {
                    tracing::warn!("failed to save API settings: {}", e);
                    e.to_string()
                });
            CheckOutcome::Verified { save_error }
        }
        Err(e) => {
            tracing::warn!(base_url = %config.base_url, "API check failed: {}", e);
            CheckOutcome::Failed(CheckFailure::from(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SETTINGS_FILE_NAME;
    use crate::test_support::temp_dir;

    #[test]
    fn test_classify() {
        assert_eq!(
            CheckFailure::classify("error sending request: ConnectTimeout"),
            CheckFailure::Timeout
        );
        assert_eq!(CheckFailure::classify("operation timed out"), CheckFailure::Timeout);
        assert_eq!(
            CheckFailure::classify("API error 401 Unauthorized: bad key"),
            CheckFailure::Unauthorized
        );
        assert_eq!(
            CheckFailure::classify("API error 404 Not Found: no such model"),
            CheckFailure::NotFound
        );
        assert_eq!(
            CheckFailure::classify("API error 500: boom"),
            CheckFailure::Other("API error 500: boom".to_string())
        );
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(CheckFailure::Timeout.to_string(), "Connection Timed Out");
        assert_eq!(
            CheckFailure::Unauthorized.to_string(),
            "Authentication Failed (401)"
        );
        assert_eq!(
            CheckFailure::NotFound.to_string(),
            "Model/Endpoint Not Found (404)"
        );
    }

    #[test]
    fn test_model_errors_classify() {
        assert_eq!(CheckFailure::from(&ModelError::Timeout(5)), CheckFailure::Timeout);
        assert_eq!(
            CheckFailure::from(&ModelError::Unreachable("http://x".into())),
            CheckFailure::Timeout
        );
        assert_eq!(
            CheckFailure::from(&ModelError::Status {
                status: StatusCode::UNAUTHORIZED,
                body: String::new(),
            }),
            CheckFailure::Unauthorized
        );
        assert_eq!(
            CheckFailure::from(&ModelError::Status {
                status: StatusCode::NOT_FOUND,
                body: "model not found".into(),
            }),
            CheckFailure::NotFound
        );
    }

    #[test]
    fn test_model_errors_classify_by_variant_not_text() {
        let unreachable = ModelError::Unreachable("http://127.0.0.1:1/v1".into());
        assert!(!unreachable.to_string().contains("ConnectTimeout"));
        assert_eq!(CheckFailure::from(&unreachable), CheckFailure::Timeout);

        // A 500 whose body happens to mention 401 is still a server error.
        let server_error = ModelError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "upstream said 401".into(),
        };
        assert_eq!(
            CheckFailure::from(&server_error),
            CheckFailure::Other(server_error.to_string())
        );
    }

    #[test]
    fn test_repeated_blurs_check_once() {
        let mut validator = CredentialValidator::new();
        assert!(validator.on_blur("http://x/v1", "m", "k").is_some());
        assert!(validator.on_blur("http://x/v1", "m", "k").is_none());
        assert!(validator.on_blur(" http://x/v1 ", "m", "k").is_none());
        assert!(validator.on_blur("http://x/v1", "m", "k2").is_some());
    }

    #[test]
    fn test_empty_url_or_model_skips_check() {
        let mut validator = CredentialValidator::new();
        assert!(validator.on_blur("", "m", "k").is_none());
        assert!(validator.on_blur("http://x/v1", "  ", "k").is_none());
        // An empty key is allowed.
        assert!(validator.on_blur("http://x/v1", "m", "").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_times_out_without_saving() {
        let store = SettingsStore::new(temp_dir().join(SETTINGS_FILE_NAME));
        let config = ModelConfig::new("http://127.0.0.1:1/v1", "autoglm-phone", "key");

        let outcome = check_credentials(config, &store).await;
        assert_eq!(outcome, CheckOutcome::Failed(CheckFailure::Timeout));
        assert!(!store.path().exists());
    }
}
