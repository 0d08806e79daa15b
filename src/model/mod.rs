//! Model endpoint reachability checks.

mod client;
mod validator;

pub use client::{ModelClient, ModelConfig, ModelError, PLACEHOLDER_API_KEY, PROBE_TIMEOUT_SECS};
pub use validator::{check_credentials, CheckFailure, CheckOutcome, CredentialValidator};
