//! Service configuration.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};

/// Connection settings for one hosted mobile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service, e.g. `https://rentahome.azure-mobile.net`.
    pub service_url: String,
    /// Static application key sent with every request.
    pub application_key: String,
    /// Per-request timeout of the HTTP transport.
    pub request_timeout_secs: u64,
    /// Core threads of the worker pool that runs async operations.
    pub worker_threads: usize,
    /// Upper bound on concurrently running async operations.
    pub max_blocking_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            application_key: String::new(),
            request_timeout_secs: 60,
            worker_threads: 2,
            max_blocking_threads: 512,
        }
    }
}

impl ServiceConfig {
    pub fn new(service_url: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            application_key: application_key.into(),
            ..Default::default()
        }
    }

    /// Parses and validates JSON configuration text.
    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        let config: ServiceConfig = serde_json::from_str(json)
            .map_err(|e| ClientError::Config(format!("unreadable service config: {e}")))?;
        config.validate()
    }

    /// Checks required fields and normalizes the service URL.
    pub fn validate(mut self) -> ClientResult<Self> {
        let trimmed = self.service_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ClientError::Config("service_url is required".into()));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "service_url must be an http(s) URL, got '{trimmed}'"
            )));
        }
        self.service_url = trimmed.to_string();

        if self.application_key.trim().is_empty() {
            return Err(ClientError::Config("application_key is required".into()));
        }
        if self.worker_threads == 0 || self.max_blocking_threads == 0 {
            return Err(ClientError::Config("worker pool sizes must be non-zero".into()));
        }
        Ok(self)
    }
}
