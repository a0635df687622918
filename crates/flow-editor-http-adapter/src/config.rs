//! Adapter configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{env, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{HttpAdapterError, Result};

/// Where the REST store lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpAdapterConfig {
    /// Base URL, without a trailing slash
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for HttpAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl HttpAdapterConfig {
    /// Read the configuration from `FLOW_EDITOR_API_URL` and
    /// `FLOW_EDITOR_API_TIMEOUT_SECS`, falling back to the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup(env::API_URL).filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(url.trim());
        }
        if let Some(raw) = lookup(env::API_TIMEOUT_SECS) {
            config.request_timeout_secs = raw.trim().parse().map_err(|e| {
                HttpAdapterError::Config(format!("{} must be a number of seconds: {}", env::API_TIMEOUT_SECS, e))
            })?;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
