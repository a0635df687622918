//! Defaults and names shared by the adapter

/// Base URL used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

/// Request timeout used when none is configured
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variables read by [`crate::HttpAdapterConfig::from_env`]
pub mod env {
    pub const API_URL: &str = "FLOW_EDITOR_API_URL";
    pub const API_TIMEOUT_SECS: &str = "FLOW_EDITOR_API_TIMEOUT_SECS";
}

/// Resource paths relative to the base URL
pub mod paths {
    pub const INTEGRATIONS: &str = "integrations";
    pub const DEPLOYMENTS: &str = "deployments";
    pub const STEP_DESCRIPTORS: &str = "steps/descriptor";
}
