//! Error types for the HTTP adapter

use flow_editor::FlowEditorError;
use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, HttpAdapterError>;

/// Errors talking to the REST store
#[derive(Debug, Error)]
pub enum HttpAdapterError {
    /// The request could not be sent or the response not read
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not what the store promises
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The descriptor service did not return one step per step sent
    #[error("Descriptor service returned {actual} steps for {expected}")]
    DescriptorCount { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HttpAdapterError {
    /// Convert for a failed descriptor fetch
    pub fn into_descriptor(self) -> FlowEditorError {
        FlowEditorError::Descriptor(self.to_string())
    }

    /// Convert for a failed deployment
    pub fn into_deploy(self) -> FlowEditorError {
        FlowEditorError::Deploy(self.to_string())
    }
}

impl From<HttpAdapterError> for FlowEditorError {
    fn from(error: HttpAdapterError) -> Self {
        match error {
            HttpAdapterError::DescriptorCount { .. } => error.into_descriptor(),
            other => FlowEditorError::Persistence(other.to_string()),
        }
    }
}
