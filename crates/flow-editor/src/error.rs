//! Error types for the flow editor

use thiserror::Error;

/// Result type alias using FlowEditorError
pub type Result<T> = std::result::Result<T, FlowEditorError>;

/// Errors that can occur while editing an integration
#[derive(Debug, Error)]
pub enum FlowEditorError {
    /// A position outside the flow's step list was passed to a mutator
    #[error("Position {position} is out of range for flow '{flow_id}' ({len} steps)")]
    PositionOutOfRange {
        flow_id: String,
        position: usize,
        len: usize,
    },

    /// No flow with the given ID exists in the document
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    /// A flow identifier was empty
    #[error("Invalid flow ID specified")]
    InvalidFlowId,

    /// An editing event arrived before a current flow was selected
    #[error("No current flow selected")]
    NoCurrentFlow,

    /// An editing event arrived before any document was assigned
    #[error("No integration loaded")]
    NotLoaded,

    /// The persistence collaborator rejected a save
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The deploy collaborator failed after a successful save
    #[error("Deploy error: {0}")]
    Deploy(String),

    /// The step descriptor collaborator failed
    #[error("Descriptor fetch error: {0}")]
    Descriptor(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowEditorError {
    /// Create a persistence error with a message
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a descriptor fetch error with a message
    pub fn descriptor(msg: impl Into<String>) -> Self {
        Self::Descriptor(msg.into())
    }

    pub(crate) fn out_of_range(flow_id: &str, position: usize, len: usize) -> Self {
        Self::PositionOutOfRange {
            flow_id: flow_id.to_string(),
            position,
            len,
        }
    }
}
