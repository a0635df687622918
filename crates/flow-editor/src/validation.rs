//! Flow validation
//!
//! Produces the list of problems that keep a flow from being publishable.
//! Validation errors are data, not failures: they are published to the UI,
//! which uses the position to send the user to the step that needs fixing.

use serde::{Deserialize, Serialize};

use crate::error::{FlowEditorError, Result};
use crate::query;
use crate::types::{IntegrationDocument, Step, StepKind};

/// A problem with a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FlowError {
    /// The integration has no name
    NoName,
    /// The start step is missing or has no connection
    NoStartConnection { position: usize },
    /// The end step is missing or has no connection
    NoFinishConnection { position: usize },
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoName => write!(f, "Integration has no name"),
            Self::NoStartConnection { position } => {
                write!(f, "No start connection at position {}", position)
            }
            Self::NoFinishConnection { position } => {
                write!(f, "No finish connection at position {}", position)
            }
        }
    }
}

/// Whether an anchor step is missing or still an empty placeholder
fn is_unconfigured_anchor(step: Option<&Step>) -> bool {
    match step {
        None => true,
        Some(step) => match step.step_kind {
            None => true,
            Some(StepKind::Endpoint) => step.connection.is_none(),
            Some(_) => false,
        },
    }
}

/// Validate a flow of the document
///
/// Returns errors in a fixed order: name, start, finish. Runs on empty
/// documents and unknown flows without failing; only an empty flow ID is
/// rejected.
pub fn validate_flow(doc: &IntegrationDocument, flow_id: &str) -> Result<Vec<FlowError>> {
    if flow_id.is_empty() {
        return Err(FlowEditorError::InvalidFlowId);
    }

    let mut errors = Vec::new();
    if doc.name.trim().is_empty() {
        errors.push(FlowError::NoName);
    }
    if is_unconfigured_anchor(query::get_start_step(doc, flow_id)) {
        errors.push(FlowError::NoStartConnection {
            position: query::get_first_position(doc, flow_id),
        });
    }
    if is_unconfigured_anchor(query::get_last_step(doc, flow_id)) {
        errors.push(FlowError::NoFinishConnection {
            position: query::get_last_position(doc, flow_id),
        });
    }
    Ok(errors)
}
