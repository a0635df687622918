//! Configuration types for the flow editor

use serde::{Deserialize, Serialize};

/// What to do with a reconciliation result when the flow changed while
/// the descriptor fetch was in flight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Drop results computed from an older revision of the document
    #[default]
    DiscardStale,
    /// Apply whatever arrives last, even over newer edits
    LastWriterWins,
}

/// Which flow becomes current when a document is first assigned
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurrentFlowPolicy {
    /// The first flow in the document
    #[default]
    FirstFlow,
    /// The first primary flow, falling back to the first flow
    PrimaryFlow,
}

/// Editor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub reconcile_policy: ReconcilePolicy,
    pub current_flow_policy: CurrentFlowPolicy,
    /// Give lazily created flows an endpoint placeholder at start and end
    pub placeholder_start_and_end: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            reconcile_policy: ReconcilePolicy::default(),
            current_flow_policy: CurrentFlowPolicy::default(),
            placeholder_start_and_end: true,
        }
    }
}
