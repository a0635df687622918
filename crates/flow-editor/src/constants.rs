//! Well-known keys and identifiers
//!
//! Single source of truth for metadata keys and connector IDs the editor
//! interprets.

/// Keys and values in `Flow::metadata`
pub mod flow_metadata {
    /// Distinguishes conditional from default alternate flows
    pub const KIND: &str = "kind";
    /// ID of the step that spawned an alternate flow
    pub const STEP_ID: &str = "stepId";
    pub const CONDITIONAL: &str = "conditional";
    pub const DEFAULT: &str = "default";
}

/// Keys in step, connection and data shape metadata
pub mod metadata_keys {
    /// Set to "true" once a step's properties were saved
    pub const CONFIGURED: &str = "configured";
    /// Set to "true" on data shapes the user defined by hand
    pub const USER_DEFINED: &str = "userDefined";
    /// Hides a step or connection from the step picker
    pub const HIDE_FROM_STEP_SELECT: &str = "hide-from-step-select";
}

/// Connector IDs with special meaning
pub mod connectors {
    pub const API_PROVIDER: &str = "api-provider";
    /// Start connector of alternate flows
    pub const FLOW: &str = "flow";
    pub const LOG: &str = "log";
}
