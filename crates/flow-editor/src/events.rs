//! Editor events and notifications
//!
//! [`FlowEvent`] is the closed set of intents the UI can send to the
//! editor. [`FlowNotification`] is what the editor reports back on its
//! message bus, through an [`EventSink`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::types::{Action, ActionDescriptor, Connection, DataShape, Flow, Step, StepKind, StringMap};

/// Editing intents, addressed by position within the current flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    /// Marker that a fresh document replaced the old one
    DocumentUpdated,

    /// Insert a blank step after `position`
    InsertStep { position: usize },

    /// Insert a data mapper before `position`
    InsertDataMapperStep { position: usize },

    /// Insert an endpoint waiting for a connection after `position`
    InsertConnectionStep { position: usize },

    /// Remove the step at `position`; a split takes its aggregate with it
    #[serde(rename_all = "camelCase")]
    RemoveStep {
        position: usize,
        #[serde(default)]
        skip_reconcile: bool,
    },

    #[serde(rename_all = "camelCase")]
    SetStep {
        position: usize,
        step: Step,
        #[serde(default)]
        skip_reconcile: bool,
    },

    /// Merge metadata into the step at `position`, creating it if missing
    #[serde(rename_all = "camelCase")]
    SetMetadata {
        position: usize,
        metadata: StringMap,
        #[serde(default)]
        skip_reconcile: bool,
    },

    /// Save the step's configured properties and mark it configured
    SetProperties {
        position: usize,
        properties: Map<String, Value>,
    },

    #[serde(rename_all = "camelCase")]
    SetAction {
        position: usize,
        action: Action,
        #[serde(default)]
        step_kind: Option<StepKind>,
    },

    SetDescriptor {
        position: usize,
        descriptor: ActionDescriptor,
    },

    #[serde(rename_all = "camelCase")]
    SetDataShape {
        position: usize,
        shape: DataShape,
        is_input: bool,
    },

    /// Replace the step at `position` with an endpoint for `connection`
    SetConnection {
        position: usize,
        connection: Connection,
    },

    /// Set a top-level integration field by its wire name
    SetProperty { key: String, value: Value },

    AddFlow { flow: Flow },

    #[serde(rename_all = "camelCase")]
    RemoveFlow { flow_id: String },

    /// Save, and deploy afterwards when `publish` is set
    Save {
        #[serde(default)]
        publish: bool,
    },
}

impl FlowEvent {
    /// Event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::DocumentUpdated => "DocumentUpdated",
            Self::InsertStep { .. } => "InsertStep",
            Self::InsertDataMapperStep { .. } => "InsertDataMapperStep",
            Self::InsertConnectionStep { .. } => "InsertConnectionStep",
            Self::RemoveStep { .. } => "RemoveStep",
            Self::SetStep { .. } => "SetStep",
            Self::SetMetadata { .. } => "SetMetadata",
            Self::SetProperties { .. } => "SetProperties",
            Self::SetAction { .. } => "SetAction",
            Self::SetDescriptor { .. } => "SetDescriptor",
            Self::SetDataShape { .. } => "SetDataShape",
            Self::SetConnection { .. } => "SetConnection",
            Self::SetProperty { .. } => "SetProperty",
            Self::AddFlow { .. } => "AddFlow",
            Self::RemoveFlow { .. } => "RemoveFlow",
            Self::Save { .. } => "Save",
        }
    }
}

/// Notifications published on the editor's message bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowNotification {
    /// A fresh document replaced the held one
    #[serde(rename_all = "camelCase")]
    DocumentUpdated { integration_id: Option<String> },

    /// The steps of a flow changed
    #[serde(rename_all = "camelCase")]
    StepsChanged { flow_id: String, revision: u64 },

    #[serde(rename_all = "camelCase")]
    FlowAdded { flow_id: String },

    #[serde(rename_all = "camelCase")]
    FlowRemoved { flow_id: String },

    #[serde(rename_all = "camelCase")]
    Saved { integration_id: String, published: bool },

    SaveFailed { error: String },

    #[serde(rename_all = "camelCase")]
    Deployed { integration_id: String },

    /// Descriptor enrichment failed; steps were left as they were
    #[serde(rename_all = "camelCase")]
    ReconcileFailed { flow_id: String, error: String },

    /// Descriptor enrichment finished after newer edits and was dropped
    #[serde(rename_all = "camelCase")]
    ReconcileDiscarded {
        flow_id: String,
        started_at: u64,
        current: u64,
    },
}

/// Trait for publishing editor notifications
///
/// This abstracts over the transport so the editor can run inside any
/// host (UI binding, broadcast channel, test collector).
pub trait EventSink: Send + Sync {
    /// Send a notification
    ///
    /// Returns an error if the notification could not be delivered.
    fn send(&self, notification: FlowNotification) -> Result<(), EventError>;
}

/// Error when sending notifications fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// A no-op sink that discards all notifications
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _notification: FlowNotification) -> Result<(), EventError> {
        Ok(())
    }
}

/// A sink that collects notifications
///
/// Useful for tests that check which notifications were emitted.
pub struct VecEventSink {
    notifications: parking_lot::Mutex<Vec<FlowNotification>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            notifications: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected notifications
    pub fn notifications(&self) -> Vec<FlowNotification> {
        self.notifications.lock().clone()
    }

    /// Clear all collected notifications
    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, notification: FlowNotification) -> Result<(), EventError> {
        self.notifications.lock().push(notification);
        Ok(())
    }
}

/// A sink fanning notifications out to any number of subscribers
///
/// Having no subscribers is not an error; notifications are dropped.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<FlowNotification>,
}

impl BroadcastEventSink {
    /// Create a sink buffering up to `capacity` notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowNotification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventSink for BroadcastEventSink {
    fn send(&self, notification: FlowNotification) -> Result<(), EventError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(notification)
            .map(|_| ())
            .map_err(|_| EventError::channel_closed())
    }
}
