//! Flow Editor - Integration flow authoring state machine
//!
//! This crate holds everything needed to edit an integration: an ordered
//! set of flows, each an ordered list of steps addressed by position. It
//! provides:
//!
//! - Read-only queries over a flow (`query`)
//! - Functional updates returning a new document (`mutator`)
//! - Publish-readiness checks (`validation`)
//! - An event-driven editor that reconciles data shapes and saves through
//!   injected collaborators (`controller`)
//!
//! # Architecture
//!
//! The editor never talks to a backend directly. It is handed:
//!
//! - `StepDescriptorFetcher`: enriches steps with resolved descriptors
//! - `PersistenceClient`: stores and deploys integrations
//! - `StepFactory`: creates blank steps (the built-in `StepCatalog` by default)
//! - `EventSink`: receives `FlowNotification`s
//!
//! Derived state (document, flows, current flow, validation errors, loaded,
//! dirty) is published on `tokio::sync::watch` channels.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flow_editor::{FlowEditor, FlowEvent, InMemoryIntegrationStore};
//!
//! let editor = FlowEditor::new(fetcher, Arc::new(InMemoryIntegrationStore::new()));
//! editor.set_document(document);
//! editor.dispatch(FlowEvent::InsertStep { position: 0 }).await?;
//! editor.save(false).await?;
//! ```

pub mod catalog;
pub mod channels;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod events;
pub mod memory;
pub mod mutator;
pub mod query;
pub mod services;
pub mod types;
pub mod validation;

// Re-export key types
pub use catalog::{StepCatalog, StepDefinition};
pub use channels::EditorChannels;
pub use config::{CurrentFlowPolicy, EditorConfig, ReconcilePolicy};
pub use controller::{FlowEditor, FlowEditorBuilder};
pub use error::{FlowEditorError, Result};
pub use events::{
    BroadcastEventSink, EventError, EventSink, FlowEvent, FlowNotification, NullEventSink,
    VecEventSink,
};
pub use memory::InMemoryIntegrationStore;
pub use query::{StepCandidate, StepPlacement};
pub use services::{PersistenceClient, StepDescriptorFetcher, StepFactory};
pub use types::{
    Action, ActionDescriptor, ActionPattern, Connection, Connector, DataShape, DataShapeKind,
    Flow, FlowType, IntegrationDocument, Step, StepKind,
};
pub use validation::{validate_flow, FlowError};
