//! External collaborators of the flow editor
//!
//! The editor only talks to the outside world through these traits. HTTP
//! implementations live in `flow-editor-http-adapter`; [`crate::memory`] and
//! [`crate::catalog`] provide in-process ones.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IntegrationDocument, Step, StepKind};

/// Enriches steps with resolved action descriptors and data shapes.
#[async_trait]
pub trait StepDescriptorFetcher: Send + Sync {
    /// Return `steps` enriched, in the same order and with the same count.
    async fn fetch(&self, steps: Vec<Step>) -> Result<Vec<Step>>;
}

/// Stores and deploys integrations.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Create the integration when it has no ID, update it otherwise.
    ///
    /// # Returns
    /// The stored document including server-assigned fields
    async fn update_or_create(&self, document: IntegrationDocument) -> Result<IntegrationDocument>;

    /// Deploy a stored integration.
    async fn deploy(&self, document: &IntegrationDocument) -> Result<()>;
}

/// Produces blank steps.
pub trait StepFactory: Send + Sync {
    /// A blank step of `kind` with any registered defaults applied.
    fn create_step(&self, kind: Option<StepKind>) -> Step;

    /// A blank data mapper step.
    fn create_mapper_step(&self) -> Step {
        self.create_step(Some(StepKind::Mapper))
    }

    /// A blank endpoint step waiting for a connection.
    fn create_connection_step(&self) -> Step {
        Step::placeholder()
    }
}
