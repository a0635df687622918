//! REST store adapter for the flow editor
//!
//! [`HttpIntegrationClient`] implements the editor's `PersistenceClient`
//! and `StepDescriptorFetcher` collaborators over the integration store's
//! REST API.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;

pub use client::HttpIntegrationClient;
pub use config::HttpAdapterConfig;
pub use error::{HttpAdapterError, Result};
