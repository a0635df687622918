//! In-process integration store
//!
//! A [`PersistenceClient`] that keeps integrations in memory. Behaves like
//! the REST store as far as the editor can tell: it assigns IDs on create
//! and bumps the concurrency markers on every write.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{FlowEditorError, Result};
use crate::services::PersistenceClient;
use crate::types::{fresh_id, IntegrationDocument};

#[derive(Default)]
pub struct InMemoryIntegrationStore {
    integrations: Mutex<HashMap<String, IntegrationDocument>>,
    deployments: Mutex<Vec<String>>,
    /// When set, every write fails with this message
    failure: Mutex<Option<String>>,
}

impl InMemoryIntegrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again with `None`)
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.lock() = message;
    }

    pub fn get(&self, id: &str) -> Option<IntegrationDocument> {
        self.integrations.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.integrations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.lock().is_empty()
    }

    /// IDs of deployed integrations, in deployment order
    pub fn deployments(&self) -> Vec<String> {
        self.deployments.lock().clone()
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(FlowEditorError::persistence(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceClient for InMemoryIntegrationStore {
    async fn update_or_create(&self, mut document: IntegrationDocument) -> Result<IntegrationDocument> {
        self.check_failure()?;

        let id = document.id.clone().unwrap_or_else(fresh_id);
        let mut integrations = self.integrations.lock();
        let previous = integrations.get(&id);
        let version = previous.and_then(|d| d.version).unwrap_or(0) + 1;
        let now = chrono::Utc::now().timestamp_millis();
        let updated_at = previous
            .and_then(|d| d.updated_at)
            .map_or(now, |last| now.max(last + 1));

        document.id = Some(id.clone());
        document.version = Some(version);
        document.updated_at = Some(updated_at);
        integrations.insert(id.clone(), document.clone());
        log::debug!("Stored integration '{}' at version {}", id, version);
        Ok(document)
    }

    async fn deploy(&self, document: &IntegrationDocument) -> Result<()> {
        self.check_failure()?;

        let id = document
            .id
            .as_deref()
            .ok_or_else(|| FlowEditorError::Deploy("integration has not been saved".to_string()))?;
        if !self.integrations.lock().contains_key(id) {
            return Err(FlowEditorError::Deploy(format!("unknown integration '{}'", id)));
        }
        self.deployments.lock().push(id.to_string());
        log::debug!("Deployed integration '{}'", id);
        Ok(())
    }
}
