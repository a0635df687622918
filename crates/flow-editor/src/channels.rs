//! Single-value channels for the editor's derived state
//!
//! Each channel always holds the latest value; subscribers see the current
//! value immediately and every replacement after that.

use tokio::sync::watch;

use crate::types::{Flow, IntegrationDocument};
use crate::validation::FlowError;

/// Publishers for the state the UI renders from
#[derive(Debug)]
pub struct EditorChannels {
    document: watch::Sender<Option<IntegrationDocument>>,
    flows: watch::Sender<Vec<Flow>>,
    current_flow: watch::Sender<Option<Flow>>,
    validation_errors: watch::Sender<Vec<FlowError>>,
    loaded: watch::Sender<bool>,
    dirty: watch::Sender<bool>,
}

impl EditorChannels {
    pub fn new() -> Self {
        Self {
            document: watch::channel(None).0,
            flows: watch::channel(Vec::new()).0,
            current_flow: watch::channel(None).0,
            validation_errors: watch::channel(Vec::new()).0,
            loaded: watch::channel(false).0,
            dirty: watch::channel(false).0,
        }
    }

    pub fn subscribe_document(&self) -> watch::Receiver<Option<IntegrationDocument>> {
        self.document.subscribe()
    }

    pub fn subscribe_flows(&self) -> watch::Receiver<Vec<Flow>> {
        self.flows.subscribe()
    }

    pub fn subscribe_current_flow(&self) -> watch::Receiver<Option<Flow>> {
        self.current_flow.subscribe()
    }

    pub fn subscribe_validation_errors(&self) -> watch::Receiver<Vec<FlowError>> {
        self.validation_errors.subscribe()
    }

    pub fn subscribe_loaded(&self) -> watch::Receiver<bool> {
        self.loaded.subscribe()
    }

    pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
        self.dirty.subscribe()
    }

    /// Publish the document together with its flow list and current flow
    pub(crate) fn publish_document(&self, document: Option<&IntegrationDocument>, current_flow_id: Option<&str>) {
        let flows = document.map(|d| d.flows.clone()).unwrap_or_default();
        let current = document
            .zip(current_flow_id)
            .and_then(|(d, id)| d.find_flow(id).cloned());
        self.document.send_replace(document.cloned());
        self.flows.send_replace(flows);
        self.current_flow.send_replace(current);
    }

    pub(crate) fn publish_validation_errors(&self, errors: Vec<FlowError>) {
        self.validation_errors.send_replace(errors);
    }

    pub(crate) fn publish_loaded(&self, loaded: bool) {
        self.loaded.send_if_modified(|current| {
            let changed = *current != loaded;
            *current = loaded;
            changed
        });
    }

    pub(crate) fn publish_dirty(&self, dirty: bool) {
        self.dirty.send_if_modified(|current| {
            let changed = *current != dirty;
            *current = dirty;
            changed
        });
    }
}

impl Default for EditorChannels {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_document_derives_current_flow() {
        let channels = EditorChannels::new();
        let current = channels.subscribe_current_flow();
        let flows = channels.subscribe_flows();

        let doc = IntegrationDocument::new("x")
            .with_flow(Flow::new("a"))
            .with_flow(Flow::new("b"));
        channels.publish_document(Some(&doc), Some("b"));

        assert_eq!(current.borrow().as_ref().map(|f| f.id.as_str()), Some("b"));
        assert_eq!(flows.borrow().len(), 2);

        channels.publish_document(None, Some("b"));
        assert!(current.borrow().is_none());
        assert!(flows.borrow().is_empty());
    }

    #[test]
    fn test_flags_only_notify_on_change() {
        let channels = EditorChannels::new();
        let mut dirty = channels.subscribe_dirty();
        dirty.mark_unchanged();

        channels.publish_dirty(false);
        assert!(!dirty.has_changed().unwrap());

        channels.publish_dirty(true);
        assert!(dirty.has_changed().unwrap());
        assert!(*dirty.borrow_and_update());
    }
}
