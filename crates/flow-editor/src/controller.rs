//! The flow editing state machine
//!
//! [`FlowEditor`] owns the integration being edited. It applies
//! [`FlowEvent`]s through the functional mutators, enriches steps through
//! the descriptor collaborator, saves through the persistence collaborator
//! and republishes derived state on its channels after every change.
//!
//! The editor is a cheap handle (`Clone`) around shared state. The state
//! lock is only held for synchronous sections, never across an `.await`.
//! Every document change bumps a revision counter; a reconciliation that
//! finishes after newer edits is dropped or applied depending on
//! [`ReconcilePolicy`].

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::catalog::StepCatalog;
use crate::channels::EditorChannels;
use crate::config::{CurrentFlowPolicy, EditorConfig, ReconcilePolicy};
use crate::constants::metadata_keys;
use crate::error::{FlowEditorError, Result};
use crate::events::{EventSink, FlowEvent, FlowNotification, NullEventSink};
use crate::mutator;
use crate::query::{self, StepPlacement};
use crate::services::{PersistenceClient, StepDescriptorFetcher, StepFactory};
use crate::types::{
    Action, ActionDescriptor, Connection, DataShape, Flow, FlowId, IntegrationDocument, Step,
    StepKind, StringMap,
};
use crate::validation::{validate_flow, FlowError};

#[derive(Debug, Default)]
struct EditorState {
    document: Option<IntegrationDocument>,
    current_flow_id: Option<FlowId>,
    dirty: bool,
    revision: u64,
}

struct Inner {
    state: Mutex<EditorState>,
    channels: EditorChannels,
    config: EditorConfig,
    descriptors: Arc<dyn StepDescriptorFetcher>,
    persistence: Arc<dyn PersistenceClient>,
    step_factory: Arc<dyn StepFactory>,
    event_sink: Arc<dyn EventSink>,
}

/// Builder for [`FlowEditor`]
pub struct FlowEditorBuilder {
    descriptors: Arc<dyn StepDescriptorFetcher>,
    persistence: Arc<dyn PersistenceClient>,
    step_factory: Arc<dyn StepFactory>,
    event_sink: Arc<dyn EventSink>,
    config: EditorConfig,
}

impl FlowEditorBuilder {
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_step_factory(mut self, step_factory: Arc<dyn StepFactory>) -> Self {
        self.step_factory = step_factory;
        self
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn build(self) -> FlowEditor {
        FlowEditor {
            inner: Arc::new(Inner {
                state: Mutex::new(EditorState::default()),
                channels: EditorChannels::new(),
                config: self.config,
                descriptors: self.descriptors,
                persistence: self.persistence,
                step_factory: self.step_factory,
                event_sink: self.event_sink,
            }),
        }
    }
}

/// Add the flow if the document does not have it yet
fn ensure_flow(document: &mut IntegrationDocument, flow_id: &str, placeholders: bool) {
    if document.find_flow(flow_id).is_some() {
        return;
    }
    log::debug!("Creating missing flow '{}'", flow_id);
    let flow = if placeholders {
        mutator::create_flow_with_id(flow_id)
    } else {
        Flow::new(flow_id)
    };
    document.flows.push(flow);
}

fn initial_flow_id(document: &IntegrationDocument, policy: CurrentFlowPolicy) -> Option<FlowId> {
    let flow = match policy {
        CurrentFlowPolicy::FirstFlow => document.flows.first(),
        CurrentFlowPolicy::PrimaryFlow => document
            .flows
            .iter()
            .find(|f| f.is_primary() && !f.is_api_provider())
            .or_else(|| document.flows.first()),
    };
    flow.map(|f| f.id.clone()).filter(|id| !id.is_empty())
}

/// Handle to the editing session
#[derive(Clone)]
pub struct FlowEditor {
    inner: Arc<Inner>,
}

impl FlowEditor {
    /// Create an editor with the built-in step catalog and no notification sink
    pub fn new(
        descriptors: Arc<dyn StepDescriptorFetcher>,
        persistence: Arc<dyn PersistenceClient>,
    ) -> Self {
        Self::builder(descriptors, persistence).build()
    }

    pub fn builder(
        descriptors: Arc<dyn StepDescriptorFetcher>,
        persistence: Arc<dyn PersistenceClient>,
    ) -> FlowEditorBuilder {
        FlowEditorBuilder {
            descriptors,
            persistence,
            step_factory: Arc::new(StepCatalog::default()),
            event_sink: Arc::new(NullEventSink),
            config: EditorConfig::default(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.inner.config
    }

    /// Channels publishing the editor's derived state
    pub fn channels(&self) -> &EditorChannels {
        &self.inner.channels
    }

    // ---- Document lifecycle ----

    /// Take ownership of a document
    ///
    /// A re-fetch of the held document (same ID, same `updatedAt`) is
    /// ignored while there are unsaved edits. A document for a different
    /// integration resets the current flow. Returns whether the document
    /// was replaced.
    pub fn set_document(&self, document: IntegrationDocument) -> bool {
        let (replaced, integration_id) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let stale = state.dirty
                && state
                    .document
                    .as_ref()
                    .is_some_and(|held| held.id == document.id && held.updated_at == document.updated_at);
            if stale {
                log::debug!(
                    "Ignoring re-fetched integration {:?}, local edits pending",
                    document.id
                );
            } else {
                let switched = state
                    .document
                    .as_ref()
                    .is_some_and(|held| held.id != document.id);
                if switched {
                    log::debug!("Switching to integration {:?}", document.id);
                    state.current_flow_id = None;
                }
                state.document = Some(document);
                state.revision += 1;
            }

            let placeholders = self.inner.config.placeholder_start_and_end;
            let policy = self.inner.config.current_flow_policy;
            if let Some(held) = state.document.as_mut() {
                if state.current_flow_id.is_none() {
                    state.current_flow_id = initial_flow_id(held, policy);
                }
                if let Some(flow_id) = state.current_flow_id.as_deref() {
                    ensure_flow(held, flow_id, placeholders);
                }
            }
            (!stale, state.document.as_ref().and_then(|d| d.id.clone()))
        };

        self.post_update();
        if replaced {
            self.notify(FlowNotification::DocumentUpdated { integration_id });
        }
        replaced
    }

    /// Make `flow_id` the current flow, creating it if the document lacks it
    pub fn select_flow(&self, flow_id: &str) -> Result<()> {
        if flow_id.is_empty() {
            return Err(FlowEditorError::InvalidFlowId);
        }
        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let document = state.document.as_mut().ok_or(FlowEditorError::NotLoaded)?;
            ensure_flow(document, flow_id, self.inner.config.placeholder_start_and_end);
            state.current_flow_id = Some(flow_id.to_string());
        }
        self.post_update();
        Ok(())
    }

    /// End the editing session, dropping the document and current flow
    pub fn cleanup(&self) {
        {
            let mut state = self.inner.state.lock();
            state.document = None;
            state.current_flow_id = None;
            state.dirty = false;
            state.revision += 1;
        }
        self.inner.channels.publish_dirty(false);
        self.post_update();
    }

    // ---- Event handling ----

    /// Serve events until every sender is dropped
    ///
    /// Events are handled one at a time, in arrival order. A failing event
    /// is logged and does not stop the loop.
    pub async fn run(&self, mut receiver: mpsc::Receiver<FlowEvent>) {
        while let Some(event) = receiver.recv().await {
            let name = event.name();
            if let Err(e) = self.dispatch(event).await {
                log::warn!("Flow event {} failed: {}", name, e);
            }
        }
        log::debug!("Flow event loop finished");
    }

    /// Apply one event
    ///
    /// Resolves once the event, including any reconciliation or save it
    /// triggered, has finished.
    pub async fn dispatch(&self, event: FlowEvent) -> Result<()> {
        log::debug!("Handling flow event {}", event.name());
        match event {
            FlowEvent::DocumentUpdated => Ok(()),
            FlowEvent::InsertStep { position } => {
                let step = mutator::create_step_using_store(self.inner.step_factory.as_ref(), None);
                self.edit_flow(|doc, flow_id| mutator::insert_step_into_flow_after(doc, flow_id, step, position))?;
                self.finish(true);
                Ok(())
            }
            FlowEvent::InsertDataMapperStep { position } => {
                let step = self.inner.step_factory.create_mapper_step();
                self.edit_flow(|doc, flow_id| mutator::insert_step_into_flow_before(doc, flow_id, step, position))?;
                self.finish(true);
                Ok(())
            }
            FlowEvent::InsertConnectionStep { position } => {
                let step = self.inner.step_factory.create_connection_step();
                self.edit_flow(|doc, flow_id| mutator::insert_step_into_flow_after(doc, flow_id, step, position))?;
                self.finish(true);
                Ok(())
            }
            FlowEvent::RemoveStep {
                position,
                skip_reconcile,
            } => self.remove_step(position, skip_reconcile).await,
            FlowEvent::SetStep {
                position,
                step,
                skip_reconcile,
            } => {
                self.edit_flow(|doc, flow_id| mutator::set_step_in_flow(doc, flow_id, step, position))?;
                self.maybe_reconcile(skip_reconcile).await;
                Ok(())
            }
            FlowEvent::SetMetadata {
                position,
                metadata,
                skip_reconcile,
            } => self.set_metadata(position, &metadata, skip_reconcile).await,
            FlowEvent::SetProperties {
                position,
                properties,
            } => self.set_properties(position, &properties).await,
            FlowEvent::SetAction {
                position,
                action,
                step_kind,
            } => self.update_step(position, |step| mutator::set_action_on_step(step, action, step_kind)),
            FlowEvent::SetDescriptor {
                position,
                descriptor,
            } => self.update_step(position, |step| mutator::set_descriptor_on_step(step, descriptor)),
            FlowEvent::SetDataShape {
                position,
                shape,
                is_input,
            } => self.update_step(position, |step| mutator::set_data_shape_on_step(step, shape, is_input)),
            FlowEvent::SetConnection {
                position,
                connection,
            } => {
                let step = mutator::create_step_with_connection(connection);
                self.edit_flow(|doc, flow_id| mutator::set_step_in_flow(doc, flow_id, step, position))?;
                self.finish(true);
                Ok(())
            }
            FlowEvent::SetProperty { key, value } => {
                self.edit_document(|doc| mutator::set_integration_property(doc, &key, value))?;
                self.finish(true);
                Ok(())
            }
            FlowEvent::AddFlow { flow } => {
                let flow_id = flow.id.clone();
                self.edit_document(|doc| {
                    let mut next = doc.clone();
                    next.flows.push(flow);
                    Ok(next)
                })?;
                self.notify(FlowNotification::FlowAdded { flow_id });
                self.finish(true);
                Ok(())
            }
            FlowEvent::RemoveFlow { flow_id } => {
                self.remove_flow(&flow_id)?;
                self.notify(FlowNotification::FlowRemoved { flow_id });
                self.finish(true);
                Ok(())
            }
            FlowEvent::Save { publish } => self.save(publish).await.map(|_| ()),
        }
    }

    /// Remove a step, taking a split's paired aggregate along
    ///
    /// The aggregate is removed as a second, separate removal so each
    /// removal reconciles once.
    fn remove_step(&self, position: usize, skip_reconcile: bool) -> BoxFuture<'_, Result<()>> {
        async move {
            let mut removed_kind = None;
            self.edit_flow(|doc, flow_id| {
                removed_kind = query::get_step(doc, flow_id, position).and_then(|s| s.step_kind);
                mutator::remove_step_from_flow(doc, flow_id, position)
            })?;

            if removed_kind == Some(StepKind::Split) {
                let paired = self
                    .read_current_flow(|flow| {
                        flow.steps
                            .iter()
                            .enumerate()
                            .skip(position)
                            .find(|(_, s)| s.is_kind(StepKind::Aggregate) || s.is_kind(StepKind::Split))
                            .filter(|(_, s)| s.is_kind(StepKind::Aggregate))
                            .map(|(index, _)| index)
                    })
                    .flatten();
                if let Some(index) = paired {
                    log::debug!("Removing aggregate at {} paired with removed split", index);
                    self.remove_step(index, skip_reconcile).await?;
                }
            }

            self.maybe_reconcile(skip_reconcile).await;
            Ok(())
        }
        .boxed()
    }

    async fn set_metadata(&self, position: usize, metadata: &StringMap, skip_reconcile: bool) -> Result<()> {
        self.edit_flow(|doc, flow_id| {
            let step = query::get_step(doc, flow_id, position).cloned().unwrap_or_default();
            mutator::set_step_in_flow(doc, flow_id, mutator::add_metadata_to_step(step, metadata), position)
        })?;
        self.maybe_reconcile(skip_reconcile).await;
        Ok(())
    }

    async fn set_properties(&self, position: usize, properties: &Map<String, Value>) -> Result<()> {
        self.update_step(position, |step| mutator::set_configured_properties_on_step(step, properties))?;
        let mut configured = StringMap::new();
        configured.insert(metadata_keys::CONFIGURED.to_string(), "true".to_string());
        self.set_metadata(position, &configured, false).await
    }

    /// Replace the step at `position` (or a blank one) with `f(step)`
    fn update_step<F>(&self, position: usize, f: F) -> Result<()>
    where
        F: FnOnce(Step) -> Step,
    {
        self.edit_flow(|doc, flow_id| {
            let step = query::get_step(doc, flow_id, position).cloned().unwrap_or_default();
            mutator::set_step_in_flow(doc, flow_id, f(step), position)
        })?;
        self.finish(true);
        Ok(())
    }

    fn remove_flow(&self, flow_id: &str) -> Result<()> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let document = state.document.as_mut().ok_or(FlowEditorError::NotLoaded)?;
        document.flows.retain(|f| f.id != flow_id);
        if state.current_flow_id.as_deref() == Some(flow_id) {
            state.current_flow_id = initial_flow_id(document, CurrentFlowPolicy::FirstFlow);
        }
        state.revision += 1;
        Ok(())
    }

    /// Replace the held document with `f(document)`
    fn edit_document<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&IntegrationDocument) -> Result<IntegrationDocument>,
    {
        let mut state = self.inner.state.lock();
        let document = state.document.as_ref().ok_or(FlowEditorError::NotLoaded)?;
        let next = f(document)?;
        state.document = Some(next);
        state.revision += 1;
        Ok(())
    }

    /// Replace the held document with `f(document, current_flow_id)`
    fn edit_flow<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&IntegrationDocument, &str) -> Result<IntegrationDocument>,
    {
        let (flow_id, revision) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let document = state.document.as_mut().ok_or(FlowEditorError::NotLoaded)?;
            let flow_id = state
                .current_flow_id
                .clone()
                .ok_or(FlowEditorError::NoCurrentFlow)?;
            ensure_flow(document, &flow_id, self.inner.config.placeholder_start_and_end);
            *document = f(document, &flow_id)?;
            state.revision += 1;
            (flow_id, state.revision)
        };
        self.notify(FlowNotification::StepsChanged { flow_id, revision });
        Ok(())
    }

    // ---- Reconciliation ----

    async fn maybe_reconcile(&self, skip_reconcile: bool) {
        if !skip_reconcile {
            self.reconcile_all_data_shapes().await;
        }
        self.finish(true);
    }

    /// Replace the current flow's steps with their enriched versions
    ///
    /// Failures leave the steps as they were.
    pub async fn reconcile_all_data_shapes(&self) {
        let snapshot = {
            let state = self.inner.state.lock();
            let revision = state.revision;
            let flow = state
                .document
                .as_ref()
                .zip(state.current_flow_id.as_deref())
                .and_then(|(doc, flow_id)| doc.find_flow(flow_id));
            flow.map(|flow| (flow.id.clone(), flow.steps.clone(), revision))
        };
        let Some((flow_id, steps, started_at)) = snapshot else {
            return;
        };

        let expected = steps.len();
        let result = self.inner.descriptors.fetch(steps).await.and_then(|enriched| {
            if enriched.len() == expected {
                Ok(enriched)
            } else {
                Err(FlowEditorError::descriptor(format!(
                    "expected {} steps, got {}",
                    expected,
                    enriched.len()
                )))
            }
        });

        match result {
            Ok(enriched) => self.apply_reconciled(&flow_id, enriched, started_at),
            Err(e) => {
                log::warn!("Reconciling data shapes of flow '{}' failed: {}", flow_id, e);
                self.notify(FlowNotification::ReconcileFailed {
                    flow_id,
                    error: e.to_string(),
                });
            }
        }
    }

    fn apply_reconciled(&self, flow_id: &str, steps: Vec<Step>, started_at: u64) {
        let outcome = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let current = state.revision;
            let stale = current != started_at;
            if stale && self.inner.config.reconcile_policy == ReconcilePolicy::DiscardStale {
                Err(current)
            } else {
                match state.document.as_mut().and_then(|d| d.find_flow_mut(flow_id)) {
                    Some(flow) => {
                        flow.steps = steps;
                        state.revision += 1;
                        Ok(Some(state.revision))
                    }
                    None => Ok(None),
                }
            }
        };

        match outcome {
            Ok(Some(revision)) => self.notify(FlowNotification::StepsChanged {
                flow_id: flow_id.to_string(),
                revision,
            }),
            Ok(None) => log::debug!("Flow '{}' is gone, dropping reconciled steps", flow_id),
            Err(current) => {
                log::debug!(
                    "Dropping reconciled steps of flow '{}' from revision {} (now {})",
                    flow_id,
                    started_at,
                    current
                );
                self.notify(FlowNotification::ReconcileDiscarded {
                    flow_id: flow_id.to_string(),
                    started_at,
                    current,
                });
            }
        }
    }

    // ---- Saving ----

    /// Save the document, deploying it afterwards when `publish` is set
    ///
    /// On success a new integration adopts the server-assigned ID and the
    /// dirty flag clears; the stored document is returned. On failure the
    /// held document and dirty flag stay as they are.
    pub async fn save(&self, publish: bool) -> Result<IntegrationDocument> {
        let document = self
            .inner
            .state
            .lock()
            .document
            .clone()
            .ok_or(FlowEditorError::NotLoaded)?;
        let prepared = mutator::prepare_integration_for_saving(&document);

        let saved = match self.inner.persistence.update_or_create(prepared).await {
            Ok(saved) => saved,
            Err(e) => return Err(self.save_failed(e)),
        };
        self.adopt_id(&saved);

        let integration_id = saved.id.clone().unwrap_or_default();
        if publish {
            if let Err(e) = self.inner.persistence.deploy(&saved).await {
                return Err(self.save_failed(e));
            }
            self.notify(FlowNotification::Deployed {
                integration_id: integration_id.clone(),
            });
        }

        self.inner.state.lock().dirty = false;
        self.inner.channels.publish_dirty(false);
        self.post_update();
        log::info!("Saved integration '{}' (published: {})", integration_id, publish);
        self.notify(FlowNotification::Saved {
            integration_id,
            published: publish,
        });
        Ok(saved)
    }

    fn adopt_id(&self, saved: &IntegrationDocument) {
        let mut state = self.inner.state.lock();
        if let Some(document) = state.document.as_mut() {
            if document.id.is_none() {
                document.id = saved.id.clone();
            }
        }
    }

    fn save_failed(&self, error: FlowEditorError) -> FlowEditorError {
        log::warn!("Saving integration failed: {}", error);
        self.notify(FlowNotification::SaveFailed {
            error: error.to_string(),
        });
        error
    }

    // ---- Publishing ----

    fn finish(&self, mark_dirty: bool) {
        if mark_dirty {
            self.inner.state.lock().dirty = true;
            self.inner.channels.publish_dirty(true);
        }
        self.post_update();
    }

    /// Republish document, flows, current flow, validation errors and loaded
    fn post_update(&self) {
        let (document, current_flow_id) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if let (Some(doc), Some(flow_id)) = (state.document.as_mut(), state.current_flow_id.as_deref()) {
                ensure_flow(doc, flow_id, self.inner.config.placeholder_start_and_end);
            }
            (state.document.clone(), state.current_flow_id.clone())
        };

        let channels = &self.inner.channels;
        channels.publish_document(document.as_ref(), current_flow_id.as_deref());
        let errors = match document.as_ref() {
            Some(doc) => validate_flow(doc, current_flow_id.as_deref().unwrap_or_default())
                .unwrap_or_else(|e| {
                    log::warn!("Validation failed: {}", e);
                    Vec::new()
                }),
            None => Vec::new(),
        };
        channels.publish_validation_errors(errors);
        channels.publish_loaded(document.is_some());
    }

    fn notify(&self, notification: FlowNotification) {
        if let Err(e) = self.inner.event_sink.send(notification) {
            log::debug!("Failed to deliver flow notification: {}", e);
        }
    }

    // ---- State accessors ----

    pub fn document(&self) -> Option<IntegrationDocument> {
        self.inner.state.lock().document.clone()
    }

    pub fn current_flow_id(&self) -> Option<FlowId> {
        self.inner.state.lock().current_flow_id.clone()
    }

    pub fn current_flow(&self) -> Option<Flow> {
        self.read_current_flow(Flow::clone)
    }

    pub fn flows(&self) -> Vec<Flow> {
        self.inner
            .state
            .lock()
            .document
            .as_ref()
            .map(|d| d.flows.clone())
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.state.lock().document.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().dirty
    }

    /// Counter bumped by every document change
    pub fn revision(&self) -> u64 {
        self.inner.state.lock().revision
    }

    /// Whether the integration has been stored at least once
    pub fn is_saved(&self) -> bool {
        self.inner
            .state
            .lock()
            .document
            .as_ref()
            .is_some_and(|d| d.id.is_some())
    }

    /// Whether the integration has a name
    pub fn is_valid(&self) -> bool {
        self.inner
            .state
            .lock()
            .document
            .as_ref()
            .is_some_and(|d| !d.name.is_empty())
    }

    /// Validate the current flow
    pub fn validate(&self) -> Result<Vec<FlowError>> {
        let state = self.inner.state.lock();
        let document = state.document.as_ref().ok_or(FlowEditorError::NotLoaded)?;
        validate_flow(document, state.current_flow_id.as_deref().unwrap_or_default())
    }

    fn read_current_flow<T>(&self, f: impl FnOnce(&Flow) -> T) -> Option<T> {
        let state = self.inner.state.lock();
        let flow_id = state.current_flow_id.as_deref()?;
        state.document.as_ref()?.find_flow(flow_id).map(f)
    }

    /// Run a query against the current flow
    fn read<T: Default>(&self, f: impl FnOnce(&IntegrationDocument, &str) -> T) -> T {
        let state = self.inner.state.lock();
        match (state.document.as_ref(), state.current_flow_id.as_deref()) {
            (Some(doc), Some(flow_id)) => f(doc, flow_id),
            _ => T::default(),
        }
    }

    // ---- Queries on the current flow ----

    pub fn step(&self, position: usize) -> Option<Step> {
        self.read(|doc, id| query::get_step(doc, id, position).cloned())
    }

    pub fn first_position(&self) -> usize {
        self.read(query::get_first_position)
    }

    pub fn last_position(&self) -> usize {
        self.read(|doc, id| query::get_last_position(doc, id))
    }

    pub fn middle_position(&self) -> usize {
        self.read(|doc, id| query::get_middle_position(doc, id))
    }

    pub fn start_step(&self) -> Option<Step> {
        self.read(|doc, id| query::get_start_step(doc, id).cloned())
    }

    pub fn end_step(&self) -> Option<Step> {
        self.read(|doc, id| query::get_end_step(doc, id).cloned())
    }

    pub fn middle_steps(&self) -> Vec<Step> {
        self.read(|doc, id| query::get_middle_steps(doc, id).into_iter().cloned().collect())
    }

    pub fn subsequent_steps(&self, position: usize) -> Vec<Step> {
        self.read(|doc, id| {
            query::get_subsequent_steps(doc, id, position)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn previous_steps(&self, position: usize) -> Vec<Step> {
        self.read(|doc, id| query::get_previous_steps(doc, id, position).into_iter().cloned().collect())
    }

    pub fn subsequent_connections(&self, position: usize) -> Vec<Step> {
        self.read(|doc, id| {
            query::get_subsequent_connections(doc, id, position)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn previous_connections(&self, position: usize) -> Vec<Step> {
        self.read(|doc, id| {
            query::get_previous_connections(doc, id, position)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn subsequent_connection(&self, position: usize) -> Option<Step> {
        self.read(|doc, id| query::get_subsequent_connection(doc, id, position).cloned())
    }

    pub fn previous_connection(&self, position: usize) -> Option<Step> {
        self.read(|doc, id| query::get_previous_connection(doc, id, position).cloned())
    }

    pub fn previous_step_index_with_data_shape(&self, position: usize) -> Option<usize> {
        self.read(|doc, id| query::get_previous_step_index_with_data_shape(doc, id, position))
    }

    pub fn previous_step_with_data_shape(&self, position: usize) -> Option<Step> {
        self.read(|doc, id| query::get_previous_step_with_data_shape(doc, id, position).cloned())
    }

    pub fn subsequent_step_with_data_shape(&self, position: usize) -> Option<Step> {
        self.read(|doc, id| query::get_subsequent_step_with_data_shape(doc, id, position).cloned())
    }

    pub fn next_aggregate_step(&self, position: usize) -> Option<Step> {
        self.read(|doc, id| query::get_next_aggregate_step(doc, id, position).cloned())
    }

    /// Whether the current flow has no steps; true when nothing is loaded
    pub fn is_empty(&self) -> bool {
        let state = self.inner.state.lock();
        match (state.document.as_ref(), state.current_flow_id.as_deref()) {
            (Some(doc), Some(flow_id)) => query::is_empty(doc, flow_id),
            _ => true,
        }
    }

    pub fn at_end(&self, position: usize) -> bool {
        let state = self.inner.state.lock();
        match (state.document.as_ref(), state.current_flow_id.as_deref()) {
            (Some(doc), Some(flow_id)) => query::at_end(doc, flow_id, position),
            _ => true,
        }
    }

    /// Filter picker candidates for `position` of the current flow
    pub fn filter_steps_by_position<'a, T, F>(&self, candidates: &'a [T], position: usize, is_allowed: F) -> Vec<&'a T>
    where
        F: Fn(&T, StepPlacement) -> bool,
    {
        self.read(|doc, id| query::filter_steps_by_position(doc, id, candidates, position, is_allowed))
    }

    // ---- Convenience wrappers for common events ----

    pub async fn insert_step(&self, position: usize) -> Result<()> {
        self.dispatch(FlowEvent::InsertStep { position }).await
    }

    pub async fn set_action(&self, position: usize, action: Action, step_kind: Option<StepKind>) -> Result<()> {
        self.dispatch(FlowEvent::SetAction {
            position,
            action,
            step_kind,
        })
        .await
    }

    pub async fn set_descriptor(&self, position: usize, descriptor: ActionDescriptor) -> Result<()> {
        self.dispatch(FlowEvent::SetDescriptor { position, descriptor }).await
    }

    pub async fn set_data_shape(&self, position: usize, shape: DataShape, is_input: bool) -> Result<()> {
        self.dispatch(FlowEvent::SetDataShape {
            position,
            shape,
            is_input,
        })
        .await
    }

    pub async fn set_connection(&self, position: usize, connection: Connection) -> Result<()> {
        self.dispatch(FlowEvent::SetConnection { position, connection }).await
    }
}
