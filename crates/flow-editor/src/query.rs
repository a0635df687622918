//! Read-only queries over a flow
//!
//! Every function takes the document and a flow ID and addresses steps by
//! 0-based position. Missing flows read as empty and out-of-range positions
//! yield `None` or an empty list, so callers can treat both as "nothing
//! here yet".

use crate::constants::{connectors, metadata_keys};
use crate::types::{ActionDescriptor, ActionPattern, Connection, Flow, IntegrationDocument, Step, StepKind};

/// A step together with its absolute position in the flow
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedStep<'a> {
    pub index: usize,
    pub step: &'a Step,
}

/// Where in a flow a position sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepPlacement {
    Start,
    Middle,
    End,
}

/// Find a flow by ID
pub fn get_flow<'a>(doc: &'a IntegrationDocument, flow_id: &str) -> Option<&'a Flow> {
    if flow_id.is_empty() {
        return None;
    }
    doc.find_flow(flow_id)
}

fn steps_of<'a>(doc: &'a IntegrationDocument, flow_id: &str) -> &'a [Step] {
    get_flow(doc, flow_id).map_or(&[], |f| f.steps.as_slice())
}

/// The step at `position`
pub fn get_step<'a>(doc: &'a IntegrationDocument, flow_id: &str, position: usize) -> Option<&'a Step> {
    steps_of(doc, flow_id).get(position)
}

/// Position of the start step
pub fn get_first_position(_doc: &IntegrationDocument, _flow_id: &str) -> usize {
    0
}

/// Position of the end step
///
/// Flows with zero or one step still report 1 so that the start and end
/// insertion points stay distinct.
pub fn get_last_position(doc: &IntegrationDocument, flow_id: &str) -> usize {
    steps_of(doc, flow_id).len().saturating_sub(1).max(1)
}

/// A position halfway between the start and end steps, rounded up
pub fn get_middle_position(doc: &IntegrationDocument, flow_id: &str) -> usize {
    (get_last_position(doc, flow_id) + 1) / 2
}

pub fn get_start_step<'a>(doc: &'a IntegrationDocument, flow_id: &str) -> Option<&'a Step> {
    get_step(doc, flow_id, get_first_position(doc, flow_id))
}

pub fn get_last_step<'a>(doc: &'a IntegrationDocument, flow_id: &str) -> Option<&'a Step> {
    get_step(doc, flow_id, get_last_position(doc, flow_id))
}

/// Alias of [`get_last_step`]
pub fn get_end_step<'a>(doc: &'a IntegrationDocument, flow_id: &str) -> Option<&'a Step> {
    get_last_step(doc, flow_id)
}

/// Steps strictly between the start and end steps
pub fn get_middle_steps<'a>(doc: &'a IntegrationDocument, flow_id: &str) -> Vec<&'a Step> {
    let steps = steps_of(doc, flow_id);
    if get_last_position(doc, flow_id) < 2 {
        return Vec::new();
    }
    steps[1..steps.len() - 1].iter().collect()
}

/// Steps after `position`, exclusive
pub fn get_subsequent_steps<'a>(doc: &'a IntegrationDocument, flow_id: &str, position: usize) -> Vec<&'a Step> {
    steps_of(doc, flow_id).iter().skip(position.saturating_add(1)).collect()
}

/// Steps before `position`, exclusive
pub fn get_previous_steps<'a>(doc: &'a IntegrationDocument, flow_id: &str, position: usize) -> Vec<&'a Step> {
    steps_of(doc, flow_id).iter().take(position).collect()
}

pub fn get_subsequent_connections<'a>(
    doc: &'a IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Vec<&'a Step> {
    get_subsequent_steps(doc, flow_id, position)
        .into_iter()
        .filter(|s| s.is_connection())
        .collect()
}

pub fn get_previous_connections<'a>(
    doc: &'a IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Vec<&'a Step> {
    get_previous_steps(doc, flow_id, position)
        .into_iter()
        .filter(|s| s.is_connection())
        .collect()
}

/// The closest connection before `position`
pub fn get_previous_connection<'a>(doc: &'a IntegrationDocument, flow_id: &str, position: usize) -> Option<&'a Step> {
    get_previous_connections(doc, flow_id, position).pop()
}

/// The closest connection after `position`
pub fn get_subsequent_connection<'a>(doc: &'a IntegrationDocument, flow_id: &str, position: usize) -> Option<&'a Step> {
    get_subsequent_connections(doc, flow_id, position)
        .into_iter()
        .next()
}

/// Whether a step exposes a data shape in the given direction
///
/// Connections always do. Extensions do when the shape in that direction
/// is typed. Every other kind is transparent to data shapes.
pub fn has_data_shape(step: &Step, is_input: bool) -> bool {
    match step.step_kind {
        Some(kind) if kind.is_connection() => true,
        Some(StepKind::Extension) => step
            .descriptor()
            .and_then(|d| d.data_shape(is_input))
            .is_some_and(|shape| !shape.is_shapeless()),
        _ => false,
    }
}

/// Steps after `position` that accept an input data shape
pub fn get_subsequent_steps_with_data_shape<'a>(
    doc: &'a IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Vec<IndexedStep<'a>> {
    steps_of(doc, flow_id)
        .iter()
        .enumerate()
        .skip(position.saturating_add(1))
        .filter(|(_, step)| has_data_shape(step, true))
        .map(|(index, step)| IndexedStep { index, step })
        .collect()
}

/// Steps before `position` that produce an output data shape
pub fn get_previous_steps_with_data_shape<'a>(
    doc: &'a IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Vec<IndexedStep<'a>> {
    steps_of(doc, flow_id)
        .iter()
        .enumerate()
        .take(position)
        .filter(|(_, step)| has_data_shape(step, false))
        .map(|(index, step)| IndexedStep { index, step })
        .collect()
}

/// Absolute index of the closest previous step with a data shape
pub fn get_previous_step_index_with_data_shape(
    doc: &IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Option<usize> {
    get_previous_steps_with_data_shape(doc, flow_id, position)
        .last()
        .map(|s| s.index)
}

pub fn get_previous_step_with_data_shape<'a>(
    doc: &'a IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Option<&'a Step> {
    get_previous_steps_with_data_shape(doc, flow_id, position)
        .last()
        .map(|s| s.step)
}

pub fn get_subsequent_step_with_data_shape<'a>(
    doc: &'a IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Option<&'a Step> {
    get_subsequent_steps_with_data_shape(doc, flow_id, position)
        .first()
        .map(|s| s.step)
}

/// First aggregate step at or after `position`
pub fn get_next_aggregate_step<'a>(doc: &'a IntegrationDocument, flow_id: &str, position: usize) -> Option<&'a Step> {
    steps_of(doc, flow_id)
        .iter()
        .skip(position)
        .find(|s| s.is_kind(StepKind::Aggregate))
}

pub fn is_empty(doc: &IntegrationDocument, flow_id: &str) -> bool {
    steps_of(doc, flow_id).is_empty()
}

/// Whether `position` is at or past the last step
pub fn at_end(doc: &IntegrationDocument, flow_id: &str, position: usize) -> bool {
    position.saturating_add(1) >= steps_of(doc, flow_id).len()
}

/// Classify a position as start, middle or end of the flow
pub fn placement_of(doc: &IntegrationDocument, flow_id: &str, position: usize) -> StepPlacement {
    if position == get_first_position(doc, flow_id) {
        StepPlacement::Start
    } else if position == get_last_position(doc, flow_id) {
        StepPlacement::End
    } else {
        StepPlacement::Middle
    }
}

/// Filter picker candidates down to those insertable at `position`
///
/// Legality is decided by `is_allowed`; [`default_placement_rule`] is the
/// stock rule for [`StepCandidate`]s.
pub fn filter_steps_by_position<'a, T, F>(
    doc: &IntegrationDocument,
    flow_id: &str,
    candidates: &'a [T],
    position: usize,
    is_allowed: F,
) -> Vec<&'a T>
where
    F: Fn(&T, StepPlacement) -> bool,
{
    let placement = placement_of(doc, flow_id, position);
    candidates
        .iter()
        .filter(|candidate| is_allowed(candidate, placement))
        .collect()
}

/// Something the step picker can offer: a step template or a connection
#[derive(Debug, Clone, PartialEq)]
pub enum StepCandidate {
    Step(Step),
    Connection(Connection),
}

fn is_hidden(metadata: &crate::types::StringMap) -> bool {
    metadata
        .get(metadata_keys::HIDE_FROM_STEP_SELECT)
        .is_some_and(|v| v != "false")
}

/// Stock insertion policy for the step picker
pub fn default_placement_rule(candidate: &StepCandidate, placement: StepPlacement) -> bool {
    match candidate {
        StepCandidate::Step(step) => {
            let connection_hidden = step.connection.as_ref().is_some_and(|c| is_hidden(&c.metadata));
            if is_hidden(&step.metadata) || connection_hidden {
                return false;
            }
            // Only connections can start a flow
            if placement == StepPlacement::Start {
                return false;
            }
            if placement == StepPlacement::End
                && matches!(
                    step.step_kind,
                    Some(
                        StepKind::Mapper
                            | StepKind::RuleFilter
                            | StepKind::ExpressionFilter
                            | StepKind::Split
                            | StepKind::Aggregate
                            | StepKind::Template
                    )
                )
            {
                return false;
            }
            if !step.is_connection() {
                return true;
            }
            step.connection
                .as_ref()
                .is_some_and(|c| c.has_action_pattern(ActionPattern::To))
        }
        StepCandidate::Connection(connection) => {
            let connector_id = connection.connector_id.as_deref();
            if is_hidden(&connection.metadata) || connector_id == Some(connectors::LOG) {
                return false;
            }
            if placement == StepPlacement::Start {
                return connection.connector.is_none() || connection.has_action_pattern(ActionPattern::From);
            }
            if connector_id == Some(connectors::API_PROVIDER) {
                return false;
            }
            connection.has_action_pattern(ActionPattern::To)
        }
    }
}

/// Whether either direction of the descriptor is shapeless
pub fn is_action_shapeless(descriptor: &ActionDescriptor) -> bool {
    is_action_input_shapeless(descriptor) || is_action_output_shapeless(descriptor)
}

/// Whether the input shape is `any`, `none` or absent
pub fn is_action_input_shapeless(descriptor: &ActionDescriptor) -> bool {
    descriptor
        .input_data_shape
        .as_ref()
        .map_or(true, |s| s.is_shapeless())
}

/// Whether the output shape is `any`, `none` or absent
pub fn is_action_output_shapeless(descriptor: &ActionDescriptor) -> bool {
    descriptor
        .output_data_shape
        .as_ref()
        .map_or(true, |s| s.is_shapeless())
}
