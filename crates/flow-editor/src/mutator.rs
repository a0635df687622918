//! Functional updates of an integration document
//!
//! Document-level functions take the document by reference and return a new
//! one; the input is never touched. Step-level functions take a step by value
//! and return the updated step.

use serde_json::{Map, Value};

use crate::error::{FlowEditorError, Result};
use crate::query;
use crate::services::StepFactory;
use crate::types::{
    fresh_id, Action, ActionDescriptor, Connection, DataShape, DataShapeKind, Flow,
    IntegrationDocument, Step, StepKind, StringMap,
};

/// Wire name of the integration-level configured properties
const CONFIGURED_PROPERTIES: &str = "configuredProperties";

fn ensure_id(mut step: Step) -> Step {
    if step.id.is_none() {
        step.id = Some(fresh_id());
    }
    step
}

/// Apply `f` to the steps of a flow in a clone of `doc`
fn with_steps<F>(doc: &IntegrationDocument, flow_id: &str, f: F) -> Result<IntegrationDocument>
where
    F: FnOnce(&mut Vec<Step>) -> Result<()>,
{
    let mut next = doc.clone();
    let flow = next
        .find_flow_mut(flow_id)
        .ok_or_else(|| FlowEditorError::UnknownFlow(flow_id.to_string()))?;
    f(&mut flow.steps)?;
    Ok(next)
}

/// Add `flow` to the document, replacing any flow with the same ID
pub fn set_flow(doc: &IntegrationDocument, flow: Flow) -> IntegrationDocument {
    let mut next = doc.clone();
    match next.find_flow_mut(&flow.id) {
        Some(existing) => *existing = flow,
        None => next.flows.push(flow),
    }
    next
}

/// A new flow with an endpoint placeholder at the start and the end
pub fn create_flow_with_id(id: impl Into<String>) -> Flow {
    Flow::new(id).with_steps(vec![create_connection_step(), create_connection_step()])
}

/// Insert `step` directly after `position`
///
/// Positions past the end append.
pub fn insert_step_into_flow_after(
    doc: &IntegrationDocument,
    flow_id: &str,
    step: Step,
    position: usize,
) -> Result<IntegrationDocument> {
    with_steps(doc, flow_id, |steps| {
        let index = position.saturating_add(1).min(steps.len());
        steps.insert(index, ensure_id(step));
        Ok(())
    })
}

/// Insert `step` at `position`, shifting the step there one place back
pub fn insert_step_into_flow_before(
    doc: &IntegrationDocument,
    flow_id: &str,
    step: Step,
    position: usize,
) -> Result<IntegrationDocument> {
    with_steps(doc, flow_id, |steps| {
        let index = position.min(steps.len());
        steps.insert(index, ensure_id(step));
        Ok(())
    })
}

/// Remove the step at `position`
///
/// The start and end anchors are reset to a fresh endpoint placeholder
/// instead of being deleted, so removing them keeps the step count.
pub fn remove_step_from_flow(
    doc: &IntegrationDocument,
    flow_id: &str,
    position: usize,
) -> Result<IntegrationDocument> {
    let first = query::get_first_position(doc, flow_id);
    let last = query::get_last_position(doc, flow_id);
    with_steps(doc, flow_id, |steps| {
        if position >= steps.len() {
            return Err(FlowEditorError::out_of_range(flow_id, position, steps.len()));
        }
        if position == first || position == last {
            steps[position] = create_connection_step();
        } else {
            steps.remove(position);
        }
        Ok(())
    })
}

/// Replace the step at `position`
///
/// Unset fields fall back to a fresh blank step, which also back-fills a
/// missing ID. `position == len` appends.
pub fn set_step_in_flow(
    doc: &IntegrationDocument,
    flow_id: &str,
    step: Step,
    position: usize,
) -> Result<IntegrationDocument> {
    with_steps(doc, flow_id, |steps| {
        let step = step.merged_with(Step {
            id: Some(fresh_id()),
            ..Step::default()
        });
        match position.cmp(&steps.len()) {
            std::cmp::Ordering::Less => steps[position] = step,
            std::cmp::Ordering::Equal => steps.push(step),
            std::cmp::Ordering::Greater => {
                return Err(FlowEditorError::out_of_range(flow_id, position, steps.len()))
            }
        }
        Ok(())
    })
}

/// Encode configured property values for transport
///
/// Strings pass through; everything else is JSON-encoded.
pub fn stringify_values(properties: &Map<String, Value>) -> StringMap {
    properties
        .iter()
        .map(|(name, value)| {
            let encoded = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), encoded)
        })
        .collect()
}

pub fn set_configured_properties_on_step(step: Step, properties: &Map<String, Value>) -> Step {
    Step {
        configured_properties: stringify_values(properties),
        ..step
    }
}

/// Attach `action` unless the step already carries an action with the same ID
///
/// The step kind is forced to `step_kind`, or `endpoint` when not given.
pub fn set_action_on_step(step: Step, action: Action, step_kind: Option<StepKind>) -> Step {
    if step
        .action
        .as_ref()
        .is_some_and(|current| current.id == action.id)
    {
        return step;
    }
    Step {
        step_kind: Some(step_kind.unwrap_or(StepKind::Endpoint)),
        action: Some(action),
        ..step
    }
}

pub fn is_user_defined_data_shape(shape: Option<&DataShape>) -> bool {
    shape.is_some_and(DataShape::is_user_defined)
}

/// Keep the old shape when it was user defined, or when the new one names a
/// kind but carries no specification
fn preserve_shape(old: Option<&DataShape>, new: Option<&DataShape>) -> bool {
    is_user_defined_data_shape(old)
        || new.map_or(true, |shape| {
            shape.kind != DataShapeKind::None && shape.specification.is_none()
        })
}

/// Set a resolved descriptor on the step
///
/// Descriptor property defaults fill in configured properties the step does
/// not have yet. Existing data shapes survive when they were defined by hand
/// or when the incoming descriptor has nothing more specific.
pub fn set_descriptor_on_step(step: Step, descriptor: ActionDescriptor) -> Step {
    let Some(action) = step.action.clone() else {
        return Step {
            action: Some(Action {
                action_type: Some("step".to_string()),
                descriptor: Some(descriptor),
                ..Action::default()
            }),
            ..step
        };
    };

    let mut configured_properties = descriptor.property_defaults();
    configured_properties.extend(step.configured_properties.clone());

    let Some(old) = action.descriptor.as_ref() else {
        return Step {
            configured_properties,
            action: Some(Action {
                descriptor: Some(descriptor),
                ..action
            }),
            ..step
        };
    };

    let input_data_shape = if preserve_shape(old.input_data_shape.as_ref(), descriptor.input_data_shape.as_ref()) {
        old.input_data_shape.clone()
    } else {
        descriptor.input_data_shape.clone()
    };
    let output_data_shape = if preserve_shape(old.output_data_shape.as_ref(), descriptor.output_data_shape.as_ref()) {
        old.output_data_shape.clone()
    } else {
        descriptor.output_data_shape.clone()
    };
    let merged = ActionDescriptor {
        input_data_shape,
        output_data_shape,
        ..descriptor
    };

    Step {
        configured_properties,
        action: Some(Action {
            descriptor: Some(merged),
            ..action
        }),
        ..step
    }
}

/// Set the data shape in one direction, keeping the rest of the descriptor
pub fn set_data_shape_on_step(step: Step, shape: DataShape, is_input: bool) -> Step {
    let mut action = step.action.clone().unwrap_or_default();
    let descriptor = action.descriptor.get_or_insert_with(ActionDescriptor::default);
    if is_input {
        descriptor.input_data_shape = Some(shape);
    } else {
        descriptor.output_data_shape = Some(shape);
    }
    Step {
        action: Some(action),
        ..step
    }
}

/// Merge `metadata` into the step's metadata, overriding existing keys
pub fn add_metadata_to_step(step: Step, metadata: &StringMap) -> Step {
    let mut merged = step.metadata.clone();
    merged.extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
    Step {
        metadata: merged,
        ..step
    }
}

/// Set a top-level integration field by its wire name
///
/// Values for `configuredProperties` are transport-encoded first. An empty
/// key leaves the document unchanged.
pub fn set_integration_property(
    doc: &IntegrationDocument,
    key: &str,
    value: Value,
) -> Result<IntegrationDocument> {
    if key.is_empty() {
        return Ok(doc.clone());
    }
    let value = match value {
        Value::Object(properties) if key == CONFIGURED_PROPERTIES => {
            serde_json::to_value(stringify_values(&properties))?
        }
        other => other,
    };
    let mut raw = serde_json::to_value(doc)?;
    if let Value::Object(fields) = &mut raw {
        fields.insert(key.to_string(), value);
    }
    Ok(serde_json::from_value(raw)?)
}

/// A blank step of `kind` with catalog defaults applied
pub fn create_step_using_store(factory: &dyn StepFactory, kind: Option<StepKind>) -> Step {
    Step {
        id: Some(fresh_id()),
        step_kind: kind,
        ..factory.create_step(kind)
    }
}

/// A fresh endpoint placeholder without a connection
pub fn create_connection_step() -> Step {
    Step::placeholder()
}

pub fn create_step_with_connection(connection: Connection) -> Step {
    create_connection_step().with_connection(connection)
}

/// Final clean-up before handing the document to the store
///
/// Assigns IDs to flows and steps missing one, drops steps without a kind
/// and adds the connector IDs in use to the tags. Running it twice gives
/// the same document.
pub fn prepare_integration_for_saving(doc: &IntegrationDocument) -> IntegrationDocument {
    let mut next = doc.clone();
    for flow in &mut next.flows {
        if flow.id.is_empty() {
            flow.id = fresh_id();
        }
        flow.steps.retain(|step| step.step_kind.is_some());
        for step in &mut flow.steps {
            if step.id.is_none() {
                step.id = Some(fresh_id());
            }
        }
    }
    let connector_ids: Vec<String> = next
        .flows
        .iter()
        .flat_map(|flow| flow.steps.iter())
        .filter(|step| step.is_connection())
        .filter_map(|step| step.connector_id().map(str::to_string))
        .collect();
    next.tags.extend(connector_ids);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StepCatalog;
    use crate::constants::metadata_keys;
    use crate::types::{ActionDescriptorStep, ConfigurationProperty};
    use serde_json::json;

    fn step(id: &str, kind: StepKind) -> Step {
        Step::new(kind).with_id(id)
    }

    fn doc_with(steps: Vec<Step>) -> IntegrationDocument {
        IntegrationDocument::new("test").with_flow(Flow::new("f").with_steps(steps))
    }

    fn five_steps() -> IntegrationDocument {
        doc_with(vec![
            step("a", StepKind::Endpoint),
            step("b", StepKind::Log),
            step("c", StepKind::Mapper),
            step("d", StepKind::Headers),
            step("e", StepKind::Endpoint),
        ])
    }

    fn step_ids(doc: &IntegrationDocument) -> Vec<String> {
        doc.flows[0]
            .steps
            .iter()
            .map(|s| s.id.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_insert_after_and_before() {
        let doc = five_steps();
        let after = insert_step_into_flow_after(&doc, "f", step("x", StepKind::Log), 1).unwrap();
        assert_eq!(step_ids(&after), vec!["a", "b", "x", "c", "d", "e"]);

        let before = insert_step_into_flow_before(&doc, "f", step("y", StepKind::Mapper), 1).unwrap();
        assert_eq!(step_ids(&before), vec!["a", "y", "b", "c", "d", "e"]);

        // Input untouched
        assert_eq!(step_ids(&doc), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_insert_after_extreme_position_appends() {
        let doc = five_steps();
        let after = insert_step_into_flow_after(&doc, "f", step("x", StepKind::Log), usize::MAX).unwrap();
        assert_eq!(step_ids(&after), vec!["a", "b", "c", "d", "e", "x"]);
    }

    #[test]
    fn test_insert_assigns_missing_id() {
        let doc = five_steps();
        let next = insert_step_into_flow_after(&doc, "f", Step::default(), 0).unwrap();
        assert!(next.flows[0].steps[1].id.is_some());
    }

    #[test]
    fn test_insert_into_unknown_flow_fails() {
        let doc = five_steps();
        let result = insert_step_into_flow_after(&doc, "nope", Step::default(), 0);
        assert!(matches!(result, Err(FlowEditorError::UnknownFlow(id)) if id == "nope"));
    }

    #[test]
    fn test_remove_anchor_keeps_count() {
        let doc = five_steps();
        for position in [0, 4] {
            let next = remove_step_from_flow(&doc, "f", position).unwrap();
            let steps = &next.flows[0].steps;
            assert_eq!(steps.len(), 5);
            assert_eq!(steps[position].step_kind, Some(StepKind::Endpoint));
            assert!(steps[position].connection.is_none());
            assert_ne!(steps[position].id, doc.flows[0].steps[position].id);
        }
    }

    #[test]
    fn test_remove_middle_splices() {
        let doc = five_steps();
        let next = remove_step_from_flow(&doc, "f", 2).unwrap();
        assert_eq!(step_ids(&next), vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn test_remove_out_of_range_fails() {
        let doc = five_steps();
        let result = remove_step_from_flow(&doc, "f", 5);
        assert!(matches!(
            result,
            Err(FlowEditorError::PositionOutOfRange { position: 5, len: 5, .. })
        ));
    }

    #[test]
    fn test_set_step_round_trip() {
        let doc = five_steps();
        for position in 0..5 {
            let current = query::get_step(&doc, "f", position).cloned().unwrap();
            let next = set_step_in_flow(&doc, "f", current, position).unwrap();
            assert_eq!(next, doc);
        }
    }

    #[test]
    fn test_set_step_back_fills_id_and_appends() {
        let doc = five_steps();
        let incoming = Step {
            step_kind: Some(StepKind::Template),
            ..Default::default()
        };
        let next = set_step_in_flow(&doc, "f", incoming.clone(), 5).unwrap();
        assert_eq!(next.flows[0].steps.len(), 6);
        assert!(next.flows[0].steps[5].id.is_some());

        assert!(set_step_in_flow(&doc, "f", incoming, 7).is_err());
    }

    #[test]
    fn test_stringify_configured_properties() {
        let doc = IntegrationDocument::new("test");
        let next = set_integration_property(&doc, "configuredProperties", json!({"a": 1, "b": "x"})).unwrap();
        assert_eq!(next.configured_properties.get("a").map(String::as_str), Some("1"));
        assert_eq!(next.configured_properties.get("b").map(String::as_str), Some("x"));

        let nested = stringify_values(json!({"c": {"d": [1, 2]}, "e": true}).as_object().unwrap());
        assert_eq!(nested.get("c").map(String::as_str), Some(r#"{"d":[1,2]}"#));
        assert_eq!(nested.get("e").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_set_integration_property_by_wire_name() {
        let doc = IntegrationDocument::new("old");
        let next = set_integration_property(&doc, "name", json!("new")).unwrap();
        assert_eq!(next.name, "new");
        assert_eq!(doc.name, "old");

        let next = set_integration_property(&doc, "currentState", json!("Draft")).unwrap();
        assert_eq!(next.extra.get("currentState"), Some(&json!("Draft")));

        let unchanged = set_integration_property(&doc, "", json!("ignored")).unwrap();
        assert_eq!(unchanged, doc);
    }

    #[test]
    fn test_set_action_skips_same_action() {
        let original = Step::default().with_action(Action::new("timer-action"));
        let same = set_action_on_step(original.clone(), Action::new("timer-action"), None);
        assert_eq!(same, original);

        let changed = set_action_on_step(original, Action::new("http-action"), None);
        assert_eq!(changed.step_kind, Some(StepKind::Endpoint));
        assert_eq!(changed.action.and_then(|a| a.id).as_deref(), Some("http-action"));
    }

    #[test]
    fn test_set_descriptor_on_step_without_action() {
        let descriptor = ActionDescriptor::with_shapes(DataShape::any(), DataShape::any());
        let next = set_descriptor_on_step(Step::new(StepKind::Extension), descriptor.clone());
        let action = next.action.unwrap();
        assert_eq!(action.action_type.as_deref(), Some("step"));
        assert_eq!(action.descriptor, Some(descriptor));
    }

    #[test]
    fn test_set_descriptor_preserves_user_defined_shape() {
        let mut user_shape = DataShape::new(DataShapeKind::JsonInstance).with_specification("{}");
        user_shape
            .metadata
            .insert(metadata_keys::USER_DEFINED.into(), "true".into());
        let old = ActionDescriptor::with_shapes(user_shape.clone(), DataShape::none());
        let mut current = Step::new(StepKind::Endpoint)
            .with_action(Action::new("a").with_descriptor(old));
        current
            .configured_properties
            .insert("period".into(), "5000".into());

        let mut page = ActionDescriptorStep::default();
        for (name, default) in [("period", "60000"), ("unit", "ms")] {
            page.properties.insert(
                name.into(),
                ConfigurationProperty {
                    default_value: Some(default.into()),
                    ..Default::default()
                },
            );
        }
        let incoming = ActionDescriptor {
            input_data_shape: Some(DataShape::new(DataShapeKind::JsonSchema).with_specification("{\"type\":\"object\"}")),
            output_data_shape: Some(DataShape::new(DataShapeKind::JsonSchema).with_specification("{}")),
            property_definition_steps: vec![page],
        };

        let next = set_descriptor_on_step(current, incoming);
        let descriptor = next.descriptor().unwrap();
        assert_eq!(descriptor.input_data_shape.as_ref(), Some(&user_shape));
        assert_eq!(
            descriptor.output_data_shape.as_ref().map(|s| s.kind),
            Some(DataShapeKind::JsonSchema)
        );
        assert_eq!(next.configured_properties.get("period").map(String::as_str), Some("5000"));
        assert_eq!(next.configured_properties.get("unit").map(String::as_str), Some("ms"));
    }

    #[test]
    fn test_set_data_shape_and_metadata() {
        let shape = DataShape::new(DataShapeKind::Java);
        let next = set_data_shape_on_step(Step::new(StepKind::Extension), shape.clone(), false);
        let descriptor = next.descriptor().unwrap();
        assert_eq!(descriptor.output_data_shape.as_ref(), Some(&shape));
        assert!(descriptor.input_data_shape.is_none());

        let mut first = StringMap::new();
        first.insert("a".into(), "1".into());
        let mut second = StringMap::new();
        second.insert("a".into(), "2".into());
        second.insert("b".into(), "3".into());
        let next = add_metadata_to_step(add_metadata_to_step(next, &first), &second);
        assert_eq!(next.metadata.get("a").map(String::as_str), Some("2"));
        assert_eq!(next.metadata.len(), 2);
    }

    #[test]
    fn test_prepare_for_saving_is_idempotent() {
        let mut doc = doc_with(vec![
            Step {
                step_kind: Some(StepKind::Endpoint),
                connection: Some(Connection::for_connector("timer")),
                ..Default::default()
            },
            Step::default(),
            Step {
                step_kind: Some(StepKind::Log),
                ..Default::default()
            },
            create_step_with_connection(Connection::for_connector("http")),
        ]);
        doc.flows.push(Flow::default().with_steps(vec![create_connection_step()]));
        doc.tags.insert("custom".into());

        let once = prepare_integration_for_saving(&doc);
        assert_eq!(once.flows[0].steps.len(), 3);
        assert!(once.flows.iter().all(|f| !f.id.is_empty()));
        assert!(once.flows.iter().flat_map(|f| &f.steps).all(|s| s.id.is_some()));
        let tags: Vec<&str> = once.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["custom", "http", "timer"]);

        let twice = prepare_integration_for_saving(&once);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_set_flow_adds_or_replaces() {
        let doc = IntegrationDocument::new("test");
        let doc = set_flow(&doc, create_flow_with_id("f"));
        assert_eq!(doc.flows.len(), 1);
        assert_eq!(doc.flows[0].steps.len(), 2);

        let doc = set_flow(&doc, Flow::new("f").with_type(crate::types::FlowType::ApiProvider));
        assert_eq!(doc.flows.len(), 1);
        assert!(doc.flows[0].steps.is_empty());
    }

    #[test]
    fn test_create_step_using_catalog() {
        let catalog = StepCatalog::default();
        let mapper = create_step_using_store(&catalog, Some(StepKind::Mapper));
        let other = create_step_using_store(&catalog, Some(StepKind::Mapper));
        assert_eq!(mapper.step_kind, Some(StepKind::Mapper));
        assert!(mapper.name.is_some());
        assert_ne!(mapper.id, other.id);

        let blank = create_step_using_store(&catalog, None);
        assert!(blank.step_kind.is_none());
        assert!(blank.id.is_some());
    }
}
