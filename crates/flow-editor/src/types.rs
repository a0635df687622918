//! Core types for integration documents
//!
//! These types define the in-memory tree the editor works on:
//! an integration holds ordered flows, and each flow holds ordered steps.
//! Field names serialize in camelCase to match the integration store's JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{connectors, flow_metadata, metadata_keys};

/// Unique identifier for a step
pub type StepId = String;

/// Unique identifier for a flow
pub type FlowId = String;

/// String-to-string map used for properties and metadata
pub type StringMap = BTreeMap<String, String>;

/// Generate a fresh identifier for a step or flow
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The kind of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// A step wrapping a connection and one of its actions
    Endpoint,
    /// Alias of `Endpoint` used by some stores
    Connector,
    /// Filter using scripting language expressions
    ExpressionFilter,
    /// Filter using simple rules
    RuleFilter,
    /// Step provided by a custom extension
    Extension,
    /// Data mapper between two data shapes
    Mapper,
    /// Content based router spawning alternate flows
    Choice,
    /// Splits a collection into individual messages
    Split,
    /// Aggregates split messages back into a collection
    Aggregate,
    /// Writes to the integration log
    Log,
    /// Sets message headers
    Headers,
    /// Renders a template
    Template,
}

impl StepKind {
    /// Whether steps of this kind wrap a connection
    pub fn is_connection(&self) -> bool {
        matches!(self, StepKind::Endpoint | StepKind::Connector)
    }

    /// The wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Endpoint => "endpoint",
            StepKind::Connector => "connector",
            StepKind::ExpressionFilter => "expressionFilter",
            StepKind::RuleFilter => "ruleFilter",
            StepKind::Extension => "extension",
            StepKind::Mapper => "mapper",
            StepKind::Choice => "choice",
            StepKind::Split => "split",
            StepKind::Aggregate => "aggregate",
            StepKind::Log => "log",
            StepKind::Headers => "headers",
            StepKind::Template => "template",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a data shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataShapeKind {
    /// Accepts or produces anything
    Any,
    /// Java class
    Java,
    /// JSON schema document
    JsonSchema,
    /// Example JSON instance
    JsonInstance,
    /// XML schema document
    XmlSchema,
    /// XML schema produced by inspection
    XmlSchemaInspected,
    /// Example XML instance
    XmlInstance,
    /// No data
    #[default]
    None,
}

/// Typed description of the payload a step accepts or produces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataShape {
    /// Shape kind; absent means `none`
    #[serde(default)]
    pub kind: DataShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema or example payload, depending on the kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    /// Type name (e.g. a Java class)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: StringMap,
}

impl DataShape {
    /// Create a data shape of the given kind
    pub fn new(kind: DataShapeKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Shape accepting or producing anything
    pub fn any() -> Self {
        Self::new(DataShapeKind::Any)
    }

    /// Shape carrying no data
    pub fn none() -> Self {
        Self::new(DataShapeKind::None)
    }

    /// Attach a specification
    pub fn with_specification(mut self, specification: impl Into<String>) -> Self {
        self.specification = Some(specification.into());
        self
    }

    /// Whether this shape carries no usable type information
    pub fn is_shapeless(&self) -> bool {
        matches!(self.kind, DataShapeKind::Any | DataShapeKind::None)
    }

    /// Whether the user defined this shape by hand
    pub fn is_user_defined(&self) -> bool {
        self.metadata
            .get(metadata_keys::USER_DEFINED)
            .is_some_and(|v| v == "true")
    }
}

/// Definition of a configurable property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Widget/value type (e.g. "string", "boolean", "textarea")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// A page of property definitions in an action descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptorStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, ConfigurationProperty>,
}

/// Resolved description of an action's data shapes and properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data_shape: Option<DataShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data_shape: Option<DataShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_definition_steps: Vec<ActionDescriptorStep>,
}

impl ActionDescriptor {
    /// Create a descriptor with the given input and output shapes
    pub fn with_shapes(input: DataShape, output: DataShape) -> Self {
        Self {
            input_data_shape: Some(input),
            output_data_shape: Some(output),
            property_definition_steps: Vec::new(),
        }
    }

    /// The data shape in the requested direction
    pub fn data_shape(&self, is_input: bool) -> Option<&DataShape> {
        if is_input {
            self.input_data_shape.as_ref()
        } else {
            self.output_data_shape.as_ref()
        }
    }

    /// Default configured property values declared by the property definitions
    pub fn property_defaults(&self) -> StringMap {
        self.property_definition_steps
            .iter()
            .flat_map(|page| page.properties.iter())
            .filter_map(|(name, prop)| {
                prop.default_value
                    .as_ref()
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}

/// How an action participates in a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionPattern {
    /// Consumes from the connection (start of a flow)
    From,
    /// Produces to the connection
    To,
    Pipe,
    PollEnrich,
}

/// An action offered by a connector or step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// "connector" or "step"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ActionPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<ActionDescriptor>,
}

impl Action {
    /// Create an action with the given ID
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Set the route pattern
    pub fn with_pattern(mut self, pattern: ActionPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Set the descriptor
    pub fn with_descriptor(mut self, descriptor: ActionDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }
}

/// A connector type (e.g. "http", "timer")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A configured instance of a connector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: StringMap,
}

impl Connection {
    /// Create a connection for the given connector
    pub fn for_connector(connector_id: impl Into<String>) -> Self {
        Self {
            connector_id: Some(connector_id.into()),
            ..Default::default()
        }
    }

    /// Whether the connector offers at least one action with the given pattern
    pub fn has_action_pattern(&self, pattern: ActionPattern) -> bool {
        self.connector
            .as_ref()
            .is_some_and(|c| c.actions.iter().any(|a| a.pattern == Some(pattern)))
    }
}

/// A node in a flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique identifier, assigned on creation and never reassigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StepId>,
    /// Kind of step; absent for an unconfigured step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_kind: Option<StepKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Connection, only on connection-kind steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Configured properties, string-serialized for transport
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configured_properties: StringMap,
    /// Out-of-band flags such as `configured: "true"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: StringMap,
    /// Opaque resource references, not interpreted by the editor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<serde_json::Value>,
}

impl Step {
    /// Create a step of the given kind with a fresh ID
    pub fn new(kind: StepKind) -> Self {
        Self {
            id: Some(fresh_id()),
            step_kind: Some(kind),
            ..Default::default()
        }
    }

    /// Fresh, unconfigured endpoint step used for start/end anchors
    pub fn placeholder() -> Self {
        Self::new(StepKind::Endpoint)
    }

    /// Set the step ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a connection
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Attach an action
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Whether this step wraps a connection
    pub fn is_connection(&self) -> bool {
        self.step_kind.is_some_and(|k| k.is_connection())
    }

    /// Whether this step is of the given kind
    pub fn is_kind(&self, kind: StepKind) -> bool {
        self.step_kind == Some(kind)
    }

    /// Connector ID of the wrapped connection, if any
    pub fn connector_id(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .and_then(|c| c.connector_id.as_deref())
    }

    /// The resolved action descriptor, if any
    pub fn descriptor(&self) -> Option<&ActionDescriptor> {
        self.action.as_ref().and_then(|a| a.descriptor.as_ref())
    }

    /// Fill any unset field from `defaults`
    pub fn merged_with(self, defaults: Step) -> Step {
        Step {
            id: self.id.or(defaults.id),
            step_kind: self.step_kind.or(defaults.step_kind),
            name: self.name.or(defaults.name),
            connection: self.connection.or(defaults.connection),
            action: self.action.or(defaults.action),
            configured_properties: if self.configured_properties.is_empty() {
                defaults.configured_properties
            } else {
                self.configured_properties
            },
            metadata: if self.metadata.is_empty() {
                defaults.metadata
            } else {
                self.metadata
            },
            dependencies: if self.dependencies.is_empty() {
                defaults.dependencies
            } else {
                self.dependencies
            },
        }
    }
}

/// The type of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
    Primary,
    ApiProvider,
    Alternate,
}

/// One execution path within an integration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Stable identifier, independent of the flow's position
    #[serde(default)]
    pub id: FlowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent means primary
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub flow_type: Option<FlowType>,
    /// For alternate flows: `kind` and the spawning `stepId`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: StringMap,
    /// Ordered steps; position is the addressing scheme
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Flow {
    /// Create an empty flow with the given ID
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Set the flow's steps
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    /// Set the flow type
    pub fn with_type(mut self, flow_type: FlowType) -> Self {
        self.flow_type = Some(flow_type);
        self
    }

    /// Effective type, treating absence as primary
    pub fn effective_type(&self) -> FlowType {
        self.flow_type.unwrap_or(FlowType::Primary)
    }

    fn start_connector_is(&self, connector_id: &str) -> bool {
        self.steps
            .first()
            .and_then(Step::connector_id)
            .is_some_and(|id| id == connector_id)
    }

    pub fn is_primary(&self) -> bool {
        self.effective_type() == FlowType::Primary
    }

    /// Whether this flow implements an API provider operation
    pub fn is_api_provider(&self) -> bool {
        self.flow_type == Some(FlowType::ApiProvider)
            || self.start_connector_is(connectors::API_PROVIDER)
    }

    /// Whether this flow is an alternate flow spawned by another step
    pub fn is_alternate(&self) -> bool {
        self.flow_type == Some(FlowType::Alternate) || self.start_connector_is(connectors::FLOW)
    }

    pub fn is_conditional(&self) -> bool {
        self.is_alternate()
            && self.metadata.get(flow_metadata::KIND).map(String::as_str)
                == Some(flow_metadata::CONDITIONAL)
    }

    pub fn is_default(&self) -> bool {
        self.is_alternate()
            && self.metadata.get(flow_metadata::KIND).map(String::as_str)
                == Some(flow_metadata::DEFAULT)
    }
}

/// An integration: a named set of flows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationDocument {
    /// Absent until the first successful save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Required for the document to be valid
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered flows; index 0 is the primary flow absent other markers
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configured_properties: StringMap,
    /// Connector IDs used, for indexing by the store
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Concurrency marker set by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Concurrency marker set by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// Store fields the editor does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IntegrationDocument {
    /// Create an unsaved document with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a flow
    pub fn with_flow(mut self, flow: Flow) -> Self {
        self.flows.push(flow);
        self
    }

    /// Find a flow by ID
    pub fn find_flow(&self, flow_id: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.id == flow_id)
    }

    /// Find a flow by ID (mutable)
    pub fn find_flow_mut(&mut self, flow_id: &str) -> Option<&mut Flow> {
        self.flows.iter_mut().find(|f| f.id == flow_id)
    }
}
