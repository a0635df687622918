//! Catalog of built-in step definitions
//!
//! Maps a [`StepKind`] to the defaults a freshly created step of that kind
//! starts with. Hosts can register extra kinds or override the built-ins.
//!
//! ```ignore
//! use flow_editor::{StepCatalog, StepDefinition, StepKind};
//!
//! let mut catalog = StepCatalog::default();
//! catalog.register(StepDefinition::new(StepKind::Log, "Audit log"));
//! ```

use std::collections::BTreeMap;

use crate::services::StepFactory;
use crate::types::{
    fresh_id, Action, ActionDescriptor, ConfigurationProperty, DataShape, Step, StepKind,
};

/// Defaults for one kind of step
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    pub kind: StepKind,
    pub name: String,
    /// Shown by step pickers, not stored on the step
    pub description: String,
    /// Property definitions offered by the configuration form
    pub properties: BTreeMap<String, ConfigurationProperty>,
    /// Descriptor pre-set on the step's action
    pub descriptor: Option<ActionDescriptor>,
}

impl StepDefinition {
    pub fn new(kind: StepKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: String::new(),
            properties: BTreeMap::new(),
            descriptor: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: ConfigurationProperty) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_descriptor(mut self, descriptor: ActionDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// A blank step built from this definition
    fn instantiate(&self) -> Step {
        Step {
            id: Some(fresh_id()),
            step_kind: Some(self.kind),
            name: Some(self.name.clone()),
            action: self.descriptor.clone().map(|descriptor| Action {
                action_type: Some("step".to_string()),
                descriptor: Some(descriptor),
                ..Action::default()
            }),
            ..Step::default()
        }
    }
}

fn optional_property(property_type: &str, display_name: &str) -> ConfigurationProperty {
    ConfigurationProperty {
        display_name: Some(display_name.to_string()),
        property_type: Some(property_type.to_string()),
        required: Some(false),
        ..Default::default()
    }
}

fn builtin_definitions() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(StepKind::Mapper, "Data Mapper")
            .with_description("Map fields from the input type to the output type."),
        StepDefinition::new(StepKind::RuleFilter, "Basic Filter").with_description(
            "Continue the integration only if criteria you specify in simple input fields are met.",
        ),
        StepDefinition::new(StepKind::Template, "Template")
            .with_description("Render a template to define consistent output data."),
        StepDefinition::new(StepKind::ExpressionFilter, "Advanced Filter")
            .with_description(
                "Continue the integration only if criteria you define in scripting language expressions are met.",
            )
            .with_property(
                "filter",
                ConfigurationProperty {
                    required: Some(true),
                    ..optional_property("textarea", "Only continue if")
                },
            ),
        StepDefinition::new(StepKind::Choice, "Conditional Flows")
            .with_description("Sends the message to different flows based on condition evaluation")
            .with_descriptor(ActionDescriptor::with_shapes(DataShape::none(), DataShape::any())),
        StepDefinition::new(StepKind::Log, "Log")
            .with_description("Send a message to the integration's log.")
            .with_property("contextLoggingEnabled", optional_property("boolean", "Message Context"))
            .with_property("bodyLoggingEnabled", optional_property("boolean", "Message Body"))
            .with_property("customText", optional_property("string", "Custom Text")),
        StepDefinition::new(StepKind::Split, "Split")
            .with_description("Process each item in a set of data individually"),
        StepDefinition::new(StepKind::Aggregate, "Aggregate")
            .with_description("End processing items in a foreach"),
        StepDefinition::new(StepKind::Headers, "Set Headers")
            .with_description("Set headers on the message passed to the next step"),
    ]
}

/// Registry of step definitions keyed by kind
#[derive(Debug, Clone)]
pub struct StepCatalog {
    definitions: Vec<StepDefinition>,
}

impl StepCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Register a definition, replacing any existing one of the same kind
    pub fn register(&mut self, definition: StepDefinition) {
        match self.definitions.iter_mut().find(|d| d.kind == definition.kind) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    pub fn get(&self, kind: StepKind) -> Option<&StepDefinition> {
        self.definitions.iter().find(|d| d.kind == kind)
    }

    /// All definitions in registration order
    pub fn definitions(&self) -> &[StepDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for StepCatalog {
    /// A catalog holding the built-in step kinds
    fn default() -> Self {
        let mut catalog = Self::new();
        for definition in builtin_definitions() {
            catalog.register(definition);
        }
        catalog
    }
}

impl StepFactory for StepCatalog {
    fn create_step(&self, kind: Option<StepKind>) -> Step {
        match kind.and_then(|k| self.get(k)) {
            Some(definition) => definition.instantiate(),
            None => Step {
                id: Some(fresh_id()),
                step_kind: kind,
                ..Step::default()
            },
        }
    }
}
