use super::conversion::IntoFlow;
use super::definition::{FlowDefinition, StepDefinition};
use super::parsing::{create_parser_by_name, register_default_parsers, Nested, StepParser};
use crate::builder::{FlowBuilder, Sequence};
use crate::error::DefinitionError;
use crate::graph::{FlowGraph, FlowType};
use crate::reference::NamespaceTable;
use ahash::AHashMap;
use std::sync::Arc;
use tracing::debug;

/// Reads declarative flow definitions into frozen graphs, one registered
/// `StepParser` per step type.
pub struct DefinitionReader {
    registry: AHashMap<String, Box<dyn StepParser>>,
    namespaces: Arc<NamespaceTable>,
}

impl Default for DefinitionReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionReader {
    pub fn new() -> Self {
        let mut registry: AHashMap<String, Box<dyn StepParser>> = AHashMap::new();
        register_default_parsers(&mut registry);
        Self {
            registry,
            namespaces: Arc::new(NamespaceTable::default()),
        }
    }

    /// Lets a custom step name stand for one of the standard step types.
    pub fn with_type_mapping(mut self, user_type_name: &str, step_type: &str) -> Self {
        if let Some(parser) = create_parser_by_name(step_type) {
            self.registry.insert(user_type_name.to_string(), parser);
        }
        self
    }

    pub fn with_custom_parser(mut self, parser: Box<dyn StepParser>) -> Self {
        self.registry.insert(parser.step_type().to_string(), parser);
        self
    }

    pub fn with_namespaces(mut self, namespaces: Arc<NamespaceTable>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn read_json(&self, json: &str) -> Result<FlowGraph, DefinitionError> {
        self.read(&FlowDefinition::from_json(json)?)
    }

    /// Converts a custom format and reads the result.
    pub fn read_from(&self, source: impl IntoFlow) -> Result<FlowGraph, DefinitionError> {
        self.read(&source.into_flow()?)
    }

    pub fn read(&self, definition: &FlowDefinition) -> Result<FlowGraph, DefinitionError> {
        let flow_type = match &definition.flow_type {
            Some(name) => FlowType::parse(name).ok_or_else(|| DefinitionError::InvalidField {
                step_type: "flow".to_string(),
                field: "type".to_string(),
                message: format!("unknown flow type '{}'", name),
            })?,
            None => FlowType::default(),
        };
        debug!(flow = %definition.name, steps = definition.steps.len(), "reading definition");

        let mut builder = FlowBuilder::new(definition.name.clone())
            .with_type(flow_type)
            .with_namespaces(Arc::clone(&self.namespaces));
        if let Some(description) = &definition.description {
            builder = builder.with_description(description.clone());
        }

        let mut nested = Nested::new(self);
        builder.with_sequence(|sequence| nested.run(&definition.steps, sequence));
        nested.finish()?;
        Ok(builder.build()?)
    }

    /// Appends `steps` to `sequence` in order.
    pub fn apply(
        &self,
        steps: &[StepDefinition],
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        for (index, step) in steps.iter().enumerate() {
            let parser = self.registry.get(&step.step_type).ok_or_else(|| {
                DefinitionError::UnknownStepType {
                    index,
                    type_name: step.step_type.clone(),
                }
            })?;
            if let Some(label) = &step.label {
                sequence.label(label.as_str());
            }
            parser.parse(step, self, sequence)?;

            if !parser.handles_errors() {
                if let Some(handler) = step.optional::<Vec<StepDefinition>>("onError")? {
                    let mut nested = Nested::new(self);
                    sequence.on_error(|s| nested.run(&handler, s));
                    nested.finish()?;
                }
            }
        }
        Ok(())
    }
}
