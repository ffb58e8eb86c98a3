use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The canonical declarative form of a flow, ready to be read into a graph.
/// This is the target structure for any custom format conversion.
///
/// ```json
/// {
///   "name": "Main menu",
///   "type": "CONTACT_FLOW",
///   "steps": [
///     { "type": "playPrompt", "text": "Hi" },
///     { "type": "disconnect" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub name: String,
    /// Flow type name, e.g. `CONTACT_FLOW`. Defaults to a contact flow.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub flow_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl FlowDefinition {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        serde_json::from_str(json).map_err(|e| DefinitionError::JsonParseError(e.to_string()))
    }
}

/// One step. Everything besides `type` and `label` is step-specific and is
/// interpreted by the parser registered for the step type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StepDefinition {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            label: None,
            fields: Map::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    fn missing(&self, field: &str) -> DefinitionError {
        DefinitionError::MissingField {
            step_type: self.step_type.clone(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(&self, field: &str, message: impl Into<String>) -> DefinitionError {
        DefinitionError::InvalidField {
            step_type: self.step_type.clone(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Deserializes an optional field into `T`.
    pub fn optional<T: serde::de::DeserializeOwned>(
        &self,
        field: &str,
    ) -> Result<Option<T>, DefinitionError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| self.invalid(field, e.to_string())),
        }
    }

    /// Deserializes a required field into `T`.
    pub fn required<T: serde::de::DeserializeOwned>(&self, field: &str) -> Result<T, DefinitionError> {
        self.optional(field)?.ok_or_else(|| self.missing(field))
    }

    /// A nested step list, e.g. the body of a route. Absent means empty.
    pub fn steps(&self, field: &str) -> Result<Vec<StepDefinition>, DefinitionError> {
        Ok(self.optional(field)?.unwrap_or_default())
    }
}
