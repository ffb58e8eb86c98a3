use super::definition::FlowDefinition;
use crate::error::DefinitionError;

/// A trait for custom data models that can be converted into a `FlowDefinition`.
///
/// This is the extension point for authoring formats other than the canonical
/// JSON. Implement it on your own configuration structs to translate them into
/// steps the `DefinitionReader` understands.
///
/// # Example
///
/// ```rust,no_run
/// use renraku::declarative::{FlowDefinition, IntoFlow, StepDefinition};
/// use renraku::error::DefinitionError;
///
/// struct Announcement { message: String }
///
/// impl IntoFlow for Announcement {
///     fn into_flow(self) -> Result<FlowDefinition, DefinitionError> {
///         Ok(FlowDefinition {
///             name: "Announcement".to_string(),
///             flow_type: None,
///             description: None,
///             steps: vec![
///                 StepDefinition::new("playPrompt").with_field("text", self.message),
///                 StepDefinition::new("disconnect"),
///             ],
///         })
///     }
/// }
/// ```
pub trait IntoFlow {
    /// Consumes the object and converts it into a flow definition.
    fn into_flow(self) -> Result<FlowDefinition, DefinitionError>;
}

impl IntoFlow for FlowDefinition {
    fn into_flow(self) -> Result<FlowDefinition, DefinitionError> {
        Ok(self)
    }
}
