use super::definition::StepDefinition;
use super::reader::DefinitionReader;
use crate::builder::Sequence;
use crate::error::DefinitionError;
use crate::graph::{
    DigitInput, ExternalCall, FallbackTrigger, FallbackTriggerSet, InputConfiguration, Operator,
    Prompt, SpeechInput,
};
use crate::reference::AttributeReference;
use ahash::AHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Defines the contract for turning one declarative step type into builder calls.
pub trait StepParser: Send + Sync {
    fn step_type(&self) -> &str;

    /// Appends the step to `sequence`. Nested step lists go back through `reader`.
    fn parse(
        &self,
        step: &StepDefinition,
        reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError>;

    /// True when the step interprets `onError` itself instead of getting the
    /// generic error handler.
    fn handles_errors(&self) -> bool {
        false
    }
}

/// Collects the first error raised inside builder closures, which can't return one.
pub(crate) struct Nested<'r> {
    reader: &'r DefinitionReader,
    error: Option<DefinitionError>,
}

impl<'r> Nested<'r> {
    pub(crate) fn new(reader: &'r DefinitionReader) -> Self {
        Self {
            reader,
            error: None,
        }
    }

    pub(crate) fn run(&mut self, steps: &[StepDefinition], sequence: &mut Sequence<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.reader.apply(steps, sequence) {
            self.error = Some(e);
        }
    }

    pub(crate) fn finish(self) -> Result<(), DefinitionError> {
        self.error.map_or(Ok(()), Err)
    }
}

/// Master macro for the step types that take a single string field, plus the
/// registration and lookup of every standard parser.
macro_rules! define_step_parsers {
    ( $( ($struct_name:ident, $step_type:literal, $field:literal, $method:ident) ),* $(,)? ; $( ($custom:ident, $custom_type:literal) ),* $(,)? ) => {
        // 1. Single-field parsers
        $(
            struct $struct_name;
            impl StepParser for $struct_name {
                fn step_type(&self) -> &str { $step_type }
                fn parse(&self, step: &StepDefinition, _reader: &DefinitionReader, sequence: &mut Sequence<'_>) -> Result<(), DefinitionError> {
                    let value: String = step.required($field)?;
                    sequence.$method(value.as_str());
                    Ok(())
                }
            }
        )*

        // 2. Register every default parser
        pub(super) fn register_default_parsers(registry: &mut AHashMap<String, Box<dyn StepParser>>) {
            $( registry.insert($step_type.to_string(), Box::new($struct_name)); )*
            $( registry.insert($custom_type.to_string(), Box::new($custom)); )*
        }

        // 3. Create a parser by its step type name
        pub(super) fn create_parser_by_name(name: &str) -> Option<Box<dyn StepParser>> {
            match name {
                $( $step_type => Some(Box::new($struct_name)), )*
                $( $custom_type => Some(Box::new($custom)), )*
                _ => None,
            }
        }
    };
}

define_step_parsers! {
    (PlayPromptParser, "playPrompt", "text", play_prompt),
    (PlaySsmlParser, "playSsml", "ssml", play_ssml),
    (PlayLibraryPromptParser, "playLibraryPrompt", "prompt", play_library_prompt),
    (TransferToFlowParser, "transferToFlow", "flow", transfer_to_flow),
    (JumpToParser, "jumpTo", "label", jump_to),

    ; // Separator between single-field and hand-written parsers

    (DisconnectParser, "disconnect"),
    (WaitParser, "wait"),
    (LoopParser, "loop"),
    (SetAttributesParser, "setAttributes"),
    (InvokeExternalParser, "invokeExternal"),
    (TransferToQueueParser, "transferToQueue"),
    (BranchParser, "branch"),
    (GetCustomerInputParser, "getCustomerInput")
}

struct DisconnectParser;
impl StepParser for DisconnectParser {
    fn step_type(&self) -> &str {
        "disconnect"
    }
    fn parse(
        &self,
        _step: &StepDefinition,
        _reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        sequence.disconnect();
        Ok(())
    }
}

struct WaitParser;
impl StepParser for WaitParser {
    fn step_type(&self) -> &str {
        "wait"
    }
    fn parse(
        &self,
        step: &StepDefinition,
        _reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        sequence.wait(step.required("seconds")?);
        Ok(())
    }
}

struct LoopParser;
impl StepParser for LoopParser {
    fn step_type(&self) -> &str {
        "loop"
    }
    fn parse(
        &self,
        step: &StepDefinition,
        _reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        let label: String = step.required("to")?;
        let count: u32 = step.required("count")?;
        sequence.loop_to(&label, count);
        Ok(())
    }
}

struct SetAttributesParser;
impl StepParser for SetAttributesParser {
    fn step_type(&self) -> &str {
        "setAttributes"
    }
    fn parse(
        &self,
        step: &StepDefinition,
        _reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        let attributes: BTreeMap<String, String> = step.required("attributes")?;
        sequence.set_attributes(attributes);
        Ok(())
    }
}

struct InvokeExternalParser;
impl StepParser for InvokeExternalParser {
    fn step_type(&self) -> &str {
        "invokeExternal"
    }
    fn parse(
        &self,
        step: &StepDefinition,
        _reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        let function: String = step.required("function")?;
        let mut call = ExternalCall::new(function);
        if let Some(timeout) = step.optional::<u32>("timeout")? {
            call = call.with_timeout(timeout);
        }
        let attributes: BTreeMap<String, String> =
            step.optional("attributes")?.unwrap_or_default();
        for (key, value) in attributes {
            call = call.with_attribute(key, value);
        }
        sequence.invoke_external_with(call);
        Ok(())
    }
}

struct TransferToQueueParser;
impl StepParser for TransferToQueueParser {
    fn step_type(&self) -> &str {
        "transferToQueue"
    }
    fn parse(
        &self,
        step: &StepDefinition,
        reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        let queue: String = step.required("queue")?;
        sequence.transfer_to_queue(queue);
        if let Some(steps) = step.optional::<Vec<StepDefinition>>("onQueueFull")? {
            let mut nested = Nested::new(reader);
            sequence.on_queue_full(|s| nested.run(&steps, s));
            nested.finish()?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct CaseDefinition {
    #[serde(default)]
    operator: Option<String>,
    value: String,
    #[serde(default)]
    steps: Vec<StepDefinition>,
}

struct BranchParser;
impl StepParser for BranchParser {
    fn step_type(&self) -> &str {
        "branch"
    }
    fn parse(
        &self,
        step: &StepDefinition,
        reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        let subject: String = step.required("subject")?;
        let subject = AttributeReference::parse(&subject)
            .ok_or_else(|| step.invalid("subject", "expected 'namespace.key'"))?;
        let cases: Vec<CaseDefinition> = step.required("cases")?;
        let mut operators = Vec::with_capacity(cases.len());
        for case in &cases {
            let operator = match &case.operator {
                Some(name) => Operator::parse(name)
                    .ok_or_else(|| step.invalid("cases", format!("unknown operator '{}'", name)))?,
                None => Operator::Equals,
            };
            operators.push(operator);
        }
        let otherwise = step.optional::<Vec<StepDefinition>>("otherwise")?;

        let mut nested = Nested::new(reader);
        sequence.branch(subject, |branch| {
            for (case, operator) in cases.iter().zip(operators) {
                branch.when(operator, case.value.clone(), |s| nested.run(&case.steps, s));
            }
            if let Some(steps) = &otherwise {
                branch.otherwise(|s| nested.run(steps, s));
            }
        });
        nested.finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeechDefinition {
    bot: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    retries: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeypadDefinition {
    #[serde(default)]
    max_digits: Option<u8>,
    #[serde(default)]
    timeout: Option<u32>,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Deserialize)]
struct RouteDefinition {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    digits: Vec<String>,
    #[serde(default)]
    steps: Vec<StepDefinition>,
}

/// Failure handlers an input step may declare, by field name.
const INPUT_HANDLERS: [(&str, FallbackTrigger); 4] = [
    ("onTimeout", FallbackTrigger::Timeout),
    ("onError", FallbackTrigger::Error),
    ("onLowConfidence", FallbackTrigger::LowConfidence),
    ("onMaxRetries", FallbackTrigger::RetriesExhausted),
];

struct GetCustomerInputParser;

impl GetCustomerInputParser {
    fn input(step: &StepDefinition) -> Result<InputConfiguration, DefinitionError> {
        let speech = step.optional::<SpeechDefinition>("speech")?.map(|definition| {
            let mut input = SpeechInput::new(definition.bot).with_retries(definition.retries);
            if let Some(threshold) = definition.confidence {
                input = input.with_confidence(threshold);
            }
            input
        });
        let keypad = step.optional::<KeypadDefinition>("keypad")?.map(|definition| {
            let mut input = DigitInput::new();
            if let Some(max_digits) = definition.max_digits {
                input = input.with_max_digits(max_digits);
            }
            if let Some(timeout) = definition.timeout {
                input = input.with_timeout(timeout);
            }
            if let Some(prompt) = definition.prompt {
                input = input.with_prompt(prompt);
            }
            input
        });
        let mut input = match (speech, keypad) {
            (Some(speech), Some(keypad)) => InputConfiguration::sequential(speech, keypad),
            (Some(speech), None) => InputConfiguration::speech(speech),
            (None, Some(keypad)) => InputConfiguration::keypad(keypad),
            (None, None) => {
                return Err(step.invalid("speech", "an input needs 'speech', 'keypad' or both"));
            }
        };
        if let Some(names) = step.optional::<Vec<String>>("fallbackOn")? {
            let mut triggers = FallbackTriggerSet::empty();
            for name in names {
                let trigger = FallbackTrigger::parse(&name).ok_or_else(|| {
                    step.invalid("fallbackOn", format!("unknown trigger '{}'", name))
                })?;
                triggers = triggers.with(trigger);
            }
            input = input.fallback_on(triggers);
        }
        Ok(input)
    }
}

impl StepParser for GetCustomerInputParser {
    fn step_type(&self) -> &str {
        "getCustomerInput"
    }

    fn handles_errors(&self) -> bool {
        true
    }

    fn parse(
        &self,
        step: &StepDefinition,
        reader: &DefinitionReader,
        sequence: &mut Sequence<'_>,
    ) -> Result<(), DefinitionError> {
        let input = Self::input(step)?;
        let prompt = match (
            step.optional::<String>("prompt")?,
            step.optional::<String>("libraryPrompt")?,
        ) {
            (Some(text), _) => Some(Prompt::Text(text)),
            (None, Some(name)) => Some(Prompt::Library(name)),
            (None, None) => None,
        };
        let routes: Vec<RouteDefinition> = step.optional("routes")?.unwrap_or_default();
        if let Some(index) = routes
            .iter()
            .position(|r| r.intent.is_none() && r.digits.is_empty())
        {
            return Err(step.invalid(
                "routes",
                format!("route {} has neither an intent nor digits", index),
            ));
        }
        let otherwise = step.optional::<Vec<StepDefinition>>("otherwise")?;
        let mut handlers = Vec::new();
        for (field, trigger) in INPUT_HANDLERS {
            if let Some(steps) = step.optional::<Vec<StepDefinition>>(field)? {
                handlers.push((trigger, steps));
            }
        }

        let mut nested = Nested::new(reader);
        let declare = |menu: &mut crate::builder::InputMenu<'_>| {
            for route in &routes {
                menu.route(route.intent.clone(), route.digits.clone(), |s| {
                    nested.run(&route.steps, s)
                });
            }
            if let Some(steps) = &otherwise {
                menu.otherwise(|s| nested.run(steps, s));
            }
            for (trigger, steps) in &handlers {
                menu.on_failure(*trigger, |s| nested.run(steps, s));
            }
        };
        match prompt {
            Some(prompt) => sequence.get_customer_input_with(prompt, input, declare),
            None => sequence.get_customer_input(input, declare),
        };
        nested.finish()
    }
}
