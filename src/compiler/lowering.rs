use super::schema::{
    action_type, error_type, ActionRecord, ActionTransitions, ConditionExpression,
    ConditionRecord, ErrorRecord, FlowDocument, LOOP_CONTINUE, LOOP_DONE,
};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::graph::{Discriminator, FlowGraph, InputConfiguration, Node, NodeKind, Operator, Prompt};
use crate::registry::{ReferenceKind, ResourceRegistry};
use ahash::AHashSet;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Orders nodes for emission: entry first, then depth-first along transitions
/// in declaration order, each node once. Nodes the walk never reaches follow in
/// declaration order.
pub fn emission_order(graph: &FlowGraph) -> Vec<&Node> {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut order = Vec::with_capacity(graph.len());
    let mut stack = vec![graph.entry()];
    while let Some(id) = stack.pop() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if !seen.insert(node.id.as_str()) {
            continue;
        }
        order.push(node);
        for transition in node.transitions.iter().rev() {
            if !seen.contains(transition.target.as_str()) {
                stack.push(transition.target.as_str());
            }
        }
    }
    for node in graph.nodes() {
        if !seen.contains(node.id.as_str()) {
            order.push(node);
        }
    }
    order
}

/// Lowers a resolved, validated graph into the flow-language document.
/// Every node produces exactly one action record or a diagnostic.
pub struct Lowering<'a> {
    graph: &'a FlowGraph,
    registry: &'a ResourceRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lowering<'a> {
    pub fn new(graph: &'a FlowGraph, registry: &'a ResourceRegistry) -> Self {
        Self {
            graph,
            registry,
            diagnostics: Vec::new(),
        }
    }

    pub fn lower(mut self, version: &str) -> Result<FlowDocument, Vec<Diagnostic>> {
        let mut actions = Vec::with_capacity(self.graph.len());
        for node in emission_order(self.graph) {
            if let Some(action) = self.lower_node(node) {
                actions.push(action);
            }
        }
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(FlowDocument {
            version: version.to_string(),
            start_action: self.graph.entry().to_string(),
            actions,
        })
    }

    fn lower_node(&mut self, node: &Node) -> Option<ActionRecord> {
        let flow_type = self.graph.flow_type();
        if !flow_type.supports(&node.kind) {
            self.diagnostics.push(
                Diagnostic::error(
                    DiagnosticKind::UnsupportedActionKind {
                        kind: node.kind.name().to_string(),
                        flow_type,
                    },
                    format!(
                        "{} steps are not available in {} flows",
                        node.kind.name(),
                        flow_type
                    ),
                )
                .with_node(node.reported_id()),
            );
            return None;
        }

        let mut parameters = BTreeMap::new();
        let action_type = match &node.kind {
            NodeKind::Message { prompt } => {
                self.prompt_parameters(node, prompt, &mut parameters);
                action_type::MESSAGE
            }
            NodeKind::CollectInput { prompt, input } => {
                let keypad_prompt = input.fallback.as_ref().and_then(|f| f.prompt.as_ref());
                let prompt = match input.primary {
                    Some(_) => prompt.as_ref(),
                    None => prompt.as_ref().or(keypad_prompt),
                };
                if let Some(prompt) = prompt {
                    self.prompt_parameters(node, prompt, &mut parameters);
                }
                self.input_parameters(node, input, &mut parameters)
            }
            NodeKind::InvokeExternal(call) => {
                let arn = self.lookup(node, ReferenceKind::Function, &call.function)?;
                parameters.insert("LambdaFunctionARN".into(), Value::String(arn));
                parameters.insert(
                    "InvocationTimeLimitSeconds".into(),
                    Value::String(call.timeout_seconds.to_string()),
                );
                if !call.attributes.is_empty() {
                    parameters.insert(
                        "LambdaInvocationAttributes".into(),
                        string_map(&call.attributes),
                    );
                }
                parameters.insert(
                    "ResponseValidation".into(),
                    json!({ "ResponseType": "STRING_MAP" }),
                );
                action_type::INVOKE_FUNCTION
            }
            NodeKind::SetAttributes { attributes } => {
                parameters.insert("Attributes".into(), string_map(attributes));
                parameters.insert("TargetContact".into(), Value::String("Current".into()));
                action_type::UPDATE_ATTRIBUTES
            }
            NodeKind::Branch { subject } => {
                parameters.insert("ComparisonValue".into(), Value::String(subject.clone()));
                action_type::COMPARE
            }
            NodeKind::TransferToQueue { queue } => {
                let arn = self.lookup(node, ReferenceKind::Queue, queue)?;
                parameters.insert("QueueId".into(), Value::String(arn));
                action_type::TRANSFER_TO_QUEUE
            }
            NodeKind::TransferToFlow { flow } => {
                let arn = self.lookup(node, ReferenceKind::Flow, flow)?;
                parameters.insert("ContactFlowId".into(), Value::String(arn));
                action_type::TRANSFER_TO_FLOW
            }
            NodeKind::Disconnect => action_type::DISCONNECT,
            NodeKind::Wait { seconds } => {
                parameters.insert(
                    "TimeLimitSeconds".into(),
                    Value::String(seconds.to_string()),
                );
                action_type::WAIT
            }
            NodeKind::Loop { count } => {
                parameters.insert("LoopCount".into(), Value::String(count.to_string()));
                action_type::LOOP
            }
        };

        Some(ActionRecord {
            identifier: node.id.clone(),
            action_type: action_type.to_string(),
            parameters,
            transitions: lower_transitions(node),
        })
    }

    fn prompt_parameters(
        &mut self,
        node: &Node,
        prompt: &Prompt,
        parameters: &mut BTreeMap<String, Value>,
    ) {
        match prompt {
            Prompt::Text(text) => {
                parameters.insert("Text".into(), Value::String(text.clone()));
            }
            Prompt::Ssml(ssml) => {
                parameters.insert("SSML".into(), Value::String(ssml.clone()));
            }
            Prompt::Library(name) => {
                if let Some(arn) = self.lookup(node, ReferenceKind::Prompt, name) {
                    parameters.insert("PromptId".into(), Value::String(arn));
                }
            }
        }
    }

    fn input_parameters(
        &mut self,
        node: &Node,
        input: &InputConfiguration,
        parameters: &mut BTreeMap<String, Value>,
    ) -> &'static str {
        if let Some(speech) = &input.primary {
            if let Some(arn) = self.lookup(node, ReferenceKind::Bot, &speech.bot) {
                parameters.insert("LexV2Bot".into(), json!({ "AliasArn": arn }));
            }
            if let Some(threshold) = speech.confidence_threshold {
                parameters.insert(
                    "IntentConfidenceThreshold".into(),
                    Value::String(format!("{:.2}", threshold)),
                );
            }
            if speech.retries > 0 {
                parameters.insert(
                    "MaxRetries".into(),
                    Value::String(speech.retries.to_string()),
                );
            }
            return action_type::SPEECH_INPUT;
        }

        let keypad = input.fallback.clone().unwrap_or_default();
        parameters.insert(
            "InputTimeLimitSeconds".into(),
            Value::String(keypad.timeout_seconds.to_string()),
        );
        if keypad.max_digits > 1 {
            parameters.insert("StoreInput".into(), Value::String("True".into()));
            parameters.insert(
                "InputValidation".into(),
                json!({ "CustomValidation": { "MaximumLength": keypad.max_digits.to_string() } }),
            );
        } else {
            parameters.insert("StoreInput".into(), Value::String("False".into()));
        }
        action_type::KEYPAD_INPUT
    }

    fn lookup(&mut self, node: &Node, kind: ReferenceKind, name: &str) -> Option<String> {
        match self.registry.lookup(kind, name) {
            Some(id) => Some(id.to_string()),
            None => {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::UnknownReference {
                            kind,
                            name: name.to_string(),
                        },
                        format!("{} '{}' is not in the resource registry", kind, name),
                    )
                    .with_node(node.reported_id()),
                );
                None
            }
        }
    }
}

fn string_map(values: &BTreeMap<String, String>) -> Value {
    let map: Map<String, Value> = values
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

fn condition(target: &str, operator: &str, operand: &str) -> ConditionRecord {
    ConditionRecord {
        next_action: target.to_string(),
        condition: ConditionExpression {
            operator: operator.to_string(),
            operands: vec![operand.to_string()],
        },
    }
}

fn error(target: &str, error_type: &str) -> ErrorRecord {
    ErrorRecord {
        next_action: target.to_string(),
        error_type: error_type.to_string(),
    }
}

/// Maps transitions onto `NextAction`, `Conditions` and `Errors`, keeping
/// declaration order within each list.
fn lower_transitions(node: &Node) -> ActionTransitions {
    let mut out = ActionTransitions::default();
    let equals = Operator::Equals.as_str();
    for transition in &node.transitions {
        let target = transition.target.as_str();
        match &transition.on {
            Discriminator::Next => out.next_action = Some(target.to_string()),
            Discriminator::Intent(value) | Discriminator::Digits(value) => {
                out.conditions.push(condition(target, equals, value));
            }
            Discriminator::Condition(comparison) => out.conditions.push(condition(
                target,
                comparison.operator.as_str(),
                &comparison.value,
            )),
            Discriminator::LoopContinue => {
                out.conditions.push(condition(target, equals, LOOP_CONTINUE));
            }
            Discriminator::LoopDone => out.conditions.push(condition(target, equals, LOOP_DONE)),
            Discriminator::Default => {
                if matches!(node.kind, NodeKind::Branch { .. }) && out.next_action.is_none() {
                    out.next_action = Some(target.to_string());
                }
                out.errors
                    .push(error(target, error_type::NO_MATCHING_CONDITION));
            }
            Discriminator::Error => out.errors.push(error(target, error_type::NO_MATCHING_ERROR)),
            Discriminator::Timeout => out.errors.push(error(target, error_type::INPUT_TIMEOUT)),
            Discriminator::LowConfidence => {
                out.errors.push(error(target, error_type::LOW_CONFIDENCE));
            }
            Discriminator::MaxRetriesExceeded => {
                out.errors
                    .push(error(target, error_type::MAX_RETRIES_EXCEEDED));
            }
            Discriminator::QueueAtCapacity => {
                out.errors.push(error(target, error_type::QUEUE_AT_CAPACITY));
            }
        }
    }
    out
}
