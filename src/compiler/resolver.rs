use crate::error::{BuildError, Diagnostic, DiagnosticKind};
use crate::graph::{
    DigitInput, Discriminator, FallbackTrigger, FlowGraph, GraphModel, InputConfiguration, Node,
    NodeKind, Prompt, RoutingTable, Transition,
};
use crate::registry::{ReferenceKind, ResourceRegistry};
use tracing::debug;

/// Handler outcomes an input node can declare besides its routes.
const HANDLERS: [Discriminator; 4] = [
    Discriminator::Timeout,
    Discriminator::Error,
    Discriminator::LowConfidence,
    Discriminator::MaxRetriesExceeded,
];

/// Closes routing tables, synthesizes keypad stages for sequential inputs, and
/// checks every resource name against the registry.
pub struct RoutingResolver<'a> {
    registry: &'a ResourceRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RoutingResolver<'a> {
    pub fn new(registry: &'a ResourceRegistry) -> Self {
        Self {
            registry,
            diagnostics: Vec::new(),
        }
    }

    /// Produces the resolved graph plus the diagnostics found on the way. A graph
    /// that is already resolved is only checked against the registry.
    pub fn resolve(
        mut self,
        graph: &FlowGraph,
    ) -> Result<(FlowGraph, Vec<Diagnostic>), Vec<Diagnostic>> {
        for node in graph.nodes() {
            self.check_references(node);
        }
        if graph.is_resolved() {
            return Ok((graph.clone(), self.diagnostics));
        }

        match self.rebuild(graph) {
            Ok(resolved) => Ok((resolved, self.diagnostics)),
            Err(BuildError::DuplicateIdentifier(id)) => {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::DuplicateIdentifier,
                        format!("identifier '{}' is declared more than once", id),
                    )
                    .with_node(id),
                );
                Err(self.diagnostics)
            }
            Err(e) => {
                self.diagnostics
                    .push(Diagnostic::error(DiagnosticKind::InvalidGraph, e.to_string()));
                Err(self.diagnostics)
            }
        }
    }

    fn rebuild(&mut self, graph: &FlowGraph) -> Result<FlowGraph, BuildError> {
        let mut model = graph.empty_model()?;
        for node in graph.nodes() {
            match &node.kind {
                NodeKind::CollectInput { prompt, input } if input.is_sequential() => {
                    self.split_sequential(&mut model, node, prompt.as_ref(), input)?;
                }
                NodeKind::CollectInput { input, .. } => {
                    let transitions = self.single_stage(node, input);
                    copy_node(&mut model, node, transitions)?;
                }
                _ => copy_node(&mut model, node, node.transitions.clone())?,
            }
        }
        model.freeze_resolved()
    }

    /// One input stage: routes, defaults, then every failure outcome wired to its
    /// handler, the error path, or the default.
    fn single_stage(&mut self, node: &Node, input: &InputConfiguration) -> Vec<Transition> {
        let table = RoutingTable::from_transitions(&node.transitions);
        let mut transitions = if input.primary.is_some() {
            table.transitions()
        } else {
            let dropped = table.routes.iter().filter(|r| r.intent.is_some()).count();
            if dropped > 0 {
                debug!(node = %node.id, dropped, "keypad input ignores intent routes");
            }
            table.digit_transitions()
        };
        push_defaults(&mut transitions, &table);
        for trigger in input.outcomes() {
            if trigger == FallbackTrigger::NoMatch {
                continue;
            }
            let on = trigger.discriminator();
            let target = handler_target(node, &on)
                .or_else(|| table.default_target().map(str::to_string));
            if let Some(target) = target {
                transitions.push(Transition::new(on, target));
            }
        }
        push_remaining(&mut transitions, node);
        transitions
    }

    fn split_sequential(
        &mut self,
        model: &mut GraphModel,
        node: &Node,
        prompt: Option<&Prompt>,
        input: &InputConfiguration,
    ) -> Result<(), BuildError> {
        let keypad_id = format!("{}-keypad", node.id);
        let table = RoutingTable::from_transitions(&node.transitions);

        let mut primary = table.transitions();
        for trigger in input.outcomes() {
            let on = trigger.discriminator();
            if input.triggers.contains(trigger) {
                primary.push(Transition::new(on, keypad_id.clone()));
            } else if trigger == FallbackTrigger::NoMatch {
                push_defaults(&mut primary, &table);
            } else if let Some(target) = handler_target(node, &on) {
                primary.push(Transition::new(on, target));
            } else {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::UnhandledInputFailure { trigger },
                        format!(
                            "'{}' is not a fallback trigger and has no handler or error path",
                            trigger
                        ),
                    )
                    .with_node(node.id.clone()),
                );
            }
        }
        push_remaining(&mut primary, node);
        copy_node(model, node, primary)?;

        let fallback = input.fallback.clone().unwrap_or_else(DigitInput::new);
        let keypad_prompt = fallback.prompt.clone().or_else(|| prompt.cloned());
        let keypad_input = InputConfiguration::keypad(fallback);
        let mut keypad = table.digit_transitions();
        push_defaults(&mut keypad, &table);
        for trigger in keypad_input.outcomes() {
            if trigger == FallbackTrigger::NoMatch {
                continue;
            }
            let on = trigger.discriminator();
            let target = handler_target(node, &on)
                .or_else(|| table.default_target().map(str::to_string));
            if let Some(target) = target {
                keypad.push(Transition::new(on, target));
            }
        }
        debug!(node = %node.id, keypad = %keypad_id, "synthesized keypad stage");

        let kind = NodeKind::CollectInput {
            prompt: keypad_prompt,
            input: keypad_input,
        };
        model.add_synthesized(kind, &keypad_id, &node.id)?;
        for transition in keypad {
            model.add_transition(&keypad_id, transition.on, &transition.target)?;
        }
        Ok(())
    }

    fn check_references(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Message { prompt } => self.check_prompt(node, prompt),
            NodeKind::CollectInput { prompt, input } => {
                if let Some(prompt) = prompt {
                    self.check_prompt(node, prompt);
                }
                if let Some(speech) = &input.primary {
                    self.check(node, ReferenceKind::Bot, &speech.bot);
                }
                if let Some(prompt) = input.fallback.as_ref().and_then(|f| f.prompt.as_ref()) {
                    self.check_prompt(node, prompt);
                }
            }
            NodeKind::InvokeExternal(call) => {
                self.check(node, ReferenceKind::Function, &call.function)
            }
            NodeKind::TransferToQueue { queue } => self.check(node, ReferenceKind::Queue, queue),
            NodeKind::TransferToFlow { flow } => self.check(node, ReferenceKind::Flow, flow),
            NodeKind::SetAttributes { .. }
            | NodeKind::Branch { .. }
            | NodeKind::Disconnect
            | NodeKind::Wait { .. }
            | NodeKind::Loop { .. } => {}
        }
    }

    fn check_prompt(&mut self, node: &Node, prompt: &Prompt) {
        if let Prompt::Library(name) = prompt {
            self.check(node, ReferenceKind::Prompt, name);
        }
    }

    fn check(&mut self, node: &Node, kind: ReferenceKind, name: &str) {
        if self.registry.lookup(kind, name).is_none() {
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
        }
    }
}

fn handler_target(node: &Node, on: &Discriminator) -> Option<String> {
    node.target(on)
        .or_else(|| node.target(&Discriminator::Error))
        .map(str::to_string)
}

fn push_defaults(transitions: &mut Vec<Transition>, table: &RoutingTable) {
    transitions.extend(
        table
            .defaults
            .iter()
            .map(|target| Transition::new(Discriminator::Default, target.clone())),
    );
}

/// Carries over declared transitions the routing table and handlers don't cover.
fn push_remaining(transitions: &mut Vec<Transition>, node: &Node) {
    for transition in &node.transitions {
        let covered = match &transition.on {
            Discriminator::Intent(_) | Discriminator::Digits(_) | Discriminator::Default => true,
            other => HANDLERS.contains(other) && transitions.iter().any(|t| &t.on == other),
        };
        if !covered {
            transitions.push(transition.clone());
        }
    }
}

fn copy_node(
    model: &mut GraphModel,
    node: &Node,
    transitions: Vec<Transition>,
) -> Result<(), BuildError> {
    let id = model.add_node(node.kind.clone(), Some(&node.id))?;
    for transition in transitions {
        model.add_transition(&id, transition.on, &transition.target)?;
    }
    Ok(())
}
