//! The fluent front end for authoring flows.
//!
//! Steps are appended to a linear sequence. Steps that route (input collection,
//! branches, error handlers) open nested sequences through closures; whatever a
//! nested sequence leaves open is spliced back into its parent, so the parent's
//! next step becomes its continuation.
//!
//! ```rust,no_run
//! use renraku::builder::FlowBuilder;
//! use renraku::error::BuildError;
//! use renraku::graph::{DigitInput, InputConfiguration, SpeechInput};
//!
//! # fn main() -> Result<(), BuildError> {
//! let input = InputConfiguration::sequential(SpeechInput::new("MenuBot"), DigitInput::new());
//! let mut flow = FlowBuilder::new("Main menu");
//! flow.play_prompt("Hi")
//!     .get_customer_input(input, |menu| {
//!         menu.when("sales", ["1"], |s| {
//!             s.transfer_to_queue("Sales");
//!         });
//!         menu.otherwise(|s| {
//!             s.disconnect();
//!         });
//!     });
//! let graph = flow.build()?;
//! # Ok(())
//! # }
//! ```

mod cases;

pub use cases::{BranchCases, InputMenu};

use crate::error::BuildError;
use crate::graph::{
    Discriminator, ExternalCall, FlowGraph, FlowType, GraphModel, InputConfiguration, NodeKind,
    Prompt,
};
use crate::reference::{AttributeReference, NamespaceTable};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An outcome of an already-declared node that still waits for its target.
#[derive(Debug, Clone)]
pub(crate) struct Exit {
    from: String,
    on: Discriminator,
}

/// Where a sequence currently is: which outcomes the next step will receive,
/// whether the sequence has started, and the label for the next step.
#[derive(Debug, Default)]
pub(crate) struct Cursor {
    exits: Vec<Exit>,
    started: bool,
    last: Option<String>,
    pending_label: Option<String>,
}

impl Cursor {
    fn opened(exits: Vec<Exit>) -> Self {
        Self {
            exits,
            started: true,
            last: None,
            pending_label: None,
        }
    }
}

/// State shared by every sequence of one builder session. The first error is
/// kept; later steps become no-ops.
pub(crate) struct BuilderState {
    model: GraphModel,
    namespaces: Arc<NamespaceTable>,
    error: Option<BuildError>,
}

impl BuilderState {
    fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }

    fn expand(&mut self, text: &str) -> Option<String> {
        match self.namespaces.expand(text) {
            Ok(expanded) => Some(expanded),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    fn expand_prompt(&mut self, prompt: Prompt) -> Option<Prompt> {
        match prompt {
            Prompt::Text(text) => self.expand(&text).map(Prompt::Text),
            Prompt::Ssml(ssml) => self.expand(&ssml).map(Prompt::Ssml),
            library => Some(library),
        }
    }

    /// Appends a node, wires every open exit of the cursor to it, and leaves the
    /// node's own continuation open.
    fn append(&mut self, cursor: &mut Cursor, kind: NodeKind) -> Option<String> {
        if self.failed() {
            return None;
        }
        // A labeled step may still be reached through `jump_to` or `loop_to`.
        if cursor.started && cursor.exits.is_empty() && cursor.pending_label.is_none() {
            self.fail(BuildError::UnreachableStep {
                after: cursor.last.clone().unwrap_or_default(),
                step: kind.name().to_string(),
            });
            return None;
        }
        let continues = kind.required_outcomes().contains(&Discriminator::Next);
        let label = cursor.pending_label.take();
        let id = match self.model.add_node(kind, label.as_deref()) {
            Ok(id) => id,
            Err(e) => {
                self.fail(e);
                return None;
            }
        };
        for exit in cursor.exits.drain(..) {
            if let Err(e) = self.model.add_transition(&exit.from, exit.on, &id) {
                self.fail(e);
                return None;
            }
        }
        cursor.started = true;
        cursor.last = Some(id.clone());
        if continues {
            cursor.exits.push(Exit {
                from: id.clone(),
                on: Discriminator::Next,
            });
        }
        Some(id)
    }

    fn connect(&mut self, from: &str, on: Discriminator, to: &str) {
        if self.failed() {
            return;
        }
        if let Err(e) = self.model.add_transition(from, on, to) {
            self.fail(e);
        }
    }

    fn message(&mut self, cursor: &mut Cursor, prompt: Prompt) {
        if let Some(prompt) = self.expand_prompt(prompt) {
            self.append(cursor, NodeKind::Message { prompt });
        }
    }

    fn collect_input(
        &mut self,
        cursor: &mut Cursor,
        prompt: Option<Prompt>,
        mut input: InputConfiguration,
        f: impl FnOnce(&mut InputMenu<'_>),
    ) {
        let prompt = match prompt {
            Some(prompt) => match self.expand_prompt(prompt) {
                Some(prompt) => Some(prompt),
                None => return,
            },
            None => None,
        };
        if let Some(keypad) = input.fallback.as_mut() {
            if let Some(keypad_prompt) = keypad.prompt.take() {
                let Some(expanded) = self.expand_prompt(keypad_prompt) else {
                    return;
                };
                keypad.prompt = Some(expanded);
            }
        }
        let Some(id) = self.append(cursor, NodeKind::CollectInput { prompt, input }) else {
            return;
        };
        let mut menu = InputMenu::new(self, id);
        f(&mut menu);
        cursor.exits = menu.into_joins();
    }

    fn invoke_external(&mut self, cursor: &mut Cursor, mut call: ExternalCall) {
        let mut attributes = BTreeMap::new();
        for (key, value) in std::mem::take(&mut call.attributes) {
            let Some(value) = self.expand(&value) else {
                return;
            };
            attributes.insert(key, value);
        }
        call.attributes = attributes;
        self.append(cursor, NodeKind::InvokeExternal(call));
    }

    fn set_attributes(&mut self, cursor: &mut Cursor, pairs: Vec<(String, String)>) {
        let mut attributes = BTreeMap::new();
        for (key, value) in pairs {
            let Some(value) = self.expand(&value) else {
                return;
            };
            attributes.insert(key, value);
        }
        self.append(cursor, NodeKind::SetAttributes { attributes });
    }

    fn branch(
        &mut self,
        cursor: &mut Cursor,
        subject: AttributeReference,
        f: impl FnOnce(&mut BranchCases<'_>),
    ) {
        let subject = match self.namespaces.resolve(&subject) {
            Ok(path) => path,
            Err(e) => return self.fail(e),
        };
        let Some(id) = self.append(cursor, NodeKind::Branch { subject }) else {
            return;
        };
        let mut cases = BranchCases::new(self, id);
        f(&mut cases);
        cursor.exits = cases.into_joins();
    }

    fn loop_to(&mut self, cursor: &mut Cursor, label: &str, count: u32) {
        let Some(id) = self.append(cursor, NodeKind::Loop { count }) else {
            return;
        };
        self.connect(&id, Discriminator::LoopContinue, label);
        cursor.exits.push(Exit {
            from: id,
            on: Discriminator::LoopDone,
        });
    }

    fn jump_to(&mut self, cursor: &mut Cursor, label: &str) {
        if self.failed() {
            return;
        }
        if !cursor.started {
            return self.fail(BuildError::DetachedHandler("jump_to"));
        }
        if cursor.exits.is_empty() {
            return self.fail(BuildError::UnreachableStep {
                after: cursor.last.clone().unwrap_or_default(),
                step: "JumpTo".to_string(),
            });
        }
        for exit in std::mem::take(&mut cursor.exits) {
            self.connect(&exit.from, exit.on, label);
        }
    }

    fn label(&mut self, cursor: &mut Cursor, label: String) {
        if let Some(previous) = cursor.pending_label.replace(label) {
            self.fail(BuildError::UnusedLabel(previous));
        }
    }

    /// Runs `f` on a sequence fed by `on` from the last declared node and splices
    /// its open tail back into `cursor`.
    fn handler(
        &mut self,
        cursor: &mut Cursor,
        name: &'static str,
        on: Discriminator,
        f: impl FnOnce(&mut Sequence<'_>),
    ) {
        if self.failed() {
            return;
        }
        let Some(from) = cursor.last.clone() else {
            return self.fail(BuildError::DetachedHandler(name));
        };
        if on == Discriminator::QueueAtCapacity
            && !matches!(
                self.model.node(&from).map(|n| &n.kind),
                Some(NodeKind::TransferToQueue { .. })
            )
        {
            return self.fail(BuildError::DetachedHandler(name));
        }
        let tail = Sequence::run(self, vec![Exit { from, on }], f);
        cursor.exits.extend(tail);
    }
}

/// Builds one flow. The builder itself is the main sequence; the first step
/// appended becomes the entry node.
pub struct FlowBuilder {
    state: BuilderState,
    cursor: Cursor,
    description: Option<String>,
}

impl FlowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: BuilderState {
                model: GraphModel::new(name, FlowType::default()),
                namespaces: Arc::new(NamespaceTable::default()),
                error: None,
            },
            cursor: Cursor::default(),
            description: None,
        }
    }

    pub fn with_type(mut self, flow_type: FlowType) -> Self {
        if let Err(e) = self.state.model.set_flow_type(flow_type) {
            self.state.fail(e);
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Uses a shared namespace table for attribute references.
    pub fn with_namespaces(mut self, namespaces: Arc<NamespaceTable>) -> Self {
        self.state.namespaces = namespaces;
        self
    }

    /// Runs `f` over the main sequence as a `Sequence`, so code written against
    /// nested sequences can drive the top level too.
    pub fn with_sequence(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
        let cursor = std::mem::take(&mut self.cursor);
        let mut sequence = Sequence {
            state: &mut self.state,
            cursor,
        };
        f(&mut sequence);
        self.cursor = sequence.cursor;
        self
    }

    /// The first append-time error, if one occurred.
    pub fn error(&self) -> Option<&BuildError> {
        self.state.error.as_ref()
    }

    /// Freezes the authored graph. Routing tables are closed later, by the compiler.
    pub fn build(mut self) -> Result<FlowGraph, BuildError> {
        if let Some(error) = self.state.error.take() {
            return Err(error);
        }
        if let Some(label) = self.cursor.pending_label.take() {
            return Err(BuildError::UnusedLabel(label));
        }
        if let Some(description) = self.description.take() {
            self.state.model.set_description(description)?;
        }
        self.state.model.freeze()
    }

    fn parts(&mut self) -> (&mut BuilderState, &mut Cursor) {
        (&mut self.state, &mut self.cursor)
    }
}

/// A nested sequence, opened by a routing step or an error handler.
pub struct Sequence<'a> {
    state: &'a mut BuilderState,
    cursor: Cursor,
}

impl<'a> Sequence<'a> {
    /// Runs `f` on a fresh sequence fed by `exits` and returns what it left open.
    fn run(
        state: &'a mut BuilderState,
        exits: Vec<Exit>,
        f: impl FnOnce(&mut Sequence<'_>),
    ) -> Vec<Exit> {
        let mut sequence = Sequence {
            state,
            cursor: Cursor::opened(exits),
        };
        f(&mut sequence);
        sequence.finish()
    }

    fn finish(mut self) -> Vec<Exit> {
        if let Some(label) = self.cursor.pending_label.take() {
            self.state.fail(BuildError::UnusedLabel(label));
        }
        self.cursor.exits
    }

    fn parts(&mut self) -> (&mut BuilderState, &mut Cursor) {
        (&mut *self.state, &mut self.cursor)
    }
}

/// Generates the step methods shared by `FlowBuilder` and `Sequence`.
macro_rules! impl_steps {
    ($ty:ty) => {
        impl $ty {
            /// Names the next step, so it can be the target of `jump_to`/`loop_to`.
            pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
                let (state, cursor) = self.parts();
                state.label(cursor, label.into());
                self
            }

            /// Plays text. `${namespace.key}` placeholders are resolved.
            pub fn play_prompt(&mut self, text: impl Into<String>) -> &mut Self {
                let (state, cursor) = self.parts();
                state.message(cursor, Prompt::Text(text.into()));
                self
            }

            pub fn play_ssml(&mut self, ssml: impl Into<String>) -> &mut Self {
                let (state, cursor) = self.parts();
                state.message(cursor, Prompt::Ssml(ssml.into()));
                self
            }

            /// Plays a prompt-library entry, by registry name.
            pub fn play_library_prompt(&mut self, name: impl Into<String>) -> &mut Self {
                let (state, cursor) = self.parts();
                state.message(cursor, Prompt::Library(name.into()));
                self
            }

            pub fn get_customer_input(
                &mut self,
                input: InputConfiguration,
                f: impl FnOnce(&mut InputMenu<'_>),
            ) -> &mut Self {
                let (state, cursor) = self.parts();
                state.collect_input(cursor, None, input, f);
                self
            }

            pub fn get_customer_input_with(
                &mut self,
                prompt: impl Into<Prompt>,
                input: InputConfiguration,
                f: impl FnOnce(&mut InputMenu<'_>),
            ) -> &mut Self {
                let (state, cursor) = self.parts();
                state.collect_input(cursor, Some(prompt.into()), input, f);
                self
            }

            pub fn invoke_external(&mut self, function: impl Into<String>) -> &mut Self {
                self.invoke_external_with(ExternalCall::new(function))
            }

            pub fn invoke_external_with(&mut self, call: ExternalCall) -> &mut Self {
                let (state, cursor) = self.parts();
                state.invoke_external(cursor, call);
                self
            }

            /// Sets contact attributes. Values may contain placeholders.
            pub fn set_attributes<K, V>(
                &mut self,
                attributes: impl IntoIterator<Item = (K, V)>,
            ) -> &mut Self
            where
                K: Into<String>,
                V: Into<String>,
            {
                let pairs = attributes
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect();
                let (state, cursor) = self.parts();
                state.set_attributes(cursor, pairs);
                self
            }

            pub fn branch(
                &mut self,
                subject: AttributeReference,
                f: impl FnOnce(&mut BranchCases<'_>),
            ) -> &mut Self {
                let (state, cursor) = self.parts();
                state.branch(cursor, subject, f);
                self
            }

            pub fn transfer_to_queue(&mut self, queue: impl Into<String>) -> &mut Self {
                let (state, cursor) = self.parts();
                state.append(
                    cursor,
                    NodeKind::TransferToQueue {
                        queue: queue.into(),
                    },
                );
                self
            }

            pub fn transfer_to_flow(&mut self, flow: impl Into<String>) -> &mut Self {
                let (state, cursor) = self.parts();
                state.append(cursor, NodeKind::TransferToFlow { flow: flow.into() });
                self
            }

            pub fn disconnect(&mut self) -> &mut Self {
                let (state, cursor) = self.parts();
                state.append(cursor, NodeKind::Disconnect);
                self
            }

            pub fn wait(&mut self, seconds: u32) -> &mut Self {
                let (state, cursor) = self.parts();
                state.append(cursor, NodeKind::Wait { seconds });
                self
            }

            /// Repeats from `label` up to `count` times, then continues here.
            pub fn loop_to(&mut self, label: &str, count: u32) -> &mut Self {
                let (state, cursor) = self.parts();
                state.loop_to(cursor, label, count);
                self
            }

            /// Sends every open path to `label`. The label may be declared later.
            pub fn jump_to(&mut self, label: &str) -> &mut Self {
                let (state, cursor) = self.parts();
                state.jump_to(cursor, label);
                self
            }

            /// Handles failure of the previous step.
            pub fn on_error(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
                let (state, cursor) = self.parts();
                state.handler(cursor, "on_error", Discriminator::Error, f);
                self
            }

            /// Handles a full queue after `transfer_to_queue`.
            pub fn on_queue_full(&mut self, f: impl FnOnce(&mut Sequence<'_>)) -> &mut Self {
                let (state, cursor) = self.parts();
                state.handler(cursor, "on_queue_full", Discriminator::QueueAtCapacity, f);
                self
            }
        }
    };
}

impl_steps!(FlowBuilder);
impl_steps!(Sequence<'_>);
