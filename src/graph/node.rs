use super::{Discriminator, InputConfiguration, Transition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the caller hears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    Text(String),
    Ssml(String),
    /// A prompt-library entry, by registry name.
    Library(String),
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::Text(text.to_string())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Prompt::Text(text)
    }
}

/// Invocation parameters for an external function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCall {
    /// Registry name of the function.
    pub function: String,
    pub timeout_seconds: u32,
    pub attributes: BTreeMap<String, String>,
}

impl ExternalCall {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            timeout_seconds: 3,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds.clamp(1, 8);
        self
    }

    /// Adds an input attribute. The value may contain `${namespace.key}` placeholders.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// The closed set of action kinds, with their parameter payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Message {
        prompt: Prompt,
    },
    CollectInput {
        prompt: Option<Prompt>,
        input: InputConfiguration,
    },
    InvokeExternal(ExternalCall),
    SetAttributes {
        attributes: BTreeMap<String, String>,
    },
    Branch {
        /// Resolved attribute path the cases compare against.
        subject: String,
    },
    TransferToQueue {
        queue: String,
    },
    TransferToFlow {
        flow: String,
    },
    Disconnect,
    Wait {
        seconds: u32,
    },
    Loop {
        count: u32,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Message { .. } => "Message",
            NodeKind::CollectInput { .. } => "CollectInput",
            NodeKind::InvokeExternal(_) => "InvokeExternal",
            NodeKind::SetAttributes { .. } => "SetAttributes",
            NodeKind::Branch { .. } => "Branch",
            NodeKind::TransferToQueue { .. } => "TransferToQueue",
            NodeKind::TransferToFlow { .. } => "TransferToFlow",
            NodeKind::Disconnect => "Disconnect",
            NodeKind::Wait { .. } => "Wait",
            NodeKind::Loop { .. } => "Loop",
        }
    }

    /// Terminal kinds end the contact's path through this flow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeKind::Disconnect | NodeKind::TransferToQueue { .. } | NodeKind::TransferToFlow { .. }
        )
    }

    /// Kinds whose outgoing edges are selected by a routing table.
    pub fn is_routing(&self) -> bool {
        matches!(self, NodeKind::CollectInput { .. } | NodeKind::Branch { .. })
    }

    /// Outcomes that must be wired for a path through this node to continue.
    pub fn required_outcomes(&self) -> Vec<Discriminator> {
        match self {
            NodeKind::Message { .. }
            | NodeKind::InvokeExternal(_)
            | NodeKind::SetAttributes { .. }
            | NodeKind::Wait { .. } => vec![Discriminator::Next],
            NodeKind::Loop { .. } => vec![Discriminator::LoopContinue, Discriminator::LoopDone],
            // Routing nodes are covered by the default-branch check.
            NodeKind::CollectInput { .. } | NodeKind::Branch { .. } => Vec::new(),
            NodeKind::TransferToQueue { .. }
            | NodeKind::TransferToFlow { .. }
            | NodeKind::Disconnect => Vec::new(),
        }
    }
}

/// One action in the graph. Nodes only point forward, by identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub transitions: Vec<Transition>,
    /// For synthesized nodes, the authored node they were derived from.
    pub origin: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            transitions: Vec::new(),
            origin: None,
        }
    }

    pub fn target(&self, on: &Discriminator) -> Option<&str> {
        self.transitions
            .iter()
            .find(|t| &t.on == on)
            .map(|t| t.target.as_str())
    }

    /// The identifier diagnostics should point at.
    pub fn reported_id(&self) -> &str {
        self.origin.as_deref().unwrap_or(&self.id)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}
