//! Name → platform identifier tables for the resources a flow refers to.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Queue,
    Flow,
    Function,
    Bot,
    Prompt,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Queue => "queue",
            ReferenceKind::Flow => "flow",
            ReferenceKind::Function => "function",
            ReferenceKind::Bot => "bot",
            ReferenceKind::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

/// Resolved resources, produced earlier in the deployment pipeline.
///
/// ```json
/// { "queues": { "Sales": "arn:aws:connect:...:queue/1" }, "functions": { ... } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRegistry {
    #[serde(default)]
    pub queues: AHashMap<String, String>,
    #[serde(default)]
    pub flows: AHashMap<String, String>,
    #[serde(default)]
    pub functions: AHashMap<String, String>,
    #[serde(default)]
    pub bots: AHashMap<String, String>,
    #[serde(default)]
    pub prompts: AHashMap<String, String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a registry from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn with(
        mut self,
        kind: ReferenceKind,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.table_mut(kind).insert(name.into(), id.into());
        self
    }

    pub fn with_queue(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.with(ReferenceKind::Queue, name, id)
    }

    pub fn with_flow(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.with(ReferenceKind::Flow, name, id)
    }

    pub fn with_function(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.with(ReferenceKind::Function, name, id)
    }

    pub fn with_bot(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.with(ReferenceKind::Bot, name, id)
    }

    pub fn with_prompt(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.with(ReferenceKind::Prompt, name, id)
    }

    pub fn lookup(&self, kind: ReferenceKind, name: &str) -> Option<&str> {
        self.table(kind).get(name).map(String::as_str)
    }

    fn table(&self, kind: ReferenceKind) -> &AHashMap<String, String> {
        match kind {
            ReferenceKind::Queue => &self.queues,
            ReferenceKind::Flow => &self.flows,
            ReferenceKind::Function => &self.functions,
            ReferenceKind::Bot => &self.bots,
            ReferenceKind::Prompt => &self.prompts,
        }
    }

    fn table_mut(&mut self, kind: ReferenceKind) -> &mut AHashMap<String, String> {
        match kind {
            ReferenceKind::Queue => &mut self.queues,
            ReferenceKind::Flow => &mut self.flows,
            ReferenceKind::Function => &mut self.functions,
            ReferenceKind::Bot => &mut self.bots,
            ReferenceKind::Prompt => &mut self.prompts,
        }
    }
}
