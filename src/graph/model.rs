use super::{Discriminator, FlowType, Node, NodeKind, Transition};
use crate::error::BuildError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// The mutable graph a builder session appends to.
///
/// Identifiers are assigned in declaration order as `node-<n>` unless an explicit
/// label is supplied. Transition targets are plain identifiers, so they may name
/// nodes that have not been declared yet.
#[derive(Debug, Clone)]
pub struct GraphModel {
    name: String,
    flow_type: FlowType,
    description: Option<String>,
    nodes: Vec<Node>,
    index: AHashMap<String, usize>,
    frozen: Option<FlowGraph>,
}

impl GraphModel {
    pub fn new(name: impl Into<String>, flow_type: FlowType) -> Self {
        Self {
            name: name.into(),
            flow_type,
            description: None,
            nodes: Vec::new(),
            index: AHashMap::new(),
            frozen: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow_type
    }

    pub fn set_flow_type(&mut self, flow_type: FlowType) -> Result<(), BuildError> {
        self.ensure_open()?;
        self.flow_type = flow_type;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), BuildError> {
        self.ensure_open()?;
        self.description = Some(description.into());
        Ok(())
    }

    /// Appends a node and returns its identifier.
    pub fn add_node(&mut self, kind: NodeKind, label: Option<&str>) -> Result<String, BuildError> {
        self.ensure_open()?;
        let id = match label {
            Some(label) => {
                if self.index.contains_key(label) {
                    return Err(BuildError::DuplicateIdentifier(label.to_string()));
                }
                label.to_string()
            }
            None => self.next_generated_id(),
        };
        self.insert(Node::new(id.clone(), kind));
        Ok(id)
    }

    /// Appends a node derived from an authored one, under a fixed identifier.
    pub(crate) fn add_synthesized(
        &mut self,
        kind: NodeKind,
        id: &str,
        origin: &str,
    ) -> Result<String, BuildError> {
        self.ensure_open()?;
        if self.index.contains_key(id) {
            return Err(BuildError::DuplicateIdentifier(id.to_string()));
        }
        let mut node = Node::new(id, kind);
        node.origin = Some(origin.to_string());
        self.insert(node);
        Ok(id.to_string())
    }

    pub fn add_transition(
        &mut self,
        from: &str,
        on: Discriminator,
        to_label: &str,
    ) -> Result<(), BuildError> {
        self.ensure_open()?;
        let position = *self
            .index
            .get(from)
            .ok_or_else(|| BuildError::UnknownNode(from.to_string()))?;
        self.nodes[position]
            .transitions
            .push(Transition::new(on, to_label));
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Produces the immutable graph. Calling this again returns the same value.
    pub fn freeze(&mut self) -> Result<FlowGraph, BuildError> {
        self.freeze_as(false)
    }

    pub(crate) fn freeze_resolved(&mut self) -> Result<FlowGraph, BuildError> {
        self.freeze_as(true)
    }

    fn freeze_as(&mut self, resolved: bool) -> Result<FlowGraph, BuildError> {
        if let Some(graph) = &self.frozen {
            return Ok(graph.clone());
        }
        let entry = self
            .nodes
            .first()
            .map(|n| n.id.clone())
            .ok_or(BuildError::EmptyFlow)?;
        let graph = FlowGraph {
            name: self.name.clone(),
            flow_type: self.flow_type,
            description: self.description.clone(),
            entry,
            nodes: self.nodes.clone(),
            index: self.index.clone(),
            resolved,
        };
        self.frozen = Some(graph.clone());
        Ok(graph)
    }

    fn ensure_open(&self) -> Result<(), BuildError> {
        if self.frozen.is_some() {
            Err(BuildError::GraphAlreadyFrozen)
        } else {
            Ok(())
        }
    }

    fn next_generated_id(&self) -> String {
        let mut ordinal = self.nodes.len() + 1;
        loop {
            let candidate = format!("node-{}", ordinal);
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
            ordinal += 1;
        }
    }

    fn insert(&mut self, node: Node) {
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }
}

/// A frozen flow: ordered nodes, a single entry, unique identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    name: String,
    flow_type: FlowType,
    description: Option<String>,
    entry: String,
    nodes: Vec<Node>,
    #[serde(skip)]
    index: AHashMap<String, usize>,
    resolved: bool,
}

impl FlowGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flow_type(&self) -> FlowType {
        self.flow_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True once routing resolution has closed the routing tables.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// A fresh model with this graph's metadata and no nodes.
    pub(crate) fn empty_model(&self) -> Result<GraphModel, BuildError> {
        let mut model = GraphModel::new(self.name.clone(), self.flow_type);
        if let Some(description) = &self.description {
            model.set_description(description.clone())?;
        }
        Ok(model)
    }

    /// Rebuilds the identifier index after deserialization.
    pub(crate) fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }
}
