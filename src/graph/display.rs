use super::{FlowGraph, Node, NodeKind, Prompt};
use ahash::AHashSet;
use std::fmt;

/// Prints a graph as a tree rooted at the entry node. Nodes already printed
/// elsewhere in the tree are shown as references.
pub struct DisplayGraph<'a> {
    pub graph: &'a FlowGraph,
}

impl<'a> fmt::Display for DisplayGraph<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.graph.name(), self.graph.flow_type())?;
        let mut seen = AHashSet::new();
        self.fmt_node(self.graph.entry(), None, f, "", true, &mut seen)?;

        let orphans: Vec<&Node> = self
            .graph
            .nodes()
            .iter()
            .filter(|n| !seen.contains(n.id.as_str()))
            .collect();
        if !orphans.is_empty() {
            writeln!(f, "unreachable:")?;
            for node in orphans {
                writeln!(f, "    {} {}", node.id, summarize(&node.kind))?;
            }
        }
        Ok(())
    }
}

impl<'a> DisplayGraph<'a> {
    fn fmt_node(
        &self,
        id: &'a str,
        edge: Option<String>,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
        seen: &mut AHashSet<&'a str>,
    ) -> fmt::Result {
        let marker = if is_last { "└── " } else { "├── " };
        let edge_label = edge.map(|e| format!("{} → ", e)).unwrap_or_default();
        write!(f, "{}{}{}", prefix, marker, edge_label)?;

        let Some(node) = self.graph.node(id) else {
            return writeln!(f, "{} <missing>", id);
        };
        if !seen.insert(node.id.as_str()) {
            return writeln!(f, "{} (see above)", id);
        }
        writeln!(f, "{} {}", node.id, summarize(&node.kind))?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        let count = node.transitions.len();
        for (i, transition) in node.transitions.iter().enumerate() {
            self.fmt_node(
                &transition.target,
                Some(transition.on.to_string()),
                f,
                &child_prefix,
                i + 1 == count,
                seen,
            )?;
        }
        Ok(())
    }
}

fn summarize(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Message { prompt } => format!("Message {}", describe_prompt(prompt)),
        NodeKind::CollectInput { input, .. } => {
            let mode = match (&input.primary, &input.fallback) {
                (Some(_), Some(_)) => "speech+keypad",
                (Some(_), None) => "speech",
                _ => "keypad",
            };
            format!("CollectInput [{}]", mode)
        }
        NodeKind::InvokeExternal(call) => format!("InvokeExternal {}", call.function),
        NodeKind::SetAttributes { attributes } => {
            format!("SetAttributes ({} keys)", attributes.len())
        }
        NodeKind::Branch { subject } => format!("Branch on {}", subject),
        NodeKind::TransferToQueue { queue } => format!("TransferToQueue {}", queue),
        NodeKind::TransferToFlow { flow } => format!("TransferToFlow {}", flow),
        NodeKind::Disconnect => "Disconnect".to_string(),
        NodeKind::Wait { seconds } => format!("Wait {}s", seconds),
        NodeKind::Loop { count } => format!("Loop x{}", count),
    }
}

fn describe_prompt(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Text(text) => format!("\"{}\"", text),
        Prompt::Ssml(_) => "<ssml>".to_string(),
        Prompt::Library(name) => format!("prompt:{}", name),
    }
}
