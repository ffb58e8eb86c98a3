use crate::error::{Diagnostic, DiagnosticKind};
use crate::graph::{Discriminator, FlowGraph, Node, NodeKind};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::collections::VecDeque;
use tracing::warn;

/// Runs every graph-level check over a resolved graph and returns all findings.
/// Diagnostics on synthesized nodes are reported against the authored node.
pub fn validate(graph: &FlowGraph, max_hops: usize) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_dangling(graph, &mut diagnostics);
    check_reachability(graph, &mut diagnostics);
    let acyclic = check_cycles(graph, &mut diagnostics);
    check_termination(graph, &mut diagnostics);
    check_terminal_reachable(graph, &mut diagnostics);
    if acyclic {
        check_hop_limit(graph, max_hops, &mut diagnostics);
    }
    check_defaults(graph, &mut diagnostics);
    check_conflicts(graph, &mut diagnostics);
    diagnostics.into_iter().unique().collect()
}

fn check_dangling(graph: &FlowGraph, out: &mut Vec<Diagnostic>) {
    for node in graph.nodes() {
        for transition in &node.transitions {
            if !graph.contains(&transition.target) {
                out.push(
                    Diagnostic::error(
                        DiagnosticKind::DanglingTransition {
                            target: transition.target.clone(),
                        },
                        format!(
                            "transition '{}' targets '{}', which is not a node",
                            transition.on, transition.target
                        ),
                    )
                    .with_node(node.reported_id()),
                );
            }
        }
    }
}

/// Identifiers reachable from the entry node.
pub(crate) fn reachable(graph: &FlowGraph) -> AHashSet<&str> {
    let mut seen = AHashSet::new();
    let mut queue = VecDeque::from([graph.entry()]);
    while let Some(id) = queue.pop_front() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if !seen.insert(node.id.as_str()) {
            continue;
        }
        queue.extend(node.transitions.iter().map(|t| t.target.as_str()));
    }
    seen
}

fn check_reachability(graph: &FlowGraph, out: &mut Vec<Diagnostic>) {
    let seen = reachable(graph);
    for node in graph.nodes() {
        if seen.contains(node.id.as_str()) {
            continue;
        }
        warn!(flow = graph.name(), node = %node.reported_id(), "unreachable node");
        out.push(
            Diagnostic::warning(
                DiagnosticKind::UnreachableNode,
                "node cannot be reached from the entry node",
            )
            .with_node(node.reported_id()),
        );
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Open,
    Done,
}

/// Reports every cycle that doesn't close through a loop's repeat edge.
/// Returns true when there is none.
fn check_cycles(graph: &FlowGraph, out: &mut Vec<Diagnostic>) -> bool {
    let mut marks: AHashMap<&str, Mark> = AHashMap::new();
    let mut acyclic = true;
    for root in graph.nodes() {
        if marks.contains_key(root.id.as_str()) {
            continue;
        }
        // Iterative DFS: (node, index of the next edge to follow).
        let mut stack: Vec<(&Node, usize)> = vec![(root, 0)];
        marks.insert(root.id.as_str(), Mark::Open);
        while let Some((node, next)) = stack.pop() {
            let edge = hop_edges(graph, node).nth(next);
            let Some(target) = edge else {
                marks.insert(node.id.as_str(), Mark::Done);
                continue;
            };
            stack.push((node, next + 1));
            match marks.get(target) {
                Some(Mark::Open) => {
                    acyclic = false;
                    out.push(
                        Diagnostic::error(
                            DiagnosticKind::IllegalCycle {
                                via: target.to_string(),
                            },
                            format!(
                                "cycle back to '{}' does not pass through a Loop step",
                                target
                            ),
                        )
                        .with_node(node.reported_id()),
                    );
                }
                Some(Mark::Done) => {}
                None => {
                    if let Some(child) = graph.node(target) {
                        marks.insert(child.id.as_str(), Mark::Open);
                        stack.push((child, 0));
                    }
                }
            }
        }
    }
    acyclic
}

fn check_termination(graph: &FlowGraph, out: &mut Vec<Diagnostic>) {
    for node in graph.nodes() {
        for outcome in node.kind.required_outcomes() {
            if node.target(&outcome).is_none() {
                out.push(
                    Diagnostic::error(
                        DiagnosticKind::UnterminatedPath {
                            outcome: outcome.to_string(),
                        },
                        format!(
                            "{} step has no '{}' transition and does not end the contact",
                            node.kind.name(),
                            outcome
                        ),
                    )
                    .with_node(node.reported_id()),
                );
            }
        }
    }
}

/// Reports reachable nodes from which no terminal step can be reached without
/// repeating a loop. Nodes already reported as open or dangling count as ends.
fn check_terminal_reachable(graph: &FlowGraph, out: &mut Vec<Diagnostic>) {
    let mut predecessors: AHashMap<&str, Vec<&str>> = AHashMap::new();
    let mut ends: AHashSet<&str> = AHashSet::new();
    let mut queue = VecDeque::new();
    for node in graph.nodes() {
        for target in hop_edges(graph, node) {
            predecessors.entry(target).or_default().push(node.id.as_str());
        }
        let open = node
            .kind
            .required_outcomes()
            .iter()
            .any(|outcome| node.target(outcome).is_none())
            || (node.kind.is_routing() && node.target(&Discriminator::Default).is_none())
            || node.transitions.iter().any(|t| !graph.contains(&t.target));
        if (node.is_terminal() || open) && ends.insert(node.id.as_str()) {
            queue.push_back(node.id.as_str());
        }
    }
    while let Some(id) = queue.pop_front() {
        for &before in predecessors.get(id).into_iter().flatten() {
            if ends.insert(before) {
                queue.push_back(before);
            }
        }
    }

    let seen = reachable(graph);
    for node in graph.nodes() {
        let id = node.id.as_str();
        if seen.contains(id) && !ends.contains(id) {
            out.push(
                Diagnostic::error(
                    DiagnosticKind::NoTerminalReachable,
                    "every path from this step loops forever without ending the contact",
                )
                .with_node(node.reported_id()),
            );
        }
    }
}

/// Edges that move a contact forward: everything except a loop's repeat edge.
fn hop_edges<'a>(graph: &'a FlowGraph, node: &'a Node) -> impl Iterator<Item = &'a str> {
    node.transitions
        .iter()
        .filter(|t| t.on != Discriminator::LoopContinue)
        .map(|t| t.target.as_str())
        .filter(move |target| graph.contains(target))
}

/// Longest path from the entry in steps, not following loop repeats.
pub(crate) fn longest_path(graph: &FlowGraph) -> usize {
    let Some(entry) = graph.node(graph.entry()) else {
        return 0;
    };
    let mut depth: AHashMap<&str, usize> = AHashMap::new();
    let mut open: AHashSet<&str> = AHashSet::new();
    let mut stack: Vec<(&Node, bool)> = vec![(entry, false)];
    while let Some((node, expanded)) = stack.pop() {
        let id = node.id.as_str();
        if expanded {
            let below = hop_edges(graph, node)
                .filter_map(|t| depth.get(t).copied())
                .max()
                .unwrap_or(0);
            depth.insert(id, below + 1);
            open.remove(id);
            continue;
        }
        if depth.contains_key(id) || !open.insert(id) {
            continue;
        }
        stack.push((node, true));
        for target in hop_edges(graph, node) {
            if depth.contains_key(target) || open.contains(target) {
                continue;
            }
            if let Some(child) = graph.node(target) {
                stack.push((child, false));
            }
        }
    }
    depth.get(graph.entry()).copied().unwrap_or(0)
}

fn check_hop_limit(graph: &FlowGraph, max_hops: usize, out: &mut Vec<Diagnostic>) {
    let hops = longest_path(graph);
    if hops > max_hops {
        out.push(
            Diagnostic::error(
                DiagnosticKind::HopLimitExceeded { limit: max_hops },
                format!(
                    "the longest path visits {} steps, more than the limit of {}",
                    hops, max_hops
                ),
            )
            .with_node(graph.entry()),
        );
    }
}

fn check_defaults(graph: &FlowGraph, out: &mut Vec<Diagnostic>) {
    for node in graph.nodes().iter().filter(|n| n.kind.is_routing()) {
        let defaults = node
            .transitions
            .iter()
            .filter(|t| t.on == Discriminator::Default)
            .count();
        if defaults == 0 {
            out.push(
                Diagnostic::error(
                    DiagnosticKind::MissingDefaultBranch,
                    format!("{} step has no default branch", node.kind.name()),
                )
                .with_node(node.reported_id()),
            );
        }
    }
}

fn check_conflicts(graph: &FlowGraph, out: &mut Vec<Diagnostic>) {
    for node in graph.nodes() {
        let duplicates = node
            .transitions
            .iter()
            .map(|t| &t.on)
            .duplicates()
            .collect::<Vec<_>>();
        for on in duplicates {
            out.push(conflict(node, on.to_string()));
        }
        check_condition_overlap(node, out);
    }
}

/// Intents and digits of a speech stage both lower to `Equals <value>`, so the
/// same value may not lead to two different targets.
fn check_condition_overlap(node: &Node, out: &mut Vec<Diagnostic>) {
    let speech = matches!(
        &node.kind,
        NodeKind::CollectInput { input, .. } if input.primary.is_some()
    );
    if !speech {
        return;
    }
    let mut targets: AHashMap<&str, &str> = AHashMap::new();
    for transition in &node.transitions {
        let (Discriminator::Intent(value) | Discriminator::Digits(value)) = &transition.on else {
            continue;
        };
        let target = transition.target.as_str();
        match targets.get(value.as_str()) {
            Some(&previous) if previous != target => {
                out.push(conflict(node, format!("Equals({})", value)));
            }
            Some(_) => {}
            None => {
                targets.insert(value.as_str(), target);
            }
        }
    }
}

fn conflict(node: &Node, discriminator: String) -> Diagnostic {
    let message = format!("more than one transition is declared for '{}'", discriminator);
    Diagnostic::error(
        DiagnosticKind::ConflictingTransition { discriminator },
        message,
    )
    .with_node(node.reported_id())
}
