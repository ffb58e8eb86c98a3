//! Tests for routing tables and the resolution of input stages.
mod common;
use common::*;
use renraku::prelude::*;

#[test]
fn test_intent_wins_over_digits_in_same_turn() {
    let graph = create_main_menu();
    let table = RoutingTable::from_transitions(&graph.node("node-2").unwrap().transitions);

    assert_eq!(table.resolve(&Recognition::both("support", "1")), Some("node-4"));
    assert_eq!(table.resolve(&Recognition::digits("1")), Some("node-3"));
    assert_eq!(table.resolve(&Recognition::intent("sales")), Some("node-3"));
    // An unknown intent leaves the digits to decide.
    assert_eq!(table.resolve(&Recognition::both("billing", "2")), Some("node-4"));
    assert_eq!(table.resolve(&Recognition::default()), Some("node-5"));
    assert!(table.has_single_default());
}

#[test]
fn test_routing_table_groups_routes_by_target() {
    let graph = create_main_menu();
    let table = RoutingTable::from_transitions(&graph.node("node-2").unwrap().transitions);

    assert_eq!(table.routes.len(), 2);
    assert_eq!(table.routes[0].intent.as_deref(), Some("sales"));
    assert_eq!(table.routes[0].digits, vec!["1".to_string()]);
    assert_eq!(table.routes[1].target, "node-4");
    assert_eq!(table.defaults, vec!["node-5".to_string()]);
}

#[test]
fn test_sequential_input_synthesizes_keypad_stage() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();
    let graph = &compiled.graph;

    assert!(graph.is_resolved());
    assert_eq!(graph.len(), 6);
    let keypad = graph.node("node-2-keypad").expect("keypad stage");
    assert_eq!(keypad.origin.as_deref(), Some("node-2"));
    match &keypad.kind {
        NodeKind::CollectInput { input, .. } => {
            assert!(input.primary.is_none());
            assert!(input.fallback.is_some());
        }
        other => panic!("Expected CollectInput, got {:?}", other),
    }

    let primary = graph.node("node-2").unwrap();
    assert_eq!(primary.target(&Discriminator::Default), Some("node-2-keypad"));
    assert_eq!(primary.target(&Discriminator::Timeout), Some("node-2-keypad"));
    assert_eq!(keypad.target(&Discriminator::Digits("2".into())), Some("node-4"));
    assert_eq!(keypad.target(&Discriminator::Default), Some("node-5"));
    assert_eq!(keypad.target(&Discriminator::Intent("sales".into())), None);
}

#[test]
fn test_each_routing_node_has_exactly_one_default() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();

    for node in compiled.graph.nodes().iter().filter(|n| n.kind.is_routing()) {
        let defaults = node
            .transitions
            .iter()
            .filter(|t| t.on == Discriminator::Default)
            .count();
        assert_eq!(defaults, 1, "node {} should have one default", node.id);
    }
}

#[test]
fn test_failure_outside_trigger_set_needs_a_handler() {
    let input = menu_input().fallback_on(FallbackTriggerSet::empty().with(FallbackTrigger::NoMatch));
    let mut flow = FlowBuilder::new("Narrow fallback");
    flow.get_customer_input(input, |menu| {
        menu.when("sales", ["1"], |s| {
            s.transfer_to_queue("Sales");
        });
        menu.otherwise(|s| {
            s.disconnect();
        });
    });
    let graph = flow.build().unwrap();

    let error = create_compiler().compile(&graph).unwrap_err();
    let unhandled: Vec<_> = error
        .diagnostics
        .iter()
        .filter(|d| d.code() == "UnhandledInputFailure")
        .collect();
    assert_eq!(unhandled.len(), 2);
    assert!(unhandled.iter().all(|d| d.node_id.as_deref() == Some("node-1")));
    assert!(unhandled.iter().any(|d| d.kind
        == DiagnosticKind::UnhandledInputFailure {
            trigger: FallbackTrigger::Timeout
        }));
}

#[test]
fn test_error_handler_covers_failures_outside_trigger_set() {
    let input = menu_input().fallback_on(FallbackTriggerSet::empty().with(FallbackTrigger::NoMatch));
    let mut flow = FlowBuilder::new("Narrow fallback");
    flow.get_customer_input(input, |menu| {
        menu.when("sales", ["1"], |s| {
            s.transfer_to_queue("Sales");
        });
        menu.otherwise(|s| {
            s.disconnect();
        });
        menu.on_error(|s| {
            s.transfer_to_queue("Support");
        });
    });
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let primary = compiled.graph.node("node-1").unwrap();
    let error_target = primary.target(&Discriminator::Error).unwrap();
    assert_eq!(primary.target(&Discriminator::Timeout), Some(error_target));
    assert_eq!(primary.target(&Discriminator::Default), Some("node-1-keypad"));
}

#[test]
fn test_speech_failures_fall_back_to_default() {
    let input = InputConfiguration::speech(
        SpeechInput::new("MenuBot")
            .with_confidence(0.6)
            .with_retries(2),
    );
    let mut flow = FlowBuilder::new("Speech only");
    flow.get_customer_input_with("How can we help?", input, |menu| {
        menu.when_intent("sales", |s| {
            s.transfer_to_queue("Sales");
        });
        menu.otherwise(|s| {
            s.disconnect();
        });
        menu.on_failure(FallbackTrigger::LowConfidence, |s| {
            s.transfer_to_queue("Support");
        });
    });
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let input = compiled.graph.node("node-1").unwrap();
    assert_eq!(input.target(&Discriminator::LowConfidence), Some("node-4"));
    assert_eq!(input.target(&Discriminator::MaxRetriesExceeded), Some("node-3"));
    assert_eq!(input.target(&Discriminator::Timeout), Some("node-3"));
    assert_eq!(compiled.graph.len(), 4);
}

#[test]
fn test_keypad_input_ignores_intent_routes() {
    let mut flow = FlowBuilder::new("Keypad only");
    flow.get_customer_input(InputConfiguration::keypad(DigitInput::new()), |menu| {
        menu.when("sales", ["1"], |s| {
            s.transfer_to_queue("Sales");
        });
        menu.otherwise(|s| {
            s.disconnect();
        });
    });
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let input = compiled.graph.node("node-1").unwrap();
    assert!(input
        .transitions
        .iter()
        .all(|t| !matches!(t.on, Discriminator::Intent(_))));
    assert_eq!(input.target(&Discriminator::Digits("1".into())), Some("node-2"));
}

#[test]
fn test_resolved_graph_is_not_resolved_again() {
    let compiler = create_compiler();
    let first = compiler.compile(&create_main_menu()).unwrap();
    let second = compiler.compile(&first.graph).unwrap();

    assert_eq!(first.graph, second.graph);
    assert_eq!(first.document, second.document);
}
