//! Tests for the fluent builder: identifiers, labels, sequencing and handlers.
mod common;
use common::*;
use renraku::prelude::*;

#[test]
fn test_steps_get_sequential_identifiers() {
    let graph = create_main_menu();

    let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["node-1", "node-2", "node-3", "node-4", "node-5"]);
    assert_eq!(graph.entry(), "node-1");
    assert!(!graph.is_resolved());
}

#[test]
fn test_message_continues_to_next_step() {
    let graph = create_main_menu();

    let greeting = graph.node("node-1").unwrap();
    assert_eq!(greeting.target(&Discriminator::Next), Some("node-2"));
    assert_eq!(
        greeting.kind,
        NodeKind::Message {
            prompt: Prompt::Text("Hi".to_string())
        }
    );
}

#[test]
fn test_routes_share_a_target_for_intent_and_digits() {
    let graph = create_main_menu();

    let input = graph.node("node-2").unwrap();
    assert_eq!(
        input.target(&Discriminator::Intent("sales".into())),
        Some("node-3")
    );
    assert_eq!(input.target(&Discriminator::Digits("1".into())), Some("node-3"));
    assert_eq!(input.target(&Discriminator::Default), Some("node-5"));
    assert_eq!(count_transitions(&graph, &Discriminator::Default), 1);
}

#[test]
fn test_duplicate_label_fails_immediately() {
    let mut flow = FlowBuilder::new("Labels");
    flow.label("Step1").play_prompt("one");
    assert!(flow.error().is_none());

    flow.label("Step1").play_prompt("two");
    assert_eq!(
        flow.error(),
        Some(&BuildError::DuplicateIdentifier("Step1".to_string()))
    );
    assert_eq!(
        flow.build().unwrap_err(),
        BuildError::DuplicateIdentifier("Step1".to_string())
    );
}

#[test]
fn test_labels_become_identifiers() {
    let mut flow = FlowBuilder::new("Labels");
    flow.label("greeting").play_prompt("Hello").disconnect();
    let graph = flow.build().unwrap();

    assert_eq!(graph.entry(), "greeting");
    assert_eq!(graph.node("greeting").unwrap().target(&Discriminator::Next), Some("node-2"));
}

#[test]
fn test_generated_identifiers_skip_taken_labels() {
    let mut flow = FlowBuilder::new("Labels");
    flow.play_prompt("one").label("node-3").play_prompt("two").play_prompt("three").disconnect();
    let graph = flow.build().unwrap();

    let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["node-1", "node-3", "node-4", "node-5"]);
}

#[test]
fn test_jump_to_forward_label() {
    let mut flow = FlowBuilder::new("Jumps");
    flow.get_customer_input(InputConfiguration::keypad(DigitInput::new()), |menu| {
        menu.when_digits("1", |s| {
            s.play_prompt("One").jump_to("goodbye");
        });
        menu.otherwise(|s| {
            s.jump_to("goodbye");
        });
    });
    flow.label("goodbye").play_prompt("Bye").disconnect();
    let graph = flow.build().unwrap();

    let input = graph.node("node-1").unwrap();
    assert_eq!(input.target(&Discriminator::Default), Some("goodbye"));
    let one = graph.node("node-2").unwrap();
    assert_eq!(one.target(&Discriminator::Next), Some("goodbye"));
    assert_eq!(graph.node("goodbye").unwrap().target(&Discriminator::Next), Some("node-4"));
}

#[test]
fn test_step_after_transfer_is_unreachable() {
    let mut flow = FlowBuilder::new("Closed");
    flow.transfer_to_queue("Sales").play_prompt("never heard");

    match flow.build() {
        Err(BuildError::UnreachableStep { after, step }) => {
            assert_eq!(after, "node-1");
            assert_eq!(step, "Message");
        }
        other => panic!("Expected UnreachableStep, got {:?}", other),
    }
}

#[test]
fn test_step_after_disconnect_is_unreachable() {
    let mut flow = FlowBuilder::new("Closed");
    flow.disconnect().wait(5);
    assert!(matches!(
        flow.build(),
        Err(BuildError::UnreachableStep { .. })
    ));
}

#[test]
fn test_step_after_flow_transfer_is_unreachable() {
    let mut flow = FlowBuilder::new("Closed");
    flow.transfer_to_flow("Survey").play_prompt("never");

    match flow.build() {
        Err(BuildError::UnreachableStep { after, step }) => {
            assert_eq!(after, "node-1");
            assert_eq!(step, "Message");
        }
        other => panic!("Expected UnreachableStep, got {:?}", other),
    }
}

#[test]
fn test_dangling_label_is_rejected() {
    let mut flow = FlowBuilder::new("Labels");
    flow.play_prompt("Hello").label("nothing");
    assert_eq!(
        flow.build().unwrap_err(),
        BuildError::UnusedLabel("nothing".to_string())
    );
}

#[test]
fn test_handler_before_any_step_is_detached() {
    let mut flow = FlowBuilder::new("Handlers");
    flow.on_error(|s| {
        s.disconnect();
    });
    assert_eq!(
        flow.build().unwrap_err(),
        BuildError::DetachedHandler("on_error")
    );
}

#[test]
fn test_queue_full_handler_needs_a_transfer() {
    let mut flow = FlowBuilder::new("Handlers");
    flow.play_prompt("Hi").on_queue_full(|s| {
        s.disconnect();
    });
    assert_eq!(
        flow.build().unwrap_err(),
        BuildError::DetachedHandler("on_queue_full")
    );
}

#[test]
fn test_error_handler_rejoins_main_sequence() {
    let mut flow = FlowBuilder::new("Handlers");
    flow.invoke_external("LookupAccount")
        .on_error(|s| {
            s.play_prompt("We could not find your account");
        })
        .play_prompt("Continuing")
        .disconnect();
    let graph = flow.build().unwrap();

    let invoke = graph.node("node-1").unwrap();
    assert_eq!(invoke.target(&Discriminator::Error), Some("node-2"));
    assert_eq!(invoke.target(&Discriminator::Next), Some("node-3"));
    assert_eq!(
        graph.node("node-2").unwrap().target(&Discriminator::Next),
        Some("node-3")
    );
}

#[test]
fn test_queue_full_handler_continues_the_flow() {
    let mut flow = FlowBuilder::new("Overflow");
    flow.transfer_to_queue("Sales")
        .on_queue_full(|s| {
            s.transfer_to_queue("Overflow");
        });
    let graph = flow.build().unwrap();

    let transfer = graph.node("node-1").unwrap();
    assert_eq!(transfer.target(&Discriminator::QueueAtCapacity), Some("node-2"));
}

#[test]
fn test_placeholders_are_resolved_against_namespaces() {
    let mut flow = FlowBuilder::new("Greeting");
    flow.play_prompt("Hello ${contact.firstName}")
        .set_attributes([("lastChannel", "${system.Channel}")])
        .disconnect();
    let graph = flow.build().unwrap();

    assert_eq!(
        graph.node("node-1").unwrap().kind,
        NodeKind::Message {
            prompt: Prompt::Text("Hello $.Attributes.firstName".to_string())
        }
    );
    match &graph.node("node-2").unwrap().kind {
        NodeKind::SetAttributes { attributes } => {
            assert_eq!(attributes["lastChannel"], "$.Channel");
        }
        other => panic!("Expected SetAttributes, got {:?}", other),
    }
}

#[test]
fn test_unknown_system_attribute_fails() {
    let mut flow = FlowBuilder::new("Greeting");
    flow.play_prompt("Calling from ${system.Planet}").disconnect();
    assert_eq!(
        flow.build().unwrap_err(),
        BuildError::UnknownAttribute {
            namespace: Namespace::System,
            key: "Planet".to_string()
        }
    );
}

#[test]
fn test_malformed_placeholder_fails() {
    let mut flow = FlowBuilder::new("Greeting");
    flow.play_prompt("Hello ${contact.firstName").disconnect();
    assert!(matches!(
        flow.build(),
        Err(BuildError::MalformedTemplate(_))
    ));
}

#[test]
fn test_branch_subject_is_resolved() {
    let graph = create_tier_branch_without_default();
    assert_eq!(
        graph.node("node-1").unwrap().kind,
        NodeKind::Branch {
            subject: "$.Attributes.tier".to_string()
        }
    );
}

#[test]
fn test_loop_points_back_to_label() {
    let mut flow = FlowBuilder::new("Retry");
    flow.label("ask")
        .play_prompt("Please hold")
        .wait(10)
        .loop_to("ask", 3)
        .disconnect();
    let graph = flow.build().unwrap();

    let looped = graph.node("node-3").unwrap();
    assert_eq!(looped.kind, NodeKind::Loop { count: 3 });
    assert_eq!(looped.target(&Discriminator::LoopContinue), Some("ask"));
    assert_eq!(looped.target(&Discriminator::LoopDone), Some("node-4"));
}

#[test]
fn test_empty_flow_fails() {
    let flow = FlowBuilder::new("Empty");
    assert_eq!(flow.build().unwrap_err(), BuildError::EmptyFlow);
}

#[test]
fn test_freeze_is_idempotent_and_final() {
    let mut model = GraphModel::new("Frozen", FlowType::ContactFlow);
    model.add_node(NodeKind::Disconnect, None).unwrap();

    let first = model.freeze().unwrap();
    let second = model.freeze().unwrap();
    assert_eq!(first, second);
    assert!(model.is_frozen());
    assert_eq!(
        model.add_node(NodeKind::Disconnect, None).unwrap_err(),
        BuildError::GraphAlreadyFrozen
    );
    assert_eq!(
        model
            .add_transition("node-1", Discriminator::Next, "node-2")
            .unwrap_err(),
        BuildError::GraphAlreadyFrozen
    );
}

#[test]
fn test_builders_are_independent_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let mut flow = FlowBuilder::new(format!("Flow {}", i));
                for _ in 0..=i {
                    flow.play_prompt("step");
                }
                flow.disconnect();
                flow.build().unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let graph = handle.join().unwrap();
        assert_eq!(graph.len(), i + 2);
        assert_eq!(graph.entry(), "node-1");
    }
}
