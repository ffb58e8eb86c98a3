//! Tests for lowering into the flow-language document.
mod common;
use common::*;
use renraku::compiler::schema::{action_type, error_type};
use renraku::prelude::*;
use serde_json::json;

#[test]
fn test_main_menu_compiles_to_expected_actions() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();
    let document = &compiled.document;

    assert_eq!(document.version, "2019-10-30");
    assert_eq!(document.start_action, "node-1");
    let ids: Vec<&str> = document.actions.iter().map(|a| a.identifier.as_str()).collect();
    assert_eq!(
        ids,
        vec!["node-1", "node-2", "node-3", "node-4", "node-2-keypad", "node-5"]
    );
    assert!(compiled.warnings.is_empty());
}

#[test]
fn test_main_menu_has_no_dangling_targets() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();
    let document = &compiled.document;

    for action in &document.actions {
        for target in action.transitions.targets() {
            assert!(
                document.action(target).is_some(),
                "{} points at missing action {}",
                action.identifier,
                target
            );
        }
    }
}

#[test]
fn test_message_and_input_parameters() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();
    let document = &compiled.document;

    let greeting = document.action("node-1").unwrap();
    assert_eq!(greeting.action_type, action_type::MESSAGE);
    assert_eq!(greeting.parameters["Text"], json!("Hi"));
    assert_eq!(greeting.transitions.next_action.as_deref(), Some("node-2"));

    let speech = document.action("node-2").unwrap();
    assert_eq!(speech.action_type, action_type::SPEECH_INPUT);
    assert_eq!(speech.parameters["LexV2Bot"], json!({ "AliasArn": BOT_ARN }));
    let operands: Vec<&str> = speech
        .transitions
        .conditions
        .iter()
        .map(|c| c.condition.operands[0].as_str())
        .collect();
    assert_eq!(operands, vec!["sales", "support", "1", "2"]);
    assert!(speech
        .transitions
        .conditions
        .iter()
        .all(|c| c.condition.operator == "Equals"));
    assert_eq!(
        speech.transitions.error_target(error_type::NO_MATCHING_CONDITION),
        Some("node-2-keypad")
    );
    assert_eq!(
        speech.transitions.error_target(error_type::INPUT_TIMEOUT),
        Some("node-2-keypad")
    );

    let keypad = document.action("node-2-keypad").unwrap();
    assert_eq!(keypad.action_type, action_type::KEYPAD_INPUT);
    assert_eq!(keypad.parameters["StoreInput"], json!("False"));
    assert_eq!(keypad.parameters["InputTimeLimitSeconds"], json!("5"));
    assert_eq!(
        keypad.transitions.error_target(error_type::NO_MATCHING_CONDITION),
        Some("node-5")
    );
}

#[test]
fn test_transfer_and_disconnect_parameters() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();
    let document = &compiled.document;

    let sales = document.action("node-3").unwrap();
    assert_eq!(sales.action_type, action_type::TRANSFER_TO_QUEUE);
    assert_eq!(sales.parameters["QueueId"], json!(SALES_ARN));

    let goodbye = document.action("node-5").unwrap();
    assert_eq!(goodbye.action_type, action_type::DISCONNECT);
    assert!(goodbye.parameters.is_empty());
    assert!(goodbye.transitions.targets().next().is_none());
}

#[test]
fn test_document_json_shape() {
    let compiled = create_compiler().compile(&create_main_menu()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&compiled.to_json().unwrap()).unwrap();

    assert_eq!(value["Version"], json!("2019-10-30"));
    assert_eq!(value["StartAction"], json!("node-1"));
    assert_eq!(value["Actions"][0]["Type"], json!("MessageParticipant"));
    assert_eq!(value["Actions"][0]["Transitions"]["NextAction"], json!("node-2"));
    assert_eq!(value["Actions"][5]["Parameters"], json!({}));
    assert_eq!(value["Actions"][5]["Transitions"], json!({}));
    assert_eq!(
        value["Actions"][1]["Transitions"]["Conditions"][0],
        json!({ "NextAction": "node-3", "Condition": { "Operator": "Equals", "Operands": ["sales"] } })
    );
    assert_eq!(
        value["Actions"][1]["Transitions"]["Errors"][0],
        json!({ "NextAction": "node-2-keypad", "ErrorType": "NoMatchingCondition" })
    );
}

#[test]
fn test_unknown_queue_fails_with_unknown_reference() {
    let error = create_compiler()
        .compile(&create_transfer("Ghost"))
        .unwrap_err();

    assert_eq!(error.diagnostics.len(), 1);
    let diagnostic = &error.diagnostics[0];
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::UnknownReference {
            kind: ReferenceKind::Queue,
            name: "Ghost".to_string()
        }
    );
    assert_eq!(diagnostic.node_id.as_deref(), Some("node-1"));
}

#[test]
fn test_compilation_is_deterministic() {
    let compiler = create_compiler();
    let first = compiler.compile(&create_main_menu()).unwrap();
    let second = compiler.compile(&create_main_menu()).unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.to_json_pretty().unwrap(), second.to_json_pretty().unwrap());
}

#[test]
fn test_compile_all_keeps_input_order() {
    let graphs = vec![
        create_main_menu(),
        create_transfer("Ghost"),
        create_tier_branch_without_default(),
        create_transfer("Sales"),
    ];
    let results = create_compiler().compile_all(&graphs);

    assert_eq!(results.len(), 4);
    assert!(results[0].is_ok());
    assert!(results[1].as_ref().unwrap_err().has("UnknownReference"));
    assert!(results[2].as_ref().unwrap_err().has("MissingDefaultBranch"));
    assert_eq!(results[3].as_ref().unwrap().document.actions.len(), 1);
}

#[test]
fn test_flow_type_rejects_unsupported_actions() {
    let mut flow = FlowBuilder::new("Whisper").with_type(FlowType::CustomerWhisper);
    flow.get_customer_input(InputConfiguration::keypad(DigitInput::new()), |menu| {
        menu.otherwise(|s| {
            s.disconnect();
        });
    });
    let graph = flow.build().unwrap();

    let error = create_compiler().compile(&graph).unwrap_err();
    assert_eq!(
        error.diagnostics[0].kind,
        DiagnosticKind::UnsupportedActionKind {
            kind: "CollectInput".to_string(),
            flow_type: FlowType::CustomerWhisper
        }
    );
}

#[test]
fn test_external_call_parameters() {
    let mut flow = FlowBuilder::new("Lookup");
    flow.invoke_external_with(
        ExternalCall::new("LookupAccount")
            .with_timeout(20)
            .with_attribute("phone", "${system.CustomerEndpoint.Address}"),
    )
    .on_error(|s| {
        s.disconnect();
    })
    .set_attributes([("tier", "${external.tier}")])
    .transfer_to_flow("Survey");
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let document = &compiled.document;

    let invoke = document.action("node-1").unwrap();
    assert_eq!(invoke.action_type, action_type::INVOKE_FUNCTION);
    assert_eq!(invoke.parameters["InvocationTimeLimitSeconds"], json!("8"));
    assert_eq!(
        invoke.parameters["LambdaInvocationAttributes"],
        json!({ "phone": "$.CustomerEndpoint.Address" })
    );
    assert_eq!(
        invoke.parameters["ResponseValidation"],
        json!({ "ResponseType": "STRING_MAP" })
    );
    assert_eq!(
        invoke.transitions.error_target(error_type::NO_MATCHING_ERROR),
        Some("node-2")
    );

    let update = document.action("node-3").unwrap();
    assert_eq!(update.action_type, action_type::UPDATE_ATTRIBUTES);
    assert_eq!(update.parameters["Attributes"], json!({ "tier": "$.External.tier" }));
    assert_eq!(update.parameters["TargetContact"], json!("Current"));

    let transfer = document.action("node-4").unwrap();
    assert_eq!(transfer.action_type, action_type::TRANSFER_TO_FLOW);
    assert!(transfer.parameters["ContactFlowId"]
        .as_str()
        .unwrap()
        .ends_with("contact-flow/survey"));
}

#[test]
fn test_branch_lowers_to_compare() {
    let mut flow = FlowBuilder::new("Tiers");
    flow.branch(AttributeReference::contact("tier"), |cases| {
        cases.equals("gold", |s| {
            s.transfer_to_queue("Gold");
        });
        cases.when(Operator::TextStartsWith, "sil", |s| {
            s.transfer_to_queue("Silver");
        });
        cases.otherwise(|s| {
            s.disconnect();
        });
    });
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let compare = compiled.document.action("node-1").unwrap();
    assert_eq!(compare.action_type, action_type::COMPARE);
    assert_eq!(compare.parameters["ComparisonValue"], json!("$.Attributes.tier"));
    assert_eq!(compare.transitions.conditions[1].condition.operator, "TextStartsWith");
    assert_eq!(compare.transitions.next_action.as_deref(), Some("node-4"));
    assert_eq!(
        compare.transitions.error_target(error_type::NO_MATCHING_CONDITION),
        Some("node-4")
    );
}

#[test]
fn test_wait_loop_and_queue_full_parameters() {
    let mut flow = FlowBuilder::new("Hold");
    flow.label("hold")
        .play_library_prompt("Welcome")
        .wait(30)
        .loop_to("hold", 3)
        .transfer_to_queue("Sales")
        .on_queue_full(|s| {
            s.play_ssml("<speak>Sorry</speak>").disconnect();
        });
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let document = &compiled.document;

    let welcome = document.action("hold").unwrap();
    assert!(welcome.parameters["PromptId"]
        .as_str()
        .unwrap()
        .ends_with("prompt/welcome"));
    assert_eq!(
        document.action("node-2").unwrap().parameters["TimeLimitSeconds"],
        json!("30")
    );

    let repeat = document.action("node-3").unwrap();
    assert_eq!(repeat.action_type, action_type::LOOP);
    assert_eq!(repeat.parameters["LoopCount"], json!("3"));
    let outcomes: Vec<(&str, &str)> = repeat
        .transitions
        .conditions
        .iter()
        .map(|c| (c.condition.operands[0].as_str(), c.next_action.as_str()))
        .collect();
    assert_eq!(
        outcomes,
        vec![("ContinueLooping", "hold"), ("DoneLooping", "node-4")]
    );

    let transfer = document.action("node-4").unwrap();
    assert_eq!(
        transfer.transitions.error_target(error_type::QUEUE_AT_CAPACITY),
        Some("node-5")
    );
    assert_eq!(
        document.action("node-5").unwrap().parameters["SSML"],
        json!("<speak>Sorry</speak>")
    );
}

#[test]
fn test_speech_and_keypad_tuning_parameters() {
    let input = InputConfiguration::sequential(
        SpeechInput::new("MenuBot").with_confidence(0.7).with_retries(2),
        DigitInput::new().with_max_digits(4).with_timeout(8).with_prompt("Enter your account number"),
    )
    .fallback_on(
        [
            FallbackTrigger::NoMatch,
            FallbackTrigger::LowConfidence,
            FallbackTrigger::RetriesExhausted,
            FallbackTrigger::Timeout,
            FallbackTrigger::Error,
        ]
        .into_iter()
        .collect(),
    );
    let mut flow = FlowBuilder::new("Account");
    flow.get_customer_input_with("Say or enter your account number", input, |menu| {
        menu.otherwise(|s| {
            s.transfer_to_queue("Support");
        });
    });
    let graph = flow.build().unwrap();

    let compiled = create_compiler().compile(&graph).unwrap();
    let document = &compiled.document;

    let speech = document.action("node-1").unwrap();
    assert_eq!(speech.parameters["IntentConfidenceThreshold"], json!("0.70"));
    assert_eq!(speech.parameters["MaxRetries"], json!("2"));
    assert_eq!(
        speech.transitions.error_target(error_type::LOW_CONFIDENCE),
        Some("node-1-keypad")
    );
    assert_eq!(
        speech.transitions.error_target(error_type::MAX_RETRIES_EXCEEDED),
        Some("node-1-keypad")
    );

    let keypad = document.action("node-1-keypad").unwrap();
    assert_eq!(keypad.parameters["Text"], json!("Enter your account number"));
    assert_eq!(keypad.parameters["StoreInput"], json!("True"));
    assert_eq!(keypad.parameters["InputTimeLimitSeconds"], json!("8"));
    assert_eq!(
        keypad.parameters["InputValidation"],
        json!({ "CustomValidation": { "MaximumLength": "4" } })
    );
}

#[test]
fn test_custom_version_is_written() {
    let compiler = Compiler::builder(create_registry())
        .with_options(CompilerOptions {
            version: "2020-01-01".to_string(),
            ..CompilerOptions::default()
        })
        .build();
    let compiled = compiler.compile(&create_transfer("Sales")).unwrap();
    assert_eq!(compiled.document.version, "2020-01-01");
}
