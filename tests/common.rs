//! Common test fixtures: a resource registry and a few representative flows.
use renraku::prelude::*;

#[allow(dead_code)]
pub const BOT_ARN: &str = "arn:aws:lex:us-east-1:111122223333:bot-alias/MENU/TSTALIAS";
#[allow(dead_code)]
pub const SALES_ARN: &str = "arn:aws:connect:us-east-1:111122223333:instance/i/queue/sales";
#[allow(dead_code)]
pub const SUPPORT_ARN: &str = "arn:aws:connect:us-east-1:111122223333:instance/i/queue/support";

/// A registry holding every resource the fixture flows refer to.
#[allow(dead_code)]
pub fn create_registry() -> ResourceRegistry {
    ResourceRegistry::new()
        .with_bot("MenuBot", BOT_ARN)
        .with_queue("Sales", SALES_ARN)
        .with_queue("Support", SUPPORT_ARN)
        .with_queue("Gold", "arn:aws:connect:us-east-1:111122223333:instance/i/queue/gold")
        .with_queue("Silver", "arn:aws:connect:us-east-1:111122223333:instance/i/queue/silver")
        .with_queue("Overflow", "arn:aws:connect:us-east-1:111122223333:instance/i/queue/overflow")
        .with_function("LookupAccount", "arn:aws:lambda:us-east-1:111122223333:function:lookup")
        .with_flow("Survey", "arn:aws:connect:us-east-1:111122223333:instance/i/contact-flow/survey")
        .with_prompt("Welcome", "arn:aws:connect:us-east-1:111122223333:instance/i/prompt/welcome")
}

#[allow(dead_code)]
pub fn create_compiler() -> Compiler {
    Compiler::builder(create_registry()).build()
}

/// Speech first, keypad on any failure.
#[allow(dead_code)]
pub fn menu_input() -> InputConfiguration {
    InputConfiguration::sequential(SpeechInput::new("MenuBot"), DigitInput::new())
}

/// Greets, asks for sales or support by voice or keypad, disconnects otherwise.
///
/// Authored nodes: `node-1` message, `node-2` input, `node-3` Sales,
/// `node-4` Support, `node-5` disconnect.
#[allow(dead_code)]
pub fn create_main_menu() -> FlowGraph {
    let mut flow = FlowBuilder::new("Main menu");
    flow.play_prompt("Hi")
        .get_customer_input(menu_input(), |menu| {
            menu.when("sales", ["1"], |s| {
                s.transfer_to_queue("Sales");
            });
            menu.when("support", ["2"], |s| {
                s.transfer_to_queue("Support");
            });
            menu.otherwise(|s| {
                s.disconnect();
            });
        });
    flow.build().expect("main menu should build")
}

/// Branches on the caller's tier without an otherwise case.
#[allow(dead_code)]
pub fn create_tier_branch_without_default() -> FlowGraph {
    let mut flow = FlowBuilder::new("Tiers");
    flow.branch(AttributeReference::contact("tier"), |cases| {
        cases.equals("1", |s| {
            s.transfer_to_queue("Gold");
        });
        cases.equals("2", |s| {
            s.transfer_to_queue("Silver");
        });
    });
    flow.build().expect("tier branch should build")
}

/// A flow whose only step is a transfer to `queue`.
#[allow(dead_code)]
pub fn create_transfer(queue: &str) -> FlowGraph {
    let mut flow = FlowBuilder::new("Transfer");
    flow.transfer_to_queue(queue);
    flow.build().expect("transfer should build")
}

/// The canonical JSON form of the main menu.
#[allow(dead_code)]
pub fn main_menu_json() -> &'static str {
    r#"{
        "name": "Main menu",
        "type": "CONTACT_FLOW",
        "steps": [
            { "type": "playPrompt", "text": "Hi" },
            {
                "type": "getCustomerInput",
                "speech": { "bot": "MenuBot" },
                "keypad": { "maxDigits": 1 },
                "routes": [
                    { "intent": "sales", "digits": ["1"], "steps": [{ "type": "transferToQueue", "queue": "Sales" }] },
                    { "intent": "support", "digits": ["2"], "steps": [{ "type": "transferToQueue", "queue": "Support" }] }
                ],
                "otherwise": [{ "type": "disconnect" }]
            }
        ]
    }"#
}

/// Number of transitions in `graph` carrying `on`.
#[allow(dead_code)]
pub fn count_transitions(graph: &FlowGraph, on: &Discriminator) -> usize {
    graph
        .nodes()
        .iter()
        .flat_map(|n| n.transitions.iter())
        .filter(|t| &t.on == on)
        .count()
}
