//! # Renraku - Contact Flow Graph Compiler
//!
//! **Renraku** turns high-level caller-interaction steps (play a message, collect
//! speech or keypad input, branch on an attribute, invoke an external function,
//! transfer, disconnect, wait, loop) into a validated graph of uniquely
//! identified actions, and lowers that graph into the contact-center platform's
//! flow-language JSON. Output is byte-deterministic, so the same flow always
//! produces the same document.
//!
//! ## Core Workflow
//!
//! 1.  **Author**: Chain steps on a `FlowBuilder`, or read a declarative JSON
//!     definition with a `DefinitionReader`. Custom formats plug in through the
//!     `IntoFlow` trait.
//! 2.  **Freeze**: `FlowBuilder::build` returns an immutable `FlowGraph`, or the
//!     first append-time mistake (duplicate labels, steps after a transfer, ...).
//! 3.  **Compile**: A `Compiler` created from a `ResourceRegistry` resolves routing
//!     tables, validates the graph and lowers it. Compilation either yields a
//!     complete document or every diagnostic found.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use renraku::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let registry = ResourceRegistry::new()
//!         .with_bot("MenuBot", "arn:aws:lex:us-east-1:111122223333:bot-alias/MENU/TSTALIAS")
//!         .with_queue("Sales", "arn:aws:connect:us-east-1:111122223333:instance/i/queue/sales")
//!         .with_queue("Support", "arn:aws:connect:us-east-1:111122223333:instance/i/queue/support");
//!     let compiler = Compiler::builder(registry).build();
//!
//!     let input = InputConfiguration::sequential(SpeechInput::new("MenuBot"), DigitInput::new());
//!     let mut flow = compiler.flow("Main menu");
//!     flow.play_prompt("Hi ${contact.firstName}")
//!         .get_customer_input(input, |menu| {
//!             menu.when("sales", ["1"], |s| {
//!                 s.transfer_to_queue("Sales");
//!             });
//!             menu.when("support", ["2"], |s| {
//!                 s.transfer_to_queue("Support");
//!             });
//!             menu.otherwise(|s| {
//!                 s.disconnect();
//!             });
//!         });
//!     let graph = flow.build()?;
//!
//!     match compiler.compile(&graph) {
//!         Ok(compiled) => println!("{}", compiled.to_json_pretty()?),
//!         Err(e) => eprintln!("{}", DiagnosticFormatter::format_error(&e)),
//!     }
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod builder;
pub mod compiler;
pub mod declarative;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod reference;
pub mod registry;
pub mod report;
