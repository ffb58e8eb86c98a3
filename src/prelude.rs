//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the renraku
//! crate. Import it to get the builder, the compiler and the graph model without
//! importing each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use renraku::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let registry = ResourceRegistry::from_file("path/to/registry.json")?;
//! let compiler = Compiler::builder(registry).build();
//!
//! let definition = std::fs::read_to_string("path/to/flow.json")?;
//! let graph = DefinitionReader::new()
//!     .with_namespaces(compiler.namespaces())
//!     .read_json(&definition)?;
//! let compiled = compiler.compile(&graph)?;
//! println!("{}", compiled.to_json()?);
//! # Ok(())
//! # }
//! ```

// Authoring
pub use crate::builder::{BranchCases, FlowBuilder, InputMenu, Sequence};
pub use crate::declarative::{DefinitionReader, FlowDefinition, IntoFlow, StepDefinition, StepParser};

// Graph model
pub use crate::graph::{
    Comparison, DigitInput, Discriminator, DisplayGraph, ExternalCall, FallbackTrigger,
    FallbackTriggerSet, FlowGraph, FlowType, GraphModel, InputConfiguration, Node, NodeKind,
    Operator, Prompt, Recognition, RoutingTable, SpeechInput, Transition,
};
pub use crate::reference::{AttributeReference, Namespace, NamespaceTable};
pub use crate::registry::{ReferenceKind, ResourceRegistry};

// Compilation
pub use crate::artifact::GraphSnapshot;
pub use crate::compiler::{CompiledFlow, Compiler, CompilerOptions, FlowDocument};
pub use crate::report::DiagnosticFormatter;

// Error types
pub use crate::error::{
    BuildError, CompileError, DefinitionError, Diagnostic, DiagnosticKind, Severity, SnapshotError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
