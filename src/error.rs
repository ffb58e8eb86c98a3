use crate::graph::{FallbackTrigger, FlowType};
use crate::reference::Namespace;
use crate::registry::ReferenceKind;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised while appending steps to a flow. These indicate a mistake in the
/// calling code and are returned from `FlowBuilder::build`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("DuplicateIdentifier: identifier '{0}' is declared more than once")]
    DuplicateIdentifier(String),

    #[error(
        "UnreachableStepError: step '{step}' follows '{after}', which already closed this path"
    )]
    UnreachableStep { after: String, step: String },

    #[error("The graph is frozen and can no longer be modified")]
    GraphAlreadyFrozen,

    #[error("A flow needs at least one step")]
    EmptyFlow,

    #[error("No node with identifier '{0}' has been declared")]
    UnknownNode(String),

    #[error("Attribute '{key}' is not declared in the {namespace} namespace")]
    UnknownAttribute { namespace: Namespace, key: String },

    #[error("Malformed attribute placeholder in '{0}'")]
    MalformedTemplate(String),

    #[error("Handler '{0}' was attached before any step was declared")]
    DetachedHandler(&'static str),

    #[error("Label '{0}' was declared but no step follows it")]
    UnusedLabel(String),
}

/// How serious a diagnostic is. Only errors block lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// The defect a diagnostic describes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    DuplicateIdentifier,
    DanglingTransition { target: String },
    UnreachableNode,
    UnterminatedPath { outcome: String },
    /// No terminal step can be reached from the node without repeating a loop.
    NoTerminalReachable,
    IllegalCycle { via: String },
    HopLimitExceeded { limit: usize },
    MissingDefaultBranch,
    ConflictingTransition { discriminator: String },
    UnhandledInputFailure { trigger: FallbackTrigger },
    UnknownReference { kind: ReferenceKind, name: String },
    UnsupportedActionKind { kind: String, flow_type: FlowType },
    /// The graph itself could not be rebuilt, e.g. an empty snapshot.
    InvalidGraph,
}

impl DiagnosticKind {
    /// The stable name of this diagnostic, as used in reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateIdentifier => "DuplicateIdentifier",
            Self::DanglingTransition { .. } => "DanglingTransition",
            Self::UnreachableNode => "UnreachableNode",
            Self::UnterminatedPath { .. } => "UnterminatedPath",
            Self::NoTerminalReachable => "NoTerminalReachable",
            Self::IllegalCycle { .. } => "IllegalCycle",
            Self::HopLimitExceeded { .. } => "HopLimitExceeded",
            Self::MissingDefaultBranch => "MissingDefaultBranch",
            Self::ConflictingTransition { .. } => "ConflictingTransition",
            Self::UnhandledInputFailure { .. } => "UnhandledInputFailure",
            Self::UnknownReference { .. } => "UnknownReference",
            Self::UnsupportedActionKind { .. } => "UnsupportedActionKind",
            Self::InvalidGraph => "InvalidGraph",
        }
    }
}

/// A single finding from resolution, validation or lowering.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub node_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            node_id: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            node_id: None,
            message: message.into(),
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.node_id {
            Some(node) => write!(f, "{}[{}] at '{}': {}", level, self.code(), node, self.message),
            None => write!(f, "{}[{}]: {}", level, self.code(), self.message),
        }
    }
}

/// Compilation failed. Carries every diagnostic collected in the failing pass,
/// warnings included.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub flow: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn new(flow: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            flow: flow.into(),
            diagnostics,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// True when at least one diagnostic carries the given code.
    pub fn has(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code() == code)
    }

    fn summary(&self) -> String {
        self.errors().map(|d| d.code()).unique().join(", ")
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Compilation of '{}' failed with {} error(s): {}",
            self.flow,
            self.error_count(),
            self.summary()
        )
    }
}

impl std::error::Error for CompileError {}

/// Errors that can occur when converting declarative step metadata into a flow.
#[derive(Error, Debug, Clone)]
pub enum DefinitionError {
    #[error("Failed to parse flow definition JSON: {0}")]
    JsonParseError(String),

    #[error("Step {index} has an unregistered step type: '{type_name}'")]
    UnknownStepType { index: usize, type_name: String },

    #[error("Step '{step_type}' is missing the required field '{field}'")]
    MissingField { step_type: String, field: String },

    #[error("Step '{step_type}' has an invalid value for '{field}': {message}")]
    InvalidField {
        step_type: String,
        field: String,
        message: String,
    },

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Errors raised while reading or writing graph snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot encoding failed: {0}")]
    Encode(String),

    #[error("Snapshot decoding failed: {0}")]
    Decode(String),

    #[error("Snapshot file '{path}' could not be accessed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
