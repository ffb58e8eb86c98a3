//! The compilation pipeline: routing resolution, validation, lowering.

use crate::builder::FlowBuilder;
use crate::error::{CompileError, Diagnostic, Severity};
use crate::graph::FlowGraph;
use crate::reference::NamespaceTable;
use crate::registry::ResourceRegistry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[cfg(feature = "debug-tools")]
use {crate::graph::DisplayGraph, std::fs};

pub mod lowering;
pub mod resolver;
pub mod schema;
pub mod validator;

use lowering::Lowering;
use resolver::RoutingResolver;
pub use schema::{FlowDocument, FLOW_LANGUAGE_VERSION};

/// Tunables for a compiler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Flow-language version written to every document.
    pub version: String,
    /// Upper bound on the number of steps along any loop-free path.
    pub max_hops: usize,
    /// Treat warnings (e.g. unreachable nodes) as errors.
    pub deny_warnings: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            version: FLOW_LANGUAGE_VERSION.to_string(),
            max_hops: 256,
            deny_warnings: false,
        }
    }
}

/// A successfully compiled flow.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFlow {
    pub name: String,
    pub document: FlowDocument,
    /// The resolved graph the document was lowered from.
    pub graph: FlowGraph,
    /// Non-fatal findings, e.g. unreachable nodes.
    pub warnings: Vec<Diagnostic>,
}

impl CompiledFlow {
    /// The document as compact JSON. Identical graphs produce identical bytes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.document)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

pub struct CompilerBuilder {
    registry: ResourceRegistry,
    namespaces: Arc<NamespaceTable>,
    options: CompilerOptions,
}

impl CompilerBuilder {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            namespaces: Arc::new(NamespaceTable::default()),
            options: CompilerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceTable) -> Self {
        self.namespaces = Arc::new(namespaces);
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.options.max_hops = max_hops;
        self
    }

    pub fn deny_warnings(mut self, deny: bool) -> Self {
        self.options.deny_warnings = deny;
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            registry: Arc::new(self.registry),
            namespaces: self.namespaces,
            options: self.options,
        }
    }
}

/// Compiles frozen graphs against one resource registry. Cheap to share
/// between threads; every compilation owns its own state.
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<ResourceRegistry>,
    namespaces: Arc<NamespaceTable>,
    options: CompilerOptions,
}

impl Compiler {
    pub fn builder(registry: ResourceRegistry) -> CompilerBuilder {
        CompilerBuilder::new(registry)
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn namespaces(&self) -> Arc<NamespaceTable> {
        Arc::clone(&self.namespaces)
    }

    /// Starts a builder that resolves attributes against this compiler's namespaces.
    pub fn flow(&self, name: impl Into<String>) -> FlowBuilder {
        FlowBuilder::new(name).with_namespaces(self.namespaces())
    }

    /// Resolves, validates and lowers one graph. Either every error found is
    /// returned, or a complete document.
    #[instrument(skip_all, fields(flow = graph.name()))]
    pub fn compile(&self, graph: &FlowGraph) -> Result<CompiledFlow, CompileError> {
        info!(nodes = graph.len(), "compiling flow");

        let (resolved, mut diagnostics) = RoutingResolver::new(&self.registry)
            .resolve(graph)
            .map_err(|diagnostics| CompileError::new(graph.name(), diagnostics))?;
        debug!(nodes = resolved.len(), "routing resolved");

        #[cfg(feature = "debug-tools")]
        {
            let name = sanitize_filename(graph.name());
            self.write_debug_file(
                &format!("tmp/flow_{}_authored.txt", name),
                &DisplayGraph { graph }.to_string(),
            );
            self.write_debug_file(
                &format!("tmp/flow_{}_resolved.txt", name),
                &DisplayGraph { graph: &resolved }.to_string(),
            );
        }

        diagnostics.extend(validator::validate(&resolved, self.options.max_hops));
        if self.options.deny_warnings {
            for diagnostic in &mut diagnostics {
                diagnostic.severity = Severity::Error;
            }
        }
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Err(CompileError::new(graph.name(), diagnostics));
        }

        let document = Lowering::new(&resolved, &self.registry)
            .lower(&self.options.version)
            .map_err(|mut errors| {
                diagnostics.append(&mut errors);
                CompileError::new(graph.name(), diagnostics.clone())
            })?;
        info!(actions = document.actions.len(), "flow compiled");

        Ok(CompiledFlow {
            name: graph.name().to_string(),
            document,
            graph: resolved,
            warnings: diagnostics,
        })
    }

    /// Compiles many graphs in parallel. Results keep the input order.
    pub fn compile_all(&self, graphs: &[FlowGraph]) -> Vec<Result<CompiledFlow, CompileError>> {
        graphs.par_iter().map(|graph| self.compile(graph)).collect()
    }

    #[cfg(feature = "debug-tools")]
    fn write_debug_file(&self, path: &str, content: &str) {
        let written = std::path::Path::new(path)
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(path, content));
        if let Err(e) = written {
            tracing::warn!(path, error = %e, "could not write debug file");
        }
    }
}

#[cfg(feature = "debug-tools")]
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
}
