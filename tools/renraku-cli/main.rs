use clap::Parser;
use renraku::prelude::*;
use std::fs;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Compiles declarative call-flow definitions into flow-language documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the flow definition JSON file, or a snapshot with --from-snapshot
    definition_path: String,

    /// Path to the resource registry JSON file
    #[arg(short, long)]
    registry: Option<String>,

    /// Path to a namespace table JSON file
    #[arg(short, long)]
    namespaces: Option<String>,

    /// Write the compiled document here instead of stdout
    #[arg(short, long)]
    out: Option<String>,

    /// Print the graph outline before compiling
    #[arg(long)]
    outline: bool,

    /// Save a binary snapshot of the authored graph to this path
    #[arg(long)]
    snapshot: Option<String>,

    /// Treat the input as a snapshot produced by --snapshot
    #[arg(long)]
    from_snapshot: bool,

    /// Fail on warnings as well as errors
    #[arg(long)]
    deny_warnings: bool,

    /// Maximum number of actions on any acyclic path
    #[arg(long, default_value_t = 256)]
    max_hops: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let total_start = Instant::now();

    // --- 1. Registry and namespaces ---
    let registry = match &cli.registry {
        Some(path) => ResourceRegistry::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load registry from '{}': {}", path, e))
        }),
        None => ResourceRegistry::new(),
    };
    let mut builder = Compiler::builder(registry)
        .with_max_hops(cli.max_hops)
        .deny_warnings(cli.deny_warnings);
    if let Some(path) = &cli.namespaces {
        let json = fs::read_to_string(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to read namespace file '{}': {}", path, e))
        });
        let table = NamespaceTable::from_json(&json).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to parse namespace file '{}': {}", path, e))
        });
        builder = builder.with_namespaces(table);
    }
    let compiler = builder.build();

    // --- 2. Authoring ---
    let graph = if cli.from_snapshot {
        GraphSnapshot::from_file(&cli.definition_path)
            .unwrap_or_else(|e| exit_with_error(&e.to_string()))
            .into_graph()
    } else {
        let json = fs::read_to_string(&cli.definition_path).unwrap_or_else(|e| {
            exit_with_error(&format!(
                "Failed to read definition file '{}': {}",
                &cli.definition_path, e
            ))
        });
        DefinitionReader::new()
            .with_namespaces(compiler.namespaces())
            .read_json(&json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to read flow: {}", e)))
    };
    info!(flow = graph.name(), nodes = graph.len(), "flow loaded");

    if cli.outline {
        eprintln!("{}", DisplayGraph { graph: &graph });
    }
    if let Some(path) = &cli.snapshot {
        GraphSnapshot::new(graph.clone())
            .save(path)
            .unwrap_or_else(|e| exit_with_error(&e.to_string()));
        info!(path = path.as_str(), "snapshot written");
    }

    // --- 3. Compilation ---
    let compile_start = Instant::now();
    let compiled = compiler.compile(&graph).unwrap_or_else(|e| {
        eprintln!("{}", DiagnosticFormatter::format_error(&e));
        std::process::exit(1);
    });
    let compile_duration = compile_start.elapsed();

    if !compiled.warnings.is_empty() {
        eprintln!(
            "{}",
            DiagnosticFormatter::format_diagnostics(&compiled.name, &compiled.warnings)
        );
    }

    let document = compiled
        .to_json_pretty()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize document: {}", e)));
    match &cli.out {
        Some(path) => fs::write(path, document).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to write document to '{}': {}", path, e))
        }),
        None => println!("{}", document),
    }

    info!(
        actions = compiled.document.actions.len(),
        compile = ?compile_duration,
        total = ?total_start.elapsed(),
        "compilation finished"
    );
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
