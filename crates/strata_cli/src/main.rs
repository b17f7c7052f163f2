//! strata: compile manifests into per-node catalogs.
//!
//! Usage:
//!   strata [options] [file...]
//!
//! With no files and no `--project`, `./strata.json` is used when present.

mod tracing_config;

use clap::{Parser as ClapParser, ValueEnum};
use miette::{LabeledSpan, MietteDiagnostic, NamedSource, Report, Severity};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use strata_compiler::{Compilation, Program, SourceFile};
use strata_diagnostics::Diagnostic;
use strata_evaluator::Catalog;
use strata_options::{load_config, load_node_data, CompilerOptions, NodeData, StrataConfig, UnknownClassPolicy};
use tracing::debug;

const CONFIG_FILE_NAME: &str = "strata.json";

#[derive(ClapParser, Debug)]
#[command(name = "strata", about = "strata - compile manifests into node catalogs", version)]
struct Cli {
    /// Manifest files to compile.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to strata.json, or to a directory containing one.
    #[arg(short = 'p', long = "project")]
    project: Option<PathBuf>,

    /// Name of the node to compile.
    #[arg(long)]
    node: Option<String>,

    /// Compile several nodes, comma separated.
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<String>,

    /// Classifier output (JSON) with the node's parameters, facts and classes.
    #[arg(long, value_name = "FILE")]
    enc: Option<PathBuf>,

    /// What a qualified variable of an unevaluated class resolves to.
    #[arg(long = "unknown-class", value_name = "POLICY")]
    unknown_class: Option<UnknownClassPolicy>,

    /// Output format for catalogs.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Only check the manifests for syntax errors.
    #[arg(long)]
    check: bool,

    /// List all files that are part of the compilation.
    #[arg(long = "list-files")]
    list_files: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct NodeOutput<'c> {
    node: &'c str,
    catalog: &'c Catalog,
    notices: &'c [String],
}

fn main() {
    tracing_config::init_tracing();
    let cli = Cli::parse();
    process::exit(run_compile(&cli));
}

fn run_compile(cli: &Cli) -> i32 {
    let start = Instant::now();

    let (files, config) = match resolve_input_files(cli) {
        Ok(resolved) => resolved,
        Err(diagnostic) => {
            print_diagnostic(&diagnostic, &[]);
            return 1;
        }
    };
    if files.is_empty() {
        print_error("No input files found.");
        return 1;
    }
    if cli.list_files {
        for file in &files {
            println!("{}", file.display());
        }
    }

    let mut options = config
        .as_ref()
        .map(|config| config.compiler_options.clone())
        .unwrap_or_else(CompilerOptions::default);
    if let Some(policy) = cli.unknown_class {
        options.unknown_class_policy = policy;
    }

    let mut program = Program::new(files, options);
    if let Err(err) = program.load_root_files() {
        for diagnostic in err.to_diagnostics().diagnostics() {
            print_diagnostic(diagnostic, &[]);
        }
        return 1;
    }

    if cli.check {
        let diagnostics = program.check_syntax();
        for diagnostic in diagnostics.diagnostics() {
            print_diagnostic(diagnostic, program.sources());
        }
        return if diagnostics.has_errors() { 1 } else { 0 };
    }

    let nodes = match resolve_nodes(cli, config.as_ref()) {
        Ok(nodes) => nodes,
        Err(diagnostic) => {
            print_diagnostic(&diagnostic, &[]);
            return 1;
        }
    };
    if nodes.is_empty() {
        print_error("No node to compile. Pass --node, --nodes or --enc.");
        return 1;
    }

    let mut exit_code = 0;
    let mut compilations = Vec::with_capacity(nodes.len());
    for result in program.compile_nodes(&nodes) {
        match result {
            Ok(compilation) => {
                for diagnostic in compilation.diagnostics.diagnostics() {
                    print_diagnostic(diagnostic, program.sources());
                }
                compilations.push(compilation);
            }
            Err(err) => {
                for diagnostic in err.to_diagnostics().diagnostics() {
                    print_diagnostic(diagnostic, program.sources());
                }
                exit_code = 1;
            }
        }
    }

    match cli.format {
        OutputFormat::Text => print_text(&compilations),
        OutputFormat::Json => {
            if let Err(err) = print_json(&compilations) {
                print_error(&format!("Cannot write catalog: {}", err));
                exit_code = 1;
            }
        }
    }

    debug!(
        nodes = nodes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "finished"
    );
    exit_code
}

fn resolve_input_files(cli: &Cli) -> Result<(Vec<PathBuf>, Option<StrataConfig>), Diagnostic> {
    if let Some(ref project) = cli.project {
        let path = if project.is_dir() {
            project.join(CONFIG_FILE_NAME)
        } else {
            project.clone()
        };
        load_files_from_config(&path)
    } else if !cli.files.is_empty() {
        Ok((cli.files.clone(), None))
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        load_files_from_config(Path::new(CONFIG_FILE_NAME))
    } else {
        Ok((vec![], None))
    }
}

fn load_files_from_config(path: &Path) -> Result<(Vec<PathBuf>, Option<StrataConfig>), Diagnostic> {
    let config = load_config(path).map_err(|err| err.to_diagnostic())?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok((config.file_paths(base_dir), Some(config)))
}

/// The nodes to compile. Classifier data from `--enc`, or else from
/// strata.json, is shared by every node named on the command line.
fn resolve_nodes(cli: &Cli, config: Option<&StrataConfig>) -> Result<Vec<NodeData>, Diagnostic> {
    let base = match cli.enc {
        Some(ref path) => Some(load_node_data(path).map_err(|err| err.to_diagnostic())?),
        None => config.and_then(|config| config.node.clone()),
    };

    let mut names = cli.nodes.clone();
    if let Some(ref node) = cli.node {
        names.push(node.clone());
    }

    let nodes = match base {
        Some(base) if names.is_empty() => {
            if base.name.is_empty() {
                vec![]
            } else {
                vec![base]
            }
        }
        Some(base) => names
            .into_iter()
            .map(|name| NodeData { name, ..base.clone() })
            .collect(),
        None => names.into_iter().map(NodeData::named).collect(),
    };
    Ok(nodes)
}

fn print_text(compilations: &[Compilation]) {
    for compilation in compilations {
        println!("Node[{}]", compilation.node);
        for notice in &compilation.notices {
            println!("  Notice: {}", notice);
        }
        for resource in compilation.catalog.resources() {
            match (&resource.file, resource.line) {
                (Some(file), Some(line)) => {
                    println!("  {} ({}, {}:{})", resource.reference(), resource.declared_in, file, line)
                }
                _ => println!("  {} ({})", resource.reference(), resource.declared_in),
            }
        }
    }
}

fn print_json(compilations: &[Compilation]) -> serde_json::Result<()> {
    let outputs: Vec<NodeOutput<'_>> = compilations
        .iter()
        .map(|compilation| NodeOutput {
            node: &compilation.node,
            catalog: &compilation.catalog,
            notices: &compilation.notices,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}

/// Render a diagnostic through miette, with a source snippet when the
/// diagnostic points into a loaded manifest.
fn print_diagnostic(diagnostic: &Diagnostic, sources: &[SourceFile]) {
    let severity = if diagnostic.is_error() {
        Severity::Error
    } else {
        Severity::Warning
    };
    let mut rendered = MietteDiagnostic::new(diagnostic.message_text.clone())
        .with_code(format!("S{}", diagnostic.code))
        .with_severity(severity);

    let source = diagnostic
        .file
        .as_deref()
        .and_then(|file| sources.iter().find(|source| source.file_name == file));
    match (diagnostic.span, source) {
        (Some(span), Some(source)) => {
            rendered = rendered.with_label(LabeledSpan::at(span.to_range(), "here"));
            let report = Report::new(rendered)
                .with_source_code(NamedSource::new(&source.file_name, source.text.clone()));
            eprintln!("{:?}", report);
        }
        _ => {
            if diagnostic.file.is_some() {
                eprintln!("{}", diagnostic);
            } else {
                eprintln!("{:?}", Report::new(rendered));
            }
        }
    }
}

fn print_error(msg: &str) {
    eprintln!("error: {}", msg);
}
