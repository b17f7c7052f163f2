//! strata_compiler: Compiler orchestration.
//!
//! Holds the program's manifest sources and compiles them into one catalog
//! per node. Every compilation parses into its own arena and owns its own
//! scope registry, so nodes compile independently and in parallel.

use bumpalo::Bump;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use strata_core::intern::StringInterner;
use strata_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use strata_evaluator::{Catalog, EvalError, Evaluator};
use strata_options::{CompilerOptions, NodeData, StrataConfig};
use strata_parser::Parser;
use strata_scope::{ScopeId, ScopeRegistry};
use thiserror::Error;
use tracing::{debug, info, info_span};

/// One manifest file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Cannot read file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} syntax error(s) in manifests", .diagnostics.error_count())]
    Syntax { diagnostics: DiagnosticCollection },

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

impl CompileError {
    pub fn to_diagnostics(&self) -> DiagnosticCollection {
        match self {
            CompileError::Read { .. } => {
                let mut diagnostics = DiagnosticCollection::new();
                diagnostics.add(Diagnostic::from_text(&messages::CANNOT_READ_FILE, self.to_string()));
                diagnostics
            }
            CompileError::Syntax { diagnostics } => diagnostics.clone(),
            CompileError::Evaluation(err) => {
                let mut diagnostics = DiagnosticCollection::new();
                diagnostics.add(err.to_diagnostic());
                diagnostics
            }
        }
    }
}

/// The output of compiling one node.
#[derive(Debug)]
pub struct Compilation {
    pub node: String,
    pub catalog: Catalog,
    /// Messages passed to `notice`.
    pub notices: Vec<String>,
    /// Warnings from parsing and evaluation.
    pub diagnostics: DiagnosticCollection,
    pub registry: ScopeRegistry,
    pub node_scope: Option<ScopeId>,
}

/// The program represents the manifests every node is compiled from.
#[derive(Debug, Default)]
pub struct Program {
    /// Compiler options.
    pub options: CompilerOptions,
    /// The root file names.
    pub root_files: Vec<PathBuf>,
    sources: Vec<SourceFile>,
}

impl Program {
    /// Create a new program from root files and options.
    pub fn new(root_files: Vec<PathBuf>, options: CompilerOptions) -> Self {
        Self {
            options,
            root_files,
            sources: Vec::new(),
        }
    }

    /// A program for the files and options in a strata.json whose
    /// directory is `base_dir`.
    pub fn from_config(config: &StrataConfig, base_dir: &Path) -> Self {
        Self::new(config.file_paths(base_dir), config.compiler_options.clone())
    }

    /// Add a source file to the program.
    pub fn add_source(&mut self, file_name: impl Into<String>, text: impl Into<String>) {
        self.sources.push(SourceFile {
            file_name: file_name.into(),
            text: text.into(),
        });
    }

    /// Load all root files from disk.
    pub fn load_root_files(&mut self) -> Result<(), CompileError> {
        for path in self.root_files.clone() {
            let text = std::fs::read_to_string(&path).map_err(|source| CompileError::Read {
                path: path.clone(),
                source,
            })?;
            self.add_source(path.display().to_string(), text);
        }
        Ok(())
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Parse every source and return the syntax diagnostics.
    pub fn check_syntax(&self) -> DiagnosticCollection {
        let arena = Bump::new();
        let mut diagnostics = DiagnosticCollection::new();
        for source in &self.sources {
            let (_, parse_diagnostics) = Parser::new(&arena, &source.file_name, &source.text).parse_manifest();
            diagnostics.extend(parse_diagnostics);
        }
        diagnostics.sort();
        diagnostics
    }

    /// Run the full pipeline for one node: parse -> merge node data ->
    /// evaluate -> catalog.
    pub fn compile_node(&self, node: &NodeData) -> Result<Compilation, CompileError> {
        let span = info_span!("compile", node = %node.name);
        let _enter = span.enter();

        let arena = Bump::new();
        let mut diagnostics = DiagnosticCollection::new();
        let mut manifests = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let (manifest, parse_diagnostics) = Parser::new(&arena, &source.file_name, &source.text).parse_manifest();
            diagnostics.extend(parse_diagnostics);
            manifests.push(manifest);
        }
        if diagnostics.has_errors() {
            diagnostics.sort();
            return Err(CompileError::Syntax { diagnostics });
        }
        debug!(files = manifests.len(), "parsed manifests");

        let registry = ScopeRegistry::with_options(
            StringInterner::new(),
            node.name.as_str(),
            self.options.scope_options(),
        );
        let evaluation = Evaluator::new(&manifests, registry)?.evaluate(&node.enc())?;
        diagnostics.extend(evaluation.diagnostics);
        info!(
            resources = evaluation.catalog.len(),
            scopes = evaluation.registry.scopes().len(),
            "compiled catalog"
        );

        Ok(Compilation {
            node: node.name.clone(),
            catalog: evaluation.catalog,
            notices: evaluation.notices,
            diagnostics,
            registry: evaluation.registry,
            node_scope: evaluation.node_scope,
        })
    }

    /// Compile several nodes in parallel. Results are in the order of
    /// `nodes`.
    pub fn compile_nodes(&self, nodes: &[NodeData]) -> Vec<Result<Compilation, CompileError>> {
        nodes.par_iter().map(|node| self.compile_node(node)).collect()
    }
}
