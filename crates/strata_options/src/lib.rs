//! strata_options: strata.json parsing, compiler options and node data.
//!
//! Node data is what an external node classifier reports for one node:
//! its parameters, facts and classes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_diagnostics::{messages, Diagnostic};
use strata_scope::{EncMerger, ScopeOptions, Value};
use thiserror::Error;

pub use strata_scope::UnknownClassPolicy;

/// Compiler options, matching the `compilerOptions` object of strata.json.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    pub unknown_class_policy: UnknownClassPolicy,
}

impl CompilerOptions {
    pub fn scope_options(&self) -> ScopeOptions {
        ScopeOptions {
            unknown_class: self.unknown_class_policy,
        }
    }
}

/// Classifier output for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeData {
    pub name: String,
    pub parameters: IndexMap<String, Value>,
    pub facts: IndexMap<String, Value>,
    pub classes: Vec<String>,
}

impl NodeData {
    /// Node data with nothing but a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn enc(&self) -> EncMerger<'_> {
        EncMerger::new(&self.parameters, &self.facts, &self.classes)
    }
}

/// The strata.json file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrataConfig {
    pub compiler_options: CompilerOptions,
    /// Manifest paths, relative to the directory holding strata.json.
    pub files: Vec<String>,
    pub node: Option<NodeData>,
}

impl StrataConfig {
    /// `files` resolved against `base_dir`.
    pub fn file_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.files.iter().map(|file| base_dir.join(file)).collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match self {
            ConfigError::Read { .. } => &messages::CANNOT_READ_FILE,
            ConfigError::Parse { .. } => &messages::INVALID_CONFIG,
        };
        Diagnostic::from_text(message, self.to_string())
    }
}

/// Parse a strata.json file from a string.
pub fn parse_config(content: &str) -> Result<StrataConfig, serde_json::Error> {
    serde_json::from_str(content)
}

/// Parse a strata.json file from a path.
pub fn load_config(path: &Path) -> Result<StrataConfig, ConfigError> {
    load_json(path)
}

/// Parse classifier output for one node from a path.
pub fn load_node_data(path: &Path) -> Result<NodeData, ConfigError> {
    load_json(path)
}

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
