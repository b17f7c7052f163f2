//! Errors raised while evaluating manifests. All of them abort the
//! compilation of the current node.

use strata_core::text::SourcePosition;
use strata_diagnostics::{messages, Diagnostic};
use strata_scope::ScopeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("Could not find class {name}{}", at(.position))]
    CouldNotFindClass {
        name: String,
        position: Option<SourcePosition>,
    },

    #[error("Duplicate declaration: {resource} is already declared{}; cannot redeclare{}", at(.previous), at(.position))]
    DuplicateResource {
        resource: String,
        position: Option<SourcePosition>,
        previous: Option<SourcePosition>,
    },

    #[error("Must pass {parameter} to {resource}{}", at(.position))]
    MissingParameter {
        parameter: String,
        resource: String,
        position: Option<SourcePosition>,
    },

    #[error("Invalid parameter {parameter} on {resource}{}", at(.position))]
    InvalidParameter {
        parameter: String,
        resource: String,
        position: Option<SourcePosition>,
    },

    #[error("Unknown function {name}{}", at(.position))]
    UnknownFunction {
        name: String,
        position: Option<SourcePosition>,
    },

    #[error("Invalid argument to {function}: {reason}{}", at(.position))]
    InvalidArgument {
        function: String,
        reason: String,
        position: Option<SourcePosition>,
    },

    #[error("Invalid template: {reason}{}", at(.position))]
    InvalidTemplate {
        reason: String,
        position: Option<SourcePosition>,
    },

    #[error("Could not find node statement with name 'default' or '{node}'")]
    NoMatchingNode { node: String },

    #[error("Could not find node {name} to inherit from{}", at(.position))]
    UnknownNode {
        name: String,
        position: Option<SourcePosition>,
    },

    #[error("Node {node} inherits from itself through {}", .chain.join(" -> "))]
    NodeInheritanceCycle { node: String, chain: Vec<String> },

    #[error("{kind} {name} is already defined{}", at(.previous))]
    DuplicateDefinition {
        kind: &'static str,
        name: String,
        position: Option<SourcePosition>,
        previous: Option<SourcePosition>,
    },

    #[error("Cannot assign to variable {name} in another namespace{}", at(.position))]
    QualifiedAssignment {
        name: String,
        position: Option<SourcePosition>,
    },
}

fn at(position: &Option<SourcePosition>) -> String {
    position
        .as_ref()
        .map(|p| format!(" at {}", p))
        .unwrap_or_default()
}

impl EvalError {
    pub fn position(&self) -> Option<&SourcePosition> {
        match self {
            EvalError::Scope(err) => err.position(),
            EvalError::CouldNotFindClass { position, .. }
            | EvalError::DuplicateResource { position, .. }
            | EvalError::MissingParameter { position, .. }
            | EvalError::InvalidParameter { position, .. }
            | EvalError::UnknownFunction { position, .. }
            | EvalError::InvalidArgument { position, .. }
            | EvalError::InvalidTemplate { position, .. }
            | EvalError::UnknownNode { position, .. }
            | EvalError::DuplicateDefinition { position, .. }
            | EvalError::QualifiedAssignment { position, .. } => position.as_ref(),
            EvalError::NoMatchingNode { .. } | EvalError::NodeInheritanceCycle { .. } => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match self {
            EvalError::Scope(err) => return err.to_diagnostic(),
            EvalError::CouldNotFindClass { .. } => &messages::COULD_NOT_FIND_CLASS,
            EvalError::DuplicateResource { .. } => &messages::DUPLICATE_RESOURCE,
            EvalError::MissingParameter { .. } => &messages::MISSING_PARAMETER,
            EvalError::InvalidParameter { .. } => &messages::INVALID_PARAMETER,
            EvalError::UnknownFunction { .. } => &messages::UNKNOWN_FUNCTION,
            EvalError::InvalidArgument { .. } => &messages::INVALID_ARGUMENT,
            EvalError::InvalidTemplate { .. } => &messages::INVALID_TEMPLATE,
            EvalError::NoMatchingNode { .. } => &messages::NO_MATCHING_NODE,
            EvalError::UnknownNode { .. } => &messages::UNKNOWN_NODE,
            EvalError::NodeInheritanceCycle { .. } => &messages::NODE_INHERITANCE_CYCLE,
            EvalError::DuplicateDefinition { .. } => &messages::DUPLICATE_DEFINITION,
            EvalError::QualifiedAssignment { .. } => &messages::QUALIFIED_ASSIGNMENT,
        };
        let diagnostic = Diagnostic::from_text(message, self.to_string());
        match self.position() {
            Some(position) => diagnostic.at(position),
            None => diagnostic,
        }
    }
}
