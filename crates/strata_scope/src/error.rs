//! Errors raised by the scope engine. All of them abort the compilation.

use strata_core::text::SourcePosition;
use strata_diagnostics::{messages, Diagnostic};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    /// A name was bound twice in the same symbol table.
    #[error("Cannot reassign variable '{name}'{}{}", at(.position), previously(.previous))]
    DuplicateBinding {
        name: String,
        position: Option<SourcePosition>,
        previous: Option<SourcePosition>,
    },

    /// A top scope binding collided with node data supplied for the node.
    #[error("Cannot reassign variable {name}{} on node {node}", at(.position))]
    CannotReassignVariable {
        name: String,
        node: String,
        position: Option<SourcePosition>,
    },

    /// A qualified variable names a class that has no evaluated scope.
    #[error("Could not find class {class} for qualified variable '{variable}'{}", at(.position))]
    UnknownClass {
        class: String,
        variable: String,
        position: Option<SourcePosition>,
    },

    #[error("The operator '{operator}' is no longer supported{}. Assign the combined value to a new variable instead", at(.position))]
    LegacyOperator {
        operator: String,
        position: Option<SourcePosition>,
    },

    #[error("Class {class} inherits from itself through {}", .chain.join(" -> "))]
    InheritanceCycle { class: String, chain: Vec<String> },
}

fn at(position: &Option<SourcePosition>) -> String {
    position
        .as_ref()
        .map(|p| format!(" at {}", p))
        .unwrap_or_default()
}

fn previously(position: &Option<SourcePosition>) -> String {
    position
        .as_ref()
        .map(|p| format!(", previously bound at {}", p))
        .unwrap_or_default()
}

impl ScopeError {
    pub fn position(&self) -> Option<&SourcePosition> {
        match self {
            ScopeError::DuplicateBinding { position, .. }
            | ScopeError::CannotReassignVariable { position, .. }
            | ScopeError::UnknownClass { position, .. }
            | ScopeError::LegacyOperator { position, .. } => position.as_ref(),
            ScopeError::InheritanceCycle { .. } => None,
        }
    }

    /// Fill in the source position if the raising site did not know it.
    pub fn or_position(mut self, source: Option<&SourcePosition>) -> Self {
        if let Some(source) = source {
            match &mut self {
                ScopeError::DuplicateBinding { position, .. }
                | ScopeError::CannotReassignVariable { position, .. }
                | ScopeError::UnknownClass { position, .. }
                | ScopeError::LegacyOperator { position, .. } => {
                    if position.is_none() {
                        *position = Some(source.clone());
                    }
                }
                ScopeError::InheritanceCycle { .. } => {}
            }
        }
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match self {
            ScopeError::DuplicateBinding { .. } => &messages::DUPLICATE_BINDING,
            ScopeError::CannotReassignVariable { .. } => &messages::CANNOT_REASSIGN_VARIABLE,
            ScopeError::UnknownClass { .. } => &messages::UNKNOWN_CLASS,
            ScopeError::LegacyOperator { .. } => &messages::LEGACY_OPERATOR,
            ScopeError::InheritanceCycle { .. } => &messages::INHERITANCE_CYCLE,
        };
        let diagnostic = Diagnostic::from_text(message, self.to_string());
        match self.position() {
            Some(position) => diagnostic.at(position),
            None => diagnostic,
        }
    }
}
