//! strata_diagnostics: Diagnostic messages and error reporting infrastructure.
//!
//! Every message the compiler can report lives in the [`messages`] catalog
//! with a stable code. Errors raised by the scope engine and the evaluator
//! are converted into [`Diagnostic`]s so the CLI prints them uniformly.

use strata_core::text::{SourcePosition, TextSpan};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Warning => write!(f, "warning"),
            DiagnosticCategory::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message template with a code and category.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// The diagnostic code (e.g., 1002, 2001).
    pub code: u32,
    pub category: DiagnosticCategory,
    /// The message template string. May contain `{0}`, `{1}`, etc. placeholders.
    pub message: &'static str,
}

/// A realized diagnostic with location information and resolved message text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: Option<Arc<str>>,
    /// Byte span in `file`, used for snippet rendering.
    pub span: Option<TextSpan>,
    /// 1-based line and column, when known.
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message_text: String,
    pub code: u32,
    pub category: DiagnosticCategory,
}

impl Diagnostic {
    /// Create a new diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self::from_text(message, format_message(message.message, args))
    }

    /// Create a diagnostic whose text was already rendered (error types
    /// carry their own `Display` wording).
    pub fn from_text(message: &DiagnosticMessage, text: String) -> Self {
        Self {
            file: None,
            span: None,
            line: None,
            column: None,
            message_text: text,
            code: message.code,
            category: message.category,
        }
    }

    /// Attach a source position.
    pub fn at(mut self, position: &SourcePosition) -> Self {
        self.file = position.file.clone();
        self.span = position.span;
        self.line = Some(position.line);
        self.column = position.column;
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(column) = self.column {
                    write!(f, ":{}", column)?;
                }
            }
            write!(f, ": ")?;
        }
        write!(f, "{} S{}: {}", self.category, self.code, self.message_text)
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc. with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// A collection of diagnostics accumulated during compilation.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Sort diagnostics by file and position.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.span.map(|s| s.start).cmp(&b.span.map(|s| s.start)))
        });
    }
}

impl IntoIterator for DiagnosticCollection {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

// ============================================================================
// Diagnostic Messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Error, message: $msg }
        };
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Warning, message: $msg }
        };
    }

    // ========================================================================
    // Scanner and parser errors (1000-1099)
    // ========================================================================
    pub const UNTERMINATED_STRING_LITERAL: DiagnosticMessage = diag!(1002, Error, "Unterminated string literal.");
    pub const VARIABLE_NAME_EXPECTED: DiagnosticMessage = diag!(1003, Error, "Variable name expected after '$'.");
    pub const _0_EXPECTED: DiagnosticMessage = diag!(1005, Error, "'{0}' expected.");
    pub const INVALID_CHARACTER: DiagnosticMessage = diag!(1006, Error, "Invalid character '{0}'.");
    pub const UNEXPECTED_TOKEN_0: DiagnosticMessage = diag!(1012, Error, "Syntax error at '{0}'.");
    pub const EXPRESSION_EXPECTED: DiagnosticMessage = diag!(1013, Error, "Expression expected.");
    pub const CLASS_NAME_EXPECTED: DiagnosticMessage = diag!(1014, Error, "Class name expected.");
    pub const NODE_NAME_EXPECTED: DiagnosticMessage = diag!(1015, Error, "Node name expected.");
    pub const UNTERMINATED_INTERPOLATION: DiagnosticMessage = diag!(1016, Error, "Unterminated '${' interpolation.");

    // ========================================================================
    // Scope errors (2000-2099)
    // ========================================================================
    pub const DUPLICATE_BINDING: DiagnosticMessage = diag!(2001, Error, "Cannot reassign variable '{0}'.");
    pub const CANNOT_REASSIGN_VARIABLE: DiagnosticMessage = diag!(2002, Error, "Cannot reassign variable {0} on node {1}.");
    pub const UNKNOWN_CLASS: DiagnosticMessage = diag!(2003, Error, "Could not find class {0} for qualified variable '{1}'.");
    pub const LEGACY_OPERATOR: DiagnosticMessage = diag!(2004, Error, "The operator '{0}' is no longer supported.");
    pub const INHERITANCE_CYCLE: DiagnosticMessage = diag!(2005, Error, "Class {0} inherits from itself.");

    // ========================================================================
    // Evaluation errors (3000-3099)
    // ========================================================================
    pub const COULD_NOT_FIND_CLASS: DiagnosticMessage = diag!(3001, Error, "Could not find class {0}.");
    pub const DUPLICATE_RESOURCE: DiagnosticMessage = diag!(3002, Error, "Duplicate declaration: {0} is already declared.");
    pub const MISSING_PARAMETER: DiagnosticMessage = diag!(3003, Error, "Must pass {0} to {1}.");
    pub const INVALID_PARAMETER: DiagnosticMessage = diag!(3004, Error, "Invalid parameter {0} on {1}.");
    pub const UNKNOWN_FUNCTION: DiagnosticMessage = diag!(3005, Error, "Unknown function {0}.");
    pub const INVALID_TEMPLATE: DiagnosticMessage = diag!(3006, Error, "Invalid template: {0}.");
    pub const NO_MATCHING_NODE: DiagnosticMessage = diag!(3007, Error, "Could not find node statement with name 'default' or '{0}'.");
    pub const DUPLICATE_DEFINITION: DiagnosticMessage = diag!(3008, Error, "{0} is already defined.");
    pub const UNKNOWN_NODE: DiagnosticMessage = diag!(3009, Error, "Could not find node {0}.");
    pub const NODE_INHERITANCE_CYCLE: DiagnosticMessage = diag!(3010, Error, "Node {0} inherits from itself.");
    pub const QUALIFIED_ASSIGNMENT: DiagnosticMessage = diag!(3011, Error, "Cannot assign to variable {0} in another namespace.");
    pub const INVALID_ARGUMENT: DiagnosticMessage = diag!(3012, Error, "Invalid argument to {0}: {1}.");
    pub const UNDEFINED_VARIABLE_IN_TEMPLATE: DiagnosticMessage = diag!(3050, Warning, "Variable '{0}' is not defined.");

    // ========================================================================
    // Configuration errors (5000-5099)
    // ========================================================================
    pub const CANNOT_READ_FILE: DiagnosticMessage = diag!(5001, Error, "Cannot read file '{0}': {1}.");
    pub const INVALID_CONFIG: DiagnosticMessage = diag!(5002, Error, "Invalid configuration in '{0}': {1}.");
}
