//! strata_ast: Abstract Syntax Tree definitions for manifests.
//!
//! Defines token kinds, arena-allocated AST nodes, and the `AstVisitor`
//! traversal trait.

pub mod node;
pub mod syntax_kind;
pub mod visitor;

// Re-export key types
pub use node::*;
pub use syntax_kind::SyntaxKind;
