//! strata_core: Core utilities for the strata manifest compiler.
//!
//! Provides string interning for variable and class names, text spans,
//! and the line/column mapping used by every diagnostic.

pub mod intern;
pub mod text;

// Re-export commonly used types
pub use intern::{InternedString, StringInterner};
pub use text::{LineMap, SourcePosition, TextSpan};
