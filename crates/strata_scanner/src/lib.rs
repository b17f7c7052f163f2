//! strata_scanner: Lexer for manifest source text.
//!
//! Produces a stream of tokens with byte spans. Strings are returned as
//! raw content; the parser splits double-quoted strings into literal text
//! and interpolated variables.

mod scanner;

pub use scanner::{Scanner, ScannerState};
