//! strata_parser: Recursive descent parser for manifests.
//!
//! Parses token streams from the scanner into an arena-allocated AST.

mod parser;

pub use parser::Parser;
