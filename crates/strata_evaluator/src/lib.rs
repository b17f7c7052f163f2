//! strata_evaluator: Reference evaluator for parsed manifests.
//!
//! Drives the scope engine the way a catalog compiler does: node data is
//! merged into top scope, top-level statements run, the matching node
//! definition is evaluated, and classes and defined types get their scopes
//! on demand. The output is the node's catalog.

pub mod catalog;
mod definitions;
mod error;
mod evaluator;
mod functions;
mod legacy;
pub mod template;

pub use catalog::{Catalog, Resource};
pub use error::EvalError;
pub use evaluator::{Evaluation, Evaluator};
pub use legacy::check_legacy_operators;
