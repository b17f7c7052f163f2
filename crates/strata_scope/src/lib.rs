//! strata_scope: Scope chain model and variable resolution.
//!
//! Scopes are created for the top level, the matched node, every evaluated
//! class and every defined type instance. Unqualified names resolve through
//! the inheritance chain, then the active node, then top scope. Qualified
//! names resolve against exactly one class scope. The scope that *included*
//! a class is never consulted.

mod enc;
mod error;
mod registry;
mod resolver;
mod scope;
mod symbol;
mod value;

pub use enc::EncMerger;
pub use error::ScopeError;
pub use registry::{ScopeOptions, ScopeRegistry, UnknownClassPolicy};
pub use resolver::{Lookup, Resolver, VariableName};
pub use scope::{Scope, ScopeId, ScopeKind, NAMESPACE_SEPARATOR};
pub use symbol::{Binding, BindingOrigin, SymbolTable};
pub use value::Value;
