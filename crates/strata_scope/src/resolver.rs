//! Variable lookup.
//!
//! Unqualified names walk the requesting scope's own table, its
//! inheritance ancestors, the active node (and the nodes it inherits), and
//! finally top scope. Qualified names read exactly one table and never
//! fall back.

use crate::error::ScopeError;
use crate::registry::{ScopeRegistry, UnknownClassPolicy};
use crate::scope::{ScopeId, ScopeKind, NAMESPACE_SEPARATOR};
use crate::value::Value;
use strata_core::intern::InternedString;
use tracing::trace;

/// A variable reference split into its namespace and local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableName<'n> {
    /// `$var`
    Unqualified(&'n str),
    /// `$::var`
    Top(&'n str),
    /// `$a::b::var` (relative) or `$::a::b::var` (absolute).
    Qualified {
        namespace: &'n str,
        local: &'n str,
        absolute: bool,
    },
}

impl<'n> VariableName<'n> {
    pub fn parse(name: &'n str) -> Self {
        let (absolute, rest) = match name.strip_prefix(NAMESPACE_SEPARATOR) {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        match rest.rsplit_once(NAMESPACE_SEPARATOR) {
            Some((namespace, local)) => VariableName::Qualified {
                namespace,
                local,
                absolute,
            },
            None if absolute => VariableName::Top(rest),
            None => VariableName::Unqualified(rest),
        }
    }

    pub fn local(&self) -> &'n str {
        match *self {
            VariableName::Unqualified(local) | VariableName::Top(local) => local,
            VariableName::Qualified { local, .. } => local,
        }
    }
}

/// The outcome of a lookup: either a bound value (possibly `undef`) and the
/// scope that holds it, or undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'r> {
    Bound { value: &'r Value, scope: ScopeId },
    Undefined,
}

impl<'r> Lookup<'r> {
    pub fn is_bound(&self) -> bool {
        matches!(self, Lookup::Bound { .. })
    }

    pub fn value(&self) -> Option<&'r Value> {
        match *self {
            Lookup::Bound { value, .. } => Some(value),
            Lookup::Undefined => None,
        }
    }

    /// The value as seen by expressions: undefined reads as `undef`.
    pub fn to_value(&self) -> Value {
        self.value().cloned().unwrap_or(Value::Undef)
    }

    pub fn scope(&self) -> Option<ScopeId> {
        match *self {
            Lookup::Bound { scope, .. } => Some(scope),
            Lookup::Undefined => None,
        }
    }
}

/// Resolves variable references against a [`ScopeRegistry`].
#[derive(Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r ScopeRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r ScopeRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `name` (without the leading `$`) as referenced from `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Result<Lookup<'r>, ScopeError> {
        let lookup = match VariableName::parse(name) {
            VariableName::Unqualified(local) => self.resolve_unqualified(scope, local),
            VariableName::Top(local) => self.read(self.registry.top(), local),
            VariableName::Qualified {
                namespace,
                local,
                absolute,
            } => {
                let reference = if absolute {
                    format!("{}{}", NAMESPACE_SEPARATOR, namespace)
                } else {
                    namespace.to_string()
                };
                let target = self
                    .registry
                    .qualify_class(&reference, scope, |candidate| self.registry.class_scope(candidate).is_some())
                    .and_then(|qualified| self.registry.class_scope(&qualified));
                match target {
                    Some(target) => self.read(target, local),
                    None => match self.registry.options().unknown_class {
                        UnknownClassPolicy::Error => {
                            return Err(ScopeError::UnknownClass {
                                class: namespace.to_string(),
                                variable: name.to_string(),
                                position: None,
                            })
                        }
                        UnknownClassPolicy::Undefined => Lookup::Undefined,
                    },
                }
            }
        };
        trace!(
            from = %self.registry.scope(scope).label(),
            name,
            bound_in = ?lookup.scope().map(|id| self.registry.scope(id).label()),
            "resolved variable"
        );
        Ok(lookup)
    }

    /// Whether `name` is bound anywhere on its lookup path, even to `undef`.
    pub fn is_bound(&self, scope: ScopeId, name: &str) -> Result<bool, ScopeError> {
        Ok(self.resolve(scope, name)?.is_bound())
    }

    /// The value of `name`, or `None` when it was never bound.
    pub fn value(&self, scope: ScopeId, name: &str) -> Result<Option<&'r Value>, ScopeError> {
        Ok(self.resolve(scope, name)?.value())
    }

    fn resolve_unqualified(&self, scope: ScopeId, local: &str) -> Lookup<'r> {
        let Some(key) = self.registry.interner().get(local) else {
            return Lookup::Undefined;
        };
        let top = self.registry.top();
        let requesting = self.registry.scope(scope);
        let found = match requesting.kind {
            ScopeKind::Top => self.read_key(top, key),
            ScopeKind::Node => self
                .walk_inheritance(scope, key)
                .or_else(|| self.read_key(top, key)),
            ScopeKind::Class | ScopeKind::DefinedTypeInstance => self
                .walk_inheritance(scope, key)
                .or_else(|| {
                    self.registry
                        .active_node()
                        .and_then(|node| self.walk_inheritance(node, key))
                })
                .or_else(|| self.read_key(top, key)),
        };
        found.unwrap_or(Lookup::Undefined)
    }

    /// Search `start` and then each scope reached through `inherits`.
    fn walk_inheritance(&self, start: ScopeId, key: InternedString) -> Option<Lookup<'r>> {
        let mut current = Some(start);
        while let Some(id) = current {
            if let Some(found) = self.read_key(id, key) {
                return Some(found);
            }
            current = self.registry.scope(id).inherits;
        }
        None
    }

    fn read(&self, scope: ScopeId, local: &str) -> Lookup<'r> {
        self.registry
            .interner()
            .get(local)
            .and_then(|key| self.read_key(scope, key))
            .unwrap_or(Lookup::Undefined)
    }

    fn read_key(&self, scope: ScopeId, key: InternedString) -> Option<Lookup<'r>> {
        let registry: &'r ScopeRegistry = self.registry;
        registry
            .scope(scope)
            .symbols
            .get(key)
            .map(|binding| Lookup::Bound {
                value: &binding.value,
                scope,
            })
    }
}

impl ScopeRegistry {
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }
}
