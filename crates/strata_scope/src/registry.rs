//! The scope registry: owner of every scope in one compilation.
//!
//! The registry is single-writer and is never shared between
//! compilations; each compilation constructs its own, together with its
//! own top scope.

use crate::error::ScopeError;
use crate::scope::{namespace_chain, Scope, ScopeId, ScopeKind, NAMESPACE_SEPARATOR};
use crate::symbol::{Binding, BindingOrigin};
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strata_core::intern::{InternedString, StringInterner};
use strata_core::text::SourcePosition;
use tracing::debug;

/// What a qualified variable reference does when its class has no
/// evaluated scope. Spelled `error` / `undefined` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownClassPolicy {
    /// Abort the compilation with [`ScopeError::UnknownClass`].
    #[default]
    Error,
    /// Resolve the reference to an undefined value.
    Undefined,
}

impl FromStr for UnknownClassPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(UnknownClassPolicy::Error),
            "undefined" => Ok(UnknownClassPolicy::Undefined),
            other => Err(format!("unknown policy '{}', expected 'error' or 'undefined'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeOptions {
    pub unknown_class: UnknownClassPolicy,
}

#[derive(Debug)]
pub struct ScopeRegistry {
    interner: StringInterner,
    options: ScopeOptions,
    scopes: Vec<Scope>,
    /// Evaluated classes by fully-qualified name.
    classes: FxHashMap<InternedString, ScopeId>,
    /// Evaluated node definitions by name.
    nodes: FxHashMap<InternedString, ScopeId>,
    top: ScopeId,
    active_node: Option<ScopeId>,
    /// Name of the node this compilation is for.
    node_name: String,
    /// Classes whose parent chain is being constructed, outermost first.
    in_progress: Vec<InternedString>,
}

impl ScopeRegistry {
    pub fn new(interner: StringInterner, node_name: impl Into<String>) -> Self {
        Self::with_options(interner, node_name, ScopeOptions::default())
    }

    pub fn with_options(interner: StringInterner, node_name: impl Into<String>, options: ScopeOptions) -> Self {
        let top = ScopeId::new(0);
        Self {
            interner,
            options,
            scopes: vec![Scope::new(top, ScopeKind::Top, String::new())],
            classes: FxHashMap::default(),
            nodes: FxHashMap::default(),
            top,
            active_node: None,
            node_name: node_name.into(),
            in_progress: Vec::new(),
        }
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn options(&self) -> ScopeOptions {
        self.options
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    #[inline]
    pub fn top(&self) -> ScopeId {
        self.top
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn active_node(&self) -> Option<ScopeId> {
        self.active_node
    }

    /// Set the node scope consulted after a class's inheritance chain.
    pub fn set_active_node(&mut self, node: Option<ScopeId>) {
        debug_assert!(node.map_or(true, |id| self.scope(id).kind == ScopeKind::Node));
        self.active_node = node;
    }

    pub fn class_scope(&self, qualified_name: &str) -> Option<ScopeId> {
        let key = self.interner.get(qualified_name)?;
        self.classes.get(&key).copied()
    }

    pub fn node_scope(&self, name: &str) -> Option<ScopeId> {
        let key = self.interner.get(name)?;
        self.nodes.get(&key).copied()
    }

    /// Obtain the scope registered under `qualified_name`, creating it on
    /// first use.
    ///
    /// `inherits` must already exist: callers evaluate the parent first so
    /// that inherited bindings are in place before the child body runs.
    /// Because a parent always predates its child, `inherits` links can
    /// never form a cycle. A second call returns the existing scope
    /// unchanged.
    pub fn get_or_create(
        &mut self,
        qualified_name: &str,
        kind: ScopeKind,
        inherits: Option<ScopeId>,
    ) -> ScopeId {
        let key = self.interner.intern(qualified_name);
        let existing = match kind {
            ScopeKind::Top => return self.top,
            ScopeKind::Class => self.classes.get(&key),
            ScopeKind::Node => self.nodes.get(&key),
            ScopeKind::DefinedTypeInstance => None,
        };
        if let Some(&id) = existing {
            return id;
        }

        let id = match kind {
            ScopeKind::Node => {
                let id = self.push_scope(ScopeKind::Node, String::new(), inherits);
                self.scopes[id.index()].title = Some(qualified_name.to_string());
                self.nodes.insert(key, id);
                id
            }
            _ => {
                let id = self.push_scope(kind, qualified_name.to_string(), inherits);
                if kind == ScopeKind::Class {
                    self.classes.insert(key, id);
                }
                id
            }
        };
        debug!(
            scope = %self.scope(id).label(),
            inherits = ?inherits.map(|p| self.scope(p).label()),
            "created scope"
        );
        id
    }

    /// Create an unregistered scope for one defined type instance. Defined
    /// types have no inheritance chain.
    pub fn create_instance(&mut self, type_name: &str, title: &str) -> ScopeId {
        let id = self.push_scope(ScopeKind::DefinedTypeInstance, type_name.to_string(), None);
        self.scopes[id.index()].title = Some(title.to_string());
        debug!(scope = %self.scope(id).label(), "created defined type instance scope");
        id
    }

    fn push_scope(&mut self, kind: ScopeKind, qualified_name: String, inherits: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        debug_assert!(inherits.map_or(true, |parent| parent < id));
        debug_assert!(inherits.map_or(true, |parent| self.scope(parent).kind == kind));
        let mut scope = Scope::new(id, kind, qualified_name);
        scope.inherits = inherits;
        self.scopes.push(scope);
        id
    }

    /// Mark `qualified_name` as under construction. Fails if it already is,
    /// which means the class inherits from itself.
    pub fn enter_class(&mut self, qualified_name: &str) -> Result<(), ScopeError> {
        let key = self.interner.intern(qualified_name);
        if let Some(start) = self.in_progress.iter().position(|&k| k == key) {
            let mut chain: Vec<String> = self.in_progress[start..]
                .iter()
                .map(|&k| self.interner.resolve(k).to_string())
                .collect();
            chain.push(qualified_name.to_string());
            return Err(ScopeError::InheritanceCycle {
                class: qualified_name.to_string(),
                chain,
            });
        }
        self.in_progress.push(key);
        Ok(())
    }

    pub fn leave_class(&mut self, qualified_name: &str) {
        if let Some(key) = self.interner.get(qualified_name) {
            if let Some(index) = self.in_progress.iter().rposition(|&k| k == key) {
                self.in_progress.remove(index);
            }
        }
    }

    /// Bind `name` in `scope`'s own table.
    ///
    /// Collisions in top scope that involve node data (ENC parameters or
    /// facts) raise [`ScopeError::CannotReassignVariable`]; any other
    /// collision raises [`ScopeError::DuplicateBinding`].
    pub fn bind(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: Value,
        origin: BindingOrigin,
        position: Option<SourcePosition>,
    ) -> Result<(), ScopeError> {
        let key = self.interner.intern(name);
        let is_top = scope == self.top;
        let binding = Binding::new(value, origin).at(position.clone());
        let table = &mut self.scopes[scope.index()].symbols;
        match table.bind(key, binding) {
            Ok(()) => Ok(()),
            Err(existing) if is_top && (existing.origin.is_node_data() || origin.is_node_data()) => {
                Err(ScopeError::CannotReassignVariable {
                    name: name.to_string(),
                    node: self.node_name.clone(),
                    position: position.or_else(|| existing.position.clone()),
                })
            }
            Err(existing) => Err(ScopeError::DuplicateBinding {
                name: name.to_string(),
                position,
                previous: existing.position.clone(),
            }),
        }
    }

    /// Qualify a class reference made from `from` against the names that
    /// `exists` accepts.
    ///
    /// A leading `::` pins the reference to the literal top-level name.
    /// Otherwise the requesting scope's enclosing namespaces are tried most
    /// specific first, then the literal name.
    pub fn qualify_class(&self, reference: &str, from: ScopeId, exists: impl Fn(&str) -> bool) -> Option<String> {
        qualify(reference, &self.scope(from).namespace_chain(), exists)
    }

    /// Like [`qualify_class`](Self::qualify_class), for a reference written
    /// inside the class or defined type named `namespace`, which need not
    /// have a scope yet (a parent class is resolved before its child's
    /// scope exists).
    pub fn qualify_class_in(&self, reference: &str, namespace: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
        qualify(reference, &namespace_chain(namespace), exists)
    }
}

fn qualify(reference: &str, chain: &[&str], exists: impl Fn(&str) -> bool) -> Option<String> {
    if let Some(absolute) = reference.strip_prefix(NAMESPACE_SEPARATOR) {
        return exists(absolute).then(|| absolute.to_string());
    }
    for namespace in chain {
        let candidate = format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, reference);
        if exists(&candidate) {
            return Some(candidate);
        }
    }
    exists(reference).then(|| reference.to_string())
}
