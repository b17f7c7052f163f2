//! Scope definitions.

use crate::symbol::SymbolTable;
use std::fmt;

/// Separator between namespace segments in class and variable names.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Index of a scope in its registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Top,
    Node,
    Class,
    DefinedTypeInstance,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Top => write!(f, "top"),
            ScopeKind::Node => write!(f, "node"),
            ScopeKind::Class => write!(f, "class"),
            ScopeKind::DefinedTypeInstance => write!(f, "defined type"),
        }
    }
}

/// A named binding context for the top level, a node, a class, or one
/// defined type instance.
///
/// There is deliberately no link to the scope that included this one.
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Fully-qualified class or defined type name; empty for top and node.
    pub qualified_name: String,
    /// Node name or defined type title, for diagnostics.
    pub title: Option<String>,
    pub symbols: SymbolTable,
    /// Set only for classes and nodes that declare inheritance.
    pub inherits: Option<ScopeId>,
}

/// `a::b::c` and each enclosing namespace: `a::b::c`, `a::b`, `a`.
pub fn namespace_chain(qualified_name: &str) -> Vec<&str> {
    let mut chain = Vec::new();
    let mut current = (!qualified_name.is_empty()).then_some(qualified_name);
    while let Some(namespace) = current {
        chain.push(namespace);
        current = namespace
            .rsplit_once(NAMESPACE_SEPARATOR)
            .map(|(container, _)| container);
    }
    chain
}

impl Scope {
    pub(crate) fn new(id: ScopeId, kind: ScopeKind, qualified_name: String) -> Self {
        Self {
            id,
            kind,
            qualified_name,
            title: None,
            symbols: SymbolTable::new(),
            inherits: None,
        }
    }

    /// The namespace textually enclosing this scope's class or type
    /// (`foo` for `foo::bar`). Used only to qualify relative class names.
    pub fn lexical_container(&self) -> Option<&str> {
        match self.kind {
            ScopeKind::Top | ScopeKind::Node => None,
            ScopeKind::Class | ScopeKind::DefinedTypeInstance => self
                .qualified_name
                .rsplit_once(NAMESPACE_SEPARATOR)
                .map(|(container, _)| container),
        }
    }

    /// Namespaces to try, most specific first, when qualifying a relative
    /// class reference made from this scope. The literal name is always the
    /// final fallback and is not included here.
    pub fn namespace_chain(&self) -> Vec<&str> {
        match self.kind {
            ScopeKind::Top | ScopeKind::Node => Vec::new(),
            ScopeKind::Class | ScopeKind::DefinedTypeInstance => namespace_chain(&self.qualified_name),
        }
    }

    /// Human-readable scope label, e.g. `Class[foo::bar]` or `Node[web01]`.
    pub fn label(&self) -> String {
        match self.kind {
            ScopeKind::Top => "Class[main]".to_string(),
            ScopeKind::Node => format!("Node[{}]", self.title.as_deref().unwrap_or("default")),
            ScopeKind::Class => format!("Class[{}]", self.qualified_name),
            ScopeKind::DefinedTypeInstance => format!(
                "{}[{}]",
                self.qualified_name,
                self.title.as_deref().unwrap_or_default()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_container() {
        let nested = Scope::new(ScopeId::new(1), ScopeKind::Class, "foo::bar".to_string());
        assert_eq!(nested.lexical_container(), Some("foo"));
        let top_level = Scope::new(ScopeId::new(2), ScopeKind::Class, "baz".to_string());
        assert_eq!(top_level.lexical_container(), None);
    }

    #[test]
    fn test_namespace_chain_most_specific_first() {
        let scope = Scope::new(ScopeId::new(1), ScopeKind::Class, "a::b::c".to_string());
        assert_eq!(scope.namespace_chain(), vec!["a::b::c", "a::b", "a"]);
        let top = Scope::new(ScopeId::new(0), ScopeKind::Top, String::new());
        assert!(top.namespace_chain().is_empty());
    }
}
