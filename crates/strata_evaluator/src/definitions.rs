//! Index of class, defined type and node definitions across all files.
//!
//! Definitions are collected before anything is evaluated, so a class can
//! be included above the place it is defined. Nested definitions are
//! qualified with the enclosing class name.

use crate::error::EvalError;
use rustc_hash::FxHashMap;
use strata_ast::node::*;
use strata_core::text::{SourcePosition, TextSpan};
use strata_scope::NAMESPACE_SEPARATOR;

/// A definition and the index of the file it appears in.
#[derive(Debug)]
pub struct Entry<'a, T> {
    pub file: usize,
    pub node: &'a T,
}

impl<'a, T> Clone for Entry<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Entry<'a, T> {}

pub type ClassEntry<'a> = Entry<'a, ClassDefinition<'a>>;
pub type DefinedTypeEntry<'a> = Entry<'a, DefinedTypeDefinition<'a>>;
pub type NodeEntry<'a> = Entry<'a, NodeDefinition<'a>>;

#[derive(Debug, Default)]
pub struct DefinitionIndex<'a> {
    classes: FxHashMap<String, ClassEntry<'a>>,
    defined_types: FxHashMap<String, DefinedTypeEntry<'a>>,
    nodes: FxHashMap<String, NodeEntry<'a>>,
}

impl<'a> DefinitionIndex<'a> {
    pub fn build(manifests: &'a [Manifest<'a>]) -> Result<Self, EvalError> {
        let mut index = Self::default();
        for (file, manifest) in manifests.iter().enumerate() {
            let mut builder = Builder {
                index: &mut index,
                manifest,
                file,
            };
            builder.collect(manifest.statements, "")?;
        }
        Ok(index)
    }

    pub fn class(&self, qualified_name: &str) -> Option<ClassEntry<'a>> {
        self.classes.get(qualified_name).copied()
    }

    pub fn defined_type(&self, qualified_name: &str) -> Option<DefinedTypeEntry<'a>> {
        self.defined_types.get(qualified_name).copied()
    }

    pub fn node(&self, name: &str) -> Option<NodeEntry<'a>> {
        self.nodes.get(name).copied()
    }

    /// The node definition for `node_name`: an exact name match first, then
    /// `default`. Returns the matched name along with the entry.
    pub fn node_for(&self, node_name: &str) -> Option<(&str, NodeEntry<'a>)> {
        self.nodes
            .get_key_value(node_name)
            .or_else(|| self.nodes.get_key_value("default"))
            .map(|(name, entry)| (name.as_str(), *entry))
    }

    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

struct Builder<'i, 'a> {
    index: &'i mut DefinitionIndex<'a>,
    manifest: &'a Manifest<'a>,
    file: usize,
}

impl<'i, 'a> Builder<'i, 'a> {
    fn position(&self, span: TextSpan) -> SourcePosition {
        self.manifest.position(span)
    }

    fn collect(&mut self, body: &'a [Statement<'a>], namespace: &str) -> Result<(), EvalError> {
        for statement in body.iter() {
            match statement {
                Statement::ClassDefinition(class) => {
                    let name = qualify(namespace, class.name.name);
                    self.insert_class(&name, class)?;
                    self.collect(class.body, &name)?;
                }
                Statement::DefinedTypeDefinition(define) => {
                    let name = qualify(namespace, define.name.name);
                    if let Some(previous) = self.index.defined_types.get(&name) {
                        return Err(self.duplicate("Defined type", name.clone(), define.span, *previous));
                    }
                    let entry = Entry {
                        file: self.file,
                        node: define,
                    };
                    self.index.defined_types.insert(name.clone(), entry);
                    self.collect(define.body, &name)?;
                }
                Statement::NodeDefinition(node) => {
                    for node_name in node.names.iter() {
                        let name = node_name.text().to_string();
                        if let Some(previous) = self.index.nodes.get(&name) {
                            return Err(self.duplicate("Node", name.clone(), node_name.span, *previous));
                        }
                        let entry = Entry {
                            file: self.file,
                            node,
                        };
                        self.index.nodes.insert(name, entry);
                    }
                }
                Statement::Assignment(_)
                | Statement::Include(_)
                | Statement::ResourceDeclaration(_)
                | Statement::Expression(_) => {}
            }
        }
        Ok(())
    }

    fn insert_class(&mut self, name: &str, class: &'a ClassDefinition<'a>) -> Result<(), EvalError> {
        if let Some(previous) = self.index.classes.get(name) {
            return Err(self.duplicate("Class", name.to_string(), class.name.span, *previous));
        }
        let entry = Entry {
            file: self.file,
            node: class,
        };
        self.index.classes.insert(name.to_string(), entry);
        Ok(())
    }

    /// The previous definition's position is only known when it is in the
    /// same file.
    fn duplicate<T>(&self, kind: &'static str, name: String, span: TextSpan, previous: Entry<'a, T>) -> EvalError
    where
        T: HasSpan,
    {
        let previous = (previous.file == self.file).then(|| self.position(previous.node.span()));
        EvalError::DuplicateDefinition {
            kind,
            name,
            position: Some(self.position(span)),
            previous,
        }
    }
}

trait HasSpan {
    fn span(&self) -> TextSpan;
}

impl HasSpan for ClassDefinition<'_> {
    fn span(&self) -> TextSpan {
        self.span
    }
}

impl HasSpan for DefinedTypeDefinition<'_> {
    fn span(&self) -> TextSpan {
        self.span
    }
}

impl HasSpan for NodeDefinition<'_> {
    fn span(&self) -> TextSpan {
        self.span
    }
}

/// `qualify("foo", "bar")` is `foo::bar`; a leading `::` or an empty
/// namespace leaves the name at top level.
fn qualify(namespace: &str, name: &str) -> String {
    if let Some(absolute) = name.strip_prefix(NAMESPACE_SEPARATOR) {
        return absolute.to_string();
    }
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("", "foo"), "foo");
        assert_eq!(qualify("foo", "bar"), "foo::bar");
        assert_eq!(qualify("foo", "::bar"), "bar");
        assert_eq!(qualify("a::b", "c::d"), "a::b::c::d");
    }
}
