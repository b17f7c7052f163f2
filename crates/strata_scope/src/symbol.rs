//! Symbol table definitions.

use crate::value::Value;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use strata_core::intern::InternedString;
use strata_core::text::SourcePosition;

/// Where a binding came from. Top scope collisions involving node data are
/// reported differently from plain manifest reassignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOrigin {
    /// An assignment statement in a manifest.
    Manifest,
    /// A class or defined type parameter (including `title` and `name`).
    Parameter,
    /// A parameter supplied by the external node classifier.
    Enc,
    /// A fact about the node being compiled.
    Fact,
}

impl BindingOrigin {
    pub fn is_node_data(self) -> bool {
        matches!(self, BindingOrigin::Enc | BindingOrigin::Fact)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub origin: BindingOrigin,
    pub position: Option<SourcePosition>,
}

impl Binding {
    pub fn new(value: Value, origin: BindingOrigin) -> Self {
        Self {
            value,
            origin,
            position: None,
        }
    }

    pub fn at(mut self, position: Option<SourcePosition>) -> Self {
        self.position = position;
        self
    }
}

/// A single-assignment mapping from variable name to binding.
///
/// A name bound once can never be rebound in the same table; other scopes
/// may shadow it in their own tables.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    table: FxHashMap<InternedString, Binding>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            table: FxHashMap::default(),
        }
    }

    /// Bind `name`. On collision the table is left untouched and the
    /// existing binding is returned.
    pub fn bind(&mut self, name: InternedString, binding: Binding) -> Result<(), &Binding> {
        match self.table.entry(name) {
            Entry::Occupied(existing) => Err(&*existing.into_mut()),
            Entry::Vacant(slot) => {
                slot.insert(binding);
                Ok(())
            }
        }
    }

    /// The locally bound value; never searches other scopes.
    pub fn get(&self, name: InternedString) -> Option<&Binding> {
        self.table.get(&name)
    }

    pub fn contains(&self, name: InternedString) -> bool {
        self.table.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InternedString, &Binding)> {
        self.table.iter()
    }
}
