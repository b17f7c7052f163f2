//! Injection of external node classifier data into top scope.

use crate::error::ScopeError;
use crate::registry::ScopeRegistry;
use crate::scope::ScopeId;
use crate::symbol::BindingOrigin;
use crate::value::Value;
use indexmap::IndexMap;
use tracing::debug;

/// Node data handed in by the external node classifier.
///
/// Merging happens once per compilation, before any manifest statement is
/// evaluated, so a later top-level assignment of the same name is the
/// second writer and fails.
#[derive(Debug, Clone, Copy)]
pub struct EncMerger<'d> {
    parameters: &'d IndexMap<String, Value>,
    facts: &'d IndexMap<String, Value>,
    classes: &'d [String],
}

impl<'d> EncMerger<'d> {
    pub fn new(
        parameters: &'d IndexMap<String, Value>,
        facts: &'d IndexMap<String, Value>,
        classes: &'d [String],
    ) -> Self {
        Self {
            parameters,
            facts,
            classes,
        }
    }

    /// Bind facts and ENC parameters into top scope. A parameter replaces a
    /// fact of the same name before anything is bound. Returns the number of
    /// bindings made.
    pub fn merge(&self, registry: &mut ScopeRegistry) -> Result<usize, ScopeError> {
        let top = registry.top();
        let mut bound = 0;
        for (name, value) in self.facts {
            if self.parameters.contains_key(name) {
                continue;
            }
            registry.bind(top, name, value.clone(), BindingOrigin::Fact, None)?;
            bound += 1;
        }
        for (name, value) in self.parameters {
            registry.bind(top, name, value.clone(), BindingOrigin::Enc, None)?;
            bound += 1;
        }
        debug!(
            node = registry.node_name(),
            parameters = self.parameters.len(),
            facts = self.facts.len(),
            "merged node data into top scope"
        );
        Ok(bound)
    }

    /// Classes the classifier assigned, in evaluation order.
    pub fn classes(&self) -> &'d [String] {
        self.classes
    }

    /// The scope ENC classes are requested from: the evaluated node scope
    /// when a node definition matched, otherwise top scope.
    pub fn class_requester(&self, registry: &ScopeRegistry, matched_node: Option<ScopeId>) -> ScopeId {
        matched_node.unwrap_or_else(|| registry.top())
    }
}
