//! The catalog: every resource declared while compiling one node.

use crate::error::EvalError;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use strata_core::text::SourcePosition;
use strata_scope::{Value, NAMESPACE_SEPARATOR};

/// Capitalize each segment of a type name: `notify` -> `Notify`,
/// `foo::bar` -> `Foo::Bar`. A leading `::` is dropped.
pub fn capitalize_type_name(name: &str) -> String {
    name.trim_start_matches(NAMESPACE_SEPARATOR)
        .split(NAMESPACE_SEPARATOR)
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(NAMESPACE_SEPARATOR)
}

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    /// Attribute values; attributes set to `undef` are not recorded.
    pub parameters: IndexMap<String, Value>,
    /// Label of the scope the declaration was evaluated in.
    pub declared_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip)]
    pub position: Option<SourcePosition>,
}

impl Resource {
    pub fn new(type_name: &str, title: impl Into<String>) -> Self {
        Self {
            type_name: capitalize_type_name(type_name),
            title: title.into(),
            parameters: IndexMap::new(),
            declared_in: String::new(),
            file: None,
            line: None,
            position: None,
        }
    }

    pub fn with_parameters(mut self, parameters: IndexMap<String, Value>) -> Self {
        self.parameters = parameters
            .into_iter()
            .filter(|(_, value)| !value.is_undef())
            .collect();
        self
    }

    pub fn declared_in(mut self, label: String) -> Self {
        self.declared_in = label;
        self
    }

    pub fn at(mut self, position: Option<SourcePosition>) -> Self {
        self.file = position.as_ref().and_then(|p| p.file.as_deref().map(str::to_string));
        self.line = position.as_ref().map(|p| p.line);
        self.position = position;
        self
    }

    /// `Type[title]`
    pub fn reference(&self) -> String {
        format!("{}[{}]", self.type_name, self.title)
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub name: String,
    resources: Vec<Resource>,
    #[serde(skip)]
    index: FxHashMap<(String, String), usize>,
}

impl Catalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Add a resource. A second resource with the same type and title is
    /// a duplicate declaration.
    pub fn add(&mut self, resource: Resource) -> Result<(), EvalError> {
        let key = (resource.type_name.clone(), resource.title.clone());
        if let Some(&existing) = self.index.get(&key) {
            return Err(EvalError::DuplicateResource {
                resource: resource.reference(),
                position: resource.position,
                previous: self.resources[existing].position.clone(),
            });
        }
        self.index.insert(key, self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Look up a resource; the type name is capitalized first, so
    /// `resource("notify", "x")` finds `Notify[x]`.
    pub fn resource(&self, type_name: &str, title: &str) -> Option<&Resource> {
        let key = (capitalize_type_name(type_name), title.to_string());
        self.index.get(&key).map(|&i| &self.resources[i])
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_type_name() {
        assert_eq!(capitalize_type_name("notify"), "Notify");
        assert_eq!(capitalize_type_name("foo::bar"), "Foo::Bar");
        assert_eq!(capitalize_type_name("::foo"), "Foo");
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut catalog = Catalog::new("the_node");
        catalog.add(Resource::new("notify", "x")).unwrap();
        let err = catalog
            .add(Resource::new("Notify", "x").at(Some(SourcePosition::new(3, None))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duplicate declaration: Notify[x] is already declared; cannot redeclare at line 3"
        );
        assert!(catalog.add(Resource::new("notify", "y")).is_ok());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_undef_attributes_are_dropped() {
        let mut parameters = IndexMap::new();
        parameters.insert("message".to_string(), Value::Undef);
        parameters.insert("withpath".to_string(), Value::Boolean(false));
        let resource = Resource::new("notify", "x").with_parameters(parameters);
        assert_eq!(resource.parameter("message"), None);
        assert_eq!(resource.parameter("withpath"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn test_lookup_capitalizes() {
        let mut catalog = Catalog::new("n");
        catalog.add(Resource::new("foo::bar", "t")).unwrap();
        assert!(catalog.resource("foo::bar", "t").is_some());
        assert!(catalog.resource("Foo::Bar", "t").is_some());
        assert_eq!(serde_json::to_value(&catalog).unwrap()["resources"][0]["type"], "Foo::Bar");
    }
}
