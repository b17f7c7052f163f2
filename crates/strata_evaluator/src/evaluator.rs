//! The evaluator: runs parsed manifests for one node against a scope
//! registry and builds the catalog.

use crate::catalog::{capitalize_type_name, Catalog, Resource};
use crate::definitions::{ClassEntry, DefinedTypeEntry, DefinitionIndex, NodeEntry};
use crate::error::EvalError;
use crate::functions::{self, CallContext};
use crate::legacy::check_legacy_operators;
use indexmap::IndexMap;
use strata_ast::node::*;
use strata_core::text::{SourcePosition, TextSpan};
use strata_diagnostics::DiagnosticCollection;
use strata_scope::{
    BindingOrigin, EncMerger, ScopeId, ScopeKind, ScopeRegistry, Value, VariableName, NAMESPACE_SEPARATOR,
};
use tracing::debug;

/// Attributes every resource accepts; they never bind defined type
/// parameters.
const METAPARAMETERS: &[&str] = &[
    "alias",
    "audit",
    "before",
    "loglevel",
    "noop",
    "notify",
    "require",
    "schedule",
    "stage",
    "subscribe",
    "tag",
];

/// The result of evaluating one node.
#[derive(Debug)]
pub struct Evaluation {
    pub catalog: Catalog,
    pub registry: ScopeRegistry,
    /// Warnings raised during evaluation.
    pub diagnostics: DiagnosticCollection,
    /// Messages passed to `notice`, in call order.
    pub notices: Vec<String>,
    /// Scope of the node definition that matched, if any.
    pub node_scope: Option<ScopeId>,
}

pub struct Evaluator<'a> {
    manifests: &'a [Manifest<'a>],
    definitions: DefinitionIndex<'a>,
    registry: ScopeRegistry,
    catalog: Catalog,
    diagnostics: DiagnosticCollection,
    notices: Vec<String>,
    /// Node definitions whose parents are being evaluated.
    node_stack: Vec<String>,
}

impl<'a> Evaluator<'a> {
    /// Index the definitions in `manifests`. Fails when a class, defined
    /// type or node is defined twice.
    pub fn new(manifests: &'a [Manifest<'a>], registry: ScopeRegistry) -> Result<Self, EvalError> {
        let definitions = DefinitionIndex::build(manifests)?;
        debug!(
            files = manifests.len(),
            classes = definitions.class_count(),
            "indexed definitions"
        );
        let catalog = Catalog::new(registry.node_name());
        Ok(Self {
            manifests,
            definitions,
            registry,
            catalog,
            diagnostics: DiagnosticCollection::new(),
            notices: Vec::new(),
            node_stack: Vec::new(),
        })
    }

    /// Evaluate the node the registry was created for.
    ///
    /// Manifests using removed assignment operators are rejected before
    /// anything is bound. Node data is then merged into top scope, every
    /// file's top-level statements run in order, then the matching node
    /// definition, then the classes the classifier assigned.
    pub fn evaluate(mut self, enc: &EncMerger<'_>) -> Result<Evaluation, EvalError> {
        check_legacy_operators(self.manifests)?;
        enc.merge(&mut self.registry)?;

        let top = self.registry.top();
        for (file, manifest) in self.manifests.iter().enumerate() {
            self.evaluate_statements(file, manifest.statements, top)?;
        }

        let node_scope = self.evaluate_matching_node()?;

        let requester = enc.class_requester(&self.registry, node_scope);
        for class in enc.classes() {
            self.evaluate_class(class, requester, None)?;
        }

        Ok(Evaluation {
            catalog: self.catalog,
            registry: self.registry,
            diagnostics: self.diagnostics,
            notices: self.notices,
            node_scope,
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn evaluate_statements(
        &mut self,
        file: usize,
        body: &'a [Statement<'a>],
        scope: ScopeId,
    ) -> Result<(), EvalError> {
        for statement in body.iter() {
            match statement {
                Statement::Assignment(assignment) => self.evaluate_assignment(file, assignment, scope)?,
                Statement::Include(include) => {
                    for class in include.classes.iter() {
                        let position = self.position(file, class.span);
                        self.evaluate_class(class.name, scope, Some(position))?;
                    }
                }
                Statement::ResourceDeclaration(declaration) => {
                    self.declare_resources(file, declaration, scope)?;
                }
                Statement::Expression(expression) => {
                    self.evaluate_expression(file, expression, scope)?;
                }
                // Indexed up front; evaluated on demand.
                Statement::ClassDefinition(_)
                | Statement::DefinedTypeDefinition(_)
                | Statement::NodeDefinition(_) => {}
            }
        }
        Ok(())
    }

    fn evaluate_assignment(
        &mut self,
        file: usize,
        assignment: &'a Assignment<'a>,
        scope: ScopeId,
    ) -> Result<(), EvalError> {
        let target = assignment.target;
        if !matches!(VariableName::parse(target.name), VariableName::Unqualified(_)) {
            return Err(EvalError::QualifiedAssignment {
                name: target.name.to_string(),
                position: Some(self.position(file, target.span)),
            });
        }
        let value = self.evaluate_expression(file, assignment.value, scope)?;
        let position = self.position(file, assignment.operator_span);
        self.registry
            .bind(scope, target.name, value, BindingOrigin::Manifest, Some(position))?;
        Ok(())
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Evaluate the class `reference` as requested from `from`, returning
    /// its scope. A class is evaluated at most once per compilation.
    pub fn evaluate_class(
        &mut self,
        reference: &str,
        from: ScopeId,
        position: Option<SourcePosition>,
    ) -> Result<ScopeId, EvalError> {
        let definitions = &self.definitions;
        let name = self
            .registry
            .qualify_class(reference, from, |candidate| definitions.class(candidate).is_some())
            .ok_or_else(|| EvalError::CouldNotFindClass {
                name: reference.trim_start_matches(NAMESPACE_SEPARATOR).to_string(),
                position,
            })?;
        self.evaluate_qualified_class(&name)
    }

    fn evaluate_qualified_class(&mut self, name: &str) -> Result<ScopeId, EvalError> {
        if let Some(existing) = self.registry.class_scope(name) {
            return Ok(existing);
        }
        let Some(entry) = self.definitions.class(name) else {
            return Err(EvalError::CouldNotFindClass {
                name: name.to_string(),
                position: None,
            });
        };

        let parent = match self.check_ancestry(name, entry)? {
            Some(parent) => Some(self.evaluate_qualified_class(&parent)?),
            None => None,
        };
        // The parent's body may have included this class already.
        if let Some(existing) = self.registry.class_scope(name) {
            return Ok(existing);
        }

        let scope = self.registry.get_or_create(name, ScopeKind::Class, parent);
        debug!(class = name, "evaluating class");

        let file = entry.file;
        let class = entry.node;
        let position = self.position(file, class.name.span);
        let resource = Resource::new("class", capitalize_type_name(name))
            .declared_in(self.registry.scope(scope).label())
            .at(Some(position.clone()));
        let reference = resource.reference();
        self.catalog.add(resource)?;

        let mut arguments = IndexMap::new();
        self.bind_parameters(file, class.parameters, &mut arguments, scope, &reference, &position)?;
        self.evaluate_statements(file, class.body, scope)?;
        Ok(scope)
    }

    /// Walk the unevaluated part of `name`'s inheritance chain by name only,
    /// failing on a cycle or an unknown ancestor. Returns the qualified
    /// parent of `name`, if it has one. No class body runs during the walk,
    /// so including a class from its ancestor's body is never a cycle.
    fn check_ancestry(&mut self, name: &str, entry: ClassEntry<'a>) -> Result<Option<String>, EvalError> {
        let mut walked: Vec<String> = Vec::new();
        let mut parent_of_name = None;
        let mut current = (name.to_string(), entry);
        let result = loop {
            if let Err(err) = self.registry.enter_class(&current.0) {
                break Err(err.into());
            }
            walked.push(current.0.clone());
            let parent = match self.qualify_parent(&current.0, current.1) {
                Ok(Some(parent)) => parent,
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            };
            if walked.len() == 1 {
                parent_of_name = Some(parent.clone());
            }
            if self.registry.class_scope(&parent).is_some() {
                break Ok(());
            }
            match self.definitions.class(&parent) {
                Some(parent_entry) => current = (parent, parent_entry),
                None => break Ok(()),
            }
        };
        for class in walked.iter().rev() {
            self.registry.leave_class(class);
        }
        result.map(|()| parent_of_name)
    }

    /// The parent of the class `name`, qualified relative to the child's
    /// namespace.
    fn qualify_parent(&self, name: &str, entry: ClassEntry<'a>) -> Result<Option<String>, EvalError> {
        let Some(parent) = entry.node.parent else {
            return Ok(None);
        };
        let definitions = &self.definitions;
        self.registry
            .qualify_class_in(parent.name, name, |candidate| definitions.class(candidate).is_some())
            .map(Some)
            .ok_or_else(|| EvalError::CouldNotFindClass {
                name: parent.name.trim_start_matches(NAMESPACE_SEPARATOR).to_string(),
                position: Some(self.position(entry.file, parent.span)),
            })
    }

    /// Bind each declared parameter in `scope`, taking the value from
    /// `arguments` when present and otherwise evaluating the default in
    /// `scope`. Arguments are consumed as they are bound.
    fn bind_parameters(
        &mut self,
        file: usize,
        parameters: &'a [Parameter<'a>],
        arguments: &mut IndexMap<String, Value>,
        scope: ScopeId,
        resource: &str,
        position: &SourcePosition,
    ) -> Result<(), EvalError> {
        for parameter in parameters.iter() {
            let value = match (arguments.shift_remove(parameter.name), parameter.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.evaluate_expression(file, default, scope)?,
                (None, None) => {
                    return Err(EvalError::MissingParameter {
                        parameter: parameter.name.to_string(),
                        resource: resource.to_string(),
                        position: Some(position.clone()),
                    })
                }
            };
            let at = self.position(file, parameter.span);
            self.registry
                .bind(scope, parameter.name, value, BindingOrigin::Parameter, Some(at))?;
        }
        Ok(())
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    fn evaluate_matching_node(&mut self) -> Result<Option<ScopeId>, EvalError> {
        if !self.definitions.has_nodes() {
            return Ok(None);
        }
        let node_name = self.registry.node_name().to_string();
        let Some((matched, entry)) = self.definitions.node_for(&node_name) else {
            return Err(EvalError::NoMatchingNode { node: node_name });
        };
        let matched = matched.to_string();
        debug!(node = %node_name, definition = %matched, "matched node definition");
        self.evaluate_node(&matched, entry).map(Some)
    }

    /// Evaluate the node definition registered as `name`: its parent node
    /// first, then its own body. Each body runs with its own scope as the
    /// active node.
    fn evaluate_node(&mut self, name: &str, entry: NodeEntry<'a>) -> Result<ScopeId, EvalError> {
        if let Some(existing) = self.registry.node_scope(name) {
            return Ok(existing);
        }
        if let Some(start) = self.node_stack.iter().position(|n| n == name) {
            let mut chain = self.node_stack[start..].to_vec();
            chain.push(name.to_string());
            return Err(EvalError::NodeInheritanceCycle {
                node: name.to_string(),
                chain,
            });
        }

        self.node_stack.push(name.to_string());
        let parent = self.evaluate_parent_node(entry);
        self.node_stack.pop();
        let parent = parent?;

        let scope = self.registry.get_or_create(name, ScopeKind::Node, parent);
        self.registry.set_active_node(Some(scope));
        debug!(node = name, "evaluating node");
        self.evaluate_statements(entry.file, entry.node.body, scope)?;
        Ok(scope)
    }

    fn evaluate_parent_node(&mut self, entry: NodeEntry<'a>) -> Result<Option<ScopeId>, EvalError> {
        let Some(parent) = entry.node.parent else {
            return Ok(None);
        };
        let parent_name = parent.text();
        let Some(parent_entry) = self.definitions.node(parent_name) else {
            return Err(EvalError::UnknownNode {
                name: parent_name.to_string(),
                position: Some(self.position(entry.file, parent.span)),
            });
        };
        self.evaluate_node(parent_name, parent_entry).map(Some)
    }

    // ========================================================================
    // Resources
    // ========================================================================

    fn declare_resources(
        &mut self,
        file: usize,
        declaration: &'a ResourceDeclaration<'a>,
        scope: ScopeId,
    ) -> Result<(), EvalError> {
        let definitions = &self.definitions;
        let defined_type = self
            .registry
            .qualify_class(declaration.type_name.name, scope, |candidate| {
                definitions.defined_type(candidate).is_some()
            })
            .and_then(|name| definitions.defined_type(&name).map(|entry| (name, entry)));

        for body in declaration.bodies.iter() {
            let position = self.position(file, body.span);
            let titles: Vec<String> = match self.evaluate_expression(file, body.title, scope)? {
                Value::Array(items) => items.iter().map(Value::to_interpolated).collect(),
                title => vec![title.to_interpolated()],
            };

            // Attribute expressions see the declaring scope.
            let mut attributes = IndexMap::new();
            for attribute in body.attributes.iter() {
                let value = self.evaluate_expression(file, attribute.value, scope)?;
                attributes.insert(attribute.name.to_string(), value);
            }

            for title in titles {
                match &defined_type {
                    Some((name, entry)) => {
                        self.instantiate(name, *entry, title, attributes.clone(), scope, &position)?;
                    }
                    None => {
                        let resource = Resource::new(declaration.type_name.name, title)
                            .with_parameters(attributes.clone())
                            .declared_in(self.registry.scope(scope).label())
                            .at(Some(position.clone()));
                        self.catalog.add(resource)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Declare one instance of the defined type `name` and evaluate its body
    /// in a fresh scope.
    fn instantiate(
        &mut self,
        name: &str,
        entry: DefinedTypeEntry<'a>,
        title: String,
        attributes: IndexMap<String, Value>,
        declared_in: ScopeId,
        position: &SourcePosition,
    ) -> Result<(), EvalError> {
        let resource = Resource::new(name, title.clone())
            .with_parameters(attributes)
            .declared_in(self.registry.scope(declared_in).label())
            .at(Some(position.clone()));
        let reference = resource.reference();
        let mut arguments = resource.parameters.clone();
        self.catalog.add(resource)?;

        let scope = self.registry.create_instance(name, &title);
        debug!(resource = %reference, "evaluating defined type instance");

        let name_value = arguments
            .shift_remove("name")
            .unwrap_or_else(|| Value::string(title.as_str()));
        let at = Some(position.clone());
        self.registry
            .bind(scope, "title", Value::String(title), BindingOrigin::Parameter, at.clone())?;
        self.registry
            .bind(scope, "name", name_value, BindingOrigin::Parameter, at)?;

        arguments.retain(|attribute, _| !METAPARAMETERS.contains(&attribute.as_str()));
        let define = entry.node;
        self.bind_parameters(entry.file, define.parameters, &mut arguments, scope, &reference, position)?;
        if let Some((parameter, _)) = arguments.first() {
            return Err(EvalError::InvalidParameter {
                parameter: parameter.clone(),
                resource: reference,
                position: Some(position.clone()),
            });
        }

        self.evaluate_statements(entry.file, define.body, scope)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn evaluate_expression(
        &mut self,
        file: usize,
        expression: &'a Expression<'a>,
        scope: ScopeId,
    ) -> Result<Value, EvalError> {
        let value = match expression {
            Expression::String(string) => Value::string(string.value),
            Expression::Interpolated(string) => {
                let mut text = String::new();
                for part in string.parts.iter() {
                    match part {
                        StringPart::Text(literal) => text.push_str(literal),
                        StringPart::Variable(variable) => {
                            text.push_str(&self.lookup(file, variable, scope)?.to_interpolated());
                        }
                    }
                }
                Value::String(text)
            }
            Expression::Integer(integer) => Value::Integer(integer.value),
            Expression::Boolean(boolean) => Value::Boolean(boolean.value),
            Expression::Undef(_) => Value::Undef,
            Expression::BareWord(word) => Value::string(word.value),
            Expression::Variable(variable) => self.lookup(file, variable, scope)?,
            Expression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in array.elements.iter() {
                    elements.push(self.evaluate_expression(file, element, scope)?);
                }
                Value::Array(elements)
            }
            Expression::Call(call) => self.evaluate_call(file, call, scope)?,
        };
        Ok(value)
    }

    /// The value of `variable` as seen from `scope`; undefined reads as
    /// `undef`.
    fn lookup(&self, file: usize, variable: &Variable<'a>, scope: ScopeId) -> Result<Value, EvalError> {
        match self.registry.resolver().resolve(scope, variable.name) {
            Ok(lookup) => Ok(lookup.to_value()),
            Err(err) => Err(err.or_position(Some(&self.position(file, variable.span))).into()),
        }
    }

    fn evaluate_call(&mut self, file: usize, call: &'a CallExpression<'a>, scope: ScopeId) -> Result<Value, EvalError> {
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in call.arguments.iter() {
            arguments.push(self.evaluate_expression(file, argument, scope)?);
        }
        let mut cx = CallContext {
            registry: &self.registry,
            definitions: &self.definitions,
            diagnostics: &mut self.diagnostics,
            notices: &mut self.notices,
            scope,
            position: self.manifests[file].position(call.span),
        };
        functions::call(call.function, arguments, &mut cx)
    }

    fn position(&self, file: usize, span: TextSpan) -> SourcePosition {
        self.manifests[file].position(span)
    }
}
