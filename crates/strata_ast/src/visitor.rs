//! AST visitor trait for traversing manifests.

use crate::node::*;

/// A visitor that traverses the AST. Implement this trait to perform
/// operations on each node kind. Default implementations walk into children.
pub trait AstVisitor<'a> {
    fn visit_manifest(&mut self, node: &Manifest<'a>) {
        for stmt in node.statements.iter() {
            self.visit_statement(stmt);
        }
    }

    fn visit_statement(&mut self, stmt: &Statement<'a>) {
        match stmt {
            Statement::Assignment(n) => self.visit_assignment(n),
            Statement::Include(n) => self.visit_include(n),
            Statement::ClassDefinition(n) => self.visit_class_definition(n),
            Statement::DefinedTypeDefinition(n) => self.visit_defined_type_definition(n),
            Statement::NodeDefinition(n) => self.visit_node_definition(n),
            Statement::ResourceDeclaration(n) => self.visit_resource_declaration(n),
            Statement::Expression(n) => self.visit_expression(n),
        }
    }

    // -- Statements --

    fn visit_assignment(&mut self, node: &Assignment<'a>) {
        self.visit_variable(&node.target);
        self.visit_expression(node.value);
    }

    fn visit_include(&mut self, _node: &IncludeStatement<'a>) {}

    fn visit_class_definition(&mut self, node: &ClassDefinition<'a>) {
        for param in node.parameters.iter() {
            self.visit_parameter(param);
        }
        self.visit_body(node.body);
    }

    fn visit_defined_type_definition(&mut self, node: &DefinedTypeDefinition<'a>) {
        for param in node.parameters.iter() {
            self.visit_parameter(param);
        }
        self.visit_body(node.body);
    }

    fn visit_node_definition(&mut self, node: &NodeDefinition<'a>) {
        self.visit_body(node.body);
    }

    fn visit_resource_declaration(&mut self, node: &ResourceDeclaration<'a>) {
        for body in node.bodies.iter() {
            self.visit_expression(body.title);
            for attr in body.attributes.iter() {
                self.visit_expression(attr.value);
            }
        }
    }

    fn visit_parameter(&mut self, node: &Parameter<'a>) {
        if let Some(default) = node.default {
            self.visit_expression(default);
        }
    }

    fn visit_body(&mut self, body: NodeList<'a, Statement<'a>>) {
        for stmt in body.iter() {
            self.visit_statement(stmt);
        }
    }

    // -- Expressions --

    fn visit_expression(&mut self, expr: &Expression<'a>) {
        match expr {
            Expression::Interpolated(n) => {
                for part in n.parts.iter() {
                    if let StringPart::Variable(var) = part {
                        self.visit_variable(var);
                    }
                }
            }
            Expression::Variable(n) => self.visit_variable(n),
            Expression::Array(n) => {
                for element in n.elements.iter() {
                    self.visit_expression(element);
                }
            }
            Expression::Call(n) => {
                for arg in n.arguments.iter() {
                    self.visit_expression(arg);
                }
            }
            Expression::String(_)
            | Expression::Integer(_)
            | Expression::Boolean(_)
            | Expression::Undef(_)
            | Expression::BareWord(_) => {}
        }
    }

    fn visit_variable(&mut self, _node: &Variable<'a>) {}
}
