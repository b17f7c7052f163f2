//! AST node definitions for manifests.
//!
//! Nodes are allocated in a bump arena owned by the caller of the parser;
//! child lists are arena slices and every node records its source span.

use std::sync::Arc;
use strata_core::text::{LineMap, SourcePosition, TextSpan};

/// A list of nodes, allocated in the arena.
pub type NodeList<'a, T> = &'a [T];

// ============================================================================
// Source File
// ============================================================================

#[derive(Debug)]
pub struct Manifest<'a> {
    pub file_name: Arc<str>,
    pub statements: NodeList<'a, Statement<'a>>,
    pub line_map: LineMap,
}

impl<'a> Manifest<'a> {
    /// Source position of a span in this file.
    pub fn position(&self, span: TextSpan) -> SourcePosition {
        self.line_map.source_position(&self.file_name, span)
    }
}

// ============================================================================
// Names
// ============================================================================

/// A variable as written, without the leading `$`: `var`, `::var`, `a::b`.
#[derive(Debug, Clone, Copy)]
pub struct Variable<'a> {
    pub span: TextSpan,
    pub name: &'a str,
}

/// A class name as written: `foo`, `foo::bar`, `::foo`.
#[derive(Debug, Clone, Copy)]
pub struct ClassReference<'a> {
    pub span: TextSpan,
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub enum NodeMatcher<'a> {
    Name(&'a str),
    Default,
}

#[derive(Debug, Clone, Copy)]
pub struct NodeName<'a> {
    pub span: TextSpan,
    pub matcher: NodeMatcher<'a>,
}

impl<'a> NodeName<'a> {
    pub fn text(&self) -> &'a str {
        match self.matcher {
            NodeMatcher::Name(name) => name,
            NodeMatcher::Default => "default",
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug)]
pub enum Statement<'a> {
    Assignment(Assignment<'a>),
    Include(IncludeStatement<'a>),
    ClassDefinition(ClassDefinition<'a>),
    DefinedTypeDefinition(DefinedTypeDefinition<'a>),
    NodeDefinition(NodeDefinition<'a>),
    ResourceDeclaration(ResourceDeclaration<'a>),
    Expression(&'a Expression<'a>),
}

impl<'a> Statement<'a> {
    pub fn span(&self) -> TextSpan {
        match self {
            Statement::Assignment(n) => n.span,
            Statement::Include(n) => n.span,
            Statement::ClassDefinition(n) => n.span,
            Statement::DefinedTypeDefinition(n) => n.span,
            Statement::NodeDefinition(n) => n.span,
            Statement::ResourceDeclaration(n) => n.span,
            Statement::Expression(n) => n.span(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// `=`
    Assign,
    /// `+=`, removed from the language.
    Append,
    /// `-=`, removed from the language.
    Remove,
}

impl AssignmentOperator {
    pub fn text(self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::Append => "+=",
            AssignmentOperator::Remove => "-=",
        }
    }
}

#[derive(Debug)]
pub struct Assignment<'a> {
    pub span: TextSpan,
    pub target: Variable<'a>,
    pub operator: AssignmentOperator,
    /// Errors about the assignment point at the operator.
    pub operator_span: TextSpan,
    pub value: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct IncludeStatement<'a> {
    pub span: TextSpan,
    pub classes: NodeList<'a, ClassReference<'a>>,
}

#[derive(Debug)]
pub struct Parameter<'a> {
    pub span: TextSpan,
    pub name: &'a str,
    pub default: Option<&'a Expression<'a>>,
}

#[derive(Debug)]
pub struct ClassDefinition<'a> {
    pub span: TextSpan,
    /// The name as written; nested definitions are qualified by the
    /// evaluator with the enclosing class name.
    pub name: ClassReference<'a>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub parent: Option<ClassReference<'a>>,
    pub body: NodeList<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct DefinedTypeDefinition<'a> {
    pub span: TextSpan,
    pub name: ClassReference<'a>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub body: NodeList<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct NodeDefinition<'a> {
    pub span: TextSpan,
    pub names: NodeList<'a, NodeName<'a>>,
    pub parent: Option<NodeName<'a>>,
    pub body: NodeList<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct ResourceDeclaration<'a> {
    pub span: TextSpan,
    pub type_name: ClassReference<'a>,
    pub bodies: NodeList<'a, ResourceBody<'a>>,
}

#[derive(Debug)]
pub struct ResourceBody<'a> {
    pub span: TextSpan,
    pub title: &'a Expression<'a>,
    pub attributes: NodeList<'a, AttributeOperation<'a>>,
}

#[derive(Debug)]
pub struct AttributeOperation<'a> {
    pub span: TextSpan,
    pub name: &'a str,
    pub value: &'a Expression<'a>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug)]
pub enum Expression<'a> {
    /// A string without interpolation (single-quoted, or double-quoted with
    /// no variables).
    String(StringLiteral<'a>),
    Interpolated(InterpolatedString<'a>),
    Integer(IntegerLiteral),
    Boolean(BooleanLiteral),
    Undef(TextSpan),
    BareWord(BareWord<'a>),
    Variable(Variable<'a>),
    Array(ArrayLiteral<'a>),
    Call(CallExpression<'a>),
}

impl<'a> Expression<'a> {
    pub fn span(&self) -> TextSpan {
        match self {
            Expression::String(n) => n.span,
            Expression::Interpolated(n) => n.span,
            Expression::Integer(n) => n.span,
            Expression::Boolean(n) => n.span,
            Expression::Undef(span) => *span,
            Expression::BareWord(n) => n.span,
            Expression::Variable(n) => n.span,
            Expression::Array(n) => n.span,
            Expression::Call(n) => n.span,
        }
    }
}

#[derive(Debug)]
pub struct StringLiteral<'a> {
    pub span: TextSpan,
    pub value: &'a str,
}

#[derive(Debug)]
pub enum StringPart<'a> {
    Text(&'a str),
    Variable(Variable<'a>),
}

#[derive(Debug)]
pub struct InterpolatedString<'a> {
    pub span: TextSpan,
    pub parts: NodeList<'a, StringPart<'a>>,
}

#[derive(Debug)]
pub struct IntegerLiteral {
    pub span: TextSpan,
    pub value: i64,
}

#[derive(Debug)]
pub struct BooleanLiteral {
    pub span: TextSpan,
    pub value: bool,
}

#[derive(Debug)]
pub struct BareWord<'a> {
    pub span: TextSpan,
    pub value: &'a str,
}

#[derive(Debug)]
pub struct ArrayLiteral<'a> {
    pub span: TextSpan,
    pub elements: NodeList<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct CallExpression<'a> {
    pub span: TextSpan,
    pub function: &'a str,
    pub arguments: NodeList<'a, Expression<'a>>,
}
