//! Parser integration tests.
//!
//! Verifies that the parser builds AST structures from manifest source.

use bumpalo::Bump;
use strata_ast::*;
use strata_parser::Parser;

/// Helper: parse source text and return the number of top-level statements
/// and the number of diagnostics.
fn parse(source: &str) -> (usize, usize) {
    let arena = Bump::new();
    let (manifest, diagnostics) = Parser::new(&arena, "test.pp", source).parse_manifest();
    (manifest.statements.len(), diagnostics.len())
}

/// Helper: assert that parsing produces the expected number of top-level
/// statements and no diagnostics.
fn assert_statement_count(source: &str, expected: usize) {
    assert_eq!(parse(source), (expected, 0), "source: {}", source);
}

// ============================================================================
// Assignments
// ============================================================================

#[test]
fn test_parse_assignment() {
    assert_statement_count("$x = 'hello'", 1);
}

#[test]
fn test_parse_multiple_assignments() {
    assert_statement_count("$a = 1; $b = 2\n$c = true", 3);
}

#[test]
fn test_parse_legacy_operators() {
    let arena = Bump::new();
    let (manifest, diagnostics) = Parser::new(&arena, "test.pp", "$x += 'a'\n$y -= 'b'").parse_manifest();
    assert!(diagnostics.is_empty());
    let operators: Vec<_> = manifest
        .statements
        .iter()
        .map(|stmt| match stmt {
            Statement::Assignment(a) => a.operator,
            other => panic!("unexpected statement {:?}", other),
        })
        .collect();
    assert_eq!(operators, vec![AssignmentOperator::Append, AssignmentOperator::Remove]);
}

#[test]
fn test_operator_position() {
    let arena = Bump::new();
    let (manifest, _) = Parser::new(&arena, "test.pp", "$var = 'top scope'").parse_manifest();
    let Statement::Assignment(assignment) = &manifest.statements[0] else {
        panic!("expected an assignment");
    };
    let position = manifest.position(assignment.operator_span);
    assert_eq!((position.line, position.column), (1, Some(6)));
    assert_eq!(assignment.target.name, "var");
}

#[test]
fn test_parse_qualified_variable_reference() {
    let arena = Bump::new();
    let (manifest, _) = Parser::new(&arena, "test.pp", "$x = $::foo::bar").parse_manifest();
    let Statement::Assignment(assignment) = &manifest.statements[0] else {
        panic!("expected an assignment");
    };
    match assignment.value {
        Expression::Variable(var) => assert_eq!(var.name, "::foo::bar"),
        other => panic!("unexpected expression {:?}", other),
    }
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_double_quoted_interpolation() {
    let arena = Bump::new();
    let (manifest, diagnostics) =
        Parser::new(&arena, "test.pp", r#"$x = "a $b and ${c::d}!""#).parse_manifest();
    assert!(diagnostics.is_empty());
    let Statement::Assignment(assignment) = &manifest.statements[0] else {
        panic!("expected an assignment");
    };
    let Expression::Interpolated(string) = assignment.value else {
        panic!("expected interpolation, got {:?}", assignment.value);
    };
    let rendered: Vec<String> = string
        .parts
        .iter()
        .map(|part| match part {
            StringPart::Text(text) => format!("text:{}", text),
            StringPart::Variable(var) => format!("var:{}", var.name),
        })
        .collect();
    assert_eq!(rendered, vec!["text:a ", "var:b", "text: and ", "var:c::d", "text:!"]);
}

#[test]
fn test_double_quoted_without_variables_is_plain() {
    let arena = Bump::new();
    let (manifest, _) = Parser::new(&arena, "test.pp", r#"$x = "tab\there \$notvar""#).parse_manifest();
    let Statement::Assignment(assignment) = &manifest.statements[0] else {
        panic!("expected an assignment");
    };
    match assignment.value {
        Expression::String(s) => assert_eq!(s.value, "tab\there $notvar"),
        other => panic!("unexpected expression {:?}", other),
    }
}

#[test]
fn test_unterminated_interpolation() {
    let (_, diagnostics) = parse(r#"$x = "${oops""#);
    assert_eq!(diagnostics, 1);
}

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn test_parse_class_with_parameters_and_parent() {
    let arena = Bump::new();
    let source = "class foo::bar ($a, $b = 'x') inherits ::base {\n  $c = $a\n}";
    let (manifest, diagnostics) = Parser::new(&arena, "test.pp", source).parse_manifest();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let Statement::ClassDefinition(class) = &manifest.statements[0] else {
        panic!("expected a class");
    };
    assert_eq!(class.name.name, "foo::bar");
    assert_eq!(class.parameters.len(), 2);
    assert!(class.parameters[0].default.is_none());
    assert!(class.parameters[1].default.is_some());
    assert_eq!(class.parent.map(|p| p.name), Some("::base"));
    assert_eq!(class.body.len(), 1);
}

#[test]
fn test_parse_nested_class() {
    assert_statement_count("class foo { class bar { $x = 1 } include bar }", 1);
}

#[test]
fn test_parse_define() {
    assert_statement_count("define foo ($msg) { notify { $title: message => $msg } }", 1);
}

#[test]
fn test_parse_node_names() {
    let arena = Bump::new();
    let source = "node the_node, 'other.example.com', default inherits base { include foo }";
    let (manifest, diagnostics) = Parser::new(&arena, "test.pp", source).parse_manifest();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let Statement::NodeDefinition(node) = &manifest.statements[0] else {
        panic!("expected a node");
    };
    let names: Vec<&str> = node.names.iter().map(|n| n.text()).collect();
    assert_eq!(names, vec!["the_node", "other.example.com", "default"]);
    assert!(matches!(node.names[2].matcher, NodeMatcher::Default));
    assert_eq!(node.parent.map(|p| p.text()), Some("base"));
}

#[test]
fn test_parse_include_list() {
    let arena = Bump::new();
    let (manifest, _) = Parser::new(&arena, "test.pp", "include a, b::c, ::d").parse_manifest();
    let Statement::Include(include) = &manifest.statements[0] else {
        panic!("expected an include");
    };
    let names: Vec<&str> = include.classes.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["a", "b::c", "::d"]);
}

// ============================================================================
// Resources and calls
// ============================================================================

#[test]
fn test_parse_resource_with_multiple_bodies() {
    let arena = Bump::new();
    let source = "notify { 'a': message => 'x', withpath => false; 'b': }";
    let (manifest, diagnostics) = Parser::new(&arena, "test.pp", source).parse_manifest();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let Statement::ResourceDeclaration(resource) = &manifest.statements[0] else {
        panic!("expected a resource");
    };
    assert_eq!(resource.type_name.name, "notify");
    assert_eq!(resource.bodies.len(), 2);
    assert_eq!(resource.bodies[0].attributes.len(), 2);
    assert_eq!(resource.bodies[0].attributes[1].name, "withpath");
    assert!(resource.bodies[1].attributes.is_empty());
}

#[test]
fn test_parse_function_calls() {
    assert_statement_count("notice('a')\nnotice 'b', $c", 2);
    let arena = Bump::new();
    let (manifest, _) =
        Parser::new(&arena, "test.pp", "$t = inline_template('<%= @x %>')").parse_manifest();
    let Statement::Assignment(assignment) = &manifest.statements[0] else {
        panic!("expected an assignment");
    };
    match assignment.value {
        Expression::Call(call) => {
            assert_eq!(call.function, "inline_template");
            assert_eq!(call.arguments.len(), 1);
        }
        other => panic!("unexpected expression {:?}", other),
    }
}

#[test]
fn test_parse_array_literal() {
    assert_statement_count("$a = ['x', 1, [true, undef], bare]", 1);
}

#[test]
fn test_comments() {
    assert_statement_count("# header\n$a = 1 # trailing\n# footer", 1);
}

// ============================================================================
// Error recovery
// ============================================================================

#[test]
fn test_missing_equals_reports_and_recovers() {
    let arena = Bump::new();
    let (manifest, diagnostics) = Parser::new(&arena, "test.pp", "$a 'x'\n$b = 2").parse_manifest();
    assert!(diagnostics.has_errors());
    assert_eq!(manifest.statements.len(), 1);
    let diagnostic = &diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.line, Some(1));
    assert_eq!(diagnostic.file.as_deref(), Some("test.pp"));
}

#[test]
fn test_stray_close_brace() {
    let (count, diagnostics) = parse("$a = 1 } $b = 2");
    assert_eq!(count, 2);
    assert_eq!(diagnostics, 1);
}

#[test]
fn test_unclosed_class_body() {
    let (_, diagnostics) = parse("class foo { $a = 1");
    assert!(diagnostics > 0);
}
