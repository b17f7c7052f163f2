//! End-to-end scoping scenarios: parse -> evaluate -> catalog.
//!
//! Each manifest declares `notify { 'something': message => ... }` and the
//! test checks which binding the message resolved to.

use strata_compiler::{Compilation, CompileError, Program};
use strata_options::{CompilerOptions, NodeData, UnknownClassPolicy};
use strata_scope::Value;

fn compile(source: &str, node: &NodeData) -> Result<Compilation, CompileError> {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.add_source("site.pp", source);
    program.compile_node(node)
}

fn message_for(source: &str, node: &NodeData) -> Option<String> {
    let compilation = compile(source, node).unwrap_or_else(|err| panic!("compilation failed: {}", err));
    let resource = compilation
        .catalog
        .resource("Notify", "something")
        .expect("Notify[something] is declared");
    resource.parameter("message").map(Value::to_string)
}

fn expect_the_message_to_be(expected: &str, source: &str) {
    assert_eq!(message_for(source, &NodeData::named("the node")).as_deref(), Some(expected));
}

fn enc_node(name: &str, parameters: &[(&str, &str)], classes: &[&str]) -> NodeData {
    let mut node = NodeData::named(name);
    for (key, value) in parameters {
        node.parameters.insert(key.to_string(), Value::string(*value));
    }
    node.classes = classes.iter().map(|c| c.to_string()).collect();
    node
}

fn compile_error(source: &str) -> String {
    compile(source, &NodeData::named("the node")).unwrap_err().to_string()
}

// ============================================================================
// Unsupported operators
// ============================================================================

#[test]
fn test_plus_assignment_is_rejected() {
    let err = compile_error("$var = [\"top_msg\"]\nnode default {\n  $var += [\"override\"]\n}");
    assert!(err.starts_with("The operator '+=' is no longer supported at line 3:8"), "{}", err);
}

#[test]
fn test_minus_assignment_is_rejected() {
    let err = compile_error("$var = [\"top_msg\"]\nnode default {\n  $var -= [\"top_msg\"]\n}");
    assert!(err.starts_with("The operator '-=' is no longer supported"), "{}", err);
}

#[test]
fn test_legacy_operator_in_unused_class_is_rejected() {
    let source = r#"
$var = "top_msg"
class override {
  $var += "override"
  include foo
}
class foo {
  notify { 'something': message => $var, }
}
include override
"#;
    let err = compile_error(source);
    assert!(err.starts_with("The operator '+=' is no longer supported"), "{}", err);
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn test_template_ignores_the_dynamic_value() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include foo
}
class foo {
  $var = "foo_msg"
  include bar
}
class bar {
  notify { 'something': message => inline_template("<%= @var %>"), }
}
"#,
    );
}

#[test]
fn test_template_reads_the_inherited_class() {
    expect_the_message_to_be(
        "Barbamama",
        r#"
node default {
  $var = "node_msg"
  include bar_bamama
  include foo
}
class bar_bamama {
  $var = "Barbamama"
}
class foo {
  $var = "foo_msg"
  include bar
}
class bar inherits bar_bamama {
  notify { 'something': message => inline_template("<%= @var %>"), }
}
"#,
    );
}

#[test]
fn test_template_falls_back_to_node_when_inherited_class_lacks_var() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include bar_bamama
  include foo
}
class bar_bamama {
}
class foo {
  $var = "foo_msg"
  include bar
}
class bar inherits bar_bamama {
  notify { 'something': message => inline_template("<%= @var %>"), }
}
"#,
    );
}

#[test]
fn test_template_lookupvar_ignores_the_dynamic_value() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include foo
}
class foo {
  $var = "foo_msg"
  include bar
}
class bar {
  notify { 'something': message => inline_template("<%= scope.lookupvar('var') %>"), }
}
"#,
    );
}

// ============================================================================
// Fully qualified names and name collisions
// ============================================================================

#[test]
fn test_node_scope_is_separate_from_top_scope() {
    expect_the_message_to_be(
        "topscope",
        r#"
$c = "topscope"
node default {
  $c = "nodescope"
  notify { 'something': message => $::c }
}
"#,
    );
}

#[test]
fn test_top_scope_variable_named_like_a_class() {
    expect_the_message_to_be(
        "topscope",
        r#"
$c = "topscope"
class c { }
node default {
  include c
  notify { 'something': message => $c }
}
"#,
    );
}

#[test]
fn test_node_scope_variable_named_like_a_class() {
    expect_the_message_to_be(
        "nodescope",
        r#"
class c { }
node default {
  $c = "nodescope"
  include c
  notify { 'something': message => $c }
}
"#,
    );
}

#[test]
fn test_class_variable_when_class_collides_with_node_variable() {
    expect_the_message_to_be(
        "class",
        r#"
class c { $b = "class" }
node default {
  $c = "nodescope"
  include c
  notify { 'something': message => $c::b }
}
"#,
    );
}

#[test]
fn test_class_variable_when_class_collides_with_top_variable() {
    expect_the_message_to_be(
        "class",
        r#"
$c = "topscope"
class c { $b = "class" }
node default {
  include c
  notify { 'something': message => $::c::b }
}
"#,
    );
}

/// A qualified name reads exactly the named class's table; it does not
/// fall back to the node or top scope.
#[test]
fn test_qualified_variable_does_not_follow_parent_scopes() {
    expect_the_message_to_be(
        "",
        r#"
class c {
  notify { 'something': message => "$a::b" }
}
class a { }
node default {
  $b = "from node"
  include a
  include c
}
"#,
    );
}

#[test]
fn test_qualified_variable_of_unevaluated_class() {
    let source = "class a { }\nnotify { 'something': message => $a::b }";
    let err = compile_error(source);
    assert_eq!(err, "Could not find class a for qualified variable 'a::b' at line 2:34");

    let mut program = Program::new(
        vec![],
        CompilerOptions {
            unknown_class_policy: UnknownClassPolicy::Undefined,
        },
    );
    program.add_source("site.pp", source);
    let compilation = program.compile_node(&NodeData::named("the node")).unwrap();
    let resource = compilation.catalog.resource("Notify", "something").unwrap();
    assert_eq!(resource.parameter("message"), None);
}

// ============================================================================
// Shadowing and inheritance
// ============================================================================

#[test]
fn test_finds_values_in_local_scope() {
    expect_the_message_to_be(
        "local_msg",
        r#"
node default {
  include baz
}
class foo {
}
class bar inherits foo {
  $var = "local_msg"
  notify { 'something': message => $var, }
}
class baz {
  include bar
}
"#,
    );
}

#[test]
fn test_finds_values_in_inherited_scope() {
    expect_the_message_to_be(
        "foo_msg",
        r#"
node default {
  include baz
}
class foo {
  $var = "foo_msg"
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
class baz {
  include bar
}
"#,
    );
}

#[test]
fn test_prefers_local_over_inherited() {
    expect_the_message_to_be(
        "local_msg",
        r#"
include bar

class foo {
  $var = "inherited"
}

class bar inherits foo {
  $var = "local_msg"
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_inherited_class_qualified_to_top() {
    expect_the_message_to_be(
        "foo_msg",
        r#"
node default {
  include baz
}
class foo {
  $var = "foo_msg"
}
class bar inherits ::foo {
  notify { 'something': message => $var, }
}
class baz {
  include bar
}
"#,
    );
}

#[test]
fn test_prefers_local_over_top_qualified_parent() {
    expect_the_message_to_be(
        "local_msg",
        r#"
include bar

class foo {
  $var = "inherited"
}

class bar inherits ::foo {
  $var = "local_msg"
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_top_scope_through_top_qualified_parent() {
    expect_the_message_to_be(
        "top msg",
        r#"
$var = "top msg"
class foo {
}

class bar inherits ::foo {
  notify { 'something': message => $var, }
}

include bar
"#,
    );
}

#[test]
fn test_nested_parent_shadows_top_class() {
    expect_the_message_to_be(
        "inner baz",
        r#"
node default {
  include foo::bar
}
class baz {
  $var = "top baz"
}
class foo {
  class baz {
    $var = "inner baz"
  }

  class bar inherits baz {
    notify { 'something': message => $var, }
  }
}
"#,
    );
}

#[test]
fn test_top_qualified_parent_skips_nested_class() {
    expect_the_message_to_be(
        "top baz",
        r#"
node default {
  include foo::bar
}
class baz {
  $var = "top baz"
}
class foo {
  class baz {
    $var = "inner baz"
  }

  class bar inherits ::baz {
    notify { 'something': message => $var, }
  }
}
"#,
    );
}

#[test]
fn test_qualified_parent() {
    expect_the_message_to_be(
        "foo_msg",
        r#"
node default {
  include bar
}
class foo {
  class baz {
    $var = "foo_msg"
  }
}
class bar inherits foo::baz {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_prefers_inherited_over_node_with_intermediate_inclusion() {
    expect_the_message_to_be(
        "foo_msg",
        r#"
node default {
  $var = "node_msg"
  include baz
}
class foo {
  $var = "foo_msg"
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
class baz {
  include bar
}
"#,
    );
}

#[test]
fn test_prefers_inherited_over_node_without_intermediate_inclusion() {
    expect_the_message_to_be(
        "foo_msg",
        r#"
node default {
  $var = "node_msg"
  include bar
}
class foo {
  $var = "foo_msg"
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_prefers_inherited_over_includer() {
    expect_the_message_to_be(
        "foo_msg",
        r#"
node default {
  include baz
}
class foo {
  $var = "foo_msg"
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
class baz {
  $var = "baz_msg"
  include bar
}
"#,
    );
}

#[test]
fn test_ignores_classes_included_by_the_parent() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include bar
}
class quux {
  $var = "quux_msg"
}
class foo inherits quux {
}
class baz {
  include foo
}
class bar inherits baz {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_ignores_the_lexically_enclosing_class() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include other::bar
}
class other {
  $var = "other_msg"
  class bar {
    notify { 'something': message => $var, }
  }
}
"#,
    );
}

#[test]
fn test_finds_values_in_node_scope() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include baz
}
class foo {
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
class baz {
  include bar
}
"#,
    );
}

#[test]
fn test_finds_values_in_top_scope() {
    expect_the_message_to_be(
        "top_msg",
        r#"
$var = "top_msg"
node default {
  include baz
}
class foo {
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
class baz {
  include bar
}
"#,
    );
}

#[test]
fn test_prefers_node_over_top() {
    expect_the_message_to_be(
        "node_msg",
        r#"
$var = "top_msg"
node default {
  $var = "node_msg"
  include foo
}
class foo {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_defined_type_reads_top_scope() {
    expect_the_message_to_be(
        "top_msg",
        r#"
$var = "top_msg"
node default {
  foo { "testing": }
}
define foo() {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_defined_type_reads_node_scope() {
    expect_the_message_to_be(
        "node_msg",
        r#"
$var = "top_msg"
node default {
  $var = "node_msg"
  foo { "testing": }
}
define foo() {
  notify { 'something': message => $var, }
}
"#,
    );
}

// ============================================================================
// No dynamic scoping
// ============================================================================

#[test]
fn test_ignores_the_includers_value() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include foo
}
class baz {
  $var = "baz_msg"
  include bar
}
class foo inherits baz {
}
class bar {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_value_only_in_dynamic_scope_is_undefined() {
    let source = r#"
node default {
  include baz
}
class foo {
}
class bar inherits foo {
  notify { 'something': message => $var, }
}
class baz {
  $var = "baz_msg"
  include bar
}
"#;
    assert_eq!(message_for(source, &NodeData::named("the node")), None);
}

#[test]
fn test_defined_type_ignores_the_declaring_class() {
    expect_the_message_to_be(
        "node_msg",
        r#"
node default {
  $var = "node_msg"
  include foo
}
class foo {
  $var = "foo_msg"
  bar { "testing": }
}
define bar() {
  notify { 'something': message => $var, }
}
"#,
    );
}

// ============================================================================
// Node inheritance
// ============================================================================

#[test]
fn test_finds_value_in_inherited_node() {
    expect_the_message_to_be(
        "parent_msg",
        r#"
$var = "top_msg"
node parent {
  $var = "parent_msg"
}
node default inherits parent {
  include foo
}
class foo {
  notify { 'something': message => $var, }
}
"#,
    );
}

#[test]
fn test_class_included_by_parent_node_sees_top_scope() {
    expect_the_message_to_be(
        "top_msg",
        r#"
$var = "top_msg"
node parent {
  include foo
}
node default inherits parent {
  $var = "default_msg"
}
class foo {
  notify { 'something': message => $var, }
}
"#,
    );
}

// ============================================================================
// External node classifier
// ============================================================================

#[test]
fn test_enc_parameters_live_in_top_scope() {
    let node = enc_node("the node", &[("var", "from_enc")], &[]);
    let message = message_for("notify { 'something': message => $var, }", &node);
    assert_eq!(message.as_deref(), Some("from_enc"));
}

#[test]
fn test_enc_parameter_cannot_be_reassigned() {
    let node = enc_node("the_node", &[("var", "from_enc")], &[]);
    let err = compile("$var = 'top scope'", &node).unwrap_err();
    assert_eq!(err.to_string(), "Cannot reassign variable var at line 1:6 on node the_node");
    assert_eq!(err.to_diagnostics().diagnostics()[0].code, 2002);
}

#[test]
fn test_enc_classes_evaluate_in_top_scope_without_a_node() {
    let node = enc_node("the node", &[("var", "from_enc")], &["foo"]);
    let source = "class foo {\n  notify { 'something': message => $var, }\n}";
    assert_eq!(message_for(source, &node).as_deref(), Some("from_enc"));
}

#[test]
fn test_node_variable_shadows_enc_parameter() {
    let node = enc_node("the_node", &[("enc_var", "Set from ENC.")], &["foo"]);
    let source = r#"
node the_node {
  $enc_var = "ENC overridden in node"
}

class foo {
  notify { 'something': message => $enc_var, }
}
"#;
    assert_eq!(message_for(source, &node).as_deref(), Some("ENC overridden in node"));
}

#[test]
fn test_enc_classes_evaluate_in_matching_node() {
    let node = enc_node("the_node", &[], &["foo"]);
    let source = r#"
node inherited {
  $var = "from inherited"
}

node the_node inherits inherited {
  $var = "from matching node"
}

class foo {
  notify { 'something': message => $var, }
}
"#;
    assert_eq!(message_for(source, &node).as_deref(), Some("from matching node"));
}

// ============================================================================
// Whole-program behavior
// ============================================================================

#[test]
fn test_inheritance_cycle() {
    let err = compile_error("class a inherits b { }\nclass b inherits a { }\ninclude a");
    assert_eq!(err, "Class a inherits from itself through a -> b -> a");
}

#[test]
fn test_self_inheritance_is_a_cycle() {
    let err = compile_error("class a inherits a { }\ninclude a");
    assert_eq!(err, "Class a inherits from itself through a -> a");
}

#[test]
fn test_parent_may_include_its_child() {
    expect_the_message_to_be(
        "p",
        r#"
class parent {
  $var = "p"
  include child
}
class child inherits parent {
  notify { 'something': message => $var }
}
include child
"#,
    );
}

#[test]
fn test_grandparent_may_include_its_grandchild() {
    let source = r#"
class base {
  $var = "base"
  include leaf
}
class middle inherits base { }
class leaf inherits middle {
  notify { 'something': message => $var }
}
include leaf
include middle
"#;
    let compilation = compile(source, &NodeData::named("the node")).unwrap();
    let resource = compilation.catalog.resource("Notify", "something").unwrap();
    assert_eq!(resource.parameter("message"), Some(&Value::string("base")));
    assert!(compilation.catalog.resource("Class", "Leaf").is_some());
    assert!(compilation.catalog.resource("Class", "Middle").is_some());
}

#[test]
fn test_syntax_errors_abort_compilation() {
    let err = compile("$a = ", &NodeData::named("n")).unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
    assert!(err.to_diagnostics().has_errors());
}

#[test]
fn test_compile_nodes_in_parallel() {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.add_source(
        "site.pp",
        r#"
node web { $role = "web" include foo }
node db { $role = "db" include foo }
class foo { notify { 'something': message => $role } }
"#,
    );
    let nodes = vec![NodeData::named("web"), NodeData::named("db"), NodeData::named("cache")];
    let results = program.compile_nodes(&nodes);
    assert_eq!(results.len(), 3);

    let messages: Vec<_> = results[..2]
        .iter()
        .map(|result| {
            let compilation = result.as_ref().unwrap();
            compilation
                .catalog
                .resource("Notify", "something")
                .and_then(|r| r.parameter("message"))
                .map(Value::to_string)
        })
        .collect();
    assert_eq!(messages, vec![Some("web".to_string()), Some("db".to_string())]);

    let err = results[2].as_ref().unwrap_err();
    assert_eq!(err.to_string(), "Could not find node statement with name 'default' or 'cache'");
}

#[test]
fn test_catalog_serializes_to_json() {
    let compilation = compile(
        "notify { 'something': message => 'hi' }",
        &NodeData::named("the node"),
    )
    .unwrap();
    let json = serde_json::to_value(&compilation.catalog).unwrap();
    assert_eq!(json["name"], "the node");
    assert_eq!(json["resources"][0]["type"], "Notify");
    assert_eq!(json["resources"][0]["parameters"]["message"], "hi");
}

#[test]
fn test_program_from_config_file() {
    let dir = std::env::temp_dir().join(format!("strata-config-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("modules")).unwrap();
    std::fs::write(dir.join("site.pp"), "node web01 { include foo }\n").unwrap();
    std::fs::write(
        dir.join("modules/foo.pp"),
        "class foo { notify { 'something': message => \"${role} ${nope::x}\" } }\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("strata.json"),
        r#"{
            "compilerOptions": { "unknownClassPolicy": "undefined" },
            "files": ["site.pp", "modules/foo.pp"],
            "node": { "name": "web01", "parameters": { "role": "web" } }
        }"#,
    )
    .unwrap();

    let config = strata_options::load_config(&dir.join("strata.json")).unwrap();
    let mut program = Program::from_config(&config, &dir);
    assert_eq!(program.options.unknown_class_policy, UnknownClassPolicy::Undefined);
    program.load_root_files().unwrap();
    assert_eq!(program.sources().len(), 2);

    let compilation = program.compile_node(config.node.as_ref().unwrap()).unwrap();
    let message = compilation
        .catalog
        .resource("Notify", "something")
        .and_then(|r| r.parameter("message"))
        .map(Value::to_string);
    assert_eq!(message.as_deref(), Some("web "));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_root_file() {
    let mut program = Program::new(vec!["/nonexistent/site.pp".into()], CompilerOptions::default());
    let err = program.load_root_files().unwrap_err();
    assert!(matches!(err, CompileError::Read { .. }));
    assert_eq!(err.to_diagnostics().diagnostics()[0].code, 5001);
}
