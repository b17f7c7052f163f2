//! Benchmark harness for the strata compiler.
//!
//! Uses criterion for reliable benchmarking.
//! Run with: cargo bench -p strata_compiler

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_compiler::Program;
use strata_options::{CompilerOptions, NodeData};

/// A site manifest with a few layers of inheritance and defined types.
const SITE: &str = r#"
$environment = "production"

class base {
  $motd = "managed by strata"
  notify { 'base': message => $motd }
}

class web::params {
  $port = 8080
  $docroot = "/srv/www"
}

class web inherits web::params {
  include base
  vhost { ['a.example.com', 'b.example.com']: port => $port }
}

define vhost ($port, $docroot = "/srv/${title}") {
  notify { "vhost-${title}": message => inline_template("<%= @docroot %>:<%= scope['port'] %>") }
}

node default {
  $role = "generic"
  include base
}
"#;

fn site(nodes: usize) -> String {
    let mut source = SITE.to_string();
    for i in 0..nodes {
        source.push_str(&format!("node web{} inherits default {{ include web }}\n", i));
    }
    source
}

fn program(nodes: usize) -> Program {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.add_source("site.pp", site(nodes));
    program
}

fn bench_compile_node(c: &mut Criterion) {
    let program = program(1);
    let node = NodeData::named("web0");
    c.bench_function("compile_node", |b| {
        b.iter(|| program.compile_node(black_box(&node)))
    });
}

fn bench_compile_nodes(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_nodes");
    for count in [4usize, 32, 128] {
        let program = program(count);
        let nodes: Vec<NodeData> = (0..count).map(|i| NodeData::named(format!("web{}", i))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &nodes, |b, nodes| {
            b.iter(|| program.compile_nodes(black_box(nodes)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile_node, bench_compile_nodes);
criterion_main!(benches);
