use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_parser::Parser;

// A medium-size manifest with every construct the parser knows.
const MANIFEST_SOURCE: &str = r#"
# Site-wide defaults
$environment = 'production'
$admins = ['alice', 'bob', 'carol']

class base::params {
  $package = 'ntp'
  $servers = ['0.pool.ntp.org', '1.pool.ntp.org']
  $restart = true
}

class base (
  $motd = "Welcome to ${hostname}",
  $owner = undef,
) inherits base::params {
  $config = "/etc/${package}.conf"
  notify { 'base':
    message => "installing $package for $environment",
  }
  class users {
    $home = '/home'
  }
}

define base::account ($uid, $shell = '/bin/bash') {
  notify { "account-$title":
    message => inline_template("<%= @name %> uses <%= @shell %>"),
  }
}

class web inherits base {
  include base::users, ::monitoring
  base::account { 'deploy': uid => 1001; 'backup': uid => 1002, shell => '/bin/sh' }
}

class monitoring {
  $port = 9100
  notice "monitoring on $port"
}

node 'web01.example.com', 'web02.example.com' inherits basenode {
  $role = 'web'
  include web
}

node basenode {
  $datacenter = 'east'
}

node default {
  include base
}
"#;

fn bench_parse_manifest(c: &mut Criterion) {
    c.bench_function("parse_manifest_medium", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let parser = Parser::new(&arena, "bench.pp", black_box(MANIFEST_SOURCE));
            let (manifest, diagnostics) = parser.parse_manifest();
            black_box((manifest, diagnostics));
        });
    });
}

criterion_group!(benches, bench_parse_manifest);
criterion_main!(benches);
