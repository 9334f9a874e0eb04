// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use oxc_allocator::Allocator;
use strata_vm::{
    Agent, Options,
    ecmascript::{
        scripts_and_modules::script::parse_script, syntax_directed_operations::ScopeTree,
    },
    engine::bytecode::compile_script,
};

static FIBONACCI: &str = "
function fib(n) {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
fib(20);
";

static CLOSURES: &str = "
function counter() {
    var count = 0;
    return function () { count += 1; return count; };
}
var total = 0;
for (var i = 0; i < 200; i++) {
    var next = counter();
    next();
    total += next();
}
total;
";

static DIRECT_EVAL: &str = "
function outer(seed) {
    var acc = seed;
    for (var i = 0; i < 50; i++) {
        eval('acc = acc + i');
    }
    return acc;
}
outer(1);
";

static EXCEPTIONS: &str = "
var caught = 0;
for (var i = 0; i < 500; i++) {
    try {
        throw i;
    } catch (e) {
        caught += e;
    }
}
caught;
";

static SCRIPTS: [(&str, &str); 4] = [
    ("fibonacci", FIBONACCI),
    ("closures", CLOSURES),
    ("direct_eval", DIRECT_EVAL),
    ("exceptions", EXCEPTIONS),
];

fn bench_compilation(c: &mut Criterion) {
    for (name, code) in SCRIPTS {
        c.bench_function(&format!("{name} (Scope analysis)"), |b| {
            let allocator = Allocator::default();
            let program = parse_script(&allocator, code).unwrap();
            b.iter(|| ScopeTree::analyze_script(&program).unwrap());
        });
        c.bench_function(&format!("{name} (Compilation)"), |b| {
            let allocator = Allocator::default();
            let program = parse_script(&allocator, code).unwrap();
            b.iter(|| compile_script(&program).unwrap());
        });
    }
}

fn bench_execution(c: &mut Criterion) {
    for (name, code) in SCRIPTS {
        c.bench_function(&format!("{name} (Execution)"), |b| {
            b.iter_batched(
                || Agent::new(Options::default()),
                |mut agent| {
                    agent.run_script(code).unwrap();
                    agent
                },
                BatchSize::PerIteration,
            )
        });
    }
}

criterion_group!(benches, bench_compilation, bench_execution);
criterion_main!(benches);
