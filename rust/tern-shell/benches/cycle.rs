//! Benchmarks for the compile/eval cycle.
//!
//! Measures single-line cycles on a fresh session, cycles against a long
//! history, and symbol listing once shadowing has piled up.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tern_script::{ScriptCompiler, ScriptExecutor};
use tern_shell::{MemoryReporter, Session, Shell, SymbolQuery};

type ScriptShell = Shell<ScriptCompiler, ScriptExecutor>;

fn fresh_shell() -> ScriptShell {
    Shell::new(
        ScriptCompiler::new(),
        ScriptExecutor::new().with_output(std::io::sink()),
        Arc::new(MemoryReporter::new()),
    )
}

/// A session that has seen `n` snippets, each shadowing `x`.
fn shell_with_history(n: usize) -> ScriptShell {
    let shell = fresh_shell();
    shell.submit_line("let x = 0").ok();
    for _ in 1..n {
        shell.submit_line("let x = x + 1").ok();
    }
    shell
}

fn bench_fresh_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh");

    group.bench_function("declaration", |b| {
        b.iter_batched(
            fresh_shell,
            |shell| black_box(shell.submit_line("let a = 1 + 2 * 3")),
            BatchSize::SmallInput,
        )
    });

    // an expression also pays for its result binding
    group.bench_function("expression", |b| {
        b.iter_batched(
            fresh_shell,
            |shell| black_box(shell.submit_line("(1 + 2) * 3")),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("function", |b| {
        b.iter_batched(
            fresh_shell,
            |shell| {
                shell
                    .submit_line("fun fib(n: Int): Int = if (n < 2) n else fib(n - 1) + fib(n - 2)")
                    .ok();
                black_box(shell.submit_line("fib(15)"))
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_long_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");

    for n in [10usize, 100, 500] {
        group.bench_function(format!("lookup_after_{}", n), |b| {
            b.iter_batched(
                || shell_with_history(n),
                |shell| black_box(shell.submit_line("x * 2")),
                BatchSize::LargeInput,
            )
        });
    }

    let shell = shell_with_history(500);
    group.bench_function("list_symbols_500", |b| {
        b.iter(|| black_box(shell.symbols(&SymbolQuery::new())))
    });

    group.finish();
}

criterion_group!(benches, bench_fresh_cycles, bench_long_history);
criterion_main!(benches);
