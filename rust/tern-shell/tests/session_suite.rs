//! Sessions driven by the tern script compiler and executor.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tern_core::{Generation, Namespace, SnippetId, TypeDesc, Value};
use tern_script::{ScriptArtifact, ScriptCompiler, ScriptExecutor};
use tern_shell::{
    wrap_fn, CommandFlow, CommandSpec, Cycle, EvalStatus, LineOutcome, MemoryReporter, Plugin,
    PluginRegistrar, Session, Shell, ShellError, SymbolDetail, SymbolKind, SymbolQuery,
    EXTRACTOR_NAME,
};

type ScriptShell = Shell<ScriptCompiler, ScriptExecutor>;

fn shell() -> (ScriptShell, MemoryReporter) {
    let reporter = MemoryReporter::new();
    let shell = Shell::new(
        ScriptCompiler::new(),
        ScriptExecutor::new().with_output(std::io::sink()),
        Arc::new(reporter.clone()),
    );
    (shell, reporter)
}

fn submit(shell: &ScriptShell, line: &str) -> LineOutcome {
    shell
        .submit_line(line)
        .unwrap_or_else(|e| panic!("line {:?} failed: {}", line, e))
}

fn cycle(shell: &ScriptShell, line: &str) -> Cycle {
    match submit(shell, line) {
        LineOutcome::Evaluated(cycle) => cycle,
        other => panic!("line {:?} did not evaluate: {:?}", line, other),
    }
}

fn assert_aligned(shell: &ScriptShell) {
    let g = shell.generations();
    assert_eq!(g.compiler, g.executor, "generations drifted: {}", g);
}

fn temp_script(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("tern-{}-{}.tn", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

// ── Results ──

#[test]
fn values_are_bound_as_numbered_results() {
    let (shell, reporter) = shell();
    assert_eq!(
        cycle(&shell, "6 * 7"),
        Cycle::Value {
            name: "res1".into(),
            ty: TypeDesc::Int,
            value: Value::Int(42),
        }
    );
    match cycle(&shell, "res1 + 1") {
        Cycle::Value { name, value, .. } => {
            assert_eq!(name, "res2");
            assert_eq!(value, Value::Int(43));
        }
        other => panic!("unexpected cycle {:?}", other),
    }
    assert_eq!(reporter.values(), ["res1: Int = 42", "res2: Int = 43"]);

    // each value costs two lines: the expression and its binding
    let history = shell.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].snippet.source, "let res1 = 42 as Int");
    assert_eq!(history[1].names, ["res1"]);
    assert_eq!(shell.generations().compiler, Generation(4));
    assert_aligned(&shell);
}

#[test]
fn result_symbol_keeps_the_value_type() {
    let (shell, _) = shell();
    cycle(&shell, "[1.5, 2.5]");
    let symbols = shell.symbols(&SymbolQuery::new().pattern("res1").unwrap());
    assert_eq!(symbols.len(), 1);
    match &symbols[0].detail {
        SymbolDetail::Instance { value, ty } => {
            assert_eq!(*ty, TypeDesc::list(TypeDesc::Float));
            assert_eq!(*value, Value::List(vec![Value::Float(1.5), Value::Float(2.5)]));
        }
        other => panic!("unexpected detail {:?}", other),
    }
}

#[test]
fn result_binding_survives_class_redeclaration() {
    let (shell, reporter) = shell();
    cycle(&shell, "class P(x: Int)");
    cycle(&shell, "let p = P(1)");
    cycle(&shell, "class P(y: String)");
    match cycle(&shell, "p") {
        Cycle::Value { name, .. } => assert_eq!(name, "res1"),
        other => panic!("unexpected cycle {:?}", other),
    }
    assert_eq!(reporter.values(), ["res1: P = P(x=1)"]);

    let history = shell.history();
    assert_eq!(history.len(), 5);
    assert_eq!(history[4].snippet.source, "let res1 = P@1(1) as P@1");
    assert_eq!(history[4].status, EvalStatus::Unit);
    assert_eq!(
        shell
            .symbols(&SymbolQuery::new().pattern("res1").unwrap())
            .len(),
        1
    );

    match cycle(&shell, "res1.x") {
        Cycle::Value { value, .. } => assert_eq!(value, Value::Int(1)),
        other => panic!("unexpected cycle {:?}", other),
    }
    assert!(reporter.errors().is_empty());
    assert_aligned(&shell);
}

#[test]
fn unit_snippets_bind_no_result() {
    let (shell, reporter) = shell();
    assert_eq!(cycle(&shell, "let x = 1"), Cycle::Unit);
    assert_eq!(cycle(&shell, "if (x > 0) print(x)"), Cycle::Unit);
    assert!(reporter.values().is_empty());
    assert!(shell
        .symbols(&SymbolQuery::new().pattern("res*").unwrap())
        .is_empty());
}

// ── Input buffering ──

#[test]
fn repeated_unit_snippet_is_recorded_twice() {
    let (shell, _) = shell();
    assert_eq!(cycle(&shell, "print(1)"), Cycle::Unit);
    assert_eq!(cycle(&shell, "print(1)"), Cycle::Unit);

    let history = shell.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].snippet.id, SnippetId(1));
    assert_eq!(history[1].snippet.id, SnippetId(2));
    for record in &history {
        assert_eq!(record.snippet.source, "print(1)");
        assert_eq!(record.status, EvalStatus::Unit);
    }
    assert!(shell.pending_lines().is_empty());
    assert_aligned(&shell);
}

#[test]
fn incomplete_input_waits_for_the_rest() {
    let (shell, _) = shell();
    assert_eq!(submit(&shell, "if (true) {"), LineOutcome::Pending);
    assert_eq!(submit(&shell, ""), LineOutcome::Pending);
    assert_eq!(shell.pending_lines(), ["if (true) {", ""]);
    assert_eq!(shell.generations().compiler, Generation(0));

    match cycle(&shell, "1 } else { 2 }") {
        Cycle::Value { value, .. } => assert_eq!(value, Value::Int(1)),
        other => panic!("unexpected cycle {:?}", other),
    }
    assert!(shell.pending_lines().is_empty());
    assert_eq!(
        shell.history()[0].snippet.source,
        "if (true) {\n\n1 } else { 2 }"
    );
}

#[test]
fn directives_are_code_while_a_snippet_is_pending() {
    let (shell, _) = shell();
    assert_eq!(submit(&shell, "if (true) {"), LineOutcome::Pending);
    // joined to the pending line, `:q` is just bad code
    assert!(matches!(
        submit(&shell, ":q"),
        LineOutcome::Evaluated(Cycle::CompileError(_))
    ));
    assert!(shell.pending_lines().is_empty());
    assert_eq!(submit(&shell, ":q"), LineOutcome::Command(CommandFlow::Quit));
}

#[test]
fn blank_line_without_pending_input_is_ignored() {
    let (shell, _) = shell();
    assert_eq!(submit(&shell, "   "), LineOutcome::Empty);
    assert!(shell.history().is_empty());
}

#[test]
fn eval_source_bypasses_the_buffer() {
    let (shell, _) = shell();
    assert_eq!(shell.eval_source("if (true) {").unwrap(), Cycle::Incomplete);
    assert!(shell.pending_lines().is_empty());
    match shell.eval_source("fun sq(n: Int): Int =\n  n * n\nsq(9)").unwrap() {
        Cycle::Value { value, .. } => assert_eq!(value, Value::Int(81)),
        other => panic!("unexpected cycle {:?}", other),
    }
}

// ── Errors ──

#[test]
fn compile_error_is_reported_and_recorded_nowhere() {
    let (shell, reporter) = shell();
    cycle(&shell, "let a = 1");
    match cycle(&shell, "a + missing") {
        Cycle::CompileError(diagnostic) => {
            assert!(diagnostic.message.contains("unresolved name 'missing'"));
            assert!(diagnostic.location.is_some());
        }
        other => panic!("unexpected cycle {:?}", other),
    }
    assert_eq!(reporter.errors().len(), 1);
    assert_eq!(shell.history().len(), 1);
    assert_aligned(&shell);
}

#[test]
fn failed_snippet_stays_in_history_but_binds_nothing() {
    let (shell, reporter) = shell();
    match cycle(&shell, "let z = 1 / 0") {
        Cycle::EvalError(detail) => assert!(detail.contains("division by zero"), "{}", detail),
        other => panic!("unexpected cycle {:?}", other),
    }
    assert_eq!(shell.history()[0].status, EvalStatus::Failed);

    // the compiler saw `z` declared; the executor never bound it
    assert!(matches!(cycle(&shell, "z"), Cycle::HistoryMismatch(_)));
    assert_eq!(shell.history()[1].status, EvalStatus::Mismatch);
    assert_eq!(reporter.errors().len(), 2);
    assert!(shell.symbols(&SymbolQuery::new()).is_empty());
    assert_aligned(&shell);
}

#[test]
fn runaway_recursion_is_an_evaluation_error() {
    let reporter = MemoryReporter::new();
    let shell = Shell::new(
        ScriptCompiler::new(),
        ScriptExecutor::new().with_max_call_depth(32),
        Arc::new(reporter.clone()),
    );
    shell
        .submit_line("fun spin(n: Int): Int = spin(n + 1)")
        .unwrap();
    match shell.submit_line("spin(0)").unwrap() {
        LineOutcome::Evaluated(Cycle::EvalError(detail)) => {
            assert!(detail.contains("32"), "{}", detail)
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

// ── History ──

#[test]
fn rollback_resurfaces_shadowed_symbols() {
    let (shell, _) = shell();
    cycle(&shell, "let g = 1");
    cycle(&shell, "let g = 2");
    let live = shell.symbols(&SymbolQuery::new().pattern("g").unwrap());
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].origin, SnippetId(2));

    assert_eq!(shell.rollback(SnippetId(1)).unwrap(), 1);
    let live = shell.symbols(&SymbolQuery::new().pattern("g").unwrap());
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].origin, SnippetId(1));
    assert_eq!(live[0].describe(), "val g: Int = 1");

    match cycle(&shell, "g") {
        Cycle::Value { value, .. } => assert_eq!(value, Value::Int(1)),
        other => panic!("unexpected cycle {:?}", other),
    }
    assert_aligned(&shell);
}

#[test]
fn rollback_to_unknown_line_is_rejected() {
    let (shell, _) = shell();
    cycle(&shell, "let a = 1");
    assert!(matches!(
        shell.rollback(SnippetId(9)),
        Err(ShellError::InvalidUsage(_))
    ));
    assert_eq!(shell.history().len(), 1);
}

#[test]
fn reset_forgets_everything() {
    let (shell, _) = shell();
    cycle(&shell, "class P(x: Int)");
    cycle(&shell, "let p = P(3)");
    assert_eq!(
        submit(&shell, ":reset"),
        LineOutcome::Command(CommandFlow::Continue)
    );
    assert!(shell.history().is_empty());
    assert!(shell.symbols(&SymbolQuery::new()).is_empty());
    assert_eq!(shell.generations().executor, Generation(0));
    assert!(matches!(cycle(&shell, "p.x"), Cycle::CompileError(_)));
}

#[test]
fn generations_never_invert_across_a_mixed_session() {
    let (shell, _) = shell();
    let lines = [
        "let a = 1",
        "a +",
        "nope",
        "fun f(n: Int): Int = n * a",
        "f(2)",
        "1 / 0",
        "class C",
        "C()",
        "missing",
        "f(\"s\")",
        "let a = 10",
        "f(1)",
    ];
    for line in lines {
        shell.submit_line(line).unwrap();
        let g = shell.generations();
        assert!(g.compiler >= g.executor, "after {:?}: {}", line, g);
    }
    assert_aligned(&shell);
}

#[test]
fn namespace_comes_from_the_shell_then_from_packages() {
    let reporter = MemoryReporter::new();
    let shell = Shell::new(
        ScriptCompiler::new(),
        ScriptExecutor::new(),
        Arc::new(reporter),
    )
    .with_namespace(Namespace::new("work"));
    cycle(&shell, "let a = 1");
    cycle(&shell, "package geo\nlet a = 2");
    let symbols = shell.symbols(&SymbolQuery::new().pattern("a").unwrap());
    let namespaces: Vec<&str> = symbols.iter().map(|s| s.namespace.as_str()).collect();
    // different namespaces do not shadow each other
    assert_eq!(namespaces, ["work", "geo"]);
}

// ── Directives ──

#[test]
fn unknown_directive_is_reported_not_fatal() {
    let (shell, reporter) = shell();
    assert_eq!(
        submit(&shell, ":frobnicate now"),
        LineOutcome::UnknownCommand("frobnicate".into())
    );
    assert!(reporter.output().contains("unknown command ':frobnicate'"));
}

#[test]
fn help_lists_every_directive() {
    let (shell, reporter) = shell();
    submit(&shell, ":help");
    let text = reporter.output();
    for name in [":help", ":quit", ":rollback", ":symbols", ":load", ":dump"] {
        assert!(text.contains(name), "missing {} in\n{}", name, text);
    }
    reporter.take();
    submit(&shell, ":h rollback");
    assert!(reporter.output().starts_with(":rollback <line>"));
}

#[test]
fn bad_directive_usage_is_an_error() {
    let (shell, _) = shell();
    assert!(matches!(
        shell.submit_line(":rollback"),
        Err(ShellError::InvalidUsage(_))
    ));
    assert!(matches!(
        shell.submit_line(":rollback ten"),
        Err(ShellError::InvalidUsage(_))
    ));
    assert!(matches!(
        shell.submit_line(":symbols --kind widget"),
        Err(ShellError::InvalidUsage(_))
    ));
}

#[test]
fn symbols_directive_filters_by_kind() {
    let (shell, reporter) = shell();
    cycle(&shell, "class Point(x: Int, y: Int)");
    cycle(&shell, "fun <T> id(x: T): T = x");
    cycle(&shell, "let origin = Point(0, 0)");
    reporter.take();

    submit(&shell, ":symbols --kind function");
    let text = reporter.output();
    assert!(text.contains("fun <T> id(x: T): T"), "{}", text);
    assert!(!text.contains("class Point"), "{}", text);

    let classes = shell.symbols(&SymbolQuery::new().kind(SymbolKind::Class));
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].name, "Point");
}

#[test]
fn generations_directive_reports_both_sides() {
    let (shell, reporter) = shell();
    cycle(&shell, "let a = 1");
    cycle(&shell, "a");
    submit(&shell, ":g");
    assert_eq!(reporter.output(), "compiler g3 / executor g3\n");

    reporter.take();
    submit(&shell, "if (a > 0) {");
    shell.clear_buffer();
    submit(&shell, ":generations");
    assert_eq!(reporter.output(), "compiler g3 / executor g3\n");
}

#[test]
fn load_evaluates_a_file_line_by_line() {
    let (shell, reporter) = shell();
    let path = temp_script(
        "load",
        "let a = 20\nfun twice(n: Int): Int =\n  n * 2\n\ntwice(a) + 2\n",
    );
    let line = format!(":load \"{}\"", path.display());
    assert_eq!(submit(&shell, &line), LineOutcome::Command(CommandFlow::Continue));
    assert_eq!(reporter.values(), ["res1: Int = 42"]);
    assert!(reporter.output().contains("loaded 5 line(s)"));
    std::fs::remove_file(path).ok();
}

#[test]
fn load_rejects_a_file_ending_mid_snippet() {
    let (shell, _) = shell();
    let path = temp_script("truncated", "let a = 1\nfun f(n: Int): Int = {\n  n\n");
    let line = format!(":load \"{}\"", path.display());
    assert!(matches!(
        shell.submit_line(&line),
        Err(ShellError::InvalidUsage(msg)) if msg.contains("incomplete")
    ));
    assert!(shell.pending_lines().is_empty());
    assert_eq!(shell.history().len(), 1);
    std::fs::remove_file(path).ok();
}

#[test]
fn dump_prints_live_symbols_as_json() {
    let (shell, reporter) = shell();
    cycle(&shell, "let a = \"x\"");
    cycle(&shell, "let a = 3");
    reporter.take();
    submit(&shell, ":dump");
    let json: serde_json::Value = serde_json::from_str(&reporter.output()).unwrap();
    let symbols = json.as_array().unwrap();
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0]["name"], "a");
    assert_eq!(symbols[0]["origin"], 2);
    assert_eq!(symbols[0]["detail"]["kind"], "instance");
}

// ── Extension points ──

#[test]
fn wrappers_nest_newest_outermost_and_stay_transparent() {
    let (plain, _) = shell();
    let (mut wrapped, _) = shell();
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["inner", "outer"] {
        let log = Arc::clone(&log);
        wrapped
            .register_wrapper(wrap_fn(name, move |_, proceed| {
                log.lock().push(format!("{}:before", name));
                let result = proceed();
                log.lock().push(format!("{}:after", name));
                result
            }))
            .unwrap();
    }
    assert_eq!(wrapped.wrapper_names(), ["outer", "inner"]);

    assert_eq!(cycle(&plain, "3 * 3"), cycle(&wrapped, "3 * 3"));
    let log = log.lock().clone();
    // the expression and its result binding each pass through the chain
    assert_eq!(
        &log[..4],
        ["outer:before", "inner:before", "inner:after", "outer:after"]
    );
    assert_eq!(log.len(), 8);
    assert_eq!(plain.symbols(&SymbolQuery::new()), wrapped.symbols(&SymbolQuery::new()));
}

#[test]
fn wrappers_can_be_removed_but_not_the_extractor() {
    let (mut shell, _) = shell();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    shell
        .register_wrapper(wrap_fn("count", move |_, proceed| {
            counter.fetch_add(1, Ordering::SeqCst);
            proceed()
        }))
        .unwrap();
    assert!(matches!(
        shell.register_wrapper(wrap_fn("count", |_, proceed| proceed())),
        Err(ShellError::DuplicateWrapper(_))
    ));
    assert!(matches!(
        shell.register_wrapper(wrap_fn(EXTRACTOR_NAME, |_, proceed| proceed())),
        Err(ShellError::DuplicateWrapper(_))
    ));

    cycle(&shell, "let a = 1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(shell.remove_wrapper("count"));
    assert!(!shell.remove_wrapper("count"));
    cycle(&shell, "let b = 2");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // symbols are still extracted without any user wrapper
    assert_eq!(shell.symbols(&SymbolQuery::new()).len(), 2);
}

struct EvalCounter {
    count: Arc<AtomicUsize>,
}

impl Plugin<ScriptArtifact> for EvalCounter {
    fn name(&self) -> &str {
        "eval-counter"
    }

    fn load(&self, registrar: &mut PluginRegistrar<'_, ScriptArtifact>) -> Result<(), ShellError> {
        let count = Arc::clone(&self.count);
        registrar.on_eval(move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        let count = Arc::clone(&self.count);
        registrar.register_command(
            CommandSpec::new("evals", "Show how many snippets ran", move |_, _, out| {
                writeln!(out, "{}", count.load(Ordering::SeqCst))?;
                Ok(CommandFlow::Continue)
            })
            .alias("ev"),
        )
    }
}

#[test]
fn plugins_add_listeners_and_directives_once() {
    let (mut shell, reporter) = shell();
    let plugin = EvalCounter {
        count: Arc::new(AtomicUsize::new(0)),
    };
    shell.load_plugin(&plugin).unwrap();
    assert!(matches!(
        shell.load_plugin(&plugin),
        Err(ShellError::DuplicatePlugin(_))
    ));
    assert_eq!(shell.plugins(), ["eval-counter"]);

    cycle(&shell, "let a = 1");
    cycle(&shell, "a");
    submit(&shell, ":ev");
    // `a` and its result binding both ran
    assert_eq!(reporter.output(), "3\n");
}

#[test]
fn compile_listeners_see_every_compiled_snippet() {
    let (mut shell, _) = shell();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    shell.events_mut().on_compile(move |compiled| {
        sink.lock().push(compiled.manifest.type_name.clone());
    });
    cycle(&shell, "let a = 1");
    cycle(&shell, "broken +)");
    cycle(&shell, "a");
    assert_eq!(*seen.lock(), ["repl.Line_1", "repl.Line_3", "repl.Line_4"]);
}
