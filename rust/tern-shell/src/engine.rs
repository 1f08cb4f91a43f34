//! The compile/eval engine.
//!
//! One complete unit of input goes through one cycle: compile it against
//! the compiler ledger, run it through the wrapper chain, record it in the
//! executor ledger and report the outcome. The whole cycle, including the
//! `resN` binding of a produced value, runs under the session's write lock.

use std::sync::Arc;

use parking_lot::RwLock;
use tern_core::{
    CompileContext, CompileDiagnostic, CompileOutcome, CompiledRecord, Environment, EvalOutcome,
    Namespace, Snippet, SnippetCompiler, SnippetExecutor, SnippetId, TypeDesc, Value,
};
use tracing::{debug, debug_span, error, info, warn};
use uuid::Uuid;

use crate::buffer::{SnippetBuffer, Submission};
use crate::commands::{
    parse_directive, CommandFlow, CommandInfo, CommandRegistry, CommandSpec, Directive,
};
use crate::error::ShellError;
use crate::events::EventBus;
use crate::extractor::SymbolExtractor;
use crate::history::{EvalStatus, EvaluatedRecord, GenerationPair, Ledgers};
use crate::plugin::{self, Plugin, PluginRegistrar};
use crate::reporter::Reporter;
use crate::session::Session;
use crate::symbols::{Symbol, SymbolQuery, SymbolTable};
use crate::wrappers::{ExecutionWrapper, WrapContext, WrapperChain};

/// Terminal state of one compile/eval cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    /// The compiler wants more input; the unit went back to the buffer.
    Incomplete,
    CompileError(CompileDiagnostic),
    Unit,
    /// A value, bound as `name` by the result binding.
    Value {
        name: String,
        ty: TypeDesc,
        value: Value,
    },
    EvalError(String),
    HistoryMismatch(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank line with nothing pending.
    Empty,
    /// The line was buffered; a continuation is expected.
    Pending,
    Evaluated(Cycle),
    Command(CommandFlow),
    UnknownCommand(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    User,
    /// The synthesized `let resN = ...` snippet. Its problems are logged,
    /// not reported.
    ResultBinding,
}

struct SessionState<C, X> {
    compiler: C,
    executor: X,
    ledgers: Ledgers,
    env: Environment,
    buffer: SnippetBuffer,
    next_line: u64,
    next_result: u64,
    default_namespace: Namespace,
}

pub struct Shell<C: SnippetCompiler, X> {
    id: Uuid,
    state: RwLock<SessionState<C, X>>,
    symbols: SymbolTable,
    extractor: SymbolExtractor,
    wrappers: WrapperChain,
    events: EventBus<C::Artifact>,
    commands: CommandRegistry,
    plugins: Vec<String>,
    reporter: Arc<dyn Reporter>,
}

impl<C, X> Shell<C, X>
where
    C: SnippetCompiler,
    X: SnippetExecutor<Artifact = C::Artifact>,
{
    pub fn new(compiler: C, executor: X, reporter: Arc<dyn Reporter>) -> Self {
        let symbols = SymbolTable::new();
        Self {
            id: Uuid::new_v4(),
            state: RwLock::new(SessionState {
                compiler,
                executor,
                ledgers: Ledgers::new(),
                env: Environment::new(),
                buffer: SnippetBuffer::new(),
                next_line: 0,
                next_result: 1,
                default_namespace: Namespace::default(),
            }),
            extractor: SymbolExtractor::new(symbols.clone()),
            symbols,
            wrappers: WrapperChain::new(),
            events: EventBus::new(),
            commands: CommandRegistry::with_builtins(),
            plugins: Vec::new(),
            reporter,
        }
    }

    /// Namespace snippets compile into until one declares a package.
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.state.get_mut().default_namespace = namespace;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn events_mut(&mut self) -> &mut EventBus<C::Artifact> {
        &mut self.events
    }

    pub fn register_command(&mut self, spec: CommandSpec) -> Result<(), ShellError> {
        self.commands.register(spec)
    }

    /// Wrap the current chain in `wrapper`. The symbol extractor stays
    /// outside every registered wrapper.
    pub fn register_wrapper(
        &mut self,
        wrapper: Arc<dyn ExecutionWrapper>,
    ) -> Result<(), ShellError> {
        plugin::register_wrapper(&mut self.wrappers, wrapper)
    }

    pub fn remove_wrapper(&mut self, name: &str) -> bool {
        self.wrappers.remove(name)
    }

    /// Registered wrapper names, outermost first.
    pub fn wrapper_names(&self) -> Vec<String> {
        self.wrappers.names()
    }

    pub fn load_plugin(&mut self, plugin: &dyn Plugin<C::Artifact>) -> Result<(), ShellError> {
        let name = plugin.name().to_string();
        if self.plugins.contains(&name) {
            return Err(ShellError::DuplicatePlugin(name));
        }
        let mut registrar =
            PluginRegistrar::new(&mut self.commands, &mut self.events, &mut self.wrappers);
        plugin.load(&mut registrar)?;
        info!(plugin = %name, "loaded plugin");
        self.plugins.push(name);
        Ok(())
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Compile and evaluate `source` as one unit, bypassing the buffer.
    pub fn eval_source(&self, source: &str) -> Result<Cycle, ShellError> {
        let _span = debug_span!("eval", session = %self.id).entered();
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.compiler.is_complete(source) {
            return Ok(Cycle::Incomplete);
        }
        state.buffer.clear();
        let cycle = self.run_cycle(state, source.to_string(), Mode::User)?;
        if cycle == Cycle::Incomplete {
            state.buffer.clear();
        }
        Ok(cycle)
    }

    fn dispatch(&self, directive: Directive) -> Result<LineOutcome, ShellError> {
        let Some(spec) = self.commands.find(&directive.name).cloned() else {
            self.reporter.report_output(&format!(
                "unknown command ':{}' (:help lists directives)\n",
                directive.name
            ));
            return Ok(LineOutcome::UnknownCommand(directive.name));
        };
        debug!(command = %spec.name, args = ?directive.args, "dispatching directive");
        let mut out = Vec::new();
        let flow = spec.execute(self, &directive.args, &mut out);
        if !out.is_empty() {
            self.reporter.report_output(&String::from_utf8_lossy(&out));
        }
        Ok(LineOutcome::Command(flow?))
    }

    fn run_cycle(
        &self,
        state: &mut SessionState<C, X>,
        source: String,
        mode: Mode,
    ) -> Result<Cycle, ShellError> {
        state.next_line += 1;
        let snippet = Snippet::new(
            SnippetId(state.next_line),
            state.ledgers.compiler.generation(),
            source,
        );
        debug!(snippet = %snippet.id, generation = %snippet.generation, ?mode, "compiling");

        let outcome = {
            let cx = CompileContext {
                history: state.ledgers.compiler.as_slice(),
                default_namespace: &state.default_namespace,
            };
            state.compiler.compile(&snippet, &cx)
        };
        let compiled = match outcome {
            CompileOutcome::Incomplete => {
                debug!(snippet = %snippet.id, "compiler wants more input");
                if mode == Mode::User {
                    state.buffer.restore(&snippet.source);
                }
                return Ok(Cycle::Incomplete);
            }
            CompileOutcome::Error(diagnostic) => {
                match mode {
                    Mode::User => self
                        .reporter
                        .report_compile_error(&diagnostic.message, diagnostic.location),
                    Mode::ResultBinding => warn!(
                        snippet = %snippet.id,
                        error = %diagnostic,
                        "result binding failed to compile"
                    ),
                }
                state.ledgers.reconcile()?;
                state.buffer.clear();
                state.ledgers.check_invariant()?;
                return Ok(Cycle::CompileError(diagnostic));
            }
            CompileOutcome::Compiled(compiled) => compiled,
        };

        self.events.emit_compile(&compiled);
        state.ledgers.compiler.append(CompiledRecord::from(&compiled));
        debug!(
            snippet = %compiled.snippet.id,
            type_name = %compiled.manifest.type_name,
            "compiled"
        );

        let execution = {
            let cx = WrapContext {
                snippet: &compiled.snippet,
                manifest: &compiled.manifest,
            };
            let mut base = || {
                state
                    .executor
                    .eval(&compiled, &mut state.env)
                    .map_err(ShellError::from)
            };
            let mut chained = || self.wrappers.run(&cx, &mut base);
            self.extractor.around(&cx, &mut chained)
        };
        let execution = match execution {
            Ok(execution) => execution,
            Err(e) => {
                if e.is_fatal() {
                    error!(snippet = %compiled.snippet.id, error = %e, "evaluation aborted");
                }
                state.buffer.clear();
                return Err(e);
            }
        };
        self.events.emit_eval(&compiled.snippet, &execution.outcome);

        let record = |status| {
            EvaluatedRecord::new(
                compiled.snippet.clone(),
                compiled.manifest.namespace.clone(),
                compiled.manifest.declared_names().map(str::to_string).collect(),
                status,
            )
        };
        let cycle = match execution.outcome {
            EvalOutcome::Value { value, ty } => {
                state.ledgers.executor.append(record(EvalStatus::Value));
                match mode {
                    Mode::User => {
                        let name = self.bind_result(state, &value, &ty)?;
                        self.reporter.report_value(&name, &ty, &value);
                        Cycle::Value { name, ty, value }
                    }
                    Mode::ResultBinding => Cycle::Value {
                        name: String::new(),
                        ty,
                        value,
                    },
                }
            }
            EvalOutcome::Unit => {
                state.ledgers.executor.append(record(EvalStatus::Unit));
                Cycle::Unit
            }
            EvalOutcome::Error(detail) => {
                state.ledgers.executor.append(record(EvalStatus::Failed));
                self.report_eval_problem(mode, &compiled.snippet, &detail);
                Cycle::EvalError(detail)
            }
            EvalOutcome::HistoryMismatch(detail) => {
                state.ledgers.executor.append(record(EvalStatus::Mismatch));
                self.report_eval_problem(mode, &compiled.snippet, &detail);
                Cycle::HistoryMismatch(detail)
            }
        };

        state.buffer.clear();
        state.ledgers.check_invariant()?;
        debug!(
            snippet = %compiled.snippet.id,
            generations = %state.ledgers.generations(),
            "cycle done"
        );
        Ok(cycle)
    }

    /// Re-enter `let resN = <value> as <Type>` through the cycle. Returns
    /// the bound name.
    fn bind_result(
        &self,
        state: &mut SessionState<C, X>,
        value: &Value,
        ty: &TypeDesc,
    ) -> Result<String, ShellError> {
        let name = format!("res{}", state.next_result);
        state.next_result += 1;
        let source = format!(
            "let {} = {} as {}",
            name,
            value.to_source(),
            ty.to_source()
        );
        match self.run_cycle(state, source, Mode::ResultBinding)? {
            Cycle::Unit => {}
            other => warn!(%name, outcome = ?other, "result binding did not evaluate cleanly"),
        }
        Ok(name)
    }

    fn report_eval_problem(&self, mode: Mode, snippet: &Snippet, detail: &str) {
        match mode {
            Mode::User => self.reporter.report_eval_error(detail),
            Mode::ResultBinding => warn!(snippet = %snippet.id, %detail, "result binding failed"),
        }
    }
}

impl<C, X> Session for Shell<C, X>
where
    C: SnippetCompiler,
    X: SnippetExecutor<Artifact = C::Artifact>,
{
    fn submit_line(&self, line: &str) -> Result<LineOutcome, ShellError> {
        let _span = debug_span!("line", session = %self.id).entered();
        let pending = !self.state.read().buffer.is_empty();
        if !pending {
            if let Some(directive) = parse_directive(line) {
                return self.dispatch(directive?);
            }
            if line.trim().is_empty() {
                return Ok(LineOutcome::Empty);
            }
        }

        let mut guard = self.state.write();
        let state = &mut *guard;
        let source = match state.buffer.submit(line, |s| state.compiler.is_complete(s)) {
            Submission::StillIncomplete => return Ok(LineOutcome::Pending),
            Submission::Complete(source) => source,
        };
        match self.run_cycle(state, source, Mode::User)? {
            Cycle::Incomplete => Ok(LineOutcome::Pending),
            cycle => Ok(LineOutcome::Evaluated(cycle)),
        }
    }

    fn reset(&self) {
        let mut state = self.state.write();
        state.ledgers.reset();
        state.env.clear();
        state.buffer.clear();
        self.symbols.clear();
        info!(session = %self.id, "session reset");
    }

    fn rollback(&self, to: SnippetId) -> Result<usize, ShellError> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.ledgers.executor.contains(to) {
            return Err(ShellError::InvalidUsage(format!("line {} is not in history", to)));
        }
        let dropped = state.ledgers.rollback(to);
        let frames = state.env.truncate_after(to);
        state.buffer.clear();
        state.ledgers.check_invariant()?;
        info!(session = %self.id, line = %to, dropped, frames, "rolled back history");
        Ok(dropped)
    }

    fn history(&self) -> Vec<EvaluatedRecord> {
        self.state.read().ledgers.executor.iter().cloned().collect()
    }

    fn generations(&self) -> GenerationPair {
        self.state.read().ledgers.generations()
    }

    fn symbols(&self, query: &SymbolQuery) -> Vec<Symbol> {
        let state = self.state.read();
        self.symbols.list(&state.ledgers.executor, query)
    }

    fn commands(&self) -> Vec<CommandInfo> {
        self.commands.infos()
    }

    fn pending_lines(&self) -> Vec<String> {
        self.state.read().buffer.pending().to_vec()
    }

    fn clear_buffer(&self) {
        self.state.write().buffer.clear();
    }
}
