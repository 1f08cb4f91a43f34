//! Builds the shell the binary drives and runs non-interactive input.

use std::path::Path;
use std::sync::Arc;

use tern_core::Namespace;
use tern_script::{ScriptCompiler, ScriptExecutor};
use tern_shell::{CommandFlow, Cycle, LineOutcome, Reporter, Session, Shell};
use tracing::{debug, warn};

use crate::colors::Palette;
use crate::config::TernConfig;
use crate::error::CliError;
use crate::plugins::{ClearPlugin, TimingPlugin};

pub type ScriptShell = Shell<ScriptCompiler, ScriptExecutor>;

/// A shell over tern script with the built-in plugins loaded.
pub fn build_shell(
    config: &TernConfig,
    palette: Palette,
    reporter: Arc<dyn Reporter>,
) -> Result<ScriptShell, CliError> {
    let executor = ScriptExecutor::new().with_max_call_depth(config.repl.max_call_depth);
    let mut shell = Shell::new(ScriptCompiler::new(), executor, reporter)
        .with_namespace(Namespace::new(config.repl.namespace.as_str()));
    shell.load_plugin(&TimingPlugin::new(config.repl.timing, palette))?;
    shell.load_plugin(&ClearPlugin)?;
    debug!(session = %shell.id(), plugins = ?shell.plugins(), "shell ready");
    Ok(shell)
}

/// What a non-interactive run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines: usize,
    pub evaluated: usize,
    pub failures: usize,
    pub quit: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    fn record(&mut self, cycle: &Cycle) {
        match cycle {
            Cycle::Incomplete => {}
            Cycle::Unit | Cycle::Value { .. } => self.evaluated += 1,
            Cycle::CompileError(_) | Cycle::EvalError(_) | Cycle::HistoryMismatch(_) => {
                self.evaluated += 1;
                self.failures += 1;
            }
        }
    }
}

/// Feed `source` to the shell line by line, the way a user would type it.
pub fn run_lines(shell: &ScriptShell, source: &str, origin: &str) -> Result<RunSummary, CliError> {
    let mut summary = RunSummary::default();
    for line in source.lines() {
        summary.lines += 1;
        match shell.submit_line(line) {
            Ok(LineOutcome::Evaluated(cycle)) => summary.record(&cycle),
            Ok(LineOutcome::Command(CommandFlow::Quit)) => {
                summary.quit = true;
                break;
            }
            Ok(LineOutcome::UnknownCommand(_)) => summary.failures += 1,
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(%origin, line = summary.lines, error = %e, "directive failed");
                eprintln!("{}:{}: {}", origin, summary.lines, e);
                summary.failures += 1;
            }
        }
    }
    if !summary.quit && !shell.pending_lines().is_empty() {
        shell.clear_buffer();
        return Err(CliError::Incomplete(origin.to_string()));
    }
    Ok(summary)
}

pub fn run_file(shell: &ScriptShell, path: &Path) -> Result<RunSummary, CliError> {
    let source = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    run_lines(shell, &source, &path.display().to_string())
}

/// Evaluate `code` as a single unit.
pub fn eval_code(shell: &ScriptShell, code: &str) -> Result<RunSummary, CliError> {
    let mut summary = RunSummary {
        lines: code.lines().count(),
        ..RunSummary::default()
    };
    match shell.eval_source(code)? {
        Cycle::Incomplete => return Err(CliError::Incomplete("<eval>".to_string())),
        cycle => summary.record(&cycle),
    }
    Ok(summary)
}
