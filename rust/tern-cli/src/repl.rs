//! Interactive REPL over a tern shell.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tern_shell::{CommandFlow, LineOutcome, Session, SymbolQuery};
use tracing::info;

use crate::colors::Palette;
use crate::config::TernConfig;
use crate::driver::{build_shell, ScriptShell};
use crate::error::CliError;
use crate::reporter::ConsoleReporter;

/// Environment variable used to override REPL history location.
pub const REPL_HISTORY_PATH_ENV: &str = "TERN_REPL_HISTORY_PATH";

const KEYWORDS: &[&str] = &[
    "let", "fun", "class", "package", "if", "else", "as", "true", "false", "in", "out",
];

const BUILTINS: &[&str] = &["print", "len"];

const TYPES: &[&str] = &["Int", "Float", "Bool", "String", "Unit", "List"];

/// Completes directives at line start, and keywords, builtins, types and
/// live session symbols elsewhere.
#[derive(Debug, Default)]
pub struct TernHelper {
    directives: Vec<String>,
    symbols: Vec<String>,
}

impl TernHelper {
    /// Pick up directives and symbols added since the last line.
    pub fn refresh(&mut self, shell: &dyn Session) {
        self.directives = shell
            .commands()
            .into_iter()
            .flat_map(|info| std::iter::once(info.name).chain(info.alias))
            .map(|word| format!(":{}", word))
            .collect();
        self.symbols = shell
            .symbols(&SymbolQuery::new())
            .into_iter()
            .map(|symbol| symbol.name)
            .collect();
        self.symbols.sort();
        self.symbols.dedup();
    }

    pub fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || "([{,.".contains(c))
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        if word.is_empty() {
            return (start, Vec::new());
        }

        let words: Vec<String> = if line.trim_start() == word && word.starts_with(':') {
            self.directives
                .iter()
                .filter(|d| d.starts_with(word))
                .cloned()
                .collect()
        } else {
            KEYWORDS
                .iter()
                .chain(BUILTINS)
                .chain(TYPES)
                .map(|s| s.to_string())
                .chain(self.symbols.iter().cloned())
                .filter(|w| w.starts_with(word))
                .collect()
        };
        (start, words)
    }
}

impl Completer for TernHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = self.candidates(line, pos);
        let pairs = words
            .into_iter()
            .map(|w| Pair {
                display: w.clone(),
                replacement: w,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for TernHelper {
    type Hint = String;
}

impl Highlighter for TernHelper {}

impl Validator for TernHelper {}

impl Helper for TernHelper {}

pub fn run_repl(config: &TernConfig, palette: Palette) -> Result<(), CliError> {
    let shell = build_shell(config, palette, Arc::new(ConsoleReporter::new(palette)))?;

    println!(
        "{}",
        palette.bold(&palette.cyan(&format!("tern {}", env!("CARGO_PKG_VERSION"))))
    );
    println!(
        "{}\n",
        palette.gray("Type :help for available commands, :quit to exit.")
    );

    let editor_config = rustyline::Config::builder().auto_add_history(true).build();
    let mut rl: Editor<TernHelper, DefaultHistory> = Editor::with_config(editor_config)?;
    let mut helper = TernHelper::default();
    helper.refresh(&shell);
    rl.set_helper(Some(helper));

    let history_path = get_history_path(config.repl.history_file.as_deref());
    if let Some(path) = &history_path {
        if path.exists() {
            if let Err(err) = rl.load_history(path) {
                eprintln!(
                    "{} failed to load history from {}: {}",
                    palette.yellow("warning:"),
                    path.display(),
                    err
                );
            }
        }
    }

    let result = repl_loop(&shell, &mut rl, config, palette);

    if let Some(path) = &history_path {
        save_history(&mut rl, path, palette);
    }
    info!(session = %shell.id(), "repl finished");
    println!("\n{}", palette.cyan("Goodbye!"));
    result
}

fn repl_loop(
    shell: &ScriptShell,
    rl: &mut Editor<TernHelper, DefaultHistory>,
    config: &TernConfig,
    palette: Palette,
) -> Result<(), CliError> {
    loop {
        let prompt = if shell.pending_lines().is_empty() {
            palette.green(&config.repl.prompt)
        } else {
            palette.gray(&config.repl.continuation_prompt)
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                match shell.submit_line(&line) {
                    Ok(LineOutcome::Command(CommandFlow::Quit)) => return Ok(()),
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        eprintln!("{} {}", palette.red("fatal:"), e);
                        return Err(e.into());
                    }
                    Err(e) => eprintln!("{} {}", palette.red("error:"), e),
                }
                if let Some(helper) = rl.helper_mut() {
                    helper.refresh(shell);
                }
            }
            Err(ReadlineError::Interrupted) => {
                if shell.pending_lines().is_empty() {
                    println!("{}", palette.gray("(Ctrl-D or :quit to exit)"));
                } else {
                    shell.clear_buffer();
                    println!("{}", palette.gray("(input discarded)"));
                }
            }
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
}

fn save_history(rl: &mut Editor<TernHelper, DefaultHistory>, path: &Path, palette: Palette) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!(
                "{} failed to create history directory {}: {}",
                palette.yellow("warning:"),
                parent.display(),
                err
            );
            return;
        }
    }
    if let Err(err) = rl.save_history(path) {
        eprintln!(
            "{} failed to save history to {}: {}",
            palette.yellow("warning:"),
            path.display(),
            err
        );
    }
}

/// Where line history lives. An override may be absolute, `~`-prefixed or
/// relative to HOME; without one it is `~/.tern/repl_history`.
pub fn resolve_history_path(home: Option<&Path>, override_path: Option<&str>) -> Option<PathBuf> {
    let raw = override_path.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return home.map(|h| h.join(".tern").join("repl_history"));
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    let under_home = path.strip_prefix("~").unwrap_or(path);
    home.map(|h| h.join(under_home))
}

fn get_history_path(configured: Option<&str>) -> Option<PathBuf> {
    let home = dirs::home_dir();
    let from_env = std::env::var(REPL_HISTORY_PATH_ENV).ok();
    resolve_history_path(home.as_deref(), from_env.as_deref().or(configured))
}
