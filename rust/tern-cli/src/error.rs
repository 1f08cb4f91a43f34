use std::path::PathBuf;

use rustyline::error::ReadlineError;
use tern_shell::ShellError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid toml in '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid log filter '{filter}': {reason}")]
    LogFilter { filter: String, reason: String },
    #[error("{0} ends inside an incomplete snippet")]
    Incomplete(String),
    #[error("line editor failure: {0}")]
    Editor(#[from] ReadlineError),
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Whether the session that produced the error must not continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            CliError::Shell(e) => e.is_fatal(),
            _ => true,
        }
    }
}
