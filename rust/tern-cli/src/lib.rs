//! Tern CLI library.
//!
//! Configuration, terminal reporting, built-in plugins and the drivers
//! behind the `tern` binary.

pub mod colors;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod plugins;
pub mod repl;
pub mod reporter;

pub use config::TernConfig;
pub use driver::{build_shell, eval_code, run_file, run_lines, RunSummary, ScriptShell};
pub use error::CliError;
