//! Configuration file parsing for `tern.toml`.
//!
//! Searches the current directory then its ancestors, falling back to
//! `~/.config/tern/tern.toml` if no project-level file is found.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tern_script::DEFAULT_MAX_CALL_DEPTH;

use crate::error::CliError;

pub const CONFIG_FILE: &str = "tern.toml";

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct TernConfig {
    #[serde(default)]
    pub repl: ReplSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReplSection {
    pub prompt: String,
    pub continuation_prompt: String,
    /// Namespace snippets compile into until one declares a package.
    pub namespace: String,
    /// Line history file; `TERN_REPL_HISTORY_PATH` takes precedence.
    pub history_file: Option<String>,
    pub max_call_depth: usize,
    /// Install the timing wrapper switched on.
    pub timing: bool,
    pub color: bool,
}

impl Default for ReplSection {
    fn default() -> Self {
        Self {
            prompt: "tern> ".to_string(),
            continuation_prompt: "....  ".to_string(),
            namespace: "repl".to_string(),
            history_file: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            timing: false,
            color: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogSection {
    /// `tracing-subscriber` filter directive; `TERN_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl TernConfig {
    /// Load `explicit` if given, otherwise the first `tern.toml` found.
    /// Returns the path that was read, or `None` with defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Option<PathBuf>, Self), CliError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find(),
        };
        match path {
            Some(path) => {
                let config = Self::load_from(&path)?;
                Ok((Some(path), config))
            }
            None => Ok((None, Self::default())),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    fn find() -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        let global = dirs::home_dir().map(|home| home.join(".config").join("tern"));
        find_config(&cwd, global.as_deref())
    }

    /// Parse a TOML string directly.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn default_template() -> &'static str {
        r#"# tern.toml

[repl]
prompt = "tern> "
continuation_prompt = "....  "
namespace = "repl"
# history_file = "~/.tern/repl_history"
max_call_depth = 256
timing = false
color = true

[log]
filter = "warn"
"#
    }
}

/// `tern.toml` in `start` or its nearest ancestor, else in `global_dir`.
fn find_config(start: &Path, global_dir: Option<&Path>) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    global_dir
        .map(|dir| dir.join(CONFIG_FILE))
        .filter(|candidate| candidate.is_file())
}
