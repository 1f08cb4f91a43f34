//! `:`-prefixed directives and their registry.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ShellError;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Quit,
}

pub type CommandHandler = Arc<
    dyn Fn(&dyn Session, &[String], &mut dyn Write) -> Result<CommandFlow, ShellError>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub alias: Option<String>,
    pub summary: String,
    pub usage: String,
    handler: CommandHandler,
}

impl CommandSpec {
    pub fn new<F>(name: impl Into<String>, summary: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&dyn Session, &[String], &mut dyn Write) -> Result<CommandFlow, ShellError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        Self {
            usage: format!(":{}", name),
            name,
            alias: None,
            summary: summary.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn matches(&self, word: &str) -> bool {
        self.name == word || self.alias.as_deref() == Some(word)
    }

    pub fn execute(
        &self,
        session: &dyn Session,
        args: &[String],
        out: &mut dyn Write,
    ) -> Result<CommandFlow, ShellError> {
        (self.handler)(session, args, out)
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.clone(),
            alias: self.alias.clone(),
            summary: self.summary.clone(),
            usage: self.usage.clone(),
        }
    }

    pub fn usage_error(&self) -> ShellError {
        ShellError::InvalidUsage(format!("usage: {}", self.usage))
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub alias: Option<String>,
    pub summary: String,
    pub usage: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in directives.
    pub fn with_builtins() -> Self {
        Self {
            specs: crate::builtins::commands(),
        }
    }

    /// Reject a command whose name or alias is already taken.
    pub fn register(&mut self, spec: CommandSpec) -> Result<(), ShellError> {
        let words = std::iter::once(spec.name.as_str()).chain(spec.alias.as_deref());
        for word in words {
            if self.find(word).is_some() {
                return Err(ShellError::DuplicateCommand(word.to_string()));
            }
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn find(&self, word: &str) -> Option<&CommandSpec> {
        self.specs.iter().find(|spec| spec.matches(word))
    }

    pub fn infos(&self) -> Vec<CommandInfo> {
        self.specs.iter().map(CommandSpec::info).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// A parsed `:name arg ...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse a directive line. `None` for lines that are not directives.
/// Arguments follow shell quoting rules.
pub fn parse_directive(line: &str) -> Option<Result<Directive, ShellError>> {
    let rest = line.trim().strip_prefix(':')?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args),
        None => (rest, ""),
    };
    let parsed = shell_words::split(args)
        .map(|args| Directive {
            name: name.to_string(),
            args,
        })
        .map_err(|e| ShellError::InvalidUsage(format!("cannot parse arguments: {}", e)));
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &dyn Session, _: &[String], _: &mut dyn Write) -> Result<CommandFlow, ShellError> {
        Ok(CommandFlow::Continue)
    }

    #[test]
    fn parses_name_and_quoted_args() {
        let directive = parse_directive("  :load \"my file.tn\" extra").unwrap().unwrap();
        assert_eq!(directive.name, "load");
        assert_eq!(directive.args, ["my file.tn", "extra"]);
        assert!(parse_directive("1 + 2").is_none());
        assert_eq!(parse_directive(":q").unwrap().unwrap().args.len(), 0);
    }

    #[test]
    fn unbalanced_quotes_are_a_usage_error() {
        assert!(matches!(
            parse_directive(":load \"oops"),
            Some(Err(ShellError::InvalidUsage(_)))
        ));
    }

    #[test]
    fn duplicate_name_or_alias_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandSpec::new("time", "toggle timing", noop).alias("t"))
            .unwrap();
        assert!(matches!(
            registry.register(CommandSpec::new("t", "clash", noop)),
            Err(ShellError::DuplicateCommand(word)) if word == "t"
        ));
        assert!(registry.find("t").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn builtin_names_and_aliases_are_distinct() {
        let registry = CommandRegistry::with_builtins();
        let mut words: Vec<String> = registry
            .infos()
            .into_iter()
            .flat_map(|info| std::iter::once(info.name).chain(info.alias))
            .collect();
        let total = words.len();
        words.sort();
        words.dedup();
        assert_eq!(words.len(), total);
    }
}
