//! The object-safe face of a shell, as seen by directives and front ends.

use tern_core::SnippetId;

use crate::commands::CommandInfo;
use crate::engine::LineOutcome;
use crate::error::ShellError;
use crate::history::{EvaluatedRecord, GenerationPair};
use crate::symbols::{Symbol, SymbolQuery};

pub trait Session {
    /// Feed one line of input: a directive, or code for the buffer.
    fn submit_line(&self, line: &str) -> Result<LineOutcome, ShellError>;

    /// Forget every snippet, binding and symbol.
    fn reset(&self);

    /// Drop everything evaluated after line `to`. Returns how many snippets
    /// were dropped.
    fn rollback(&self, to: SnippetId) -> Result<usize, ShellError>;

    /// Executor-side history, oldest first.
    fn history(&self) -> Vec<EvaluatedRecord>;

    fn generations(&self) -> GenerationPair;

    fn symbols(&self, query: &SymbolQuery) -> Vec<Symbol>;

    fn commands(&self) -> Vec<CommandInfo>;

    /// Lines waiting for the rest of an incomplete unit.
    fn pending_lines(&self) -> Vec<String>;

    fn clear_buffer(&self);
}
