use serde::Serialize;

use crate::ids::{Generation, SnippetId};

/// One complete unit of user input, as handed to the compiler.
///
/// The outcome of compiling and evaluating it is tracked by the shell's
/// history ledgers, not here; a `Snippet` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub id: SnippetId,
    /// Compiler generation at the time the snippet was created.
    pub generation: Generation,
    pub source: String,
}

impl Snippet {
    pub fn new(id: SnippetId, generation: Generation, source: impl Into<String>) -> Self {
        Self {
            id,
            generation,
            source: source.into(),
        }
    }
}
