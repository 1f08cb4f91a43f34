//! The snippet compiler: lex, parse and check one snippet against the
//! compiler history.

use tern_core::{
    CompileContext, CompileDiagnostic, CompileOutcome, CompiledSnippet, Manifest, Snippet,
    SnippetCompiler,
};
use thiserror::Error;
use tracing::debug;

use crate::check::{Checker, TypeError};
use crate::ir::ScriptArtifact;
use crate::lexer::{tokenize, LexError};
use crate::parser::{parse, ParseError};
use crate::tokens::Span;

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl ScriptError {
    pub fn span(&self) -> Span {
        match self {
            ScriptError::Lex(e) => e.span(),
            ScriptError::Parse(e) => e.span(),
            ScriptError::Type(e) => e.span(),
        }
    }

    /// Whether more input could still turn the source into a valid snippet.
    pub fn is_incomplete(&self) -> bool {
        match self {
            ScriptError::Lex(LexError::UnterminatedString { .. }) => true,
            ScriptError::Parse(e) => e.is_eof(),
            _ => false,
        }
    }
}

/// Compile `snippet` against the history in `cx`.
pub fn compile_snippet(
    snippet: &Snippet,
    cx: &CompileContext<'_>,
) -> Result<(ScriptArtifact, Manifest), ScriptError> {
    let tokens = tokenize(&snippet.source)?;
    let items = parse(tokens)?;
    Ok(Checker::new(cx, snippet.id).check_snippet(&items)?)
}

/// Whether `source` is syntactically complete, ignoring type errors.
pub fn is_complete_source(source: &str) -> bool {
    let result = tokenize(source)
        .map_err(ScriptError::from)
        .and_then(|tokens| parse(tokens).map_err(ScriptError::from));
    match result {
        Ok(_) => true,
        Err(e) => !e.is_incomplete(),
    }
}

#[derive(Debug, Default)]
pub struct ScriptCompiler {
    compiled: u64,
}

impl ScriptCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snippets compiled successfully by this instance.
    pub fn compiled_count(&self) -> u64 {
        self.compiled
    }
}

impl SnippetCompiler for ScriptCompiler {
    type Artifact = ScriptArtifact;

    fn is_complete(&self, source: &str) -> bool {
        is_complete_source(source)
    }

    fn compile(
        &mut self,
        snippet: &Snippet,
        cx: &CompileContext<'_>,
    ) -> CompileOutcome<ScriptArtifact> {
        match compile_snippet(snippet, cx) {
            Ok((artifact, manifest)) => {
                self.compiled += 1;
                debug!(
                    snippet = %snippet.id,
                    type_name = %manifest.type_name,
                    deps = artifact.deps.len(),
                    "compiled snippet"
                );
                CompileOutcome::Compiled(CompiledSnippet {
                    snippet: snippet.clone(),
                    manifest,
                    artifact,
                })
            }
            Err(e) if e.is_incomplete() => CompileOutcome::Incomplete,
            Err(e) => {
                let location = Some(e.span().location());
                CompileOutcome::Error(CompileDiagnostic::new(e.to_string(), location))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_core::{Generation, Namespace, SnippetId, TypeDesc};

    fn compile_alone(source: &str) -> CompileOutcome<ScriptArtifact> {
        let ns = Namespace::default();
        let cx = CompileContext {
            history: &[],
            default_namespace: &ns,
        };
        let snippet = Snippet::new(SnippetId(1), Generation(0), source);
        ScriptCompiler::new().compile(&snippet, &cx)
    }

    #[test]
    fn open_block_is_incomplete() {
        assert!(!is_complete_source("if (true) {"));
        assert!(!is_complete_source("\"abc"));
        assert!(is_complete_source("if (true) { 1 } else { 2 }"));
        assert!(is_complete_source("1 +* 2"));
    }

    #[test]
    fn type_errors_carry_a_location() {
        match compile_alone("let x: Int = \"no\"") {
            CompileOutcome::Error(diag) => {
                assert!(diag.message.contains("type mismatch"), "{}", diag.message);
                assert_eq!(diag.location.map(|l| l.line), Some(1));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn manifest_names_the_frame_type() {
        match compile_alone("let x = 1\nx + 1") {
            CompileOutcome::Compiled(compiled) => {
                assert_eq!(compiled.manifest.type_name, "repl.Line_1");
                assert_eq!(compiled.manifest.result_type, TypeDesc::Int);
                assert_eq!(compiled.manifest.declared_names().collect::<Vec<_>>(), ["x"]);
            }
            other => panic!("expected compiled, got {:?}", other),
        }
    }
}
