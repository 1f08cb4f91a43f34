//! Contracts of the two external collaborators: the snippet compiler and the
//! snippet executor.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::env::Environment;
use crate::frame::Frame;
use crate::ids::Namespace;
use crate::manifest::Manifest;
use crate::snippet::Snippet;
use crate::types::TypeDesc;
use crate::value::Value;

// ── Compilation ─────────────────────────────────────────────────────

/// Position inside a snippet's source, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileDiagnostic {
    pub message: String,
    pub location: Option<Location>,
}

impl CompileDiagnostic {
    pub fn new(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} ({})", self.message, loc),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A successfully compiled snippet: the executor's artifact plus the
/// declaration manifest the shell consumes.
#[derive(Debug, Clone)]
pub struct CompiledSnippet<A> {
    pub snippet: Snippet,
    pub manifest: Manifest,
    pub artifact: A,
}

#[derive(Debug, Clone)]
pub enum CompileOutcome<A> {
    /// The source is a valid prefix; more input is needed.
    Incomplete,
    Error(CompileDiagnostic),
    Compiled(CompiledSnippet<A>),
}

/// What the compiler-side history keeps per snippet.
#[derive(Debug, Clone)]
pub struct CompiledRecord {
    pub snippet: Snippet,
    pub manifest: Manifest,
}

impl<A> From<&CompiledSnippet<A>> for CompiledRecord {
    fn from(compiled: &CompiledSnippet<A>) -> Self {
        CompiledRecord {
            snippet: compiled.snippet.clone(),
            manifest: compiled.manifest.clone(),
        }
    }
}

/// Accumulated compiler-side state handed to each compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    /// Compiler history, oldest first.
    pub history: &'a [CompiledRecord],
    /// Namespace used until a snippet switches it.
    pub default_namespace: &'a Namespace,
}

impl CompileContext<'_> {
    /// Namespace new snippets compile into: that of the last compiled
    /// snippet, or the default for an empty history.
    pub fn current_namespace(&self) -> Namespace {
        self.history
            .last()
            .map(|record| record.manifest.namespace.clone())
            .unwrap_or_else(|| self.default_namespace.clone())
    }
}

pub trait SnippetCompiler: Send {
    type Artifact: Send + Sync + 'static;

    /// Whether `source` forms a syntactically complete unit.
    fn is_complete(&self, source: &str) -> bool;

    fn compile(
        &mut self,
        snippet: &Snippet,
        cx: &CompileContext<'_>,
    ) -> CompileOutcome<Self::Artifact>;
}

// ── Evaluation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    Value { value: Value, ty: TypeDesc },
    Unit,
    Error(String),
    /// The artifact depends on snippets the executor has not evaluated.
    HistoryMismatch(String),
}

impl EvalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EvalOutcome::Value { .. } | EvalOutcome::Unit)
    }
}

/// Output of one evaluation: the outcome plus the frame it bound, if any.
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: EvalOutcome,
    pub frame: Option<Arc<Frame>>,
}

impl Execution {
    pub fn new(outcome: EvalOutcome, frame: Option<Arc<Frame>>) -> Self {
        Self { outcome, frame }
    }

    pub fn without_frame(outcome: EvalOutcome) -> Self {
        Self {
            outcome,
            frame: None,
        }
    }
}

/// Failures of a collaborator that are not user-visible outcomes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("artifact for snippet {0} is malformed: {1}")]
    MalformedArtifact(u64, String),
    #[error("opaque entry of '{0}' has an unexpected payload")]
    OpaquePayload(String),
}

pub trait SnippetExecutor: Send {
    type Artifact: Send + Sync + 'static;

    fn eval(
        &mut self,
        compiled: &CompiledSnippet<Self::Artifact>,
        env: &mut Environment,
    ) -> Result<Execution, ServiceError>;
}
