//! Tern script: a small statically typed language used as the shell's
//! default compiler and executor.
//!
//! ```
//! use tern_core::{CompileContext, CompileOutcome, Generation, Namespace, Snippet, SnippetId};
//! use tern_core::SnippetCompiler;
//! use tern_script::ScriptCompiler;
//!
//! let ns = Namespace::default();
//! let cx = CompileContext { history: &[], default_namespace: &ns };
//! let snippet = Snippet::new(SnippetId(1), Generation(0), "1 + 2");
//! assert!(matches!(ScriptCompiler::new().compile(&snippet, &cx), CompileOutcome::Compiled(_)));
//! ```

pub mod ast;
pub mod check;
pub mod compiler;
pub mod executor;
pub mod interp;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod tokens;

pub use check::TypeError;
pub use compiler::{compile_snippet, is_complete_source, ScriptCompiler, ScriptError};
pub use executor::{ScriptExecutor, DEFAULT_MAX_CALL_DEPTH};
pub use interp::RuntimeError;
pub use ir::ScriptArtifact;
