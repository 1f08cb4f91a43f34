//! Tern shell: the session engine behind the interactive prompt.
//!
//! A [`Shell`] owns the input buffer, the compiler and executor ledgers, the
//! environment the executor binds frames into, the symbol table and the
//! wrapper chain. Compilers and executors plug in through the
//! [`tern_core::SnippetCompiler`] and [`tern_core::SnippetExecutor`] traits.
//!
//! ```
//! use std::sync::Arc;
//! use tern_script::{ScriptCompiler, ScriptExecutor};
//! use tern_shell::{Cycle, LineOutcome, MemoryReporter, Session, Shell};
//!
//! let reporter = MemoryReporter::new();
//! let shell = Shell::new(
//!     ScriptCompiler::new(),
//!     ScriptExecutor::new(),
//!     Arc::new(reporter.clone()),
//! );
//! let outcome = shell.submit_line("6 * 7").unwrap();
//! assert!(matches!(outcome, LineOutcome::Evaluated(Cycle::Value { .. })));
//! assert_eq!(reporter.values(), ["res1: Int = 42"]);
//! ```

pub mod buffer;
pub mod builtins;
pub mod commands;
pub mod engine;
pub mod error;
pub mod events;
pub mod extractor;
pub mod history;
pub mod plugin;
pub mod reporter;
pub mod session;
pub mod symbols;
pub mod wrappers;

pub use buffer::{SnippetBuffer, Submission};
pub use commands::{
    parse_directive, CommandFlow, CommandHandler, CommandInfo, CommandRegistry, CommandSpec,
    Directive,
};
pub use engine::{Cycle, LineOutcome, Shell};
pub use error::{InternalError, ShellError};
pub use events::EventBus;
pub use extractor::{SymbolExtractor, EXTRACTOR_NAME};
pub use history::{
    EvalStatus, EvaluatedRecord, GenerationPair, History, HistoryEntry, Ledgers, Reconciled,
};
pub use plugin::{Plugin, PluginRegistrar};
pub use reporter::{MemoryReporter, Report, Reporter};
pub use session::Session;
pub use symbols::{Symbol, SymbolDetail, SymbolKind, SymbolQuery, SymbolTable};
pub use wrappers::{wrap_fn, ExecutionWrapper, FnWrapper, Proceed, WrapContext, WrapperChain};
