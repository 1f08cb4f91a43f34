use tern_core::{Generation, ServiceError, SnippetId};
use thiserror::Error;

/// Contract violations between the compiler, the executor and the shell.
/// These end the current operation and are never shown as "try again".
#[derive(Debug, Error, PartialEq)]
pub enum InternalError {
    #[error("member '{member}' of {type_name} has an unknown kind ({descriptor})")]
    UnknownMemberKind {
        type_name: String,
        member: String,
        descriptor: String,
    },
    #[error("declared member '{member}' is missing from {type_name}")]
    MissingMember { type_name: String, member: String },
    #[error("successful evaluation of line {0} produced no frame")]
    MissingFrame(SnippetId),
    #[error("compiler generation {compiler} is behind executor generation {executor}")]
    GenerationInvariant {
        compiler: Generation,
        executor: Generation,
    },
    #[error("reconciliation left compiler at {compiler} and executor at {executor}")]
    ReconcileMismatch {
        compiler: Generation,
        executor: Generation,
    },
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("internal consistency failure: {0}")]
    Internal(#[from] InternalError),
    #[error("service failure: {0}")]
    Service(#[from] ServiceError),
    #[error("command ':{0}' is already registered")]
    DuplicateCommand(String),
    #[error("wrapper '{0}' is already registered")]
    DuplicateWrapper(String),
    #[error("plugin '{0}' is already loaded")]
    DuplicatePlugin(String),
    #[error("{0}")]
    InvalidUsage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    /// Whether the session can no longer be trusted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Internal(_) | ShellError::Service(_))
    }
}
