//! Tern core types.
//!
//! Shared vocabulary between the shell and its two collaborators: the
//! snippet compiler and the snippet executor. Nothing in here knows how a
//! snippet is parsed or run; it only describes what flows between the
//! pieces.

pub mod env;
pub mod frame;
pub mod ids;
pub mod manifest;
pub mod service;
pub mod snippet;
pub mod types;
pub mod value;

pub use env::Environment;
pub use frame::{Frame, Member, MemberKind, Opaque, RESULT_MEMBER, RUN_MEMBER};
pub use ids::{Generation, Namespace, SnippetId};
pub use manifest::{Declaration, DeclarationKind, Manifest};
pub use service::{
    CompileContext, CompileDiagnostic, CompileOutcome, CompiledRecord, CompiledSnippet,
    EvalOutcome, Execution, Location, ServiceError, SnippetCompiler, SnippetExecutor,
};
pub use snippet::Snippet;
pub use types::{FunctionSignature, Param, TypeDesc, TypeParam, Variance};
pub use value::{Object, Value};
