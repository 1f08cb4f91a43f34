//! Runtime frames: the environment object an evaluated snippet leaves behind.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::ids::SnippetId;
use crate::types::{FunctionSignature, TypeDesc};
use crate::value::Value;

/// Member holding the raw value of the snippet's last expression.
pub const RESULT_MEMBER: &str = "$result";
/// Member holding the re-invocable entry point of the snippet.
pub const RUN_MEMBER: &str = "$run";

/// Executor-private payload (a function body, a compiled entry point).
/// The shell never looks inside.
pub type Opaque = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Frame {
    pub snippet: SnippetId,
    /// Runtime type name, e.g. `repl.Line_4`. The namespace is derived from it.
    pub type_name: String,
    /// Classes declared by the snippet.
    pub nested_types: Vec<String>,
    pub members: Vec<Member>,
}

impl Frame {
    pub fn new(snippet: SnippetId, type_name: impl Into<String>) -> Self {
        Self {
            snippet,
            type_name: type_name.into(),
            nested_types: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().rev().find(|m| m.name == name)
    }

    pub fn has_nested_type(&self, name: &str) -> bool {
        self.nested_types.iter().any(|t| t == name)
    }

    /// The value held by the reserved result member, if any.
    pub fn result(&self) -> Option<&Value> {
        match self.member(RESULT_MEMBER).map(|m| &m.kind) {
            Some(MemberKind::Property { value, .. }) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    /// Snippet whose source declared the member.
    pub declared_in: SnippetId,
    pub kind: MemberKind,
}

impl Member {
    pub fn is_reserved(&self) -> bool {
        self.name == RESULT_MEMBER || self.name == RUN_MEMBER
    }
}

#[derive(Clone)]
pub enum MemberKind {
    Property {
        value: Value,
        ty: TypeDesc,
    },
    Function {
        signature: FunctionSignature,
        entry: Opaque,
    },
    /// Anything the executor exposes that is neither a property nor a function.
    Other { descriptor: String },
}

impl fmt::Debug for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Property { value, ty } => f
                .debug_struct("Property")
                .field("value", value)
                .field("ty", ty)
                .finish(),
            MemberKind::Function { signature, .. } => f
                .debug_struct("Function")
                .field("signature", signature)
                .finish_non_exhaustive(),
            MemberKind::Other { descriptor } => f
                .debug_struct("Other")
                .field("descriptor", descriptor)
                .finish(),
        }
    }
}
