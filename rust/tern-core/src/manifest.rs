//! Declaration manifests.
//!
//! Alongside every compiled artifact the compiler emits a manifest naming what
//! the snippet declares. The shell reads manifests instead of reflecting over
//! runtime objects: they drive name shadowing in the history ledger and are
//! checked against the runtime frame by the symbol extractor.

use serde::Serialize;

use crate::ids::Namespace;
use crate::types::{FunctionSignature, Param, TypeDesc};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub namespace: Namespace,
    /// Runtime type name of the snippet's frame, e.g. `repl.Line_4`.
    pub type_name: String,
    pub declarations: Vec<Declaration>,
    /// Type of the snippet's value; `Unit` for declaration-only snippets.
    pub result_type: TypeDesc,
}

impl Manifest {
    pub fn new(namespace: Namespace, type_name: impl Into<String>) -> Self {
        Self {
            namespace,
            type_name: type_name.into(),
            declarations: Vec::new(),
            result_type: TypeDesc::Unit,
        }
    }

    /// The most recent declaration of `name` in this snippet.
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().rev().find(|d| d.name == name)
    }

    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.name.as_str())
    }

    pub fn is_named(&self) -> bool {
        !self.declarations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclarationKind {
    Class { fields: Vec<Param> },
    Property { ty: TypeDesc },
    Function { signature: FunctionSignature },
}

impl DeclarationKind {
    pub fn label(&self) -> &'static str {
        match self {
            DeclarationKind::Class { .. } => "class",
            DeclarationKind::Property { .. } => "property",
            DeclarationKind::Function { .. } => "function",
        }
    }
}
