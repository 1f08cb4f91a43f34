//! Type descriptions as reported by the compiler and carried by symbols.

use serde::Serialize;
use std::fmt;
use strum::{Display, EnumString};

use crate::ids::{Namespace, SnippetId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDesc {
    Unit,
    Bool,
    Int,
    Float,
    String,
    List { element: Box<TypeDesc> },
    /// A user class. `origin` is the snippet that declared it, so a class
    /// redeclared under the same name is a distinct type.
    Class {
        namespace: Namespace,
        name: String,
        origin: SnippetId,
    },
    /// A function type parameter, only meaningful inside its signature.
    Param { name: String },
}

impl TypeDesc {
    pub fn list(element: TypeDesc) -> Self {
        TypeDesc::List {
            element: Box::new(element),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeDesc::Int | TypeDesc::Float)
    }

    /// Render as a type expression. Classes carry their declaring line,
    /// unlike `Display`.
    pub fn to_source(&self) -> String {
        match self {
            TypeDesc::List { element } => format!("List<{}>", element.to_source()),
            TypeDesc::Class { name, origin, .. } => format!("{}@{}", name, origin),
            other => other.to_string(),
        }
    }

    /// True when the type mentions a type parameter anywhere.
    pub fn is_generic(&self) -> bool {
        match self {
            TypeDesc::Param { .. } => true,
            TypeDesc::List { element } => element.is_generic(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Unit => write!(f, "Unit"),
            TypeDesc::Bool => write!(f, "Bool"),
            TypeDesc::Int => write!(f, "Int"),
            TypeDesc::Float => write!(f, "Float"),
            TypeDesc::String => write!(f, "String"),
            TypeDesc::List { element } => write!(f, "List<{}>", element),
            TypeDesc::Class { name, .. } => write!(f, "{}", name),
            TypeDesc::Param { name } => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Variance {
    #[default]
    Invariant,
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeParam {
    pub name: String,
    pub variance: Variance,
    pub bound: Option<TypeDesc>,
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variance {
            Variance::Invariant => {}
            other => write!(f, "{} ", other)?,
        }
        write!(f, "{}", self.name)?;
        if let Some(bound) = &self.bound {
            write!(f, " : {}", bound)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeDesc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionSignature {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: TypeDesc,
}

impl FunctionSignature {
    pub fn new(params: Vec<Param>, ret: TypeDesc) -> Self {
        Self {
            type_params: Vec::new(),
            params,
            ret,
        }
    }

    /// Render as `<T> (x: T, n: Int): T`, without the function name.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.type_params.is_empty() {
            let tps: Vec<String> = self.type_params.iter().map(|tp| tp.to_string()).collect();
            out.push_str(&format!("<{}> ", tps.join(", ")));
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        out.push_str(&format!("({}): {}", params.join(", "), self.ret));
        out
    }
}
