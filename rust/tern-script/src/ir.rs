//! Typed, name-resolved form of a snippet. This is the artifact the compiler
//! hands to the executor.

use std::sync::Arc;

use tern_core::{FunctionSignature, Param, SnippetId, TypeDesc, Value};

use crate::ast::{BinOp, UnaryOp};
use crate::tokens::Span;

#[derive(Debug, Clone)]
pub struct ScriptArtifact {
    pub items: Vec<IrItem>,
    /// Bindings from earlier snippets this snippet reads.
    pub deps: Vec<Dependency>,
    pub result_type: TypeDesc,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependency {
    pub snippet: SnippetId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum IrItem {
    Let {
        name: String,
        ty: TypeDesc,
        init: IrExpr,
    },
    Fun(Arc<IrFunction>),
    Class {
        name: String,
        fields: Vec<Param>,
    },
    Expr(IrExpr),
}

#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: String,
    pub signature: FunctionSignature,
    pub body: IrExpr,
}

#[derive(Debug, Clone)]
pub struct IrExpr {
    pub kind: IrKind,
    pub ty: TypeDesc,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Intrinsic {
    Print,
    Len,
}

#[derive(Debug, Clone)]
pub enum IrKind {
    Lit(Value),
    List(Vec<IrExpr>),
    Local(String),
    Global {
        snippet: SnippetId,
        name: String,
    },
    Call {
        snippet: SnippetId,
        name: String,
        args: Vec<IrExpr>,
    },
    Construct {
        class: String,
        /// Snippet that declared the class.
        origin: SnippetId,
        fields: Vec<String>,
        args: Vec<IrExpr>,
    },
    Intrinsic {
        op: Intrinsic,
        args: Vec<IrExpr>,
    },
    Field {
        target: Box<IrExpr>,
        field: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<IrExpr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
    },
    If {
        cond: Box<IrExpr>,
        then_branch: Box<IrExpr>,
        else_branch: Option<Box<IrExpr>>,
    },
    Block(Vec<IrStmt>),
    /// Int to Float conversion introduced by `as Float`.
    Widen(Box<IrExpr>),
}

#[derive(Debug, Clone)]
pub enum IrStmt {
    Let { name: String, init: IrExpr },
    Expr(IrExpr),
}
