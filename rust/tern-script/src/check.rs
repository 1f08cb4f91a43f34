//! Name resolution and type checking.
//!
//! Turns a parsed snippet into a [`ScriptArtifact`] plus the [`Manifest`] of
//! what it declares. Names from earlier snippets are resolved against the
//! compiler history: the most recent binding in the current namespace wins,
//! then the most recent binding in any namespace.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tern_core::{
    CompileContext, Declaration, DeclarationKind, FunctionSignature, Manifest, Namespace, Param,
    SnippetId, TypeDesc, TypeParam, Value,
};
use thiserror::Error;

use crate::ast::*;
use crate::ir::*;
use crate::tokens::Span;

#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("type mismatch at {span}: expected {expected}, found {actual}")]
    Mismatch {
        expected: String,
        actual: String,
        span: Span,
    },
    #[error("unresolved name '{name}' at {span}")]
    Unresolved { name: String, span: Span },
    #[error("unknown type '{name}' at {span}")]
    UnknownType { name: String, span: Span },
    #[error("'{name}' is not callable at {span}")]
    NotCallable { name: String, span: Span },
    #[error("{kind} '{name}' cannot be used as a value at {span}")]
    NotAValue {
        name: String,
        kind: &'static str,
        span: Span,
    },
    #[error("wrong number of arguments to '{name}' at {span}: expected {expected}, found {actual}")]
    ArgCount {
        name: String,
        expected: usize,
        actual: usize,
        span: Span,
    },
    #[error("type '{ty}' has no field '{field}' at {span}")]
    UnknownField {
        ty: String,
        field: String,
        span: Span,
    },
    #[error("operator '{op}' cannot be applied to {lhs} and {rhs} at {span}")]
    BadOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
        span: Span,
    },
    #[error("operator '{op}' cannot be applied to {operand} at {span}")]
    BadOperand {
        op: &'static str,
        operand: String,
        span: Span,
    },
    #[error("cannot cast {from} to {to} at {span}")]
    BadCast { from: String, to: String, span: Span },
    #[error("cannot infer the element type of an empty list at {span}")]
    EmptyList { span: Span },
    #[error("recursive function '{name}' needs an explicit return type at {span}")]
    RecursionNeedsType { name: String, span: Span },
    #[error("type argument {actual} for '{param}' does not satisfy bound {bound} at {span}")]
    BoundViolation {
        param: String,
        bound: String,
        actual: String,
        span: Span,
    },
    #[error("cannot infer type parameter '{param}' of '{name}' at {span}")]
    UninferredParam {
        param: String,
        name: String,
        span: Span,
    },
    #[error("'{name}' is already declared in this snippet at {span}")]
    Duplicate { name: String, span: Span },
    #[error("package declaration must be the first item of a snippet at {span}")]
    MisplacedPackage { span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::Unresolved { span, .. }
            | TypeError::UnknownType { span, .. }
            | TypeError::NotCallable { span, .. }
            | TypeError::NotAValue { span, .. }
            | TypeError::ArgCount { span, .. }
            | TypeError::UnknownField { span, .. }
            | TypeError::BadOperands { span, .. }
            | TypeError::BadOperand { span, .. }
            | TypeError::BadCast { span, .. }
            | TypeError::EmptyList { span }
            | TypeError::RecursionNeedsType { span, .. }
            | TypeError::BoundViolation { span, .. }
            | TypeError::UninferredParam { span, .. }
            | TypeError::Duplicate { span, .. }
            | TypeError::MisplacedPackage { span } => *span,
        }
    }
}

/// A binding found outside the local scopes.
struct GlobalRef {
    snippet: SnippetId,
    namespace: Namespace,
    kind: DeclarationKind,
}

pub struct Checker<'a> {
    cx: &'a CompileContext<'a>,
    snippet: SnippetId,
    namespace: Namespace,
    /// Declarations of the snippet being checked, in declaration order.
    own: Vec<Declaration>,
    scopes: Vec<Vec<(String, TypeDesc)>>,
    type_params: Vec<TypeParam>,
    /// Function whose body is being checked.
    current_fun: Option<String>,
    deps: BTreeSet<Dependency>,
}

impl<'a> Checker<'a> {
    pub fn new(cx: &'a CompileContext<'a>, snippet: SnippetId) -> Self {
        Self {
            cx,
            snippet,
            namespace: cx.current_namespace(),
            own: Vec::new(),
            scopes: Vec::new(),
            type_params: Vec::new(),
            current_fun: None,
            deps: BTreeSet::new(),
        }
    }

    pub fn check_snippet(
        mut self,
        items: &[Item],
    ) -> Result<(ScriptArtifact, Manifest), TypeError> {
        for (idx, item) in items.iter().enumerate() {
            if let Item::Package { path, span } = item {
                if idx != 0 {
                    return Err(TypeError::MisplacedPackage { span: *span });
                }
                self.namespace = Namespace::new(path.clone());
            }
        }

        // Classes and explicitly typed functions are visible to the whole snippet.
        for item in items {
            if let Item::Class(class) = item {
                let fields = self.resolve_params(&class.fields)?;
                self.declare(
                    Declaration {
                        name: class.name.clone(),
                        kind: DeclarationKind::Class { fields },
                    },
                    class.span,
                )?;
            }
        }
        let mut predeclared = Vec::new();
        for item in items {
            if let Item::Fun(fun) = item {
                if let Some(signature) = self.fun_signature(fun)? {
                    self.declare(
                        Declaration {
                            name: fun.name.clone(),
                            kind: DeclarationKind::Function { signature },
                        },
                        fun.span,
                    )?;
                    predeclared.push(fun.name.clone());
                }
            }
        }

        let mut ir_items = Vec::new();
        let mut result_type = TypeDesc::Unit;
        for item in items {
            result_type = TypeDesc::Unit;
            match item {
                Item::Package { .. } => {}
                Item::Class(class) => {
                    let fields = self
                        .class_fields(self.snippet, &class.name)
                        .unwrap_or_default();
                    ir_items.push(IrItem::Class {
                        name: class.name.clone(),
                        fields,
                    });
                }
                Item::Fun(fun) => {
                    let function = self.check_fun(fun)?;
                    if !predeclared.contains(&fun.name) {
                        self.declare(
                            Declaration {
                                name: fun.name.clone(),
                                kind: DeclarationKind::Function {
                                    signature: function.signature.clone(),
                                },
                            },
                            fun.span,
                        )?;
                    }
                    ir_items.push(IrItem::Fun(Arc::new(function)));
                }
                Item::Let(decl) => {
                    let (ty, init) = self.check_let(decl)?;
                    self.declare(
                        Declaration {
                            name: decl.name.clone(),
                            kind: DeclarationKind::Property { ty: ty.clone() },
                        },
                        decl.span,
                    )?;
                    ir_items.push(IrItem::Let {
                        name: decl.name.clone(),
                        ty,
                        init,
                    });
                }
                Item::Expr(expr) => {
                    let ir = self.check_expr(expr, None)?;
                    result_type = ir.ty.clone();
                    ir_items.push(IrItem::Expr(ir));
                }
            }
        }

        let type_name = self.namespace.qualify(&format!("Line_{}", self.snippet));
        let manifest = Manifest {
            namespace: self.namespace.clone(),
            type_name,
            declarations: self.own,
            result_type: result_type.clone(),
        };
        let artifact = ScriptArtifact {
            items: ir_items,
            deps: self.deps.into_iter().collect(),
            result_type,
        };
        Ok((artifact, manifest))
    }

    fn declare(&mut self, decl: Declaration, span: Span) -> Result<(), TypeError> {
        if self.own.iter().any(|d| d.name == decl.name) {
            return Err(TypeError::Duplicate {
                name: decl.name,
                span,
            });
        }
        self.own.push(decl);
        Ok(())
    }

    // ── Lookup ──

    fn lookup_local(&self, name: &str) -> Option<&TypeDesc> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty)
    }

    fn lookup_global(&self, name: &str) -> Option<GlobalRef> {
        if let Some(decl) = self.own.iter().rev().find(|d| d.name == name) {
            return Some(GlobalRef {
                snippet: self.snippet,
                namespace: self.namespace.clone(),
                kind: decl.kind.clone(),
            });
        }
        let search = |same_namespace: bool| {
            self.cx
                .history
                .iter()
                .rev()
                .filter(|r| !same_namespace || r.manifest.namespace == self.namespace)
                .find_map(|r| r.manifest.find(name).map(|d| (r, d)))
        };
        search(true)
            .or_else(|| search(false))
            .map(|(record, decl)| GlobalRef {
                snippet: record.snippet.id,
                namespace: record.manifest.namespace.clone(),
                kind: decl.kind.clone(),
            })
    }

    fn note_dependency(&mut self, snippet: SnippetId, name: &str) {
        if snippet != self.snippet {
            self.deps.insert(Dependency {
                snippet,
                name: name.to_string(),
            });
        }
    }

    /// The class `name` as declared by snippet `origin`, whatever has
    /// shadowed it since.
    fn class_at(&self, name: &str, origin: SnippetId) -> Option<GlobalRef> {
        let (namespace, decls) = if origin == self.snippet {
            (self.namespace.clone(), self.own.as_slice())
        } else {
            let record = self.cx.history.iter().find(|r| r.snippet.id == origin)?;
            (
                record.manifest.namespace.clone(),
                record.manifest.declarations.as_slice(),
            )
        };
        decls
            .iter()
            .find(|d| d.name == name && matches!(d.kind, DeclarationKind::Class { .. }))
            .map(|d| GlobalRef {
                snippet: origin,
                namespace,
                kind: d.kind.clone(),
            })
    }

    fn class_fields(&self, origin: SnippetId, name: &str) -> Option<Vec<Param>> {
        let decls: &[Declaration] = if origin == self.snippet {
            &self.own
        } else {
            &self
                .cx
                .history
                .iter()
                .find(|r| r.snippet.id == origin)?
                .manifest
                .declarations
        };
        decls.iter().rev().find_map(|d| match &d.kind {
            DeclarationKind::Class { fields } if d.name == name => Some(fields.clone()),
            _ => None,
        })
    }

    // ── Types ──

    fn resolve_type(&self, ty: &TypeExpr) -> Result<TypeDesc, TypeError> {
        match ty {
            TypeExpr::List { element, .. } => Ok(TypeDesc::list(self.resolve_type(element)?)),
            TypeExpr::Named {
                name,
                origin: Some(origin),
                span,
            } => match self.class_at(name, *origin) {
                Some(class) => Ok(TypeDesc::Class {
                    namespace: class.namespace,
                    name: name.clone(),
                    origin: class.snippet,
                }),
                None => Err(TypeError::UnknownType {
                    name: format!("{}@{}", name, origin),
                    span: *span,
                }),
            },
            TypeExpr::Named {
                name,
                origin: None,
                span,
            } => {
                let builtin = match name.as_str() {
                    "Int" => Some(TypeDesc::Int),
                    "Float" => Some(TypeDesc::Float),
                    "Bool" => Some(TypeDesc::Bool),
                    "String" => Some(TypeDesc::String),
                    "Unit" => Some(TypeDesc::Unit),
                    _ => None,
                };
                if let Some(ty) = builtin {
                    return Ok(ty);
                }
                if self.type_params.iter().any(|tp| &tp.name == name) {
                    return Ok(TypeDesc::Param { name: name.clone() });
                }
                match self.lookup_global(name) {
                    Some(GlobalRef {
                        snippet,
                        namespace,
                        kind: DeclarationKind::Class { .. },
                    }) => Ok(TypeDesc::Class {
                        namespace,
                        name: name.clone(),
                        origin: snippet,
                    }),
                    _ => Err(TypeError::UnknownType {
                        name: name.clone(),
                        span: *span,
                    }),
                }
            }
        }
    }

    fn resolve_params(&self, params: &[ParamDecl]) -> Result<Vec<Param>, TypeError> {
        params
            .iter()
            .map(|p| {
                Ok(Param {
                    name: p.name.clone(),
                    ty: self.resolve_type(&p.ty)?,
                })
            })
            .collect()
    }

    fn expect_type(expected: &TypeDesc, actual: &TypeDesc, span: Span) -> Result<(), TypeError> {
        if expected == actual {
            Ok(())
        } else {
            Err(TypeError::Mismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
                span,
            })
        }
    }

    // ── Declarations ──

    fn resolve_type_params(&self, decls: &[TypeParamDecl]) -> Result<Vec<TypeParam>, TypeError> {
        decls
            .iter()
            .map(|tp| {
                Ok(TypeParam {
                    name: tp.name.clone(),
                    variance: tp.variance,
                    bound: tp.bound.as_ref().map(|b| self.resolve_type(b)).transpose()?,
                })
            })
            .collect()
    }

    /// Signature of a function with a declared return type; `None` when the
    /// return type has to be inferred from the body.
    fn fun_signature(&mut self, fun: &FunDecl) -> Result<Option<FunctionSignature>, TypeError> {
        let Some(ret) = &fun.ret else {
            return Ok(None);
        };
        let type_params = self.resolve_type_params(&fun.type_params)?;
        let saved = std::mem::replace(&mut self.type_params, type_params.clone());
        let resolved = self
            .resolve_params(&fun.params)
            .and_then(|params| Ok((params, self.resolve_type(ret)?)));
        self.type_params = saved;
        let (params, ret) = resolved?;
        Ok(Some(FunctionSignature {
            type_params,
            params,
            ret,
        }))
    }

    fn check_fun(&mut self, fun: &FunDecl) -> Result<IrFunction, TypeError> {
        let type_params = self.resolve_type_params(&fun.type_params)?;
        self.type_params = type_params.clone();
        self.current_fun = Some(fun.name.clone());
        let result = self.check_fun_body(fun, type_params);
        self.type_params.clear();
        self.current_fun = None;
        result
    }

    fn check_fun_body(
        &mut self,
        fun: &FunDecl,
        type_params: Vec<TypeParam>,
    ) -> Result<IrFunction, TypeError> {
        let params = self.resolve_params(&fun.params)?;
        let ret = fun.ret.as_ref().map(|r| self.resolve_type(r)).transpose()?;

        let saved_scopes = std::mem::take(&mut self.scopes);
        self.scopes.push(
            params
                .iter()
                .map(|p| (p.name.clone(), p.ty.clone()))
                .collect(),
        );
        let body = self.check_expr(&fun.body, ret.as_ref());
        self.scopes = saved_scopes;
        let body = body?;

        let ret = match ret {
            Some(ret) => {
                Self::expect_type(&ret, &body.ty, fun.body.span())?;
                ret
            }
            None => body.ty.clone(),
        };
        Ok(IrFunction {
            name: fun.name.clone(),
            signature: FunctionSignature {
                type_params,
                params,
                ret,
            },
            body,
        })
    }

    fn check_let(&mut self, decl: &LetDecl) -> Result<(TypeDesc, IrExpr), TypeError> {
        let declared = decl.ty.as_ref().map(|t| self.resolve_type(t)).transpose()?;
        let init = self.check_expr(&decl.init, declared.as_ref())?;
        let ty = match declared {
            Some(ty) => {
                Self::expect_type(&ty, &init.ty, decl.init.span())?;
                ty
            }
            None => init.ty.clone(),
        };
        Ok((ty, init))
    }

    // ── Expressions ──

    fn check_expr(
        &mut self,
        expr: &Expr,
        expected: Option<&TypeDesc>,
    ) -> Result<IrExpr, TypeError> {
        let span = expr.span();
        let typed = |kind: IrKind, ty: TypeDesc| IrExpr { kind, ty, span };
        match expr {
            Expr::Int(n, _) => Ok(typed(IrKind::Lit(Value::Int(*n)), TypeDesc::Int)),
            Expr::Float(x, _) => Ok(typed(IrKind::Lit(Value::Float(*x)), TypeDesc::Float)),
            Expr::Str(s, _) => Ok(typed(IrKind::Lit(Value::Str(s.clone())), TypeDesc::String)),
            Expr::Bool(b, _) => Ok(typed(IrKind::Lit(Value::Bool(*b)), TypeDesc::Bool)),
            Expr::List(items, _) => self.check_list(items, expected, span),
            Expr::Name(name, _) => self.check_name(name, span),
            Expr::Call {
                callee,
                origin,
                args,
                ..
            } => self.check_call(callee, *origin, args, span),
            Expr::Field { target, field, .. } => {
                let target = self.check_expr(target, None)?;
                let field_ty = match &target.ty {
                    TypeDesc::Class { name, origin, .. } => self
                        .class_fields(*origin, name)
                        .and_then(|fields| fields.into_iter().find(|p| &p.name == field))
                        .map(|p| p.ty),
                    _ => None,
                };
                let Some(ty) = field_ty else {
                    return Err(TypeError::UnknownField {
                        ty: target.ty.to_string(),
                        field: field.clone(),
                        span,
                    });
                };
                Ok(typed(
                    IrKind::Field {
                        target: Box::new(target),
                        field: field.clone(),
                    },
                    ty,
                ))
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.check_expr(operand, None)?;
                let ok = match op {
                    UnaryOp::Neg => operand.ty.is_numeric(),
                    UnaryOp::Not => operand.ty == TypeDesc::Bool,
                };
                if !ok {
                    return Err(TypeError::BadOperand {
                        op: if *op == UnaryOp::Neg { "-" } else { "!" },
                        operand: operand.ty.to_string(),
                        span,
                    });
                }
                let ty = operand.ty.clone();
                Ok(typed(
                    IrKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                ))
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.check_expr(lhs, None)?;
                let rhs = self.check_expr(rhs, None)?;
                let ty = Self::binary_type(*op, &lhs.ty, &rhs.ty).ok_or_else(|| {
                    TypeError::BadOperands {
                        op: op.symbol(),
                        lhs: lhs.ty.to_string(),
                        rhs: rhs.ty.to_string(),
                        span,
                    }
                })?;
                Ok(typed(
                    IrKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                ))
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.check_expr(cond, Some(&TypeDesc::Bool))?;
                Self::expect_type(&TypeDesc::Bool, &cond.ty, cond.span)?;
                match else_branch {
                    Some(else_branch) => {
                        let then_ir = self.check_expr(then_branch, expected)?;
                        let else_ir = self.check_expr(else_branch, Some(&then_ir.ty))?;
                        Self::expect_type(&then_ir.ty, &else_ir.ty, else_branch.span())?;
                        let ty = then_ir.ty.clone();
                        Ok(typed(
                            IrKind::If {
                                cond: Box::new(cond),
                                then_branch: Box::new(then_ir),
                                else_branch: Some(Box::new(else_ir)),
                            },
                            ty,
                        ))
                    }
                    None => {
                        let then_ir = self.check_expr(then_branch, None)?;
                        Ok(typed(
                            IrKind::If {
                                cond: Box::new(cond),
                                then_branch: Box::new(then_ir),
                                else_branch: None,
                            },
                            TypeDesc::Unit,
                        ))
                    }
                }
            }
            Expr::Block(stmts, _) => {
                self.scopes.push(Vec::new());
                let result = self.check_block(stmts, expected);
                self.scopes.pop();
                let (stmts, ty) = result?;
                Ok(typed(IrKind::Block(stmts), ty))
            }
            Expr::Cast { expr, ty, .. } => {
                let target = self.resolve_type(ty)?;
                let inner = self.check_expr(expr, Some(&target))?;
                if inner.ty == target {
                    Ok(inner)
                } else if inner.ty == TypeDesc::Int && target == TypeDesc::Float {
                    Ok(typed(IrKind::Widen(Box::new(inner)), TypeDesc::Float))
                } else {
                    Err(TypeError::BadCast {
                        from: inner.ty.to_string(),
                        to: target.to_string(),
                        span,
                    })
                }
            }
        }
    }

    fn check_list(
        &mut self,
        items: &[Expr],
        expected: Option<&TypeDesc>,
        span: Span,
    ) -> Result<IrExpr, TypeError> {
        let expected_element = match expected {
            Some(TypeDesc::List { element }) if !element.is_generic() => Some((**element).clone()),
            _ => None,
        };
        if items.is_empty() {
            let Some(element) = expected_element else {
                return Err(TypeError::EmptyList { span });
            };
            return Ok(IrExpr {
                kind: IrKind::List(Vec::new()),
                ty: TypeDesc::list(element),
                span,
            });
        }
        let mut ir_items = Vec::with_capacity(items.len());
        let mut element: Option<TypeDesc> = expected_element;
        for item in items {
            let ir = self.check_expr(item, element.as_ref())?;
            match &element {
                Some(ty) => Self::expect_type(ty, &ir.ty, ir.span)?,
                None => element = Some(ir.ty.clone()),
            }
            ir_items.push(ir);
        }
        Ok(IrExpr {
            kind: IrKind::List(ir_items),
            ty: TypeDesc::list(element.unwrap_or(TypeDesc::Unit)),
            span,
        })
    }

    fn check_block(
        &mut self,
        stmts: &[Stmt],
        expected: Option<&TypeDesc>,
    ) -> Result<(Vec<IrStmt>, TypeDesc), TypeError> {
        let mut out = Vec::with_capacity(stmts.len());
        let mut ty = TypeDesc::Unit;
        for (idx, stmt) in stmts.iter().enumerate() {
            let is_last = idx + 1 == stmts.len();
            match stmt {
                Stmt::Let(decl) => {
                    let (decl_ty, init) = self.check_let(decl)?;
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.push((decl.name.clone(), decl_ty));
                    }
                    out.push(IrStmt::Let {
                        name: decl.name.clone(),
                        init,
                    });
                    ty = TypeDesc::Unit;
                }
                Stmt::Expr(expr) => {
                    let ir = self.check_expr(expr, if is_last { expected } else { None })?;
                    ty = ir.ty.clone();
                    out.push(IrStmt::Expr(ir));
                }
            }
        }
        Ok((out, ty))
    }

    fn check_name(&mut self, name: &str, span: Span) -> Result<IrExpr, TypeError> {
        if let Some(ty) = self.lookup_local(name) {
            return Ok(IrExpr {
                kind: IrKind::Local(name.to_string()),
                ty: ty.clone(),
                span,
            });
        }
        match self.lookup_global(name) {
            Some(GlobalRef {
                snippet,
                kind: DeclarationKind::Property { ty },
                ..
            }) => {
                self.note_dependency(snippet, name);
                Ok(IrExpr {
                    kind: IrKind::Global {
                        snippet,
                        name: name.to_string(),
                    },
                    ty,
                    span,
                })
            }
            Some(GlobalRef { kind, .. }) => Err(TypeError::NotAValue {
                name: name.to_string(),
                kind: kind.label(),
                span,
            }),
            None if self.current_fun.as_deref() == Some(name) => Err(TypeError::NotAValue {
                name: name.to_string(),
                kind: "function",
                span,
            }),
            None => Err(TypeError::Unresolved {
                name: name.to_string(),
                span,
            }),
        }
    }

    fn check_call(
        &mut self,
        callee: &str,
        origin: Option<SnippetId>,
        args: &[Expr],
        span: Span,
    ) -> Result<IrExpr, TypeError> {
        if let Some(origin) = origin {
            let Some(GlobalRef {
                snippet,
                namespace,
                kind: DeclarationKind::Class { fields },
            }) = self.class_at(callee, origin)
            else {
                return Err(TypeError::Unresolved {
                    name: format!("{}@{}", callee, origin),
                    span,
                });
            };
            return self.construct(callee, snippet, namespace, fields, args, span);
        }
        if self.lookup_local(callee).is_some() {
            return Err(TypeError::NotCallable {
                name: callee.to_string(),
                span,
            });
        }
        match self.lookup_global(callee) {
            Some(GlobalRef {
                snippet,
                kind: DeclarationKind::Function { signature },
                ..
            }) => {
                self.note_dependency(snippet, callee);
                let (args, ret) = self.check_args(callee, &signature, args, span)?;
                Ok(IrExpr {
                    kind: IrKind::Call {
                        snippet,
                        name: callee.to_string(),
                        args,
                    },
                    ty: ret,
                    span,
                })
            }
            Some(GlobalRef {
                snippet,
                namespace,
                kind: DeclarationKind::Class { fields },
            }) => self.construct(callee, snippet, namespace, fields, args, span),
            Some(GlobalRef {
                kind: DeclarationKind::Property { .. },
                ..
            }) => Err(TypeError::NotCallable {
                name: callee.to_string(),
                span,
            }),
            None => self.check_intrinsic(callee, args, span),
        }
    }

    fn construct(
        &mut self,
        class: &str,
        origin: SnippetId,
        namespace: Namespace,
        fields: Vec<Param>,
        args: &[Expr],
        span: Span,
    ) -> Result<IrExpr, TypeError> {
        let signature = FunctionSignature::new(fields.clone(), TypeDesc::Unit);
        let (args, _) = self.check_args(class, &signature, args, span)?;
        Ok(IrExpr {
            kind: IrKind::Construct {
                class: class.to_string(),
                origin,
                fields: fields.into_iter().map(|p| p.name).collect(),
                args,
            },
            ty: TypeDesc::Class {
                namespace,
                name: class.to_string(),
                origin,
            },
            span,
        })
    }

    fn check_intrinsic(
        &mut self,
        callee: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<IrExpr, TypeError> {
        let (op, ret) = match callee {
            "print" => (Intrinsic::Print, TypeDesc::Unit),
            "len" => (Intrinsic::Len, TypeDesc::Int),
            _ if self.current_fun.as_deref() == Some(callee) => {
                return Err(TypeError::RecursionNeedsType {
                    name: callee.to_string(),
                    span,
                })
            }
            _ => {
                return Err(TypeError::Unresolved {
                    name: callee.to_string(),
                    span,
                })
            }
        };
        if args.len() != 1 {
            return Err(TypeError::ArgCount {
                name: callee.to_string(),
                expected: 1,
                actual: args.len(),
                span,
            });
        }
        let arg = self.check_expr(&args[0], None)?;
        if matches!(op, Intrinsic::Len)
            && !matches!(arg.ty, TypeDesc::String | TypeDesc::List { .. })
        {
            return Err(TypeError::Mismatch {
                expected: "String or List".to_string(),
                actual: arg.ty.to_string(),
                span: arg.span,
            });
        }
        Ok(IrExpr {
            kind: IrKind::Intrinsic {
                op,
                args: vec![arg],
            },
            ty: ret,
            span,
        })
    }

    /// Check call arguments, inferring type parameters; returns the
    /// arguments and the instantiated return type.
    fn check_args(
        &mut self,
        name: &str,
        signature: &FunctionSignature,
        args: &[Expr],
        span: Span,
    ) -> Result<(Vec<IrExpr>, TypeDesc), TypeError> {
        if args.len() != signature.params.len() {
            return Err(TypeError::ArgCount {
                name: name.to_string(),
                expected: signature.params.len(),
                actual: args.len(),
                span,
            });
        }
        let mut subst: HashMap<String, TypeDesc> = HashMap::new();
        let mut ir_args = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&signature.params) {
            let hint = substitute(&param.ty, &subst);
            let hint = (!hint.is_generic() || self.in_scope_params(&hint)).then_some(hint);
            let ir = self.check_expr(arg, hint.as_ref())?;
            if !unify(&param.ty, &ir.ty, &mut subst) {
                return Err(TypeError::Mismatch {
                    expected: substitute(&param.ty, &subst).to_string(),
                    actual: ir.ty.to_string(),
                    span: ir.span,
                });
            }
            ir_args.push(ir);
        }
        for tp in &signature.type_params {
            let Some(actual) = subst.get(&tp.name) else {
                continue;
            };
            if let Some(bound) = &tp.bound {
                if actual != bound {
                    return Err(TypeError::BoundViolation {
                        param: tp.name.clone(),
                        bound: bound.to_string(),
                        actual: actual.to_string(),
                        span,
                    });
                }
            }
        }
        let ret = substitute(&signature.ret, &subst);
        if ret.is_generic() && !self.in_scope_params(&ret) {
            return Err(TypeError::UninferredParam {
                param: ret.to_string(),
                name: name.to_string(),
                span,
            });
        }
        Ok((ir_args, ret))
    }

    /// Whether every type parameter in `ty` belongs to the enclosing function.
    fn in_scope_params(&self, ty: &TypeDesc) -> bool {
        match ty {
            TypeDesc::Param { name } => self.type_params.iter().any(|tp| &tp.name == name),
            TypeDesc::List { element } => self.in_scope_params(element),
            _ => true,
        }
    }

    fn binary_type(op: BinOp, lhs: &TypeDesc, rhs: &TypeDesc) -> Option<TypeDesc> {
        match op {
            BinOp::Add if *lhs == TypeDesc::String => Some(TypeDesc::String),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                (lhs == rhs && lhs.is_numeric()).then(|| lhs.clone())
            }
            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
                (lhs == rhs && (lhs.is_numeric() || *lhs == TypeDesc::String))
                    .then_some(TypeDesc::Bool)
            }
            BinOp::Eq | BinOp::NotEq => (lhs == rhs).then_some(TypeDesc::Bool),
            BinOp::And | BinOp::Or => {
                (*lhs == TypeDesc::Bool && *rhs == TypeDesc::Bool).then_some(TypeDesc::Bool)
            }
        }
    }
}

/// Bind type parameters in `param` so it matches `arg`.
fn unify(param: &TypeDesc, arg: &TypeDesc, subst: &mut HashMap<String, TypeDesc>) -> bool {
    match (param, arg) {
        (TypeDesc::Param { name }, _) => match subst.get(name) {
            Some(bound) => bound == arg,
            None => {
                subst.insert(name.clone(), arg.clone());
                true
            }
        },
        (TypeDesc::List { element: p }, TypeDesc::List { element: a }) => unify(p, a, subst),
        _ => param == arg,
    }
}

fn substitute(ty: &TypeDesc, subst: &HashMap<String, TypeDesc>) -> TypeDesc {
    match ty {
        TypeDesc::Param { name } => subst.get(name).cloned().unwrap_or_else(|| ty.clone()),
        TypeDesc::List { element } => TypeDesc::list(substitute(element, subst)),
        other => other.clone(),
    }
}
