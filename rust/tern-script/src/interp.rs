//! Tree-walking interpreter over the checked IR.

use std::cmp::Ordering;
use std::io::Write;
use std::sync::Arc;

use tern_core::{Environment, Member, MemberKind, Object, SnippetId, Value};
use thiserror::Error;

use crate::ast::{BinOp, UnaryOp};
use crate::ir::{Intrinsic, IrExpr, IrFunction, IrItem, IrKind, IrStmt};
use crate::tokens::Span;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("division by zero at {span}")]
    DivisionByZero { span: Span },
    #[error("integer overflow in '{op}' at {span}")]
    Overflow { op: &'static str, span: Span },
    #[error("call depth limit of {limit} exceeded at {span}")]
    StackOverflow { limit: usize, span: Span },
    #[error("cannot write program output: {0}")]
    Output(#[from] std::io::Error),

    // Faults of the artifact rather than the program.
    #[error("'{name}' from line {snippet} is not bound")]
    Unbound { snippet: SnippetId, name: String },
    #[error("function entry of '{name}' has an unexpected payload")]
    BadEntry { name: String },
    #[error("malformed artifact: {0}")]
    Malformed(String),
}

impl RuntimeError {
    /// Whether the error is a fault of the compiled artifact (or the
    /// environment it runs against) instead of the user's program.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            RuntimeError::Unbound { .. }
                | RuntimeError::BadEntry { .. }
                | RuntimeError::Malformed(_)
        )
    }
}

pub struct Interpreter<'a> {
    env: &'a Environment,
    snippet: SnippetId,
    /// Members of the frame under construction.
    members: Vec<Member>,
    scopes: Vec<Vec<(String, Value)>>,
    depth: usize,
    max_depth: usize,
    out: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        env: &'a Environment,
        snippet: SnippetId,
        members: Vec<Member>,
        max_depth: usize,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            env,
            snippet,
            members,
            scopes: Vec::new(),
            depth: 0,
            max_depth,
            out,
        }
    }

    pub fn into_members(self) -> Vec<Member> {
        self.members
    }

    /// Run the snippet's items in order. Returns the value of the last item
    /// when it is an expression, `Unit` otherwise.
    pub fn run(&mut self, items: &[IrItem]) -> Result<Value, RuntimeError> {
        let mut last = Value::Unit;
        for item in items {
            last = Value::Unit;
            match item {
                IrItem::Let { name, ty, init } => {
                    let value = self.eval(init)?;
                    self.members.push(Member {
                        name: name.clone(),
                        declared_in: self.snippet,
                        kind: MemberKind::Property {
                            value,
                            ty: ty.clone(),
                        },
                    });
                }
                IrItem::Expr(expr) => last = self.eval(expr)?,
                IrItem::Fun(_) | IrItem::Class { .. } => {}
            }
        }
        Ok(last)
    }

    fn member(&self, snippet: SnippetId, name: &str) -> Result<&Member, RuntimeError> {
        let found = if snippet == self.snippet {
            self.members.iter().rev().find(|m| m.name == name)
        } else {
            self.env.lookup(snippet, name)
        };
        found.ok_or_else(|| RuntimeError::Unbound {
            snippet,
            name: name.to_string(),
        })
    }

    fn eval(&mut self, expr: &IrExpr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            IrKind::Lit(value) => Ok(value.clone()),
            IrKind::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            )),
            IrKind::Local(name) => self
                .scopes
                .iter()
                .rev()
                .flat_map(|scope| scope.iter().rev())
                .find(|(n, _)| n == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| RuntimeError::Malformed(format!("unknown local '{}'", name))),
            IrKind::Global { snippet, name } => match &self.member(*snippet, name)?.kind {
                MemberKind::Property { value, .. } => Ok(value.clone()),
                _ => Err(RuntimeError::Malformed(format!("'{}' is not a property", name))),
            },
            IrKind::Call {
                snippet,
                name,
                args,
            } => {
                let function = self.function(*snippet, name)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&function, args, expr.span)
            }
            IrKind::Construct {
                class,
                origin,
                fields,
                args,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for (field, arg) in fields.iter().zip(args) {
                    values.push((field.clone(), self.eval(arg)?));
                }
                Ok(Value::Object(Arc::new(Object {
                    class: class.clone(),
                    origin: *origin,
                    fields: values,
                })))
            }
            IrKind::Intrinsic { op, args } => {
                let Some(arg) = args.first() else {
                    return Err(RuntimeError::Malformed("intrinsic without argument".into()));
                };
                let value = self.eval(arg)?;
                match op {
                    Intrinsic::Print => {
                        match &value {
                            Value::Str(s) => writeln!(self.out, "{}", s)?,
                            other => writeln!(self.out, "{}", other)?,
                        }
                        Ok(Value::Unit)
                    }
                    Intrinsic::Len => match value {
                        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                        Value::List(items) => Ok(Value::Int(items.len() as i64)),
                        other => Err(RuntimeError::Malformed(format!("len of {}", other))),
                    },
                }
            }
            IrKind::Field { target, field } => match self.eval(target)? {
                Value::Object(obj) => obj
                    .field(field)
                    .cloned()
                    .ok_or_else(|| RuntimeError::Malformed(format!("no field '{}'", field))),
                other => Err(RuntimeError::Malformed(format!(
                    "field '{}' of non-object {}",
                    field, other
                ))),
            },
            IrKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(n)) => {
                        n.checked_neg().map(Value::Int).ok_or(RuntimeError::Overflow {
                            op: "-",
                            span: expr.span,
                        })
                    }
                    (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (_, other) => Err(RuntimeError::Malformed(format!("bad operand {}", other))),
                }
            }
            IrKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, &lhs) {
                    (BinOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
                    (BinOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
                    _ => {}
                }
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs, expr.span)
            }
            IrKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let taken = match self.eval(cond)? {
                    Value::Bool(b) => b,
                    other => {
                        return Err(RuntimeError::Malformed(format!(
                            "non-boolean condition {}",
                            other
                        )))
                    }
                };
                match (taken, else_branch) {
                    (true, Some(_)) => self.eval(then_branch),
                    (true, None) => self.eval(then_branch).map(|_| Value::Unit),
                    (false, Some(else_branch)) => self.eval(else_branch),
                    (false, None) => Ok(Value::Unit),
                }
            }
            IrKind::Block(stmts) => {
                self.scopes.push(Vec::new());
                let result = self.block(stmts);
                self.scopes.pop();
                result
            }
            IrKind::Widen(inner) => match self.eval(inner)? {
                Value::Int(n) => Ok(Value::Float(n as f64)),
                other => Err(RuntimeError::Malformed(format!("cannot widen {}", other))),
            },
        }
    }

    fn block(&mut self, stmts: &[IrStmt]) -> Result<Value, RuntimeError> {
        let mut last = Value::Unit;
        for stmt in stmts {
            match stmt {
                IrStmt::Let { name, init } => {
                    let value = self.eval(init)?;
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.push((name.clone(), value));
                    }
                    last = Value::Unit;
                }
                IrStmt::Expr(expr) => last = self.eval(expr)?,
            }
        }
        Ok(last)
    }

    fn function(&self, snippet: SnippetId, name: &str) -> Result<Arc<IrFunction>, RuntimeError> {
        match &self.member(snippet, name)?.kind {
            MemberKind::Function { entry, .. } => {
                entry
                    .clone()
                    .downcast::<IrFunction>()
                    .map_err(|_| RuntimeError::BadEntry {
                        name: name.to_string(),
                    })
            }
            _ => Err(RuntimeError::Malformed(format!("'{}' is not a function", name))),
        }
    }

    fn call(
        &mut self,
        function: &IrFunction,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= self.max_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.max_depth,
                span,
            });
        }
        let locals = function
            .signature
            .params
            .iter()
            .map(|p| p.name.clone())
            .zip(args)
            .collect();
        let saved = std::mem::replace(&mut self.scopes, vec![locals]);
        self.depth += 1;
        let result = self.eval(&function.body);
        self.depth -= 1;
        self.scopes = saved;
        result
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value, span: Span) -> Result<Value, RuntimeError> {
    let overflow = || RuntimeError::Overflow {
        op: op.symbol(),
        span,
    };
    match (op, lhs, rhs) {
        (BinOp::Eq, l, r) => Ok(Value::Bool(l == r)),
        (BinOp::NotEq, l, r) => Ok(Value::Bool(l != r)),
        (BinOp::And | BinOp::Or, _, Value::Bool(r)) => Ok(Value::Bool(r)),
        (BinOp::Add, Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
        (BinOp::Add, Value::Str(l), r) => Ok(Value::Str(format!("{}{}", l, r))),
        (BinOp::Div | BinOp::Rem, Value::Int(_), Value::Int(0)) => {
            Err(RuntimeError::DivisionByZero { span })
        }
        (op, Value::Int(l), Value::Int(r)) => match op {
            BinOp::Add => l.checked_add(r).map(Value::Int).ok_or_else(overflow),
            BinOp::Sub => l.checked_sub(r).map(Value::Int).ok_or_else(overflow),
            BinOp::Mul => l.checked_mul(r).map(Value::Int).ok_or_else(overflow),
            BinOp::Div => l.checked_div(r).map(Value::Int).ok_or_else(overflow),
            BinOp::Rem => l.checked_rem(r).map(Value::Int).ok_or_else(overflow),
            _ => compare(op, l.cmp(&r)),
        },
        (op, Value::Float(l), Value::Float(r)) => match op {
            BinOp::Add => Ok(Value::Float(l + r)),
            BinOp::Sub => Ok(Value::Float(l - r)),
            BinOp::Mul => Ok(Value::Float(l * r)),
            BinOp::Div => Ok(Value::Float(l / r)),
            BinOp::Rem => Ok(Value::Float(l % r)),
            // NaN compares false against everything.
            _ => match l.partial_cmp(&r) {
                Some(ordering) => compare(op, ordering),
                None => Ok(Value::Bool(false)),
            },
        },
        (op, Value::Str(l), Value::Str(r)) => compare(op, l.cmp(&r)),
        (op, l, r) => Err(RuntimeError::Malformed(format!(
            "operator '{}' on {} and {}",
            op.symbol(),
            l,
            r
        ))),
    }
}

fn compare(op: BinOp, ordering: Ordering) -> Result<Value, RuntimeError> {
    let result = match op {
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::LtEq => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::GtEq => ordering != Ordering::Less,
        other => {
            return Err(RuntimeError::Malformed(format!(
                "'{}' is not a comparison",
                other.symbol()
            )))
        }
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_by_zero_is_an_error() {
        let err = binary(BinOp::Div, Value::Int(1), Value::Int(0), Span::new(1, 3)).unwrap_err();
        assert_eq!(err.to_string(), "division by zero at line 1, col 3");
        assert!(!err.is_internal());
    }

    #[test]
    fn float_division_follows_ieee() {
        let v = binary(BinOp::Div, Value::Float(1.0), Value::Float(0.0), Span::default()).unwrap();
        assert_eq!(v, Value::Float(f64::INFINITY));
    }

    #[test]
    fn string_concatenation_renders_rhs() {
        let v = binary(BinOp::Add, Value::Str("n=".into()), Value::Int(4), Span::default())
            .unwrap();
        assert_eq!(v, Value::Str("n=4".into()));
    }

    #[test]
    fn overflow_is_reported() {
        let err = binary(BinOp::Add, Value::Int(i64::MAX), Value::Int(1), Span::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow { op: "+", .. }));
    }
}
