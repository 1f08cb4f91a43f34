//! Recursive descent parser with precedence climbing for tern script.

use tern_core::{SnippetId, Variance};
use thiserror::Error;

use crate::ast::*;
use crate::tokens::{Span, Token, TokenKind};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected {found} at line {line}, col {col}; expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        line: usize,
        col: usize,
    },
    /// Input ended while a construct was still open.
    #[error("unexpected end of input; expected {expected}")]
    UnexpectedEof { expected: String, line: usize, col: usize },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Unexpected { line, col, .. }
            | ParseError::UnexpectedEof { line, col, .. } => Span::new(*line, *col),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, ParseError::UnexpectedEof { .. })
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn error(&self, expected: &str) -> ParseError {
        let tok = self.current();
        if tok.kind == TokenKind::Eof {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
                line: tok.span.line,
                col: tok.span.col,
            }
        } else {
            ParseError::Unexpected {
                found: tok.kind.to_string(),
                expected: expected.to_string(),
                line: tok.span.line,
                col: tok.span.col,
            }
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(&kind.to_string()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(self.error(what)),
        }
    }

    /// Optional `@N` after a class name.
    fn parse_origin(&mut self) -> Result<Option<SnippetId>, ParseError> {
        if !self.at(&TokenKind::At) {
            return Ok(None);
        }
        self.advance();
        match self.peek_kind().clone() {
            TokenKind::IntLit(n) if n > 0 => {
                self.advance();
                Ok(Some(SnippetId(n as u64)))
            }
            _ => Err(self.error("line number")),
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Kind of the first token after any newlines, without consuming.
    fn peek_past_newlines(&self) -> &TokenKind {
        let mut idx = self.pos;
        while let Some(tok) = self.tokens.get(idx) {
            if tok.kind != TokenKind::Newline {
                return &tok.kind;
            }
            idx += 1;
        }
        &TokenKind::Eof
    }

    // ── Items ──

    pub fn parse_snippet(&mut self) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        self.skip_separators();
        while !self.at(&TokenKind::Eof) {
            items.push(self.parse_item()?);
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semicolon => self.skip_separators(),
                TokenKind::Eof => break,
                _ => return Err(self.error("newline or ';' between items")),
            }
        }
        Ok(items)
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        match self.peek_kind() {
            TokenKind::Package => self.parse_package(),
            TokenKind::Let => Ok(Item::Let(self.parse_let()?)),
            TokenKind::Fun => Ok(Item::Fun(self.parse_fun()?)),
            TokenKind::Class => Ok(Item::Class(self.parse_class()?)),
            _ => Ok(Item::Expr(self.parse_expr()?)),
        }
    }

    fn parse_package(&mut self) -> Result<Item, ParseError> {
        let span = self.expect(&TokenKind::Package)?.span;
        let (first, _) = self.expect_ident("package name")?;
        let mut path = first;
        while self.at(&TokenKind::Dot) {
            self.advance();
            let (part, _) = self.expect_ident("package name segment")?;
            path.push('.');
            path.push_str(&part);
        }
        Ok(Item::Package { path, span })
    }

    fn parse_let(&mut self) -> Result<LetDecl, ParseError> {
        let span = self.expect(&TokenKind::Let)?.span;
        let (name, _) = self.expect_ident("binding name")?;
        let ty = if self.at(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&TokenKind::Assign)?;
        self.skip_newlines();
        let init = self.parse_expr()?;
        Ok(LetDecl {
            name,
            ty,
            init,
            span,
        })
    }

    fn parse_fun(&mut self) -> Result<FunDecl, ParseError> {
        let span = self.expect(&TokenKind::Fun)?.span;
        let type_params = if self.at(&TokenKind::Lt) {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        let (name, _) = self.expect_ident("function name")?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params(&TokenKind::RParen)?;
        let ret = if self.at(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = if self.at(&TokenKind::LBrace) {
            self.parse_block()?
        } else {
            self.expect(&TokenKind::Assign)?;
            self.skip_newlines();
            self.parse_expr()?
        };
        Ok(FunDecl {
            name,
            type_params,
            params,
            ret,
            body,
            span,
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParamDecl>, ParseError> {
        self.expect(&TokenKind::Lt)?;
        let mut out = Vec::new();
        loop {
            let variance = match self.peek_kind() {
                TokenKind::In => {
                    self.advance();
                    Variance::In
                }
                TokenKind::Out => {
                    self.advance();
                    Variance::Out
                }
                _ => Variance::Invariant,
            };
            let (name, span) = self.expect_ident("type parameter")?;
            let bound = if self.at(&TokenKind::Colon) {
                self.advance();
                Some(self.parse_type()?)
            } else {
                None
            };
            out.push(TypeParamDecl {
                name,
                variance,
                bound,
                span,
            });
            if self.at(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(&TokenKind::Gt)?;
            return Ok(out);
        }
    }

    /// Parameters up to and including `close`.
    fn parse_params(&mut self, close: &TokenKind) -> Result<Vec<ParamDecl>, ParseError> {
        let mut params = Vec::new();
        while !self.at(close) {
            let (name, span) = self.expect_ident("parameter name")?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(ParamDecl { name, ty, span });
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else if !self.at(close) {
                return Err(self.error(&format!("',' or {}", close)));
            }
        }
        self.expect(close)?;
        Ok(params)
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        let span = self.expect(&TokenKind::Class)?.span;
        let (name, _) = self.expect_ident("class name")?;
        let fields = if self.at(&TokenKind::LParen) {
            self.advance();
            self.parse_params(&TokenKind::RParen)?
        } else {
            Vec::new()
        };
        Ok(ClassDecl { name, fields, span })
    }

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let (name, span) = self.expect_ident("type name")?;
        if name == "List" && self.at(&TokenKind::Lt) {
            self.advance();
            let element = self.parse_type()?;
            self.expect(&TokenKind::Gt)?;
            return Ok(TypeExpr::List {
                element: Box::new(element),
                span,
            });
        }
        let origin = self.parse_origin()?;
        Ok(TypeExpr::Named { name, origin, span })
    }

    // ── Expressions ──

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(0)
    }

    fn binary_op(kind: &TokenKind) -> Option<(BinOp, u8)> {
        Some(match kind {
            TokenKind::OrOr => (BinOp::Or, 1),
            TokenKind::AndAnd => (BinOp::And, 2),
            TokenKind::EqEq => (BinOp::Eq, 3),
            TokenKind::NotEq => (BinOp::NotEq, 3),
            TokenKind::Lt => (BinOp::Lt, 4),
            TokenKind::LtEq => (BinOp::LtEq, 4),
            TokenKind::Gt => (BinOp::Gt, 4),
            TokenKind::GtEq => (BinOp::GtEq, 4),
            TokenKind::Plus => (BinOp::Add, 5),
            TokenKind::Minus => (BinOp::Sub, 5),
            TokenKind::Star => (BinOp::Mul, 6),
            TokenKind::Slash => (BinOp::Div, 6),
            TokenKind::Percent => (BinOp::Rem, 6),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_cast()?;
        while let Some((op, prec)) = Self::binary_op(self.peek_kind()) {
            if prec <= min_prec {
                break;
            }
            let span = self.advance().span;
            self.skip_newlines();
            let rhs = self.parse_binary(prec)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        while self.at(&TokenKind::As) {
            let span = self.advance().span;
            let ty = self.parse_type()?;
            expr = Expr::Cast {
                expr: Box::new(expr),
                ty,
                span,
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let span = self.advance().span;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        while self.at(&TokenKind::Dot) {
            let span = self.advance().span;
            let (field, _) = self.expect_ident("field name")?;
            expr = Expr::Field {
                target: Box::new(expr),
                field,
                span,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Expr::Int(n, tok.span))
            }
            TokenKind::FloatLit(x) => {
                self.advance();
                Ok(Expr::Float(x, tok.span))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::Str(s, tok.span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true, tok.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false, tok.span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                let origin = self.parse_origin()?;
                if origin.is_some() || self.at(&TokenKind::LParen) {
                    self.expect(&TokenKind::LParen)?;
                    let args = self.parse_args(&TokenKind::RParen)?;
                    Ok(Expr::Call {
                        callee: name,
                        origin,
                        args,
                        span: tok.span,
                    })
                } else {
                    Ok(Expr::Name(name, tok.span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_args(&TokenKind::RBracket)?;
                Ok(Expr::List(items, tok.span))
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_args(&mut self, close: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.at(close) {
            args.push(self.parse_expr()?);
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else if !self.at(close) {
                return Err(self.error(&format!("',' or {}", close)));
            }
        }
        self.expect(close)?;
        Ok(args)
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let span = self.expect(&TokenKind::If)?.span;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        self.skip_newlines();
        let then_branch = self.parse_expr()?;
        let else_branch = if *self.peek_past_newlines() == TokenKind::Else {
            self.skip_newlines();
            self.advance();
            self.skip_newlines();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
            span,
        })
    }

    fn parse_block(&mut self) -> Result<Expr, ParseError> {
        let span = self.expect(&TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at(&TokenKind::RBrace) {
            let stmt = if self.at(&TokenKind::Let) {
                Stmt::Let(self.parse_let()?)
            } else {
                Stmt::Expr(self.parse_expr()?)
            };
            stmts.push(stmt);
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semicolon => self.skip_separators(),
                TokenKind::RBrace => {}
                _ => return Err(self.error("newline, ';' or '}'")),
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Block(stmts, span))
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Vec<Item>, ParseError> {
    Parser::new(tokens).parse_snippet()
}
