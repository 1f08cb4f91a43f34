//! Lexer for tern script.
//!
//! Newlines are significant item separators, except inside `(...)` and
//! `[...]` where they are skipped. `//` starts a line comment.

use crate::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("string starting at line {line}, col {col} runs into a newline")]
    NewlineInString { line: usize, col: usize },
    #[error("invalid number '{text}' at line {line}, col {col}")]
    InvalidNumber { text: String, line: usize, col: usize },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { line, col, .. }
            | LexError::UnterminatedString { line, col }
            | LexError::NewlineInString { line, col }
            | LexError::InvalidNumber { line, col, .. } => Span::new(*line, *col),
        }
    }
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    /// Open `(` and `[` count; newlines inside them are not separators.
    nesting: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            nesting: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn here(&self) -> Span {
        Span::new(self.line, self.col)
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.current() {
            let span = self.here();
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    let redundant = matches!(
                        tokens.last(),
                        None | Some(Token {
                            kind: TokenKind::Newline,
                            ..
                        })
                    );
                    if self.nesting == 0 && !redundant {
                        tokens.push(Token::new(TokenKind::Newline, span));
                    }
                }
                '/' if self.peek() == Some('/') => {
                    while !matches!(self.current(), None | Some('\n')) {
                        self.advance();
                    }
                }
                '"' => tokens.push(self.read_string()?),
                c if c.is_ascii_digit() => tokens.push(self.read_number()?),
                c if c.is_alphabetic() || c == '_' => tokens.push(self.read_word()),
                _ => tokens.push(self.read_symbol()?),
            }
        }
        tokens.push(Token::new(TokenKind::Eof, self.here()));
        Ok(tokens)
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let span = self.here();
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.current() {
                None => {
                    return Err(LexError::UnterminatedString {
                        line: span.line,
                        col: span.col,
                    })
                }
                Some('\n') => {
                    return Err(LexError::NewlineInString {
                        line: span.line,
                        col: span.col,
                    })
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some('\\') => s.push('\\'),
                        Some('"') => s.push('"'),
                        Some(c) => {
                            s.push('\\');
                            s.push(c);
                        }
                        None => {
                            return Err(LexError::UnterminatedString {
                                line: span.line,
                                col: span.col,
                            })
                        }
                    }
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::StringLit(s), span))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let span = self.here();
        let mut text = String::new();
        let mut is_float = false;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    text.push(c);
                }
                self.advance();
            } else if c == '.' && !is_float && self.peek().is_some_and(|n| n.is_ascii_digit()) {
                is_float = true;
                text.push(c);
                self.advance();
            } else if (c == 'e' || c == 'E')
                && self
                    .peek()
                    .is_some_and(|n| n.is_ascii_digit() || n == '-' || n == '+')
            {
                is_float = true;
                text.push(c);
                self.advance();
                if let Some(sign) = self.current().filter(|s| *s == '-' || *s == '+') {
                    text.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }
        let invalid = |text: String| LexError::InvalidNumber {
            text,
            line: span.line,
            col: span.col,
        };
        let kind = if is_float {
            TokenKind::FloatLit(text.parse().map_err(|_| invalid(text.clone()))?)
        } else {
            TokenKind::IntLit(text.parse().map_err(|_| invalid(text.clone()))?)
        };
        Ok(Token::new(kind, span))
    }

    fn read_word(&mut self) -> Token {
        let span = self.here();
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
        Token::new(kind, span)
    }

    fn read_symbol(&mut self) -> Result<Token, LexError> {
        let span = self.here();
        let ch = self.advance().unwrap_or('\0');
        let next = self.current();
        let two = |lexer: &mut Lexer, kind: TokenKind| {
            lexer.advance();
            kind
        };
        let kind = match (ch, next) {
            ('=', Some('=')) => two(self, TokenKind::EqEq),
            ('!', Some('=')) => two(self, TokenKind::NotEq),
            ('<', Some('=')) => two(self, TokenKind::LtEq),
            ('>', Some('=')) => two(self, TokenKind::GtEq),
            ('&', Some('&')) => two(self, TokenKind::AndAnd),
            ('|', Some('|')) => two(self, TokenKind::OrOr),
            ('=', _) => TokenKind::Assign,
            ('!', _) => TokenKind::Bang,
            ('<', _) => TokenKind::Lt,
            ('>', _) => TokenKind::Gt,
            ('+', _) => TokenKind::Plus,
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            (',', _) => TokenKind::Comma,
            (':', _) => TokenKind::Colon,
            (';', _) => TokenKind::Semicolon,
            ('.', _) => TokenKind::Dot,
            ('@', _) => TokenKind::At,
            ('{', _) => TokenKind::LBrace,
            ('}', _) => TokenKind::RBrace,
            ('(', _) => {
                self.nesting += 1;
                TokenKind::LParen
            }
            (')', _) => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::RParen
            }
            ('[', _) => {
                self.nesting += 1;
                TokenKind::LBracket
            }
            (']', _) => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::RBracket
            }
            (c, _) => {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    line: span.line,
                    col: span.col,
                })
            }
        };
        Ok(Token::new(kind, span))
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_let_binding() {
        assert_eq!(
            kinds("let x = 42"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Assign,
                TokenKind::IntLit(42),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn newlines_inside_parens_are_skipped() {
        let toks = kinds("f(1,\n2)\nx");
        assert_eq!(toks.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn floats_with_exponent() {
        assert_eq!(kinds("1e300")[0], TokenKind::FloatLit(1e300));
        assert_eq!(kinds("2.5E-3")[0], TokenKind::FloatLit(2.5e-3));
        assert_eq!(kinds("3.0")[0], TokenKind::FloatLit(3.0));
    }

    #[test]
    fn member_access_on_int_is_not_a_float() {
        assert_eq!(
            kinds("1.x")[..3],
            [
                TokenKind::IntLit(1),
                TokenKind::Dot,
                TokenKind::Ident("x".into())
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        assert!(matches!(
            tokenize("\"abc"),
            Err(LexError::UnterminatedString { line: 1, col: 1 })
        ));
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(
            kinds("1 // one\n"),
            vec![TokenKind::IntLit(1), TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn out_of_range_integer_is_invalid() {
        assert!(matches!(
            tokenize("9223372036854775808"),
            Err(LexError::InvalidNumber { .. })
        ));
    }
}
