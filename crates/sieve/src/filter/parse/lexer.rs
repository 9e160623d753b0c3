//! Filter lexer.
//!
//! Splits filter text into tokens with byte spans.

use crate::{
    error::{FilterError, Span},
    filter::RelOp,
};
use std::{fmt, iter::Peekable, str::CharIndices};

///
/// TokenKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum TokenKind<'a> {
    Ident(&'a str),
    Dot,
    LParen,
    RParen,
    And,
    Or,
    Not,
    Param,
    Op(RelOp),
    Eof,
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "'{name}'"),
            Self::Dot => f.write_str("'.'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::And => f.write_str("'&'"),
            Self::Or => f.write_str("'|'"),
            Self::Not => f.write_str("'!'"),
            Self::Param => f.write_str("'?'"),
            Self::Op(op) => write!(f, "'{op}'"),
            Self::Eof => f.write_str("end of filter"),
        }
    }
}

///
/// Token
///

#[derive(Clone, Copy, Debug)]
pub(super) struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

///
/// Lexer
///

pub(super) struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`.
    pub(super) fn tokenize(mut self) -> Result<Vec<Token<'a>>, FilterError> {
        while let Some((start, c)) = self.chars.next() {
            let kind = match c {
                c if c.is_whitespace() => continue,
                '.' => TokenKind::Dot,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '&' => TokenKind::And,
                '|' => TokenKind::Or,
                '?' => TokenKind::Param,
                '=' => TokenKind::Op(RelOp::Eq),
                '!' => {
                    if self.eat('=') {
                        TokenKind::Op(RelOp::Ne)
                    } else {
                        TokenKind::Not
                    }
                }
                '<' => {
                    if self.eat('=') {
                        TokenKind::Op(RelOp::Le)
                    } else {
                        TokenKind::Op(RelOp::Lt)
                    }
                }
                '>' => {
                    if self.eat('=') {
                        TokenKind::Op(RelOp::Ge)
                    } else {
                        TokenKind::Op(RelOp::Gt)
                    }
                }
                c if is_ident_start(c) => {
                    let input = self.input;
                    let end = self.scan_ident(start);
                    self.push(TokenKind::Ident(&input[start..end]), start, end);
                    continue;
                }
                other => {
                    return Err(FilterError::malformed(
                        format!("unexpected character '{other}'"),
                        Span::new(start, start + other.len_utf8()),
                        self.input,
                    ));
                }
            };

            let end = self.offset();
            self.push(kind, start, end);
        }

        let end = self.input.len();
        self.push(TokenKind::Eof, end, end);

        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind<'a>, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if(|&(_, c)| c == expected).is_some()
    }

    fn scan_ident(&mut self, start: usize) -> usize {
        let mut end = start + 1;
        while let Some((i, c)) = self.chars.next_if(|&(_, c)| is_ident_continue(c)) {
            end = i + c.len_utf8();
        }
        end
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

///
/// TESTS
///
