//! Filter parser.
//!
//! Recursive descent over the filter grammar:
//!
//! ```text
//! filter  := and ('|' and)*
//! and     := not ('&' not)*
//! not     := '!' not | primary
//! primary := '(' filter ')' | chain op '?' | chain '(' [filter] ')'
//! chain   := segment ('.' segment)*
//! segment := ident | '(' ident ')'
//! ```
//!
//! A parenthesized single identifier is always a chain segment marking an
//! outer join; it can never be a valid grouped filter.
//!
//! `!`, grouping, and existence sub-filters each recurse, so their nesting
//! is capped at the configured filter depth.

mod lexer;

#[cfg(test)]
mod tests;

use crate::{
    error::{FilterError, Span},
    filter::{
        chain::{ChainUsage, ChainedProperty, ResolvedChain, Segment, resolve_chain},
        context::FilterContext,
        node::{ExistsFilter, Filter, FilterNode, Operand, PropertyFilter},
    },
    model::EntityRef,
};
use lexer::{Lexer, Token, TokenKind};

///
/// Parser
///

pub(crate) struct Parser<'a> {
    ctx: &'a FilterContext,
    text: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(ctx: &'a FilterContext, text: &'a str) -> Result<Self, FilterError> {
        let tokens = Lexer::new(text).tokenize()?;

        Ok(Self {
            ctx,
            text,
            tokens,
            pos: 0,
            nesting: 0,
        })
    }

    /// The token sequence as single-spaced text; equal for inputs that only
    /// differ in whitespace.
    pub(crate) fn token_text(&self) -> String {
        self.tokens
            .iter()
            .filter(|token| token.kind != TokenKind::Eof)
            .map(|token| &self.text[token.span.range()])
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse a complete filter over `entity`.
    pub(crate) fn parse_filter(mut self, entity: &EntityRef) -> Result<Filter, FilterError> {
        let filter = self.parse_or(entity)?;
        self.expect_end()?;

        Ok(filter)
    }

    /// Parse a complete standalone chain; any final hop is accepted.
    pub(crate) fn parse_standalone_chain(
        self,
        entity: &EntityRef,
    ) -> Result<ChainedProperty, FilterError> {
        Ok(self.parse_chain_for(entity, ChainUsage::Any)?.chain)
    }

    /// Parse a complete chain whose final hop must suit `usage`.
    pub(crate) fn parse_chain_for(
        mut self,
        entity: &EntityRef,
        usage: ChainUsage,
    ) -> Result<ResolvedChain, FilterError> {
        let segments = self.parse_segments()?;
        self.expect_end()?;

        resolve_chain(self.ctx.schema(), entity, &segments, usage, self.text)
    }

    ///
    /// GRAMMAR
    ///

    fn parse_or(&mut self, entity: &EntityRef) -> Result<Filter, FilterError> {
        let mut filter = self.parse_and(entity)?;

        while self.peek().kind == TokenKind::Or {
            self.advance();
            let right = self.parse_and(entity)?;
            filter = self.ctx.or_unchecked(&filter, &right)?;
        }

        Ok(filter)
    }

    fn parse_and(&mut self, entity: &EntityRef) -> Result<Filter, FilterError> {
        let mut filter = self.parse_not(entity)?;

        while self.peek().kind == TokenKind::And {
            self.advance();
            let right = self.parse_not(entity)?;
            filter = self.ctx.and_unchecked(&filter, &right)?;
        }

        Ok(filter)
    }

    fn parse_not(&mut self, entity: &EntityRef) -> Result<Filter, FilterError> {
        if self.peek().kind == TokenKind::Not {
            self.advance();
            self.descend()?;
            let inner = self.parse_not(entity)?;
            self.nesting -= 1;

            return Ok(self.ctx.not(&inner));
        }

        self.parse_primary(entity)
    }

    fn parse_primary(&mut self, entity: &EntityRef) -> Result<Filter, FilterError> {
        let token = self.peek();

        match token.kind {
            TokenKind::LParen if self.at_outer_segment() => self.parse_entity_filter(entity),
            TokenKind::LParen => {
                self.advance();
                self.descend()?;
                let filter = self.parse_or(entity)?;
                self.nesting -= 1;
                if self.peek().kind != TokenKind::RParen {
                    return Err(self.error(
                        "unbalanced parentheses: missing ')'",
                        token.span.merge(self.peek().span),
                    ));
                }
                self.advance();

                Ok(filter)
            }
            TokenKind::Ident(_) => self.parse_entity_filter(entity),
            other => Err(self.error(
                format!("unexpected {other}; expected a property or '('"),
                token.span,
            )),
        }
    }

    /// Comparison or existence test rooted at a property chain.
    fn parse_entity_filter(&mut self, entity: &EntityRef) -> Result<Filter, FilterError> {
        let segments = self.parse_segments()?;
        let chain_span = segments_span(&segments);
        let next = self.peek();

        match next.kind {
            TokenKind::Op(op) => {
                self.advance();
                let param = self.peek();
                if param.kind != TokenKind::Param {
                    return Err(self.error(
                        format!("expected '?' after '{op}', found {}", param.kind),
                        param.span,
                    ));
                }
                self.advance();

                let resolved = self.resolve(entity, &segments, ChainUsage::Comparison)?;

                Ok(self.ctx.intern(
                    entity,
                    FilterNode::Property(PropertyFilter {
                        chain: resolved.chain,
                        op,
                        operand: Operand::Unbound,
                    }),
                ))
            }
            TokenKind::LParen => {
                let resolved = self.resolve(entity, &segments, ChainUsage::Exists)?;
                let Some(target) = resolved.target else {
                    return Err(self.error("existence test requires a relation", chain_span));
                };
                self.advance();

                let sub = match self.peek().kind {
                    TokenKind::RParen => self.ctx.open(&target),
                    TokenKind::Eof => {
                        return Err(self.error(
                            "unterminated existence test: missing ')'",
                            next.span.merge(self.peek().span),
                        ));
                    }
                    _ => {
                        self.descend()?;
                        let sub = self.parse_or(&target)?;
                        self.nesting -= 1;
                        sub
                    }
                };

                if self.peek().kind != TokenKind::RParen {
                    return Err(self.error(
                        "unterminated existence test: missing ')'",
                        next.span.merge(self.peek().span),
                    ));
                }
                self.advance();

                self.ctx.intern_exists(
                    entity,
                    ExistsFilter {
                        chain: resolved.chain,
                        sub,
                        negated: false,
                    },
                )
            }
            _ => {
                // Resolve first so a one-to-many chain reports the missing
                // existence test rather than a missing operator.
                self.resolve(entity, &segments, ChainUsage::Comparison)?;

                Err(self.error(
                    format!("expected a relational operator, found {}", next.kind),
                    next.span,
                ))
            }
        }
    }

    fn parse_segments(&mut self) -> Result<Vec<Segment<'a>>, FilterError> {
        let mut segments = Vec::new();

        loop {
            segments.push(self.parse_segment()?);

            if self.peek().kind != TokenKind::Dot {
                return Ok(segments);
            }
            self.advance();
        }
    }

    fn parse_segment(&mut self) -> Result<Segment<'a>, FilterError> {
        let token = self.peek();

        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();

                Ok(Segment {
                    name,
                    outer: false,
                    span: token.span,
                })
            }
            TokenKind::LParen if self.at_outer_segment() => {
                self.advance();
                let ident = self.advance();
                self.advance();

                let TokenKind::Ident(name) = ident.kind else {
                    return Err(self.error("expected a property name", ident.span));
                };

                Ok(Segment {
                    name,
                    outer: true,
                    span: ident.span,
                })
            }
            other => Err(self.error(
                format!("expected a property name, found {other}"),
                token.span,
            )),
        }
    }

    ///
    /// HELPERS
    ///

    /// Enter one more level of recursive nesting.
    fn descend(&mut self) -> Result<(), FilterError> {
        let limit = self.ctx.config().max_filter_depth;
        if self.nesting >= limit {
            return Err(FilterError::FilterTooDeep { limit });
        }
        self.nesting += 1;

        Ok(())
    }

    fn resolve(
        &self,
        entity: &EntityRef,
        segments: &[Segment<'_>],
        usage: ChainUsage,
    ) -> Result<ResolvedChain, FilterError> {
        resolve_chain(self.ctx.schema(), entity, segments, usage, self.text)
    }

    /// `(` ident `)` at the cursor.
    fn at_outer_segment(&self) -> bool {
        matches!(
            (self.kind_at(self.pos), self.kind_at(self.pos + 1), self.kind_at(self.pos + 2)),
            (
                TokenKind::LParen,
                TokenKind::Ident(_),
                TokenKind::RParen
            )
        )
    }

    fn kind_at(&self, pos: usize) -> TokenKind<'a> {
        self.tokens.get(pos).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn peek(&self) -> Token<'a> {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                span: Span::new(self.text.len(), self.text.len()),
            })
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect_end(&self) -> Result<(), FilterError> {
        let token = self.peek();

        match token.kind {
            TokenKind::Eof => Ok(()),
            TokenKind::RParen => {
                Err(self.error("unbalanced parentheses: unexpected ')'", token.span))
            }
            other => Err(self.error(format!("unexpected {other} after filter"), token.span)),
        }
    }

    fn error(&self, message: impl Into<String>, span: Span) -> FilterError {
        FilterError::malformed(message, span, self.text)
    }
}

fn segments_span(segments: &[Segment<'_>]) -> Span {
    segments
        .iter()
        .map(|s| s.span)
        .reduce(Span::merge)
        .unwrap_or_default()
}
