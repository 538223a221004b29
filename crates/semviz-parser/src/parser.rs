//! Core parser infrastructure: token cursor, error reporting, helpers.

use semviz_lexer::token::{Token, TokenKind};
use semviz_types::ast::{Block, Body, Ident};
use semviz_types::{Diagnostic, Diagnostics, ErrorCode, SourceText, Span, MAX_ERRORS};

/// Deepest expression nesting accepted in one body.
pub(crate) const MAX_EXPR_DEPTH: u32 = 32;

/// The action body parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Body`].
/// Collects errors and attempts recovery inside blocks.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_text: &'src SourceText,
    errors: Diagnostics,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
    /// Fallback returned by `peek` past the end of a malformed stream.
    eof: Token,
}

/// Result of parsing. `body` is `None` whenever `errors` is non-empty.
pub struct ParseResult {
    pub body: Option<Body>,
    pub errors: Diagnostics,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_text: &'src SourceText) -> Self {
        let end = tokens.last().map_or(Span::point(1, 1), |t| t.span);
        Self {
            tokens,
            pos: 0,
            source_text,
            errors: Diagnostics::empty(),
            expr_depth: 0,
            eof: Token::new(TokenKind::Eof, end),
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Separator Handling ────────────────────────────────────────────────────

    pub(crate) fn skip_newlines(&mut self) {
        while self.check_exact(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skip newlines and semicolons.
    pub(crate) fn skip_separators(&mut self) {
        while self.peek_kind().is_separator() {
            self.advance();
        }
    }

    /// A statement ends at a separator, a closing brace, or end of input.
    pub(crate) fn expect_separator(&mut self) {
        if self.at_end() || self.check_exact(&TokenKind::RBrace) {
            return;
        }
        if self.peek_kind().is_separator() {
            self.skip_separators();
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected newline or ';', got '{}'", self.peek_kind()),
            );
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            let code = match expected {
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    ErrorCode::UNCLOSED_DELIMITER
                }
                _ => ErrorCode::UNEXPECTED_TOKEN,
            };
            self.error_at_current(
                code,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    /// An identifier or keyword used after `.` or as a record field name
    /// (`{ if: 1 }`, `x.in`).
    pub(crate) fn expect_member_name(&mut self) -> Option<Ident> {
        let kind = self.peek_kind().clone();
        match &kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ if kind.is_keyword() => {
                let span = self.advance().span;
                Some(Ident::new(kind.to_string(), span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected name, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    pub(crate) fn expect_string_literal(&mut self) -> Option<String> {
        match self.peek_kind().clone() {
            TokenKind::StringLiteral(s) => {
                self.advance();
                Some(s)
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected string literal, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_text.line(span.start_line).unwrap_or("");
        let error = Diagnostic::new(&self.source_text.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_text.line(span.start_line).unwrap_or("");
        let error = Diagnostic::new(&self.source_text.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(error);
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip to the start of the next statement after an error.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            if self.peek_kind().is_separator() {
                self.skip_separators();
                return;
            }
            match self.peek_kind() {
                TokenKind::Let
                | TokenKind::If
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Assert
                | TokenKind::Throw
                | TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the whole stream as one expression.
    pub fn parse_expression_body(mut self) -> ParseResult {
        self.skip_separators();
        if self.at_end() {
            self.error_at_current(ErrorCode::EMPTY_BODY, "action body is empty");
            return self.finish(None);
        }
        let expr = self.parse_expression();
        self.skip_separators();
        if expr.is_some() && !self.at_end() {
            self.error_at_current(
                ErrorCode::TRAILING_INPUT,
                format!("unexpected '{}' after expression", self.peek_kind()),
            );
        }
        self.finish(expr.map(Body::Expr))
    }

    /// Parse the whole stream as a single `{ ... }` block.
    pub fn parse_block_body(mut self) -> ParseResult {
        self.skip_separators();
        let block: Option<Block> = self.parse_block();
        self.skip_separators();
        if block.is_some() && !self.at_end() {
            self.error_at_current(
                ErrorCode::TRAILING_INPUT,
                format!("unexpected '{}' after block", self.peek_kind()),
            );
        }
        self.finish(block.map(Body::Block))
    }

    fn finish(self, body: Option<Body>) -> ParseResult {
        let body = if self.errors.has_errors() { None } else { body };
        ParseResult {
            body,
            errors: self.errors,
        }
    }
}
