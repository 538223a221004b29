//! Action body lexer: converts source text to a token stream.
//!
//! Features:
//! - String interpolation with `${expr}` via a mode stack
//! - Line (`//`) and block (`/* */`) comments stripped
//! - `$`-prefixed identifiers so default argument names (`$1`) lex as names
//! - Error recovery: collects up to 20 errors instead of stopping at the first
//! - Newline or `;` separated statements

use semviz_types::{Diagnostic, Diagnostics, ErrorCode, SourceText, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Inside a string literal, scanning text until `"` or `${`.
    String,
    /// Inside `${...}`. Tracks brace depth so the closing `}` is found.
    Interpolation { brace_depth: u32 },
}

/// The action body lexer.
pub struct Lexer<'src> {
    source: &'src str,
    source_text: &'src SourceText,
    /// Current byte offset into `source`.
    pos: usize,
    /// 1-based line.
    line: u32,
    /// 1-based column, counted in characters.
    col: u32,
    errors: Diagnostics,
    mode_stack: Vec<Mode>,
    /// Tokens to emit before the next scan (interpolation openers).
    pending: Vec<Token>,
}

/// Result of lexing: tokens plus any errors collected.
pub struct LexResult {
    /// Always ends with [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_text: &'src SourceText) -> Self {
        Self {
            source: &source_text.text,
            source_text,
            pos: 0,
            line: 1,
            col: 1,
            errors: Diagnostics::empty(),
            mode_stack: vec![Mode::Normal],
            pending: Vec::new(),
        }
    }

    /// Lex the whole body.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.total_errors >= MAX_ERRORS {
                break;
            }

            if let Some(pending) = self.pending.pop() {
                tokens.push(pending);
                continue;
            }

            let token = match self.current_mode() {
                Mode::Normal | Mode::Interpolation { .. } => self.scan_normal(),
                Mode::String => self.scan_string_continuation(),
            };

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn token_from(&self, kind: TokenKind, start_line: u32, start_col: u32) -> Token {
        Token::new(kind, self.span_from(start_line, start_col))
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_text.line(span.start_line).unwrap_or("");
        let err = Diagnostic::new(&self.source_text.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_text.line(span.start_line).unwrap_or("");
        let err = Diagnostic::new(&self.source_text.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces and tabs; newlines are tokens.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip `// ...` up to (not including) the newline.
    fn skip_line_comment(&mut self) -> bool {
        if self.peek() == Some('/') && self.peek_at(1) == Some('/') {
            while let Some(ch) = self.peek() {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
            true
        } else {
            false
        }
    }

    /// Skip `/* ... */`. An unclosed comment runs to the end of input.
    fn skip_block_comment(&mut self) -> bool {
        if self.peek() != Some('/') || self.peek_at(1) != Some('*') {
            return false;
        }
        let start_line = self.line;
        let start_col = self.col;
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNCLOSED_DELIMITER,
                        "unterminated block comment",
                        span,
                    );
                    break;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        true
    }

    // ─────────────────────────────────────────────────────────────
    // Normal-mode scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_normal(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            if !(self.skip_block_comment() || self.skip_line_comment()) {
                break;
            }
        }

        if self.errors.total_errors >= MAX_ERRORS {
            return Token::new(TokenKind::Eof, self.current_span());
        }

        if self.at_end() {
            if self
                .mode_stack
                .iter()
                .any(|m| matches!(m, Mode::String | Mode::Interpolation { .. }))
            {
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "unterminated string literal",
                    self.current_span(),
                );
            }
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start_line = self.line;
        let start_col = self.col;
        let start_pos = self.pos;
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, self.current_span());
        };

        match ch {
            '\n' => self.token_from(TokenKind::Newline, start_line, start_col),
            ';' => self.token_from(TokenKind::Semicolon, start_line, start_col),

            '"' => self.scan_string(start_line, start_col),

            '0'..='9' => self.scan_number(start_pos, start_line, start_col),

            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(start_pos, start_line, start_col),

            '$' => {
                if matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                    self.scan_identifier(start_pos, start_line, start_col)
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "unexpected character '$'",
                        span,
                        "interpolation '${...}' is only valid inside a string",
                    );
                    self.scan_normal()
                }
            }

            '+' => self.token_from(TokenKind::Plus, start_line, start_col),
            '-' => self.token_from(TokenKind::Minus, start_line, start_col),
            '*' => self.token_from(TokenKind::Star, start_line, start_col),
            '/' => self.token_from(TokenKind::Slash, start_line, start_col),
            '%' => self.token_from(TokenKind::Percent, start_line, start_col),

            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    // tolerate `===`
                    if self.peek() == Some('=') {
                        self.advance();
                    }
                    self.token_from(TokenKind::EqEq, start_line, start_col)
                } else {
                    self.token_from(TokenKind::Eq, start_line, start_col)
                }
            }

            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                    }
                    self.token_from(TokenKind::BangEq, start_line, start_col)
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "unexpected character '!'",
                        span,
                        "use 'not' for boolean negation, or '!=' for inequality",
                    );
                    self.scan_normal()
                }
            }

            '&' | '|' => {
                let doubled = self.peek() == Some(ch);
                if doubled {
                    self.advance();
                }
                let span = self.span_from(start_line, start_col);
                let word = if ch == '&' { "and" } else { "or" };
                let op = if doubled {
                    format!("{ch}{ch}")
                } else {
                    ch.to_string()
                };
                self.emit_error_with_suggestion(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("unexpected operator '{op}'"),
                    span,
                    format!("use '{word}'"),
                );
                self.scan_normal()
            }

            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.token_from(TokenKind::LessEq, start_line, start_col)
                } else {
                    self.token_from(TokenKind::Less, start_line, start_col)
                }
            }

            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.token_from(TokenKind::GreaterEq, start_line, start_col)
                } else {
                    self.token_from(TokenKind::Greater, start_line, start_col)
                }
            }

            '?' => {
                if self.peek() == Some('?') {
                    self.advance();
                    self.token_from(TokenKind::QuestionQuestion, start_line, start_col)
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "unexpected character '?'",
                        span,
                        "use 'if cond { a } else { b }' or the '??' operator",
                    );
                    self.scan_normal()
                }
            }

            '.' => self.token_from(TokenKind::Dot, start_line, start_col),
            '(' => self.token_from(TokenKind::LParen, start_line, start_col),
            ')' => self.token_from(TokenKind::RParen, start_line, start_col),
            '[' => self.token_from(TokenKind::LBracket, start_line, start_col),
            ']' => self.token_from(TokenKind::RBracket, start_line, start_col),
            ',' => self.token_from(TokenKind::Comma, start_line, start_col),
            ':' => self.token_from(TokenKind::Colon, start_line, start_col),

            '{' => {
                if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                    *brace_depth += 1;
                }
                self.token_from(TokenKind::LBrace, start_line, start_col)
            }

            '}' => {
                if let Mode::Interpolation { brace_depth } = self.current_mode() {
                    if brace_depth == 0 {
                        self.pop_mode();
                        self.push_mode(Mode::String);
                        return self.token_from(TokenKind::InterpolationEnd, start_line, start_col);
                    }
                    if let Some(Mode::Interpolation { brace_depth }) = self.mode_stack.last_mut() {
                        *brace_depth -= 1;
                    }
                }
                self.token_from(TokenKind::RBrace, start_line, start_col)
            }

            _ => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("unexpected character '{ch}'"),
                    span,
                );
                self.scan_normal()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        while let Some('0'..='9') = self.peek() {
            self.advance();
        }

        if self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9')) {
            self.advance();
            while let Some('0'..='9') = self.peek() {
                self.advance();
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = &self.source[start_pos..self.pos];
        let value: f64 = text.parse().unwrap_or(0.0);

        Token::new(TokenKind::NumberLit(value), span)
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = &self.source[start_pos..self.pos];
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // String literals & interpolation
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal after the opening `"`. Produces either a
    /// `StringLiteral` or a `StringStart` followed by a mode switch.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        span,
                    );
                    return Token::new(TokenKind::StringLiteral(buf), span);
                }
                Some('"') => {
                    self.advance();
                    return Token::new(
                        TokenKind::StringLiteral(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    let interp_line = self.line;
                    let interp_col = self.col;
                    self.advance();
                    self.advance();
                    let interp_span = self.span_from(interp_line, interp_col);
                    self.push_mode(Mode::Interpolation { brace_depth: 0 });
                    self.pending
                        .push(Token::new(TokenKind::InterpolationStart, interp_span));
                    return Token::new(
                        TokenKind::StringStart(buf),
                        Span::new(start_line, start_col, interp_line, interp_col),
                    );
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Continue a string after an interpolation's closing `}`.
    fn scan_string_continuation(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut buf = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        span,
                    );
                    self.pop_mode();
                    return Token::new(TokenKind::StringEnd(buf), span);
                }
                Some('"') => {
                    self.advance();
                    self.pop_mode();
                    return Token::new(
                        TokenKind::StringEnd(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    let interp_line = self.line;
                    let interp_col = self.col;
                    self.advance();
                    self.advance();
                    let interp_span = self.span_from(interp_line, interp_col);
                    self.pop_mode();
                    self.push_mode(Mode::Interpolation { brace_depth: 0 });
                    self.pending
                        .push(Token::new(TokenKind::InterpolationStart, interp_span));
                    return Token::new(
                        TokenKind::StringPart(buf),
                        Span::new(start_line, start_col, interp_line, interp_col),
                    );
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence starting at the `\`.
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        match self.advance() {
            Some('"') => Some('"'),
            Some('\\') => Some('\\'),
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('$') => Some('$'),
            Some('\'') => Some('\''),
            Some(ch) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_ESCAPE,
                    format!("invalid escape sequence '\\{ch}'"),
                    span,
                );
                Some(ch)
            }
            None => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "unexpected end of input in escape sequence",
                    span,
                );
                None
            }
        }
    }
}
