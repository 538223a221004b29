//! semviz parser: converts a token stream into an action body AST.

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser};

use semviz_lexer::{Lexer, Token, TokenKind};
use semviz_types::{SourceText, Span};

/// Lex and parse `source` as a bare expression body.
pub fn parse_expression_body(source: &SourceText) -> ParseResult {
    let lex = Lexer::new(source).lex();
    let mut result = Parser::new(lex.tokens, source).parse_expression_body();
    merge_lex_errors(&mut result, lex.errors);
    result
}

/// Lex and parse `source` as a `{ ... }` statement block.
pub fn parse_block_body(source: &SourceText) -> ParseResult {
    let lex = Lexer::new(source).lex();
    let mut result = Parser::new(lex.tokens, source).parse_block_body();
    merge_lex_errors(&mut result, lex.errors);
    result
}

/// Lex and parse `source` as the statements of a block whose braces were
/// left out (`let a = 1; a + 2`). Spans refer to `source` as written.
pub fn parse_statement_body(source: &SourceText) -> ParseResult {
    let lex = Lexer::new(source).lex();
    let mut tokens = lex.tokens;
    let eof = tokens.pop().unwrap_or(Token::new(TokenKind::Eof, Span::point(1, 1)));
    tokens.insert(0, Token::new(TokenKind::LBrace, Span::point(1, 1)));
    tokens.push(Token::new(TokenKind::RBrace, eof.span));
    tokens.push(eof);
    let mut result = Parser::new(tokens, source).parse_block_body();
    merge_lex_errors(&mut result, lex.errors);
    result
}

fn merge_lex_errors(result: &mut ParseResult, lex_errors: semviz_types::Diagnostics) {
    if lex_errors.has_errors() {
        let mut all = lex_errors;
        all.extend(std::mem::take(&mut result.errors));
        result.errors = all;
        result.body = None;
    }
}
