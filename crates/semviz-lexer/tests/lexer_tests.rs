//! Lexer tests for action bodies.
//!
//! Covers: reserved words, operators, literals (number, string,
//! interpolated), `$`-names, comments, separators, error recovery, and
//! the 100-iteration determinism test.

use semviz_lexer::{Lexer, TokenKind};
use semviz_types::SourceText;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let src = SourceText::new("Test.value", source);
    Lexer::new(&src)
        .lex()
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

fn error_count(source: &str) -> usize {
    let src = SourceText::new("Test.value", source);
    Lexer::new(&src).lex().errors.total_errors
}

fn first_error(source: &str) -> String {
    let src = SourceText::new("Test.value", source);
    Lexer::new(&src)
        .lex()
        .errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_default()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────
// Keywords & identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_statement_keywords() {
    let pairs = [
        ("let", TokenKind::Let),
        ("if", TokenKind::If),
        ("else", TokenKind::Else),
        ("for", TokenKind::For),
        ("in", TokenKind::In),
        ("return", TokenKind::Return),
        ("assert", TokenKind::Assert),
        ("throw", TokenKind::Throw),
    ];
    for (src, expected) in &pairs {
        assert_eq!(kinds(src), vec![expected.clone()], "keyword '{src}'");
    }
}

#[test]
fn test_expression_keywords() {
    let pairs = [
        ("true", TokenKind::True),
        ("false", TokenKind::False),
        ("nil", TokenKind::Nil),
        ("not", TokenKind::Not),
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
    ];
    for (src, expected) in &pairs {
        assert_eq!(kinds(src), vec![expected.clone()], "keyword '{src}'");
    }
}

#[test]
fn test_default_argument_names() {
    assert_eq!(kinds("$1 + $2"), vec![ident("$1"), TokenKind::Plus, ident("$2")]);
    assert_eq!(kinds("_x"), vec![ident("_x")]);
    assert_eq!(kinds("num_1"), vec![ident("num_1")]);
    assert_eq!(kinds("_"), vec![ident("_")]);
}

#[test]
fn test_module_names_are_identifiers() {
    assert_eq!(
        kinds("math.max(a, b)"),
        vec![
            ident("math"),
            TokenKind::Dot,
            ident("max"),
            TokenKind::LParen,
            ident("a"),
            TokenKind::Comma,
            ident("b"),
            TokenKind::RParen,
        ]
    );
}

#[test]
fn test_keyword_prefix_is_identifier() {
    assert_eq!(kinds("letter"), vec![ident("letter")]);
    assert_eq!(kinds("iffy"), vec![ident("iffy")]);
    assert_eq!(kinds("nil_value"), vec![ident("nil_value")]);
}

// ─────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_all_operator_tokens() {
    let expected = vec![
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::Star,
        TokenKind::Slash,
        TokenKind::Percent,
        TokenKind::EqEq,
        TokenKind::BangEq,
        TokenKind::Less,
        TokenKind::Greater,
        TokenKind::LessEq,
        TokenKind::GreaterEq,
        TokenKind::QuestionQuestion,
        TokenKind::Eq,
    ];
    assert_eq!(kinds("+ - * / % == != < > <= >= ?? ="), expected);
}

#[test]
fn test_js_equality_tolerated() {
    assert_eq!(kinds("a === b"), vec![ident("a"), TokenKind::EqEq, ident("b")]);
    assert_eq!(kinds("a !== b"), vec![ident("a"), TokenKind::BangEq, ident("b")]);
}

#[test]
fn test_logical_symbols_rejected_with_suggestion() {
    let src = SourceText::new("Test.value", "a && b");
    let result = Lexer::new(&src).lex();
    assert_eq!(result.errors.total_errors, 1);
    let err = result.errors.first().unwrap();
    assert!(err.message.contains("&&"));
    assert_eq!(err.suggestion.as_deref(), Some("use 'and'"));
    // recovery keeps both operands
    let names: Vec<_> = result
        .tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Identifier(_)))
        .collect();
    assert_eq!(names.len(), 2);
}

#[test]
fn test_bang_alone_is_error() {
    assert_eq!(error_count("!x"), 1);
    assert!(first_error("!x").contains("'!'"));
}

// ─────────────────────────────────────────────────────────────────────
// Numbers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_integer_and_decimal_literals() {
    assert_eq!(kinds("42"), vec![TokenKind::NumberLit(42.0)]);
    assert_eq!(kinds("3.25"), vec![TokenKind::NumberLit(3.25)]);
    assert_eq!(kinds("0"), vec![TokenKind::NumberLit(0.0)]);
}

#[test]
fn test_number_followed_by_dot_method() {
    assert_eq!(
        kinds("1.abs"),
        vec![TokenKind::NumberLit(1.0), TokenKind::Dot, ident("abs")]
    );
}

#[test]
fn test_negative_number_is_unary_minus() {
    assert_eq!(kinds("-5"), vec![TokenKind::Minus, TokenKind::NumberLit(5.0)]);
}

// ─────────────────────────────────────────────────────────────────────
// Strings
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_plain_string() {
    assert_eq!(
        kinds("\"hello\""),
        vec![TokenKind::StringLiteral("hello".into())]
    );
}

#[test]
fn test_string_escape_sequences() {
    assert_eq!(
        kinds(r#""a\nb\t\"c\"\\\$""#),
        vec![TokenKind::StringLiteral("a\nb\t\"c\"\\$".into())]
    );
}

#[test]
fn test_invalid_escape_reported() {
    assert_eq!(error_count(r#""\q""#), 1);
    assert!(first_error(r#""\q""#).contains("invalid escape"));
}

#[test]
fn test_unicode_string_contents() {
    assert_eq!(
        kinds("\"héllo ◦ wörld\""),
        vec![TokenKind::StringLiteral("héllo ◦ wörld".into())]
    );
}

#[test]
fn test_string_interpolation_simple() {
    assert_eq!(
        kinds("\"sum: ${total}\""),
        vec![
            TokenKind::StringStart("sum: ".into()),
            TokenKind::InterpolationStart,
            ident("total"),
            TokenKind::InterpolationEnd,
            TokenKind::StringEnd("".into()),
        ]
    );
}

#[test]
fn test_string_interpolation_multiple() {
    assert_eq!(
        kinds("\"${a} + ${b}!\""),
        vec![
            TokenKind::StringStart("".into()),
            TokenKind::InterpolationStart,
            ident("a"),
            TokenKind::InterpolationEnd,
            TokenKind::StringPart(" + ".into()),
            TokenKind::InterpolationStart,
            ident("b"),
            TokenKind::InterpolationEnd,
            TokenKind::StringEnd("!".into()),
        ]
    );
}

#[test]
fn test_string_interpolation_with_record_braces() {
    let k = kinds("\"${ {x: 1}.x }\"");
    assert!(k.contains(&TokenKind::LBrace));
    assert!(k.contains(&TokenKind::RBrace));
    assert_eq!(k.last(), Some(&TokenKind::StringEnd("".into())));
}

#[test]
fn test_unterminated_string() {
    assert_eq!(error_count("\"abc"), 1);
    assert!(first_error("\"abc").contains("unterminated"));
}

// ─────────────────────────────────────────────────────────────────────
// Comments & separators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_line_comment_stripped() {
    assert_eq!(
        kinds("a // trailing\nb"),
        vec![ident("a"), TokenKind::Newline, ident("b")]
    );
}

#[test]
fn test_block_comment_stripped() {
    assert_eq!(kinds("a /* inner \n more */ + b"), vec![ident("a"), TokenKind::Plus, ident("b")]);
    assert_eq!(error_count("a /* never closed"), 1);
}

#[test]
fn test_semicolon_and_newline_separators() {
    assert_eq!(
        kinds("let a = 1; a\n"),
        vec![
            TokenKind::Let,
            ident("a"),
            TokenKind::Eq,
            TokenKind::NumberLit(1.0),
            TokenKind::Semicolon,
            ident("a"),
            TokenKind::Newline,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Spans & limits
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_spans_are_one_based_and_char_counted() {
    let src = SourceText::new("Test.value", "\"é\" + x\n  y");
    let tokens = Lexer::new(&src).lex().tokens;
    assert_eq!(tokens[0].span.start_col, 1);
    assert_eq!(tokens[0].span.end_col, 3);
    assert_eq!(tokens[1].span.start_col, 5);
    let y = tokens
        .iter()
        .find(|t| t.kind == ident("y"))
        .unwrap();
    assert_eq!(y.span.start_line, 2);
    assert_eq!(y.span.start_col, 3);
}

#[test]
fn test_error_cap() {
    let src = SourceText::new("Test.value", "# ".repeat(50));
    let result = Lexer::new(&src).lex();
    assert_eq!(result.errors.errors.len(), semviz_types::MAX_ERRORS);
    assert_eq!(result.tokens.last().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_empty_source_is_just_eof() {
    let src = SourceText::new("Test.value", "");
    let tokens = Lexer::new(&src).lex().tokens;
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
}

#[test]
fn test_lexer_determinism_100_iterations() {
    let source = "let total = num + \"${args[0]}\"\nif total > 1 { return math.max(total, 2) }";
    let first = kinds(source);
    for _ in 0..100 {
        assert_eq!(kinds(source), first);
    }
}
