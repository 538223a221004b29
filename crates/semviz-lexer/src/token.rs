//! Token types for the action body lexer.
//!
//! Defines [`TokenKind`] covering every lexeme an action body may contain
//! and [`Token`], which pairs a kind with a source [`Span`].

use semviz_types::Span;
use std::fmt;

/// Reserved words of the action body language.
///
/// Module names (`math`, `string`, `list`, ...) are deliberately absent:
/// they are ordinary identifiers so that a grammar argument called `list`
/// can shadow them.
pub const ALL_KEYWORDS: &[&str] = &[
    // Statements
    "let", "if", "else", "for", "in", "return", "assert", "throw",
    // Expressions
    "true", "false", "nil", "not", "and", "or",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `42`, `3.14`
    NumberLit(f64),
    /// String literal with no interpolation: `"hello"`
    StringLiteral(String),
    True,
    False,
    Nil,

    // ── String Interpolation ─────────────────────────────────
    /// Text before the first `${` of an interpolated string.
    StringStart(String),
    /// Text between a `}` and the next `${`.
    StringPart(String),
    /// Text after the last `}` up to the closing `"`.
    StringEnd(String),
    /// `${`
    InterpolationStart,
    /// The `}` closing an interpolation.
    InterpolationEnd,

    // ── Identifiers ──────────────────────────────────────────
    /// `num`, `_x`, `$1`, `this`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    Let,
    If,
    Else,
    For,
    In,
    Return,
    Assert,
    Throw,
    Not,
    And,
    Or,

    // ── Operators ────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    /// `??`
    QuestionQuestion,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Eq,
    /// `;` (statement separator, same as a newline)
    Semicolon,

    // ── Special ──────────────────────────────────────────────
    Newline,
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. `None` for ordinary identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "let" => TokenKind::Let,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "assert" => TokenKind::Assert,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            "not" => TokenKind::Not,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Return
                | TokenKind::Assert
                | TokenKind::Throw
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::Not
                | TokenKind::And
                | TokenKind::Or
        )
    }

    /// Newlines and semicolons both end a statement.
    pub fn is_separator(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Semicolon)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::NumberLit(n) => return write!(f, "{n}"),
            TokenKind::StringLiteral(s) => return write!(f, "\"{s}\""),
            TokenKind::StringStart(s) => return write!(f, "\"{s}${{"),
            TokenKind::StringPart(s) => return write!(f, "}}{s}${{"),
            TokenKind::StringEnd(s) => return write!(f, "}}{s}\""),
            TokenKind::Identifier(name) => return write!(f, "{name}"),
            TokenKind::InterpolationStart => "${",
            TokenKind::InterpolationEnd => "}",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Nil => "nil",
            TokenKind::Let => "let",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Return => "return",
            TokenKind::Assert => "assert",
            TokenKind::Throw => "throw",
            TokenKind::Not => "not",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::QuestionQuestion => "??",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Eq => "=",
            TokenKind::Semicolon => ";",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "end of input",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_count() {
        assert_eq!(ALL_KEYWORDS.len(), 14);
    }

    #[test]
    fn test_from_keyword_covers_list() {
        for &kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw).unwrap();
            assert!(kind.is_keyword(), "{kw} should be a keyword");
            assert_eq!(kind.to_string(), kw);
        }
    }

    #[test]
    fn test_module_names_are_identifiers() {
        for name in ["math", "string", "list", "convert", "core", "this", "args"] {
            assert!(TokenKind::from_keyword(name).is_none(), "{name}");
        }
    }

    #[test]
    fn test_keyword_case_sensitivity() {
        assert!(TokenKind::from_keyword("let").is_some());
        assert!(TokenKind::from_keyword("Let").is_none());
        assert!(TokenKind::from_keyword("NIL").is_none());
    }

    #[test]
    fn test_is_keyword_false_for_non_keywords() {
        let kinds = [
            TokenKind::NumberLit(1.0),
            TokenKind::Identifier("num".into()),
            TokenKind::Plus,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        for kind in &kinds {
            assert!(!kind.is_keyword(), "{kind:?}");
        }
    }

    #[test]
    fn test_display_operators_and_literals() {
        assert_eq!(TokenKind::QuestionQuestion.to_string(), "??");
        assert_eq!(TokenKind::BangEq.to_string(), "!=");
        assert_eq!(TokenKind::NumberLit(3.5).to_string(), "3.5");
        assert_eq!(TokenKind::NumberLit(2.0).to_string(), "2");
        assert_eq!(TokenKind::StringLiteral("hi".into()).to_string(), "\"hi\"");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn test_separators() {
        assert!(TokenKind::Newline.is_separator());
        assert!(TokenKind::Semicolon.is_separator());
        assert!(!TokenKind::Comma.is_separator());
    }
}
