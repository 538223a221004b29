//! Parsing expressions: the grammar-side shape a trace node was matched by.

use crate::trace::Interval;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Iteration operator of a [`PExprKind::Iter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterOp {
    #[serde(rename = "*")]
    Star,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "?")]
    Opt,
}

impl IterOp {
    pub fn symbol(self) -> &'static str {
        match self {
            IterOp::Star => "*",
            IterOp::Plus => "+",
            IterOp::Opt => "?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PExprKind {
    Apply { rule_name: String },
    Seq { factors: Vec<PExpr> },
    Alt { terms: Vec<PExpr> },
    Iter { expr: Box<PExpr>, op: IterOp },
    Terminal { text: String },
    Range { from: char, to: char },
    UnicodeChar { category: String },
    Not { expr: Box<PExpr> },
    Lookahead { expr: Box<PExpr> },
    Lex { expr: Box<PExpr> },
}

/// A parsing expression.
///
/// `source` is the interval of the grammar text the expression was written
/// at; expressions synthesized by the grammar machinery (implicit space
/// skipping, built-in rule bodies) have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PExpr {
    pub kind: PExprKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Interval>,
}

impl PExpr {
    pub fn new(kind: PExprKind) -> Self {
        Self { kind, source: None }
    }

    pub fn apply(rule_name: impl Into<String>) -> Self {
        Self::new(PExprKind::Apply {
            rule_name: rule_name.into(),
        })
    }

    pub fn seq(factors: Vec<PExpr>) -> Self {
        Self::new(PExprKind::Seq { factors })
    }

    pub fn alt(terms: Vec<PExpr>) -> Self {
        Self::new(PExprKind::Alt { terms })
    }

    pub fn terminal(text: impl Into<String>) -> Self {
        Self::new(PExprKind::Terminal { text: text.into() })
    }

    pub fn range(from: char, to: char) -> Self {
        Self::new(PExprKind::Range { from, to })
    }

    pub fn unicode_char(category: impl Into<String>) -> Self {
        Self::new(PExprKind::UnicodeChar {
            category: category.into(),
        })
    }

    pub fn iter(expr: PExpr, op: IterOp) -> Self {
        Self::new(PExprKind::Iter {
            expr: Box::new(expr),
            op,
        })
    }

    pub fn star(expr: PExpr) -> Self {
        Self::iter(expr, IterOp::Star)
    }

    pub fn plus(expr: PExpr) -> Self {
        Self::iter(expr, IterOp::Plus)
    }

    pub fn opt(expr: PExpr) -> Self {
        Self::iter(expr, IterOp::Opt)
    }

    pub fn not(expr: PExpr) -> Self {
        Self::new(PExprKind::Not {
            expr: Box::new(expr),
        })
    }

    pub fn lookahead(expr: PExpr) -> Self {
        Self::new(PExprKind::Lookahead {
            expr: Box::new(expr),
        })
    }

    pub fn lex(expr: PExpr) -> Self {
        Self::new(PExprKind::Lex {
            expr: Box::new(expr),
        })
    }

    /// Attach the grammar source interval.
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.source = Some(Interval::new(start, end));
        self
    }

    /// Rule name of an application, `None` for every other kind.
    pub fn rule_name(&self) -> Option<&str> {
        match &self.kind {
            PExprKind::Apply { rule_name } => Some(rule_name),
            _ => None,
        }
    }

    /// Terminals, ranges and unicode categories match characters directly.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.kind,
            PExprKind::Terminal { .. } | PExprKind::Range { .. } | PExprKind::UnicodeChar { .. }
        )
    }

    /// Sequence and alternation nodes only combine other nodes.
    pub fn is_combinator(&self) -> bool {
        matches!(self.kind, PExprKind::Seq { .. } | PExprKind::Alt { .. })
    }

    /// Human-readable form, as shown in trace labels and editor headers.
    pub fn display_string(&self) -> String {
        match &self.kind {
            PExprKind::Apply { rule_name } => rule_name.clone(),
            PExprKind::Seq { factors } => {
                let parts: Vec<String> = factors.iter().map(PExpr::display_string).collect();
                format!("({})", parts.join(" "))
            }
            PExprKind::Alt { terms } => {
                let parts: Vec<String> = terms.iter().map(PExpr::display_string).collect();
                format!("({})", parts.join(" | "))
            }
            PExprKind::Iter { expr, op } => format!("{}{}", expr.display_string(), op.symbol()),
            PExprKind::Terminal { text } => {
                serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
            }
            PExprKind::Range { from, to } => format!("{:?}..{:?}", from, to),
            PExprKind::UnicodeChar { category } => format!("\\p{{{category}}}"),
            PExprKind::Not { expr } => format!("~{}", expr.display_string()),
            PExprKind::Lookahead { expr } => format!("&{}", expr.display_string()),
            PExprKind::Lex { expr } => format!("#{}", expr.display_string()),
        }
    }
}

/// The parts of a grammar this engine needs: each rule's body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub rule_bodies: BTreeMap<String, PExpr>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, rule_name: impl Into<String>, body: PExpr) {
        self.rule_bodies.insert(rule_name.into(), body);
    }

    pub fn rule_body(&self, rule_name: &str) -> Option<&PExpr> {
        self.rule_bodies.get(rule_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strings() {
        let sum = PExpr::seq(vec![
            PExpr::apply("Num"),
            PExpr::terminal("+"),
            PExpr::apply("Num"),
        ]);
        assert_eq!(sum.display_string(), "(Num \"+\" Num)");
        assert_eq!(PExpr::plus(PExpr::apply("digit")).display_string(), "digit+");
        assert_eq!(PExpr::range('a', 'z').display_string(), "'a'..'z'");
        assert_eq!(
            PExpr::alt(vec![PExpr::apply("A"), PExpr::apply("B")]).display_string(),
            "(A | B)"
        );
    }

    #[test]
    fn test_primitive_and_combinator() {
        assert!(PExpr::terminal("x").is_primitive());
        assert!(PExpr::unicode_char("Lu").is_primitive());
        assert!(!PExpr::apply("Num").is_primitive());
        assert!(PExpr::seq(vec![]).is_combinator());
        assert!(!PExpr::star(PExpr::apply("a")).is_combinator());
    }

    #[test]
    fn test_json_shape() {
        let expr = PExpr::star(PExpr::apply("digit")).at(3, 9);
        let json = serde_json::to_string(&expr).unwrap();
        assert!(json.contains("\"type\":\"iter\""));
        assert!(json.contains("\"op\":\"*\""));
        let back: PExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}
