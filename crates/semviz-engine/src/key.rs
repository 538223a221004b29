//! Memo addressing: one key per (CST node shape, action name).

use semviz_types::trace::CstNode;
use serde::{Serialize, Serializer};
use std::fmt;

/// Identifies a node's result under one action.
///
/// Keys are built from the node's constructor name and span, not from the
/// node itself, so two CST nodes with the same kind and span share an
/// entry. They are only comparable within the walk that produced them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub ctor: String,
    pub start: usize,
    pub end: usize,
    pub action: String,
}

impl NodeKey {
    pub fn new(ctor: impl Into<String>, start: usize, end: usize, action: impl Into<String>) -> Self {
        Self {
            ctor: ctor.into(),
            start,
            end,
            action: action.into(),
        }
    }

    pub fn of(node: &CstNode, action: &str) -> Self {
        Self::new(node.ctor_name(), node.interval.start, node.interval.end, action)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_from_{}_to_{}_at_{}",
            self.ctor, self.start, self.end, self.action
        )
    }
}

impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semviz_types::trace::{CstKind, Interval};

    fn cst(kind: CstKind, start: usize, end: usize) -> CstNode {
        CstNode {
            kind,
            interval: Interval::new(start, end),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_key_format() {
        let node = cst(
            CstKind::Nonterminal {
                rule_name: "Sum".into(),
            },
            0,
            3,
        );
        assert_eq!(NodeKey::of(&node, "value").to_string(), "Sum_from_0_to_3_at_value");
        let term = cst(CstKind::Terminal, 1, 2);
        assert_eq!(NodeKey::of(&term, "eval").to_string(), "_terminal_from_1_to_2_at_eval");
    }

    #[test]
    fn test_same_shape_collapses() {
        let a = cst(CstKind::Iter, 2, 5);
        let b = cst(CstKind::Iter, 2, 5);
        assert_eq!(NodeKey::of(&a, "x"), NodeKey::of(&b, "x"));
        assert_ne!(NodeKey::of(&a, "x"), NodeKey::of(&b, "y"));
    }

    #[test]
    fn test_serializes_as_string() {
        let key = NodeKey::new("Num", 0, 1, "value");
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            "\"Num_from_0_to_1_at_value\""
        );
    }
}
