//! Argument inference from a rule's grammatical shape.
//!
//! A rule body `Num "+" Num` yields one argument per factor. Each argument
//! gets a display string for the editor header and a default name the body
//! can use, e.g. `num_1`, `$2`, `num_2`.

use semviz_lexer::ALL_KEYWORDS;
use semviz_types::pexpr::{IterOp, PExpr, PExprKind};
use semviz_types::trace::{Trace, TraceId, TraceNode};
use serde::Serialize;

/// Names bound by the compiler itself; inferred names never take them.
pub const RESERVED_NAMES: &[&str] = &["args", "this"];

/// One inferred argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentInfo {
    /// The factor as written in the grammar, e.g. `Num` or `"+"`.
    pub display: String,
    pub default_name: String,
}

/// The expression whose shape determines `node`'s arguments.
///
/// Usually the rule body from the grammar. For an alternation it is the
/// alternative that actually matched in this trace. Without a grammar
/// entry the matched body in the trace is used.
pub fn argument_expr(trace: &Trace, node: TraceId) -> Option<&PExpr> {
    let tnode = trace.get(node)?;
    let rule = tnode.rule_name()?;
    let mut children = real_children(trace, tnode);

    let body = match trace.grammar.rule_body(rule) {
        Some(body) => body,
        None => return children.first().map(|c| &c.expr),
    };
    if !matches!(body.kind, PExprKind::Alt { .. }) {
        return Some(body);
    }

    // Apply → Alt → attempts, or the attempts directly under the Apply
    let alt = match children.as_slice() {
        [only] if matches!(only.expr.kind, PExprKind::Alt { .. }) => Some(*only),
        _ => None,
    };
    if let Some(alt) = alt {
        children = real_children(trace, alt);
    }
    Some(
        children
            .iter()
            .find(|c| c.succeeded)
            .map_or(body, |c| &c.expr),
    )
}

/// Children that are neither implicit whitespace nor blackholes.
fn real_children<'t>(trace: &'t Trace, node: &TraceNode) -> Vec<&'t TraceNode> {
    node.children
        .iter()
        .filter_map(|id| trace.get(*id))
        .filter(|c| !c.is_whitespace() && !c.is_blackhole())
        .collect()
}

/// Display strings and default names for every argument of `expr`.
pub fn argument_signature(expr: &PExpr) -> Vec<ArgumentInfo> {
    let mut infos = Vec::new();
    match &expr.kind {
        PExprKind::Seq { factors } => {
            let mut flat = Vec::new();
            flatten_factors(factors, &mut flat);
            for (i, factor) in flat.iter().enumerate() {
                infos.push(ArgumentInfo {
                    display: factor.display_string(),
                    default_name: argument_name(factor).unwrap_or_else(|| format!("${}", i + 1)),
                });
            }
        }
        _ => infos.push(ArgumentInfo {
            display: expr.display_string(),
            default_name: argument_name(expr).unwrap_or_else(|| "$1".to_string()),
        }),
    }
    resolve_duplicates(&mut infos);
    infos
}

/// Nested sequences contribute their factors; negative lookahead binds nothing.
fn flatten_factors<'e>(factors: &'e [PExpr], out: &mut Vec<&'e PExpr>) {
    for factor in factors {
        match &factor.kind {
            PExprKind::Seq { factors } => flatten_factors(factors, out),
            PExprKind::Not { .. } => {}
            _ => out.push(factor),
        }
    }
}

/// A meaningful name for `expr`, or `None` when only a positional name fits.
fn argument_name(expr: &PExpr) -> Option<String> {
    let name = match &expr.kind {
        PExprKind::Apply { rule_name } => lower_first(rule_name),
        PExprKind::Terminal { text } => {
            if !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                format!("_{text}")
            } else {
                return None;
            }
        }
        PExprKind::Iter { expr, op } => {
            let inner = argument_name(expr)?;
            match op {
                IterOp::Star | IterOp::Plus => format!("{inner}s"),
                IterOp::Opt => format!("opt{}", upper_first(&inner)),
            }
        }
        PExprKind::Lookahead { expr } | PExprKind::Lex { expr } => argument_name(expr)?,
        PExprKind::Seq { .. }
        | PExprKind::Alt { .. }
        | PExprKind::Range { .. }
        | PExprKind::UnicodeChar { .. }
        | PExprKind::Not { .. } => return None,
    };
    if name.is_empty() || ALL_KEYWORDS.contains(&name.as_str()) || RESERVED_NAMES.contains(&name.as_str()) {
        return None;
    }
    Some(name)
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Every occurrence of a repeated name gets a subscript: `num_1`, `num_2`.
fn resolve_duplicates(infos: &mut [ArgumentInfo]) {
    let names: Vec<String> = infos.iter().map(|a| a.default_name.clone()).collect();
    for name in &names {
        if names.iter().filter(|n| *n == name).count() <= 1 {
            continue;
        }
        let mut subscript = 1;
        for info in infos.iter_mut() {
            if &info.default_name == name {
                info.default_name = format!("{name}_{subscript}");
                subscript += 1;
            }
        }
    }
}
