//! Trace walk: one draw request per visited node.
//!
//! The walk starts at the focused node, evaluates the active action there
//! first, then visits the subtree depth-first. Rule applications that get an
//! action panel are evaluated on demand if the first evaluation did not
//! reach them.

use crate::config::SessionConfig;
use crate::evaluate::Evaluator;
use crate::key::NodeKey;
use crate::memo::{ErrorWrapper, MemoStore, Outcome};
use crate::registry::ActionDefinition;
use semviz_compiler::{argument_expr, argument_signature, ActionSource, ArgumentInfo};
use semviz_eval::Value;
use semviz_types::trace::{CstId, Trace, TraceId, TraceNode, TraceVisitor, VisitAction};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Label shown for implicit whitespace applications.
pub const WHITESPACE_LABEL: &str = "\u{25E6}";
/// Consumed-input text shown for a run of whitespace.
pub const WHITESPACE_INPUT: &str = "\u{B7}";
const ELLIPSIS: char = '\u{2026}';

// ══════════════════════════════════════════════════════════════════════════════
// Draw requests
// ══════════════════════════════════════════════════════════════════════════════

/// A node's result as the renderer shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultView {
    Value {
        value: serde_json::Value,
    },
    Failure,
    Error {
        message: String,
        origin: NodeKey,
        /// Whether this node's own body raised the error.
        is_origin: bool,
    },
    Pending,
}

impl ResultView {
    pub fn value(value: &Value) -> Self {
        ResultView::Value {
            value: value.to_json(),
        }
    }

    fn of(outcome: &Outcome, key: &NodeKey) -> Self {
        match outcome {
            Outcome::Succeeded(v) => Self::value(v),
            Outcome::Failed => ResultView::Failure,
            Outcome::Errored(w) => ResultView::Error {
                message: w.error.to_string(),
                origin: w.origin.clone(),
                is_origin: &w.origin == key,
            },
            Outcome::Pending => ResultView::Pending,
        }
    }
}

/// The action editor attached to a rule application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPanel {
    pub action: String,
    pub key: NodeKey,
    pub rule: String,
    /// Editor contents: unsaved edits, else the installed source.
    pub source: ActionSource,
    pub arguments: Vec<ArgumentInfo>,
    pub result: ResultView,
    pub pass_through: bool,
    pub todo: bool,
    /// Needs the author's attention.
    pub marked: bool,
    pub editor_open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRequest {
    pub node: TraceId,
    pub depth: usize,
    pub key: Option<NodeKey>,
    pub label: String,
    pub succeeded: bool,
    pub labeled: bool,
    pub leaf: bool,
    pub primitive: bool,
    pub whitespace: bool,
    /// Consumed input; empty for inner nodes, `None` when nothing was
    /// consumed.
    pub input: Option<String>,
    /// This node is the committed zoom target.
    pub zoom_target: bool,
    pub panel: Option<ActionPanel>,
}

/// Receives draw requests in walk order.
pub trait DrawSink {
    fn draw(&mut self, request: DrawRequest);

    /// Called after the children of a descended node.
    fn exit(&mut self, _node: TraceId) {}
}

impl DrawSink for Vec<DrawRequest> {
    fn draw(&mut self, request: DrawRequest) {
        self.push(request);
    }
}

/// An error as shown to the author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfacedError {
    pub origin: NodeKey,
    pub message: String,
}

impl From<&ErrorWrapper> for SurfacedError {
    fn from(w: &ErrorWrapper) -> Self {
        Self {
            origin: w.origin.clone(),
            message: w.error.to_string(),
        }
    }
}

/// Summary of one walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkReport {
    pub focus: TraceId,
    pub action: Option<String>,
    pub drawn: usize,
    pub evaluations: usize,
    pub todo: Vec<NodeKey>,
    pub pass_through: Vec<NodeKey>,
    /// Errors shown at their origin, one per origin.
    pub errors: Vec<SurfacedError>,
    /// The error that escaped evaluation of the focused node, if any.
    pub escaped: Option<SurfacedError>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Labels
// ══════════════════════════════════════════════════════════════════════════════

/// Label text, truncated after `max_len` characters when it contains a space.
pub fn label_for(node: &TraceNode, max_len: usize) -> String {
    if node.is_whitespace() {
        return WHITESPACE_LABEL.to_string();
    }
    let text = &node.display_string;
    if text.chars().count() > max_len && text.contains(' ') {
        let mut short: String = text.chars().take(max_len).collect();
        short.push(ELLIPSIS);
        short
    } else {
        text.clone()
    }
}

/// Blackholes, sequences and alternations, failed rule applications and
/// expressions the author never wrote carry no label.
pub fn is_labeled(node: &TraceNode) -> bool {
    if node.is_blackhole() || node.expr.is_combinator() {
        return false;
    }
    if node.rule_name().is_some() {
        return node.succeeded;
    }
    node.expr.source.is_some()
}

// ══════════════════════════════════════════════════════════════════════════════
// Driver
// ══════════════════════════════════════════════════════════════════════════════

pub(crate) struct WalkDriver<'a, S: DrawSink + ?Sized> {
    pub trace: &'a Trace,
    pub config: &'a SessionConfig,
    pub action: Option<&'a ActionDefinition>,
    pub edit_cache: &'a BTreeMap<String, ActionSource>,
    pub memo: &'a mut MemoStore,
    pub last_edited: &'a mut Option<NodeKey>,
    pub zoom_target: Option<TraceId>,
    pub sink: &'a mut S,
}

impl<S: DrawSink + ?Sized> WalkDriver<'_, S> {
    pub fn run(mut self, focus: TraceId) -> WalkReport {
        self.memo.clear();
        debug!(focus = %focus, action = ?self.action.map(ActionDefinition::name), "walk start");

        let trace = self.trace;
        let escaped = trace
            .get(focus)
            .and_then(|n| n.cst)
            .and_then(|cst| self.evaluate(cst))
            .and_then(|outcome| outcome.error().map(SurfacedError::from));
        if let Some(err) = &escaped {
            warn!(origin = %err.origin, message = %err.message, "evaluation error");
        }

        let mut visitor = Visitor {
            driver: &mut self,
            drawn: 0,
            errors: Vec::new(),
        };
        trace.walk(focus, &mut visitor);
        let drawn = visitor.drawn;
        let errors = visitor.errors;

        let report = WalkReport {
            focus,
            action: self.action.map(|a| a.name().to_string()),
            drawn,
            evaluations: self.memo.evaluations(),
            todo: self.memo.todo().map(<[_]>::to_vec).unwrap_or_default(),
            pass_through: self.memo.pass_through().map(<[_]>::to_vec).unwrap_or_default(),
            errors,
            escaped,
        };
        debug!(
            focus = %focus,
            drawn = report.drawn,
            entries = self.memo.len(),
            evaluations = report.evaluations,
            todo = report.todo.len(),
            errors = report.errors.len(),
            "walk end"
        );
        report
    }

    fn evaluate(&mut self, cst: CstId) -> Option<Outcome> {
        let action = self.action?;
        let mut eval = Evaluator::new(self.trace, action, &mut *self.memo, self.config.gas_limit);
        Some(eval.evaluate(cst))
    }

    /// Outcome for `key`, evaluating `cst` first if nothing is recorded.
    fn outcome_for(&mut self, cst: CstId, key: &NodeKey) -> Option<Outcome> {
        if let Some(outcome) = self.memo.get(key) {
            return Some(outcome.clone());
        }
        self.evaluate(cst)
    }

    fn panel(&mut self, id: TraceId, node: &TraceNode, cst: CstId) -> Option<ActionPanel> {
        let action = self.action?;
        let rule = node.rule_name()?;
        if !node.succeeded || rule == "spaces" {
            return None;
        }
        let trace = self.trace;
        let cst_node = trace.cst.get(cst.index())?;
        let key = NodeKey::of(cst_node, action.name());
        let outcome = self.outcome_for(cst, &key)?;

        let todo = self.memo.is_todo(&key);
        let marked = match &outcome {
            Outcome::Errored(w) => w.origin == key,
            Outcome::Failed => todo || self.no_child_results(cst_node.children.as_slice(), action),
            Outcome::Succeeded(_) | Outcome::Pending => false,
        };
        if matches!(outcome, Outcome::Succeeded(_)) && self.last_edited.as_ref() == Some(&key) {
            *self.last_edited = None;
        }
        let editor_open = marked && self.last_edited.as_ref() == Some(&key);

        let source = self
            .edit_cache
            .get(rule)
            .cloned()
            .or_else(|| action.source(rule))
            .unwrap_or_default();
        let arguments = argument_expr(trace, id)
            .map(argument_signature)
            .unwrap_or_default();

        Some(ActionPanel {
            action: action.name().to_string(),
            result: ResultView::of(&outcome, &key),
            pass_through: self.memo.is_pass_through(&key),
            rule: rule.to_string(),
            key,
            source,
            arguments,
            todo,
            marked,
            editor_open,
        })
    }

    /// True when no CST child has a recorded result.
    fn no_child_results(&self, children: &[CstId], action: &ActionDefinition) -> bool {
        children.iter().all(|c| {
            self.trace
                .cst
                .get(c.index())
                .map_or(true, |n| !self.memo.has(&NodeKey::of(n, action.name())))
        })
    }
}

struct Visitor<'d, 'a, S: DrawSink + ?Sized> {
    driver: &'d mut WalkDriver<'a, S>,
    drawn: usize,
    errors: Vec<SurfacedError>,
}

impl<S: DrawSink + ?Sized> TraceVisitor for Visitor<'_, '_, S> {
    fn enter(
        &mut self,
        trace: &Trace,
        id: TraceId,
        _parent: Option<TraceId>,
        depth: usize,
    ) -> VisitAction {
        let node = trace.node(id);
        if !self.driver.config.show_failures && !node.succeeded {
            return VisitAction::Skip;
        }
        let whitespace = node.is_whitespace();
        if whitespace && node.interval.is_empty() {
            return VisitAction::Skip;
        }
        let primitive = node.expr.is_primitive();
        let leaf = primitive || node.is_blackhole() || whitespace || node.children.is_empty();

        let input = (node.succeeded && node.replaced_by.is_none()).then(|| {
            if !leaf {
                String::new()
            } else if whitespace {
                WHITESPACE_INPUT.to_string()
            } else {
                trace.text(node.interval).to_string()
            }
        });

        let key = match (node.cst, self.driver.action) {
            (Some(cst), Some(action)) => trace
                .cst
                .get(cst.index())
                .map(|c| NodeKey::of(c, action.name())),
            _ => None,
        };
        let panel = node.cst.and_then(|cst| self.driver.panel(id, node, cst));
        if let Some(ResultView::Error {
            origin,
            message,
            is_origin: true,
        }) = panel.as_ref().map(|p| &p.result)
        {
            if !self.errors.iter().any(|e| &e.origin == origin) {
                self.errors.push(SurfacedError {
                    origin: origin.clone(),
                    message: message.clone(),
                });
            }
        }

        self.driver.sink.draw(DrawRequest {
            node: id,
            depth,
            key,
            label: label_for(node, self.driver.config.label_max_len),
            succeeded: node.succeeded,
            labeled: is_labeled(node),
            leaf,
            primitive,
            whitespace,
            input,
            zoom_target: self.driver.zoom_target == Some(id),
            panel,
        });
        self.drawn += 1;

        if leaf {
            VisitAction::Skip
        } else {
            VisitAction::Descend
        }
    }

    fn exit(&mut self, _trace: &Trace, id: TraceId, _parent: Option<TraceId>, _depth: usize) {
        self.driver.sink.exit(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semviz_types::pexpr::PExpr;
    use semviz_types::trace::Interval;

    fn node(expr: PExpr, display: &str) -> TraceNode {
        TraceNode {
            expr,
            interval: Interval::new(0, 1),
            children: Vec::new(),
            succeeded: true,
            replaced_by: None,
            display_string: display.to_string(),
            cst: None,
        }
    }

    #[test]
    fn test_label_truncation() {
        let long = node(PExpr::apply("R"), "(Alpha Beta Gamma Delta)");
        assert_eq!(label_for(&long, 20), "(Alpha Beta Gamma De\u{2026}");
        let no_space = node(PExpr::apply("R"), "AVeryLongRuleNameWithoutSpaces");
        assert_eq!(label_for(&no_space, 20), "AVeryLongRuleNameWithoutSpaces");
        let ws = node(PExpr::apply("spaces"), "spaces");
        assert_eq!(label_for(&ws, 20), WHITESPACE_LABEL);
    }

    #[test]
    fn test_labeling_policy() {
        assert!(is_labeled(&node(PExpr::apply("Num"), "Num")));
        let mut failed = node(PExpr::apply("Num"), "Num");
        failed.succeeded = false;
        assert!(!is_labeled(&failed));
        assert!(!is_labeled(&node(PExpr::seq(vec![]), "()")));
        assert!(!is_labeled(&node(PExpr::terminal("+"), "\"+\"")));
        assert!(is_labeled(&node(PExpr::terminal("+").at(4, 7), "\"+\"")));
        assert!(!is_labeled(&node(PExpr::terminal("x").at(0, 3), "space")));
    }
}
