//! The read-only trace of one grammar match.
//!
//! A [`Trace`] holds two arenas: the derivation steps the matcher took
//! ([`TraceNode`], including failed attempts) and the concrete syntax tree
//! built from the successful ones ([`CstNode`]). Actions run over CST nodes;
//! the walk visits trace nodes. A trace node that produced a CST node links
//! to it through [`TraceNode::cst`].

use crate::pexpr::{Grammar, IterOp, PExpr};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ══════════════════════════════════════════════════════════════════════════════
// Ids & Intervals
// ══════════════════════════════════════════════════════════════════════════════

/// Index of a [`TraceNode`] in its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub u32);

/// Index of a [`CstNode`] in its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CstId(pub u32);

impl TraceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl CstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for CstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Half-open byte range `[start, end)` into the matched input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest interval covering both.
    pub fn cover(self, other: Interval) -> Interval {
        Interval::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CstKind {
    Nonterminal { rule_name: String },
    Terminal,
    Iter,
}

/// A concrete syntax tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CstNode {
    pub kind: CstKind,
    pub interval: Interval,
    #[serde(default)]
    pub children: Vec<CstId>,
}

impl CstNode {
    /// Constructor name used to address actions and memo entries.
    pub fn ctor_name(&self) -> &str {
        match &self.kind {
            CstKind::Nonterminal { rule_name } => rule_name,
            CstKind::Terminal => "_terminal",
            CstKind::Iter => "_iter",
        }
    }

    pub fn rule_name(&self) -> Option<&str> {
        match &self.kind {
            CstKind::Nonterminal { rule_name } => Some(rule_name),
            _ => None,
        }
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self.kind, CstKind::Nonterminal { .. })
    }
}

/// One step of the matcher: an expression tried at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceNode {
    pub expr: PExpr,
    pub interval: Interval,
    #[serde(default)]
    pub children: Vec<TraceId>,
    pub succeeded: bool,
    /// Set when this node's result was superseded by another node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<TraceId>,
    pub display_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cst: Option<CstId>,
}

impl TraceNode {
    pub fn rule_name(&self) -> Option<&str> {
        self.expr.rule_name()
    }

    /// Application of the implicit whitespace-skipping rule.
    pub fn is_whitespace(&self) -> bool {
        self.rule_name() == Some("spaces")
    }

    /// Redirected nodes and the `space` / `empty` markers are suppressed.
    pub fn is_blackhole(&self) -> bool {
        self.replaced_by.is_some()
            || self.display_string == "space"
            || self.display_string == "empty"
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Trace
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("invalid trace JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trace has no nodes")]
    Empty,
    #[error("trace node {0} does not exist")]
    DanglingTraceId(TraceId),
    #[error("CST node {0} does not exist")]
    DanglingCstId(CstId),
    #[error("interval {interval} of {node} lies outside the input (length {input_len})")]
    OutsideInput {
        node: String,
        interval: Interval,
        input_len: usize,
    },
    #[error("child {child} ({child_interval}) escapes parent {parent} ({parent_interval})")]
    ChildOutsideParent {
        parent: String,
        parent_interval: Interval,
        child: String,
        child_interval: Interval,
    },
    #[error("trace node {0} is reachable from itself")]
    Cycle(TraceId),
    #[error("CST node {0} is reachable from itself")]
    CstCycle(CstId),
}

/// Returned by [`TraceVisitor::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitAction {
    Descend,
    Skip,
}

/// Depth-first trace callbacks.
///
/// `exit` is only called for nodes whose `enter` returned
/// [`VisitAction::Descend`], after all their children.
pub trait TraceVisitor {
    fn enter(
        &mut self,
        trace: &Trace,
        node: TraceId,
        parent: Option<TraceId>,
        depth: usize,
    ) -> VisitAction;

    fn exit(&mut self, _trace: &Trace, _node: TraceId, _parent: Option<TraceId>, _depth: usize) {}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub input: String,
    #[serde(default)]
    pub grammar: Grammar,
    pub nodes: Vec<TraceNode>,
    #[serde(default)]
    pub cst: Vec<CstNode>,
    pub root: TraceId,
}

impl Trace {
    /// Parse and validate a trace produced by an external matcher.
    pub fn from_json(json: &str) -> Result<Self, TraceError> {
        let trace: Trace = serde_json::from_str(json)?;
        trace.validate()?;
        Ok(trace)
    }

    /// Look up a trace node. Ids are only meaningful for the trace that
    /// issued them.
    pub fn node(&self, id: TraceId) -> &TraceNode {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: TraceId) -> Option<&TraceNode> {
        self.nodes.get(id.index())
    }

    pub fn cst_node(&self, id: CstId) -> &CstNode {
        &self.cst[id.index()]
    }

    pub fn root_node(&self) -> &TraceNode {
        self.node(self.root)
    }

    /// Whether the whole match succeeded.
    pub fn succeeded(&self) -> bool {
        self.get(self.root).is_some_and(|n| n.succeeded)
    }

    /// Input text covered by `interval`; empty when it is out of range or
    /// not on a character boundary.
    pub fn text(&self, interval: Interval) -> &str {
        self.input.get(interval.start..interval.end).unwrap_or("")
    }

    /// Visit trace nodes depth-first starting at `start`.
    pub fn walk<V: TraceVisitor + ?Sized>(&self, start: TraceId, visitor: &mut V) {
        if self.get(start).is_none() {
            return;
        }
        // (node, parent, depth, next child index) for every descended node
        let mut stack: Vec<(TraceId, Option<TraceId>, usize, usize)> = Vec::new();
        if visitor.enter(self, start, None, 0) == VisitAction::Descend {
            stack.push((start, None, 0, 0));
        }
        while let Some(top) = stack.len().checked_sub(1) {
            let (id, parent, depth, next) = stack[top];
            match self.get(id).and_then(|n| n.children.get(next)) {
                Some(&child) => {
                    stack[top].3 += 1;
                    if visitor.enter(self, child, Some(id), depth + 1) == VisitAction::Descend {
                        stack.push((child, Some(id), depth + 1, 0));
                    }
                }
                None => {
                    stack.pop();
                    visitor.exit(self, id, parent, depth);
                }
            }
        }
    }

    /// Check arena references, interval nesting and acyclicity.
    pub fn validate(&self) -> Result<(), TraceError> {
        if self.nodes.is_empty() {
            return Err(TraceError::Empty);
        }
        self.check_trace_id(self.root)?;
        let input_len = self.input.len();

        for (i, node) in self.nodes.iter().enumerate() {
            let id = TraceId(i as u32);
            if node.interval.start > node.interval.end || node.interval.end > input_len {
                return Err(TraceError::OutsideInput {
                    node: id.to_string(),
                    interval: node.interval,
                    input_len,
                });
            }
            if let Some(by) = node.replaced_by {
                self.check_trace_id(by)?;
            }
            if let Some(cst) = node.cst {
                self.check_cst_id(cst)?;
            }
            for &child in &node.children {
                self.check_trace_id(child)?;
                let child_node = self.node(child);
                if node.succeeded
                    && child_node.succeeded
                    && !node.interval.contains(&child_node.interval)
                {
                    return Err(TraceError::ChildOutsideParent {
                        parent: id.to_string(),
                        parent_interval: node.interval,
                        child: child.to_string(),
                        child_interval: child_node.interval,
                    });
                }
            }
        }

        for (i, node) in self.cst.iter().enumerate() {
            let id = CstId(i as u32);
            if node.interval.start > node.interval.end || node.interval.end > input_len {
                return Err(TraceError::OutsideInput {
                    node: id.to_string(),
                    interval: node.interval,
                    input_len,
                });
            }
            for &child in &node.children {
                self.check_cst_id(child)?;
                let child_interval = self.cst_node(child).interval;
                if !node.interval.contains(&child_interval) {
                    return Err(TraceError::ChildOutsideParent {
                        parent: id.to_string(),
                        parent_interval: node.interval,
                        child: child.to_string(),
                        child_interval,
                    });
                }
            }
        }

        self.check_acyclic()
    }

    fn check_trace_id(&self, id: TraceId) -> Result<(), TraceError> {
        match self.get(id) {
            Some(_) => Ok(()),
            None => Err(TraceError::DanglingTraceId(id)),
        }
    }

    fn check_cst_id(&self, id: CstId) -> Result<(), TraceError> {
        if id.index() < self.cst.len() {
            Ok(())
        } else {
            Err(TraceError::DanglingCstId(id))
        }
    }

    fn check_acyclic(&self) -> Result<(), TraceError> {
        let trace_cycle = first_cycle(self.nodes.len(), |node, i| {
            self.nodes[node].children.get(i).map(|c| c.index())
        });
        if let Some(node) = trace_cycle {
            return Err(TraceError::Cycle(TraceId(node as u32)));
        }
        let cst_cycle = first_cycle(self.cst.len(), |node, i| {
            self.cst[node].children.get(i).map(|c| c.index())
        });
        match cst_cycle {
            Some(node) => Err(TraceError::CstCycle(CstId(node as u32))),
            None => Ok(()),
        }
    }
}

/// Iterative three-colour DFS over `len` nodes whose `i`-th child is
/// `child(node, i)`. Returns a node that is reachable from itself.
fn first_cycle(len: usize, child: impl Fn(usize, usize) -> Option<usize>) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }
    let mut marks = vec![Mark::New; len];
    for start in 0..len {
        if marks[start] != Mark::New {
            continue;
        }
        // (node, next child index)
        let mut stack = vec![(start, 0usize)];
        marks[start] = Mark::Open;
        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next) = stack[top];
            match child(node, next) {
                Some(c) => {
                    stack[top].1 += 1;
                    match marks[c] {
                        Mark::Open => return Some(c),
                        Mark::New => {
                            marks[c] = Mark::Open;
                            stack.push((c, 0));
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    None
}

// ══════════════════════════════════════════════════════════════════════════════
// Builder
// ══════════════════════════════════════════════════════════════════════════════

/// A partially built match: its trace node plus the CST nodes it binds
/// into its parent (a sequence binds one per factor).
#[derive(Debug, Clone)]
pub struct Piece {
    pub node: TraceId,
    pub bindings: Vec<CstId>,
}

/// Builds a consistent trace and CST bottom-up.
///
/// ```
/// use semviz_types::trace::TraceBuilder;
/// use semviz_types::pexpr::PExpr;
///
/// let mut b = TraceBuilder::new("2+3");
/// b.rule("Num", PExpr::range('0', '9'));
/// let digit = b.range(0, '0', '9');
/// let num = b.apply("Num", digit);
/// let trace = b.finish(num).unwrap();
/// assert_eq!(trace.text(trace.root_node().interval), "2");
/// ```
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    input: String,
    grammar: Grammar,
    nodes: Vec<TraceNode>,
    cst: Vec<CstNode>,
}

impl TraceBuilder {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            grammar: Grammar::new(),
            nodes: Vec::new(),
            cst: Vec::new(),
        }
    }

    /// Record a rule body in the grammar.
    pub fn rule(&mut self, name: impl Into<String>, body: PExpr) -> &mut Self {
        self.grammar.define(name, body);
        self
    }

    pub fn interval_of(&self, piece: &Piece) -> Interval {
        self.nodes[piece.node.index()].interval
    }

    /// Literal `text` matched at `start`.
    pub fn terminal(&mut self, start: usize, text: &str) -> Piece {
        let interval = Interval::new(start, start + text.len());
        self.leaf(PExpr::terminal(text), interval)
    }

    /// One character in `from..to` matched at `start`.
    pub fn range(&mut self, start: usize, from: char, to: char) -> Piece {
        let width = self
            .input
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8);
        self.leaf(PExpr::range(from, to), Interval::new(start, start + width))
    }

    fn leaf(&mut self, expr: PExpr, interval: Interval) -> Piece {
        let cst = self.push_cst(CstKind::Terminal, interval, Vec::new());
        let node = self.push_node(expr, interval, Vec::new(), true, Some(cst));
        Piece {
            node,
            bindings: vec![cst],
        }
    }

    /// Successful application of `rule_name` whose body matched `body`.
    pub fn apply(&mut self, rule_name: &str, body: Piece) -> Piece {
        let interval = self.interval_of(&body);
        let cst = self.push_cst(
            CstKind::Nonterminal {
                rule_name: rule_name.to_string(),
            },
            interval,
            body.bindings,
        );
        let node = self.push_node(
            PExpr::apply(rule_name),
            interval,
            vec![body.node],
            true,
            Some(cst),
        );
        Piece {
            node,
            bindings: vec![cst],
        }
    }

    /// Sequence of factors; binds every factor's CST nodes in order.
    pub fn seq(&mut self, parts: Vec<Piece>) -> Piece {
        let interval = self.span_of(&parts, 0);
        let expr = PExpr::seq(self.exprs_of(&parts));
        let children = parts.iter().map(|p| p.node).collect();
        let bindings = parts.into_iter().flat_map(|p| p.bindings).collect();
        let node = self.push_node(expr, interval, children, true, None);
        Piece { node, bindings }
    }

    /// Alternation over `attempts` in the order they were tried. The first
    /// successful attempt is the match; with none the alternation fails.
    pub fn alt(&mut self, attempts: Vec<Piece>) -> Piece {
        let expr = PExpr::alt(self.exprs_of(&attempts));
        let winner = attempts
            .iter()
            .find(|p| self.nodes[p.node.index()].succeeded)
            .cloned();
        let children = attempts.iter().map(|p| p.node).collect();
        match winner {
            Some(win) => {
                let interval = self.interval_of(&win);
                let node = self.push_node(expr, interval, children, true, None);
                Piece {
                    node,
                    bindings: win.bindings,
                }
            }
            None => {
                let at = attempts
                    .first()
                    .map_or(0, |p| self.nodes[p.node.index()].interval.start);
                let node = self.push_node(expr, Interval::new(at, at), children, false, None);
                Piece {
                    node,
                    bindings: Vec::new(),
                }
            }
        }
    }

    /// Repetition of `inner` starting at `start`; binds a single `_iter`
    /// CST node holding every repetition's bindings.
    pub fn iter(&mut self, op: IterOp, inner: PExpr, start: usize, parts: Vec<Piece>) -> Piece {
        let interval = self.span_of(&parts, start);
        let children = parts.iter().map(|p| p.node).collect();
        let cst_children = parts.into_iter().flat_map(|p| p.bindings).collect();
        let cst = self.push_cst(CstKind::Iter, interval, cst_children);
        let node = self.push_node(PExpr::iter(inner, op), interval, children, true, Some(cst));
        Piece {
            node,
            bindings: vec![cst],
        }
    }

    /// A failed attempt of `expr` at `at`. Binds nothing.
    pub fn failed(&mut self, expr: PExpr, at: usize) -> Piece {
        let node = self.push_node(expr, Interval::new(at, at), Vec::new(), false, None);
        Piece {
            node,
            bindings: Vec::new(),
        }
    }

    /// Implicit whitespace skipped over `start..end`. Binds nothing.
    pub fn spaces(&mut self, start: usize, end: usize) -> Piece {
        let node = self.push_node(
            PExpr::apply("spaces"),
            Interval::new(start, end),
            Vec::new(),
            true,
            None,
        );
        Piece {
            node,
            bindings: Vec::new(),
        }
    }

    /// Mark `piece`'s node as superseded by `by`.
    pub fn redirect(&mut self, piece: &Piece, by: TraceId) {
        self.nodes[piece.node.index()].replaced_by = Some(by);
    }

    /// Attach a grammar source interval to `piece`'s expression.
    pub fn sourced(&mut self, piece: Piece, start: usize, end: usize) -> Piece {
        let node = &mut self.nodes[piece.node.index()];
        node.expr.source = Some(Interval::new(start, end));
        piece
    }

    /// Finish with `root` as the top-level result.
    pub fn finish(self, root: Piece) -> Result<Trace, TraceError> {
        let trace = Trace {
            input: self.input,
            grammar: self.grammar,
            nodes: self.nodes,
            cst: self.cst,
            root: root.node,
        };
        trace.validate()?;
        Ok(trace)
    }

    fn exprs_of(&self, parts: &[Piece]) -> Vec<PExpr> {
        parts
            .iter()
            .map(|p| self.nodes[p.node.index()].expr.clone())
            .collect()
    }

    fn span_of(&self, parts: &[Piece], fallback: usize) -> Interval {
        parts
            .iter()
            .filter(|p| self.nodes[p.node.index()].succeeded)
            .map(|p| self.interval_of(p))
            .reduce(Interval::cover)
            .unwrap_or(Interval::new(fallback, fallback))
    }

    fn push_node(
        &mut self,
        expr: PExpr,
        interval: Interval,
        children: Vec<TraceId>,
        succeeded: bool,
        cst: Option<CstId>,
    ) -> TraceId {
        let id = TraceId(self.nodes.len() as u32);
        let display_string = expr.display_string();
        self.nodes.push(TraceNode {
            expr,
            interval,
            children,
            succeeded,
            replaced_by: None,
            display_string,
            cst,
        });
        id
    }

    fn push_cst(&mut self, kind: CstKind, interval: Interval, children: Vec<CstId>) -> CstId {
        let id = CstId(self.cst.len() as u32);
        self.cst.push(CstNode {
            kind,
            interval,
            children,
        });
        id
    }
}
