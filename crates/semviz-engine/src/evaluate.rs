//! Action evaluation over the CST.
//!
//! [`Evaluator::evaluate`] computes one node's [`Outcome`] under one action
//! and records it in the [`MemoStore`] before returning, whatever path it
//! took. Callers find out whether a descendant failed from the store alone.
//!
//! Rules with a compiled body run it with every child's result bound. Rules
//! without one fall back to the default dispatch: a single child is passed
//! through, anything else is recorded as todo and fails without evaluating
//! its children.
//!
//! Nodes waiting on their children live on an explicit stack, so the depth
//! of the CST is limited by memory rather than by the native stack.

use crate::key::NodeKey;
use crate::memo::{ErrorWrapper, MemoStore, Outcome};
use crate::registry::{ActionDefinition, ActionKind};
use semviz_compiler::CompiledAction;
use semviz_eval::Value;
use semviz_types::trace::{CstId, CstKind, CstNode, Trace};
use tracing::{debug, trace};

/// Evaluates one action over a trace's CST, writing into `memo`.
pub struct Evaluator<'a> {
    trace: &'a Trace,
    action: &'a ActionDefinition,
    memo: &'a mut MemoStore,
    gas_limit: u64,
}

/// How a node combines its children's results.
#[derive(Clone, Copy)]
enum Mode<'a> {
    Compiled(&'a CompiledAction),
    PassThrough,
    Iter,
}

/// A node whose children are being evaluated.
struct Frame<'a> {
    node: &'a CstNode,
    key: NodeKey,
    mode: Mode<'a>,
    next: usize,
    results: Vec<Value>,
    failed: bool,
}

impl Frame<'_> {
    /// Take the next child's outcome. Returns the node's own outcome when
    /// the remaining children no longer matter.
    fn accept(&mut self, child: Outcome, permissive: bool) -> Option<Outcome> {
        match (self.mode, child) {
            (_, Outcome::Errored(w)) => Some(propagate(Outcome::Errored(w), permissive)),
            (Mode::PassThrough, child) => Some(propagate(child, permissive)),
            (_, Outcome::Succeeded(v)) => {
                self.results.push(v);
                None
            }
            (Mode::Compiled(_), Outcome::Failed | Outcome::Pending) => {
                self.results.push(Value::Nil);
                None
            }
            (Mode::Iter, Outcome::Failed | Outcome::Pending) => {
                self.failed = true;
                None
            }
        }
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(
        trace: &'a Trace,
        action: &'a ActionDefinition,
        memo: &'a mut MemoStore,
        gas_limit: u64,
    ) -> Self {
        Self {
            trace,
            action,
            memo,
            gas_limit,
        }
    }

    pub fn key_of(&self, node: &CstNode) -> NodeKey {
        NodeKey::of(node, self.action.name())
    }

    /// Evaluate `id` and record its outcome.
    ///
    /// Attributes reuse a finished entry. Operations always recompute.
    pub fn evaluate(&mut self, id: CstId) -> Outcome {
        let mut stack: Vec<Frame<'a>> = Vec::new();
        let mut finished = self.enter(id, &mut stack);
        while let Some(frame) = stack.last_mut() {
            let early = match finished.take() {
                Some(child) => frame.accept(child, self.memo.permissive()),
                None => None,
            };
            if early.is_none() {
                if let Some(&child) = frame.node.children.get(frame.next) {
                    frame.next += 1;
                    finished = self.enter(child, &mut stack);
                    continue;
                }
            }
            let Some(frame) = stack.pop() else { break };
            finished = Some(self.finish(frame, early));
        }
        finished.unwrap_or(Outcome::Failed)
    }

    /// Start on `id`. Returns its outcome if it is already known or needs no
    /// children, otherwise pushes a frame for it.
    fn enter(&mut self, id: CstId, stack: &mut Vec<Frame<'a>>) -> Option<Outcome> {
        let trace = self.trace;
        let Some(node) = trace.cst.get(id.index()) else {
            return Some(Outcome::Failed);
        };
        let key = self.key_of(node);
        if self.action.kind() == ActionKind::Attribute {
            match self.memo.get(&key) {
                None | Some(Outcome::Pending) => {}
                Some(done) => return Some(done.clone()),
            }
        }

        self.memo.set(key.clone(), Outcome::Pending);
        self.memo.count_evaluation();
        let action = self.action;
        let mode = match (action.get(node.ctor_name()), &node.kind) {
            (Some(compiled), _) => Mode::Compiled(compiled),
            (None, CstKind::Nonterminal { .. }) if node.children.len() == 1 => {
                self.memo.record_pass_through(key.clone());
                Mode::PassThrough
            }
            (None, CstKind::Nonterminal { .. }) => {
                self.memo.record_todo(key.clone());
                return Some(self.record(key, Outcome::Failed));
            }
            (None, CstKind::Terminal) => {
                let text = Value::string(trace.text(node.interval));
                return Some(self.record(key, Outcome::Succeeded(text)));
            }
            (None, CstKind::Iter) => Mode::Iter,
        };
        stack.push(Frame {
            node,
            key,
            mode,
            next: 0,
            results: Vec::with_capacity(node.children.len()),
            failed: false,
        });
        None
    }

    /// Complete a frame whose children are done, or that ended early.
    fn finish(&mut self, frame: Frame<'a>, early: Option<Outcome>) -> Outcome {
        let Frame {
            node,
            key,
            mode,
            results,
            failed,
            ..
        } = frame;
        let outcome = match (early, mode) {
            (Some(outcome), _) => outcome,
            (None, Mode::Compiled(compiled)) => self.run_compiled(compiled, node, &key, results),
            (None, Mode::Iter) if failed => Outcome::Failed,
            (None, Mode::Iter) => Outcome::Succeeded(Value::List(results)),
            // a single child always ends the frame early
            (None, Mode::PassThrough) => Outcome::Failed,
        };
        self.record(key, outcome)
    }

    fn record(&mut self, key: NodeKey, outcome: Outcome) -> Outcome {
        trace!(key = %key, outcome = ?outcome, "evaluated");
        self.memo.set(key, outcome.clone());
        outcome
    }

    fn run_compiled(
        &mut self,
        compiled: &CompiledAction,
        node: &CstNode,
        key: &NodeKey,
        args: Vec<Value>,
    ) -> Outcome {
        let this = Value::record([
            ("rule", Value::string(node.ctor_name())),
            ("source", Value::string(self.trace.text(node.interval))),
            ("start", Value::Number(node.interval.start as f64)),
            ("end", Value::Number(node.interval.end as f64)),
            ("args", Value::List(args.clone())),
        ]);
        let output = compiled.run(compiled.environment(&args, this), self.gas_limit);
        for line in &output.log {
            debug!(target: "semviz::action", key = %key, "{line}");
        }

        match output.result {
            Ok(value) => {
                if self.any_child_failed(node) {
                    Outcome::Failed
                } else {
                    Outcome::Succeeded(value)
                }
            }
            Err(error) if self.memo.permissive() => {
                trace!(key = %key, %error, "error suppressed while rules are todo");
                Outcome::Failed
            }
            Err(error) => Outcome::Errored(ErrorWrapper {
                origin: key.clone(),
                error,
            }),
        }
    }

    fn any_child_failed(&self, node: &CstNode) -> bool {
        node.children.iter().any(|&child| {
            self.trace
                .cst
                .get(child.index())
                .is_some_and(|c| self.memo.is_failed(&self.key_of(c)))
        })
    }
}

/// A child's error reaches the caller unchanged unless the walk is
/// permissive, in which case it becomes a failure.
fn propagate(outcome: Outcome, permissive: bool) -> Outcome {
    match outcome {
        Outcome::Errored(_) if permissive => Outcome::Failed,
        other => other,
    }
}
