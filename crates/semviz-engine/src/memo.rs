//! Per-walk result store.

use crate::key::NodeKey;
use semviz_eval::{EvalError, Value};
use std::collections::BTreeMap;
use std::fmt;

/// An evaluation error tagged with the node whose body raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorWrapper {
    pub origin: NodeKey,
    pub error: EvalError,
}

impl fmt::Display for ErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.error, self.origin)
    }
}

/// What is known about one node's result.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Evaluation has started and not yet finished.
    Pending,
    /// The node, or one of its children, could not produce a value.
    Failed,
    /// A body raised an error that has not been suppressed.
    Errored(ErrorWrapper),
    Succeeded(Value),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorWrapper> {
        match self {
            Outcome::Errored(w) => Some(w),
            _ => None,
        }
    }
}

/// Results keyed by [`NodeKey`], plus the todo and pass-through side lists.
///
/// Both side lists stay `None` until their first entry, so "nothing was
/// todo" is distinguishable from "no todo tracking happened".
#[derive(Debug, Clone, Default)]
pub struct MemoStore {
    entries: BTreeMap<NodeKey, Outcome>,
    todo: Option<Vec<NodeKey>>,
    pass_through: Option<Vec<NodeKey>>,
    evaluations: usize,
}

impl MemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NodeKey) -> Option<&Outcome> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: NodeKey, outcome: Outcome) {
        self.entries.insert(key, outcome);
    }

    pub fn has(&self, key: &NodeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_failed(&self, key: &NodeKey) -> bool {
        self.get(key).is_some_and(Outcome::is_failed)
    }

    pub fn record_todo(&mut self, key: NodeKey) {
        push_unique(self.todo.get_or_insert_with(Vec::new), key);
    }

    pub fn record_pass_through(&mut self, key: NodeKey) {
        push_unique(self.pass_through.get_or_insert_with(Vec::new), key);
    }

    pub fn todo(&self) -> Option<&[NodeKey]> {
        self.todo.as_deref()
    }

    pub fn pass_through(&self) -> Option<&[NodeKey]> {
        self.pass_through.as_deref()
    }

    pub fn is_todo(&self, key: &NodeKey) -> bool {
        self.todo.as_ref().is_some_and(|t| t.contains(key))
    }

    pub fn is_pass_through(&self, key: &NodeKey) -> bool {
        self.pass_through.as_ref().is_some_and(|p| p.contains(key))
    }

    /// Errors are downgraded to failures once any rule in this walk is todo.
    pub fn permissive(&self) -> bool {
        self.todo.is_some()
    }

    pub fn entries(&self) -> &BTreeMap<NodeKey, Outcome> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of dispatches performed, cached attribute hits excluded.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub(crate) fn count_evaluation(&mut self) {
        self.evaluations += 1;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn push_unique(list: &mut Vec<NodeKey>, key: NodeKey) {
    if !list.contains(&key) {
        list.push(key);
    }
}
