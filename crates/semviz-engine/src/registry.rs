//! Named action sets and the active-action selection.

use crate::error::{SessionError, SessionResult};
use semviz_compiler::{ActionSource, CompiledAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How an action's results are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Recomputed on every call.
    Operation,
    /// Computed once per node per walk.
    Attribute,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Operation => write!(f, "Operation"),
            ActionKind::Attribute => write!(f, "Attribute"),
        }
    }
}

/// One action: a compiled body per rule. Rules without one use the
/// default dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    name: String,
    kind: ActionKind,
    rules: BTreeMap<String, CompiledAction>,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            rules: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Install `action` for its rule, replacing any previous body.
    pub fn install(&mut self, action: CompiledAction) -> Option<CompiledAction> {
        self.rules.insert(action.rule_name().to_string(), action)
    }

    pub fn uninstall(&mut self, rule_name: &str) -> Option<CompiledAction> {
        self.rules.remove(rule_name)
    }

    pub fn get(&self, rule_name: &str) -> Option<&CompiledAction> {
        self.rules.get(rule_name)
    }

    /// Saved source of the rule's installed body.
    pub fn source(&self, rule_name: &str) -> Option<ActionSource> {
        self.get(rule_name).map(CompiledAction::decompile)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

/// Every action in a session, in insertion order, and which one is active.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<ActionDefinition>,
    active: Option<usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new action and make it active.
    pub fn add(&mut self, name: &str, kind: ActionKind) -> SessionResult<&mut ActionDefinition> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidActionName(name.to_string()));
        }
        if self.position(name).is_some() {
            return Err(SessionError::DuplicateAction(name.to_string()));
        }
        self.actions.push(ActionDefinition::new(name, kind));
        let index = self.actions.len() - 1;
        self.active = Some(index);
        Ok(&mut self.actions[index])
    }

    /// Make `name` active. Returns `false` when it was already active, in
    /// which case it is deselected instead.
    pub fn toggle(&mut self, name: &str) -> SessionResult<bool> {
        let index = self
            .position(name)
            .ok_or_else(|| SessionError::UnknownAction(name.to_string()))?;
        if self.active == Some(index) {
            self.active = None;
            Ok(false)
        } else {
            self.active = Some(index);
            Ok(true)
        }
    }

    pub fn deselect(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&ActionDefinition> {
        self.active.and_then(|i| self.actions.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut ActionDefinition> {
        self.active.and_then(|i| self.actions.get_mut(i))
    }

    pub fn get(&self, name: &str) -> Option<&ActionDefinition> {
        self.position(name).map(|i| &self.actions[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(ActionDefinition::name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.name == name)
    }
}
