//! Session state that persists between walks.
//!
//! Commands mutate the registry, the navigation stack or the edit cache and
//! schedule a refresh. Hosts call [`Session::tick_at`] with the current time
//! (or [`Session::refresh`] directly) to run the walk.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::key::NodeKey;
use crate::memo::MemoStore;
use crate::navigation::NavigationStack;
use crate::registry::{ActionDefinition, ActionKind, ActionRegistry};
use crate::scheduler::RefreshScheduler;
use crate::walk::{DrawSink, WalkDriver, WalkReport};
use semviz_compiler::{
    argument_expr, argument_signature, compile_action, resolve_arguments, ActionSource,
    ArgumentInfo, Fingerprint,
};
use semviz_types::trace::{Trace, TraceId};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// What a save did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Installed,
    /// The body was empty, so the rule is back on the default dispatch.
    Uninstalled,
    /// Same arguments and body as the installed action; nothing changed.
    Unchanged,
}

pub struct Session {
    config: SessionConfig,
    trace: Option<Trace>,
    registry: ActionRegistry,
    navigation: Option<NavigationStack>,
    scheduler: RefreshScheduler,
    /// Results of the most recent walk.
    memo: MemoStore,
    /// Editor contents per rule for the active action.
    edit_cache: BTreeMap<String, ActionSource>,
    last_edited: Option<NodeKey>,
    now: Duration,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            trace: None,
            registry: ActionRegistry::new(),
            navigation: None,
            scheduler: RefreshScheduler::new(),
            memo: MemoStore::new(),
            edit_cache: BTreeMap::new(),
            last_edited: None,
            now: Duration::ZERO,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Accessors
    // ══════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
        self.request_refresh(Duration::ZERO);
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn active_action(&self) -> Option<&ActionDefinition> {
        self.registry.active()
    }

    pub fn navigation(&self) -> Option<&NavigationStack> {
        self.navigation.as_ref()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn memo(&self) -> &MemoStore {
        &self.memo
    }

    pub fn last_edited(&self) -> Option<&NodeKey> {
        self.last_edited.as_ref()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the session clock forward. Earlier times are ignored.
    pub fn advance_to(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Trace
    // ══════════════════════════════════════════════════════════════════════

    /// Replace the trace. Zoom state and the previous walk's results are
    /// dropped; actions are kept.
    pub fn load_trace(&mut self, trace: Trace) {
        debug!(nodes = trace.nodes.len(), cst = trace.cst.len(), "trace loaded");
        self.navigation = Some(NavigationStack::new(trace.root));
        self.trace = Some(trace);
        self.memo.clear();
        self.last_edited = None;
        self.request_refresh(Duration::ZERO);
    }

    pub fn load_trace_json(&mut self, json: &str) -> SessionResult<()> {
        let trace = Trace::from_json(json)?;
        self.load_trace(trace);
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Actions
    // ══════════════════════════════════════════════════════════════════════

    /// Create an action and make it active.
    pub fn add_action(&mut self, name: &str, kind: ActionKind) -> SessionResult<()> {
        self.registry.add(name, kind)?;
        debug!(action = name, %kind, "action added");
        self.reset_editing();
        self.request_refresh(self.config.select_delay());
        Ok(())
    }

    /// Select `name`, or deselect it if it is already active. Returns
    /// whether an action is active afterwards.
    pub fn select_action(&mut self, name: &str) -> SessionResult<bool> {
        let active = self.registry.toggle(name)?;
        if active {
            self.reset_editing();
        }
        debug!(action = name, active, "action selected");
        self.request_refresh(self.config.select_delay());
        Ok(active)
    }

    pub fn deselect_action(&mut self) {
        self.registry.deselect();
        self.request_refresh(self.config.select_delay());
    }

    /// Inferred arguments for the rule applied at `node`.
    pub fn argument_signature(&self, node: TraceId) -> SessionResult<Vec<ArgumentInfo>> {
        let trace = self.trace.as_ref().ok_or(SessionError::NoTrace)?;
        trace.get(node).ok_or(SessionError::UnknownNode(node))?;
        let expr = argument_expr(trace, node).ok_or(SessionError::NotARule(node))?;
        Ok(argument_signature(expr))
    }

    /// Editor contents for `rule`: unsaved edits, else the installed
    /// source, else empty.
    pub fn action_source(&self, rule: &str) -> ActionSource {
        self.edit_cache
            .get(rule)
            .cloned()
            .or_else(|| self.registry.active().and_then(|a| a.source(rule)))
            .unwrap_or_default()
    }

    /// Remember unsaved editor contents for `rule`.
    pub fn stage_edit(&mut self, rule: &str, source: ActionSource) {
        self.edit_cache.insert(rule.to_string(), source);
    }

    /// Compile `body` for the rule applied at `node` and install it in the
    /// active action.
    ///
    /// A blank body uninstalls the rule's action. A compile error leaves
    /// the installed action alone and drops the rule's unsaved edits.
    pub fn save_action(
        &mut self,
        node: TraceId,
        body: &str,
        arg_overrides: &[Option<String>],
    ) -> SessionResult<SaveOutcome> {
        let trace = self.trace.as_ref().ok_or(SessionError::NoTrace)?;
        let tnode = trace.get(node).ok_or(SessionError::UnknownNode(node))?;
        let (rule, cst) = match (tnode.rule_name(), tnode.cst) {
            (Some(rule), Some(cst)) => (rule.to_string(), trace.cst_node(cst)),
            _ => return Err(SessionError::NotARule(node)),
        };
        let defaults: Vec<String> = argument_expr(trace, node)
            .map(argument_signature)
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.default_name)
            .collect();

        let action = self.registry.active_mut().ok_or(SessionError::NoActiveAction)?;
        let action_name = action.name().to_string();
        let key = NodeKey::of(cst, &action_name);
        self.last_edited = Some(key);

        if body.trim().is_empty() {
            action.uninstall(&rule);
            self.edit_cache.remove(&rule);
            debug!(action = %action_name, rule = %rule, "action uninstalled");
            self.request_refresh(self.config.save_delay());
            return Ok(SaveOutcome::Uninstalled);
        }

        let compiled = resolve_arguments(&action_name, &rule, &defaults, arg_overrides)
            .and_then(|args| {
                let unchanged = action
                    .get(&rule)
                    .is_some_and(|c| c.fingerprint() == Fingerprint::of(&args, body));
                if unchanged {
                    Ok(None)
                } else {
                    compile_action(&action_name, &rule, args, body).map(Some)
                }
            });
        match compiled {
            Ok(None) => {
                self.edit_cache.remove(&rule);
                debug!(action = %action_name, rule = %rule, "save unchanged");
                Ok(SaveOutcome::Unchanged)
            }
            Ok(Some(compiled)) => {
                self.edit_cache.insert(rule.clone(), compiled.decompile());
                debug!(
                    action = %action_name,
                    rule = %rule,
                    fingerprint = %compiled.fingerprint(),
                    "action installed"
                );
                action.install(compiled);
                self.request_refresh(self.config.save_delay());
                Ok(SaveOutcome::Installed)
            }
            Err(err) => {
                warn!(action = %action_name, rule = %rule, error = %err, "compile failed");
                self.edit_cache.remove(&rule);
                Err(err.into())
            }
        }
    }

    fn reset_editing(&mut self) {
        self.edit_cache.clear();
        self.last_edited = None;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Zoom
    // ══════════════════════════════════════════════════════════════════════

    pub fn zoom_in(&mut self, node: TraceId) -> bool {
        if !self.has_node(node) {
            return false;
        }
        let changed = self.navigation.as_mut().is_some_and(|nav| nav.zoom_in(node));
        if changed {
            self.request_refresh(self.config.zoom_delay());
        }
        changed
    }

    pub fn zoom_out(&mut self, node: TraceId) -> bool {
        let changed = self.navigation.as_mut().is_some_and(|nav| nav.zoom_out(node));
        if changed {
            self.request_refresh(self.config.zoom_delay());
        }
        changed
    }

    /// Zoom out of `node` if it is a zoom frame, otherwise zoom into it.
    pub fn toggle_zoom(&mut self, node: TraceId) -> bool {
        let zoomed_at = self
            .navigation
            .as_ref()
            .is_some_and(|nav| nav.frames().iter().skip(1).any(|f| f.target == node));
        if zoomed_at {
            self.zoom_out(node)
        } else {
            self.zoom_in(node)
        }
    }

    /// Walk `node` instead of the committed focus until the preview ends.
    pub fn preview_enter(&mut self, node: TraceId) {
        if !self.has_node(node) {
            return;
        }
        if let Some(nav) = self.navigation.as_mut() {
            nav.preview_enter(node);
            self.request_refresh(self.config.zoom_delay());
        }
    }

    pub fn preview_exit(&mut self) {
        if let Some(nav) = self.navigation.as_mut() {
            nav.preview_exit();
            self.request_refresh(self.config.zoom_delay());
        }
    }

    fn has_node(&self, node: TraceId) -> bool {
        self.trace.as_ref().is_some_and(|trace| trace.get(node).is_some())
    }

    /// Leave zoom mode entirely.
    pub fn exit_zoom(&mut self) {
        if let Some(nav) = self.navigation.as_mut() {
            nav.reset();
            self.request_refresh(self.config.exit_zoom_delay());
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Refresh
    // ══════════════════════════════════════════════════════════════════════

    /// Schedule a refresh `delay` from now, replacing any pending one.
    pub fn request_refresh(&mut self, delay: Duration) {
        let generation = self.scheduler.request_at(delay, self.now);
        debug!(generation, delay_ms = delay.as_millis() as u64, "refresh requested");
    }

    /// Advance the clock to `now` and run the pending refresh if it is due.
    pub fn tick_at<S: DrawSink + ?Sized>(
        &mut self,
        now: Duration,
        sink: &mut S,
    ) -> SessionResult<Option<WalkReport>> {
        self.advance_to(now);
        if !self.scheduler.take_due(self.now) {
            return Ok(None);
        }
        self.refresh(sink).map(Some)
    }

    /// Walk the focused subtree now. Any pending refresh is cancelled.
    pub fn refresh<S: DrawSink + ?Sized>(&mut self, sink: &mut S) -> SessionResult<WalkReport> {
        self.scheduler.cancel();
        let trace = self.trace.as_ref().ok_or(SessionError::NoTrace)?;
        let focus = self
            .navigation
            .as_ref()
            .map_or(trace.root, NavigationStack::focus);
        let zoom_target = self.navigation.as_ref().and_then(NavigationStack::zoom_target);
        let driver = WalkDriver {
            trace,
            config: &self.config,
            action: self.registry.active(),
            edit_cache: &self.edit_cache,
            memo: &mut self.memo,
            last_edited: &mut self.last_edited,
            zoom_target,
            sink,
        };
        Ok(driver.run(focus))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
