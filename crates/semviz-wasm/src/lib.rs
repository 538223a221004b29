//! semviz session as a WASM module for browser environments.
//!
//! Commands take and return JSON strings. Walk output is handed over as a
//! structured JavaScript value.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { VisualizerSession } from 'semviz-wasm';
//!
//! await init();
//!
//! const session = new VisualizerSession('{}');
//! session.load_trace(traceJson);
//! session.add_action('value', 'Operation');
//! JSON.parse(session.save_action(3, 'convert.to_int($1)', '[]'));
//! // { success: true, value: "Installed", error: null }
//!
//! const frame = session.tick(performance.now());
//! if (frame) render(frame.draws);
//! ```

use semviz_engine::{
    ActionKind, DrawRequest, SaveOutcome, Session, SessionConfig, SessionError, WalkReport,
};
use semviz_types::trace::TraceId;
use semviz_types::Diagnostics;
use serde::Serialize;
use std::time::Duration;
use wasm_bindgen::prelude::*;

/// Reply to a command.
///
/// ```json
/// { "success": false, "value": null,
///   "error": { "message": "cannot compile Num: ...", "diagnostics": { ... } } }
/// ```
#[derive(Debug, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub value: serde_json::Value,
    pub error: Option<CommandError>,
}

#[derive(Debug, Serialize)]
pub struct CommandError {
    pub message: String,
    /// Present for compile errors.
    pub diagnostics: Option<Diagnostics>,
}

impl CommandResult {
    fn ok(value: impl Serialize) -> Self {
        Self {
            success: true,
            value: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            error: None,
        }
    }

    fn err(error: &SessionError) -> Self {
        let diagnostics = match error {
            SessionError::Compile(err) => Some(err.diagnostics().clone()),
            _ => None,
        };
        Self {
            success: false,
            value: serde_json::Value::Null,
            error: Some(CommandError {
                message: error.to_string(),
                diagnostics,
            }),
        }
    }

    fn from_result<T: Serialize>(result: Result<T, SessionError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::err(&err),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"value":null,"error":{{"message":"Serialization error: {}","diagnostics":null}}}}"#,
                e
            )
        })
    }
}

/// One walk: the summary and every draw request in order.
#[derive(Debug, Serialize)]
pub struct WalkOutput {
    pub report: WalkReport,
    pub draws: Vec<DrawRequest>,
}

fn save_outcome_name(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Installed => "Installed",
        SaveOutcome::Uninstalled => "Uninstalled",
        SaveOutcome::Unchanged => "Unchanged",
    }
}

fn parse_kind(kind: &str) -> Option<ActionKind> {
    match kind {
        "Operation" | "operation" => Some(ActionKind::Operation),
        "Attribute" | "attribute" => Some(ActionKind::Attribute),
        _ => None,
    }
}

fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

/// A visualizer session owned by JavaScript.
#[wasm_bindgen]
pub struct VisualizerSession {
    inner: Session,
}

#[wasm_bindgen]
impl VisualizerSession {
    /// Create a session from a JSON `SessionConfig`; `{}` takes every default.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<VisualizerSession, JsValue> {
        let config: SessionConfig = if config_json.trim().is_empty() {
            SessionConfig::default()
        } else {
            serde_json::from_str(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        Ok(Self {
            inner: Session::new(config),
        })
    }

    /// Load a trace produced by the grammar matcher.
    pub fn load_trace(&mut self, trace_json: &str) -> String {
        CommandResult::from_result(self.inner.load_trace_json(trace_json)).to_json()
    }

    /// `kind` is `"Operation"` or `"Attribute"`.
    pub fn add_action(&mut self, name: &str, kind: &str) -> String {
        let result = match parse_kind(kind) {
            Some(kind) => self.inner.add_action(name, kind),
            None => Err(SessionError::InvalidActionName(format!("{name} ({kind})"))),
        };
        CommandResult::from_result(result).to_json()
    }

    /// Toggle selection of `name`; the value is whether it is now active.
    pub fn select_action(&mut self, name: &str) -> String {
        CommandResult::from_result(self.inner.select_action(name)).to_json()
    }

    /// Compile and install `body` for the rule at `node`.
    ///
    /// `overrides_json` is an array of argument names, `null` entries
    /// keeping the inferred name.
    pub fn save_action(&mut self, node: u32, body: &str, overrides_json: &str) -> String {
        let overrides: Vec<Option<String>> = if overrides_json.trim().is_empty() {
            Vec::new()
        } else {
            match serde_json::from_str(overrides_json) {
                Ok(overrides) => overrides,
                Err(e) => {
                    return CommandResult {
                        success: false,
                        value: serde_json::Value::Null,
                        error: Some(CommandError {
                            message: format!("invalid argument overrides: {e}"),
                            diagnostics: None,
                        }),
                    }
                    .to_json()
                }
            }
        };
        let result = self
            .inner
            .save_action(TraceId(node), body, &overrides)
            .map(save_outcome_name);
        CommandResult::from_result(result).to_json()
    }

    /// Editor contents for `rule` as `{ args, body }`.
    pub fn action_source(&self, rule: &str) -> String {
        CommandResult::ok(self.inner.action_source(rule)).to_json()
    }

    /// Inferred `{ display, default_name }` per argument of the rule at `node`.
    pub fn argument_signature(&self, node: u32) -> String {
        CommandResult::from_result(self.inner.argument_signature(TraceId(node))).to_json()
    }

    pub fn toggle_zoom(&mut self, node: u32) -> bool {
        self.inner.toggle_zoom(TraceId(node))
    }

    pub fn zoom_in(&mut self, node: u32) -> bool {
        self.inner.zoom_in(TraceId(node))
    }

    pub fn zoom_out(&mut self, node: u32) -> bool {
        self.inner.zoom_out(TraceId(node))
    }

    pub fn preview_enter(&mut self, node: u32) {
        self.inner.preview_enter(TraceId(node));
    }

    pub fn preview_exit(&mut self) {
        self.inner.preview_exit();
    }

    pub fn exit_zoom(&mut self) {
        self.inner.exit_zoom();
    }

    /// Milliseconds until the pending refresh is due, or `undefined`.
    pub fn time_until_refresh(&self, now_ms: f64) -> Option<f64> {
        self.inner
            .scheduler()
            .time_until_due(millis(now_ms))
            .map(|d| d.as_secs_f64() * 1000.0)
    }

    /// Run the pending refresh if it is due at `now_ms`. Returns the walk
    /// output, or `null` when nothing was due.
    pub fn tick(&mut self, now_ms: f64) -> Result<JsValue, JsValue> {
        let mut draws = Vec::new();
        match self.inner.tick_at(millis(now_ms), &mut draws) {
            Ok(Some(report)) => to_js(&WalkOutput { report, draws }),
            Ok(None) => Ok(JsValue::NULL),
            Err(err) => Err(JsValue::from_str(&err.to_string())),
        }
    }

    /// Walk now, ignoring the schedule.
    pub fn refresh(&mut self) -> Result<JsValue, JsValue> {
        let mut draws = Vec::new();
        let report = self
            .inner
            .refresh(&mut draws)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        to_js(&WalkOutput { report, draws })
    }
}

fn to_js(output: &WalkOutput) -> Result<JsValue, JsValue> {
    output
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Into::into)
}

/// Return the engine version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use semviz_types::pexpr::PExpr;
    use semviz_types::trace::TraceBuilder;

    fn trace_json() -> String {
        let mut b = TraceBuilder::new("7");
        b.rule("Num", PExpr::range('0', '9'));
        let digit = b.range(0, '0', '9');
        let num = b.apply("Num", digit);
        serde_json::to_string(&b.finish(num).unwrap()).unwrap()
    }

    fn parse(reply: &str) -> serde_json::Value {
        serde_json::from_str(reply).unwrap()
    }

    fn session() -> VisualizerSession {
        VisualizerSession {
            inner: Session::default(),
        }
    }

    #[test]
    fn test_commands_reply_with_json() {
        let mut s = session();
        assert_eq!(parse(&s.load_trace(&trace_json()))["success"], true);
        assert_eq!(parse(&s.add_action("value", "Operation"))["success"], true);
        let reply = parse(&s.save_action(1, "convert.to_int($1)", "[]"));
        assert_eq!(reply["value"], "Installed");
        let source = parse(&s.action_source("Num"));
        assert_eq!(source["value"]["body"], "convert.to_int($1)");
        let sig = parse(&s.argument_signature(1));
        assert_eq!(sig["value"][0]["default_name"], "$1");
    }

    #[test]
    fn test_compile_error_carries_diagnostics() {
        let mut s = session();
        s.load_trace(&trace_json());
        s.add_action("value", "Attribute");
        let reply = parse(&s.save_action(1, "1 +", "[]"));
        assert_eq!(reply["success"], false);
        assert!(reply["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("cannot compile Num"));
        assert!(reply["error"]["diagnostics"]["errors"].is_array());
    }

    #[test]
    fn test_bad_input_is_reported() {
        let mut s = session();
        assert_eq!(parse(&s.load_trace("{"))["success"], false);
        assert_eq!(parse(&s.add_action("value", "Method"))["success"], false);
        s.load_trace(&trace_json());
        s.add_action("value", "Operation");
        let reply = parse(&s.save_action(1, "1", "{bad"));
        assert!(reply["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("invalid argument overrides"));
    }

    #[test]
    fn test_millis_clamps() {
        assert_eq!(millis(-5.0), Duration::ZERO);
        assert_eq!(millis(f64::NAN), Duration::ZERO);
        assert_eq!(millis(250.0), Duration::from_millis(250));
    }

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
