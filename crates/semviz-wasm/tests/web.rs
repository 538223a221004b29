//! Browser tests for the session binding (`wasm-pack test --headless`).

#![cfg(target_arch = "wasm32")]

use semviz_types::pexpr::PExpr;
use semviz_types::trace::TraceBuilder;
use semviz_wasm::VisualizerSession;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn trace_json() -> String {
    let mut b = TraceBuilder::new("7");
    b.rule("Num", PExpr::range('0', '9'));
    let digit = b.range(0, '0', '9');
    let num = b.apply("Num", digit);
    serde_json::to_string(&b.finish(num).unwrap()).unwrap()
}

#[wasm_bindgen_test]
fn refresh_returns_structured_walk() {
    let mut s = VisualizerSession::new("{}").unwrap();
    s.load_trace(&trace_json());
    s.add_action("value", "Operation");
    s.save_action(1, "convert.to_int($1) + 1", "[]");
    let out = s.refresh().unwrap();
    assert!(out.is_object());
}

#[wasm_bindgen_test]
fn tick_waits_for_debounce() {
    let mut s = VisualizerSession::new(r#"{"save_delay_ms": 50}"#).unwrap();
    s.load_trace(&trace_json());
    s.add_action("value", "Operation");
    s.refresh().unwrap();
    s.save_action(1, "1", "[]");
    assert!(s.tick(10.0).unwrap().is_null());
    assert!(s.tick(60.0).unwrap().is_object());
}
