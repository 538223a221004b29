//! Integration tests for the action compiler.
//!
//! Covers: argument inference against real traces (sequence and
//! alternation rules), compile-and-run with the explicit environment,
//! argument validation, syntax diagnostics and source recovery.

use semviz_compiler::{
    argument_expr, argument_signature, compile_action, resolve_arguments, CompileError,
};
use semviz_eval::{EvalError, Value, DEFAULT_GAS_LIMIT};
use semviz_types::pexpr::PExpr;
use semviz_types::trace::{Trace, TraceBuilder, TraceId};
use semviz_types::ErrorCode;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// `Sum = Num "+" Num`, `Num = digit+`, matched against `"2+3"`.
fn sum_trace() -> Trace {
    let mut b = TraceBuilder::new("2+3");
    b.rule(
        "Sum",
        PExpr::seq(vec![PExpr::apply("Num"), PExpr::terminal("+"), PExpr::apply("Num")]),
    )
    .rule("Num", PExpr::plus(PExpr::apply("digit")));
    let two = b.range(0, '0', '9');
    let left = b.apply("Num", two);
    let plus = b.terminal(1, "+");
    let three = b.range(2, '0', '9');
    let right = b.apply("Num", three);
    let body = b.seq(vec![left, plus, right]);
    let sum = b.apply("Sum", body);
    b.finish(sum).unwrap()
}

/// `Value = Num | Str`, matched against `"7"`: first attempt fails.
fn alt_trace() -> (Trace, TraceId) {
    let mut b = TraceBuilder::new("7");
    b.rule("Value", PExpr::alt(vec![PExpr::apply("Str"), PExpr::apply("Num")]));
    let miss = b.failed(PExpr::apply("Str"), 0);
    let digit = b.range(0, '0', '9');
    let num = b.apply("Num", digit);
    let alt = b.alt(vec![miss, num]);
    let value = b.apply("Value", alt);
    let id = value.node;
    (b.finish(value).unwrap(), id)
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

// ══════════════════════════════════════════════════════════════════════════════
// Argument inference
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn infer_sequence_rule_from_grammar() {
    let trace = sum_trace();
    let expr = argument_expr(&trace, trace.root).unwrap();
    let sig = argument_signature(expr);
    let names: Vec<&str> = sig.iter().map(|a| a.default_name.as_str()).collect();
    assert_eq!(names, vec!["num_1", "$2", "num_2"]);
}

#[test]
fn infer_alternation_uses_matched_alternative() {
    let (trace, value) = alt_trace();
    let expr = argument_expr(&trace, value).unwrap();
    assert_eq!(expr.rule_name(), Some("Num"));
    let sig = argument_signature(expr);
    assert_eq!(sig.len(), 1);
    assert_eq!(sig[0].default_name, "num");
    assert_eq!(sig[0].display, "Num");
}

#[test]
fn infer_without_grammar_entry_uses_trace_body() {
    let mut b = TraceBuilder::new("x");
    let x = b.terminal(0, "x");
    let rule = b.apply("Letter", x);
    let trace = b.finish(rule).unwrap();
    let expr = argument_expr(&trace, trace.root).unwrap();
    assert_eq!(argument_signature(expr)[0].default_name, "_x");
}

#[test]
fn infer_non_rule_node_is_none() {
    let trace = sum_trace();
    // the "+" terminal
    let plus = trace
        .nodes
        .iter()
        .position(|n| n.display_string == "\"+\"")
        .unwrap();
    assert!(argument_expr(&trace, TraceId(plus as u32)).is_none());
}

// ══════════════════════════════════════════════════════════════════════════════
// Compile & run
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn compiled_sum_uses_named_and_positional_arguments() {
    let action = compile_action("value", "Sum", strings(&["num_1", "$2", "num_2"]), "num_1 + num_2")
        .unwrap();
    let children = vec![num(2.0), Value::string("+"), num(3.0)];
    let env = action.environment(&children, Value::Nil);
    assert_eq!(action.run(env, DEFAULT_GAS_LIMIT).result, Ok(num(5.0)));

    let by_index = compile_action("value", "Sum", strings(&["a", "b", "c"]), "args[0] + args[2]")
        .unwrap();
    let env = by_index.environment(&children, Value::Nil);
    assert_eq!(by_index.run(env, DEFAULT_GAS_LIMIT).result, Ok(num(5.0)));
}

#[test]
fn environment_is_explicit_and_enumerable() {
    let action = compile_action("value", "Num", strings(&["digits"]), "digits").unwrap();
    let env = action.environment(&[Value::string("42")], Value::Nil);
    assert_eq!(env.visible_names(), vec!["$1", "args", "digits", "this"]);
}

#[test]
fn runtime_errors_come_back_in_output() {
    let action = compile_action("value", "Num", strings(&["$1"]), "{ throw \"x\" }").unwrap();
    let out = action.run(action.environment(&[], Value::Nil), DEFAULT_GAS_LIMIT);
    assert_eq!(out.result, Err(EvalError::Thrown(Value::string("x"))));
}

#[test]
fn core_log_is_captured() {
    let action = compile_action("value", "Num", strings(&["$1"]), "core.log(\"seen\", $1)").unwrap();
    let out = action.run(action.environment(&[num(2.0)], Value::Nil), DEFAULT_GAS_LIMIT);
    assert_eq!(out.log, vec!["seen 2".to_string()]);
    assert!(out.gas_used > 0);
}

#[test]
fn braced_block_body_compiles() {
    let action = compile_action(
        "value",
        "Num",
        strings(&["$1"]),
        "{\n  let n = convert.to_number($1)\n  return n * 10\n}",
    )
    .unwrap();
    let out = action.run(action.environment(&[Value::string("4")], Value::Nil), DEFAULT_GAS_LIMIT);
    assert_eq!(out.result, Ok(num(40.0)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn syntax_error_carries_diagnostics() {
    let err = compile_action("value", "Sum", strings(&["a"]), "a +* 2").unwrap_err();
    match &err {
        CompileError::Syntax { rule, diagnostics } => {
            assert_eq!(rule, "Sum");
            let first = diagnostics.first().unwrap();
            assert_eq!(first.file, "Sum.value");
            assert_eq!(first.source_line, "a +* 2");
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("cannot compile Sum:"));
}

#[test]
fn empty_body_is_a_compile_error() {
    let err = compile_action("value", "Sum", vec![], "   ").unwrap_err();
    assert_eq!(err.diagnostics().first().unwrap().code, ErrorCode::EMPTY_BODY);
}

#[test]
fn duplicate_and_invalid_argument_names() {
    let err = compile_action("value", "Sum", strings(&["a", "a"]), "a").unwrap_err();
    assert_eq!(
        err.diagnostics().first().unwrap().code,
        ErrorCode::DUPLICATE_ARGUMENT_NAME
    );
    let err = compile_action("value", "Sum", strings(&["this"]), "1").unwrap_err();
    assert_eq!(
        err.diagnostics().first().unwrap().code,
        ErrorCode::INVALID_ARGUMENT_NAME
    );
    let err = resolve_arguments("value", "Sum", &strings(&["a", "b"]), &[Some("1x".into())])
        .unwrap_err();
    assert!(matches!(err, CompileError::Arguments { .. }));
}

// ══════════════════════════════════════════════════════════════════════════════
// Source recovery & fingerprints
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn decompile_returns_saved_source() {
    let action = compile_action("value", "Sum", strings(&["l", "$2", "r"]), "l + r").unwrap();
    let source = action.decompile();
    assert_eq!(source.args, strings(&["l", "$2", "r"]));
    assert_eq!(source.body, "l + r");
    assert_eq!(source.fingerprint(), action.fingerprint());
}

#[test]
fn fingerprint_changes_with_arguments_or_body() {
    let a = compile_action("value", "Sum", strings(&["l", "r"]), "l + r").unwrap();
    let b = compile_action("value", "Sum", strings(&["l", "r"]), "l - r").unwrap();
    let c = compile_action("value", "Sum", strings(&["x", "r"]), "l + r").unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn compile_determinism_100_iterations() {
    let first = compile_action("value", "Sum", strings(&["l", "r"]), "{ let t = l + r\n t * 2 }")
        .unwrap();
    for _ in 0..100 {
        let again = compile_action("value", "Sum", strings(&["l", "r"]), "{ let t = l + r\n t * 2 }")
            .unwrap();
        assert_eq!(again, first);
    }
}
