//! Parser tests for action bodies.
//!
//! Covers: expression precedence, postfix chains, literals, interpolation,
//! block statements, error codes and recovery, and the 100-iteration
//! determinism test.

use semviz_parser::{parse_block_body, parse_expression_body, ParseResult};
use semviz_types::ast::*;
use semviz_types::{ErrorCode, SourceText};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse_expr(source: &str) -> ParseResult {
    parse_expression_body(&SourceText::new("Test.value", source))
}

fn parse_block(source: &str) -> ParseResult {
    parse_block_body(&SourceText::new("Test.value", source))
}

/// Parse an expression body, panicking on errors.
fn expr_ok(source: &str) -> Expr {
    let result = parse_expr(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors for {source:?}");
    }
    match result.body {
        Some(Body::Expr(expr)) => expr,
        other => panic!("expected expression body, got {other:?}"),
    }
}

fn block_ok(source: &str) -> Block {
    let result = parse_block(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors for {source:?}");
    }
    match result.body {
        Some(Body::Block(block)) => block,
        other => panic!("expected block body, got {other:?}"),
    }
}

fn expr_error_codes(source: &str) -> Vec<ErrorCode> {
    parse_expr(source).errors.errors.iter().map(|e| e.code).collect()
}

fn as_binary(expr: &Expr) -> (&Expr, BinOp, &Expr) {
    match &expr.kind {
        ExprKind::Binary { left, op, right } => (left, *op, right),
        other => panic!("expected binary, got {other:?}"),
    }
}

fn as_ident(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Identifier(name) => name,
        other => panic!("expected identifier, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_mul_binds_tighter_than_add() {
    let e = expr_ok("a + b * c");
    let (left, op, right) = as_binary(&e);
    assert_eq!(op, BinOp::Add);
    assert_eq!(as_ident(left), "a");
    assert_eq!(as_binary(right).1, BinOp::Mul);
}

#[test]
fn test_add_is_left_associative() {
    let e = expr_ok("a - b - c");
    let (left, op, right) = as_binary(&e);
    assert_eq!(op, BinOp::Sub);
    assert_eq!(as_ident(right), "c");
    assert_eq!(as_binary(left).1, BinOp::Sub);
}

#[test]
fn test_and_binds_tighter_than_or() {
    let e = expr_ok("a or b and c");
    let (_, op, right) = as_binary(&e);
    assert_eq!(op, BinOp::Or);
    assert_eq!(as_binary(right).1, BinOp::And);
}

#[test]
fn test_nil_coalesce_between_and_and_comparison() {
    let e = expr_ok("a ?? b == c");
    match &e.kind {
        ExprKind::NilCoalesce { right, .. } => assert_eq!(as_binary(right).1, BinOp::Eq),
        other => panic!("expected ??, got {other:?}"),
    }
}

#[test]
fn test_comparison_chain_rejected() {
    assert!(expr_error_codes("a < b < c").contains(&ErrorCode::UNEXPECTED_TOKEN));
}

#[test]
fn test_unary_nesting() {
    let e = expr_ok("not not -x");
    match &e.kind {
        ExprKind::Unary { op, operand } => {
            assert_eq!(*op, UnaryOp::Not);
            assert!(matches!(operand.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
        }
        other => panic!("expected unary, got {other:?}"),
    }
}

#[test]
fn test_newline_after_operator_continues() {
    let e = expr_ok("num +\n  num_1");
    assert_eq!(as_binary(&e).1, BinOp::Add);
}

// ─────────────────────────────────────────────────────────────────────
// Postfix & names
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_dollar_names_and_indexing() {
    let e = expr_ok("$1 + args[2]");
    let (left, _, right) = as_binary(&e);
    assert_eq!(as_ident(left), "$1");
    assert!(matches!(right.kind, ExprKind::Index { .. }));
}

#[test]
fn test_qualified_builtin_is_method_call() {
    let e = expr_ok("math.max(a, b)");
    match &e.kind {
        ExprKind::MethodCall { object, method, args } => {
            assert_eq!(as_ident(object), "math");
            assert_eq!(method.name, "max");
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected method call, got {other:?}"),
    }
}

#[test]
fn test_postfix_chain() {
    let e = expr_ok("this.args[0].length()");
    assert!(matches!(e.kind, ExprKind::MethodCall { .. }));
}

#[test]
fn test_keyword_as_member_name() {
    let e = expr_ok("x.in");
    assert!(matches!(e.kind, ExprKind::FieldAccess { .. }));
}

#[test]
fn test_bare_call_rejected_with_suggestion() {
    let result = parse_expr("parseInt(x)");
    assert!(result.body.is_none());
    let err = result.errors.first().unwrap();
    assert!(err.message.contains("not callable"));
    assert!(err.suggestion.as_deref().unwrap().contains("math.max"));
}

// ─────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_list_and_record_literals() {
    let e = expr_ok("[1, \"two\", nil, true,]");
    match &e.kind {
        ExprKind::ListLit(items) => assert_eq!(items.len(), 4),
        other => panic!("expected list, got {other:?}"),
    }
    let e = expr_ok("{ left: a, right: b }");
    match &e.kind {
        ExprKind::RecordLit(fields) => {
            let names: Vec<&str> = fields.iter().map(|f| f.name.name.as_str()).collect();
            assert_eq!(names, vec!["left", "right"]);
        }
        other => panic!("expected record, got {other:?}"),
    }
}

#[test]
fn test_string_interpolation_parts() {
    let e = expr_ok("\"${a} plus ${b}\"");
    match &e.kind {
        ExprKind::StringInterpolation(parts) => {
            assert_eq!(parts.len(), 3);
            assert!(matches!(&parts[1], StringPart::Literal(s) if s == " plus "));
        }
        other => panic!("expected interpolation, got {other:?}"),
    }
}

#[test]
fn test_if_expression_with_else_if() {
    let e = expr_ok("if a { 1 } else if b { 2 } else { 3 }");
    match &e.kind {
        ExprKind::If(ie) => assert!(matches!(ie.else_branch, Some(ElseBranch::ElseIf(_)))),
        other => panic!("expected if, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Blocks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_block_statements() {
    let block = block_ok(
        "{
  let total = 0
  for x, i in xs { total + x }
  assert total >= 0, \"negative\"
  if total > 10 { throw \"too big\" }
  return total
}",
    );
    assert_eq!(block.stmts.len(), 5);
    assert!(matches!(block.stmts[0], Stmt::Let(_)));
    match &block.stmts[1] {
        Stmt::For(f) => assert_eq!(f.index.as_ref().map(|i| i.name.as_str()), Some("i")),
        other => panic!("expected for, got {other:?}"),
    }
    match &block.stmts[2] {
        Stmt::Assert(a) => assert_eq!(a.message.as_deref(), Some("negative")),
        other => panic!("expected assert, got {other:?}"),
    }
    assert!(matches!(block.stmts[3], Stmt::If(_)));
    assert!(matches!(&block.stmts[4], Stmt::Return(r) if r.value.is_some()));
}

#[test]
fn test_semicolons_separate_statements() {
    let block = block_ok("{ let a = 1; let b = 2; a + b }");
    assert_eq!(block.stmts.len(), 3);
    assert!(matches!(block.stmts[2], Stmt::Expr(_)));
}

#[test]
fn test_bare_return() {
    let block = block_ok("{ return }");
    assert!(matches!(&block.stmts[0], Stmt::Return(r) if r.value.is_none()));
}

#[test]
fn test_else_on_next_line() {
    let block = block_ok("{\n if a { 1 }\n else { 2 }\n}");
    assert_eq!(block.stmts.len(), 1);
    match &block.stmts[0] {
        Stmt::If(ie) => assert!(ie.else_branch.is_some()),
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn test_statement_is_not_an_expression_body() {
    assert!(parse_expr("let a = 1").body.is_none());
    assert!(parse_block("{ let a = 1 }").body.is_some());
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_expression_body() {
    assert_eq!(expr_error_codes("  \n "), vec![ErrorCode::EMPTY_BODY]);
}

#[test]
fn test_trailing_input() {
    assert_eq!(expr_error_codes("a b"), vec![ErrorCode::TRAILING_INPUT]);
}

#[test]
fn test_unclosed_paren() {
    assert_eq!(expr_error_codes("(a + b"), vec![ErrorCode::UNCLOSED_DELIMITER]);
}

#[test]
fn test_lex_errors_surface_first() {
    let result = parse_expr("a @ b");
    assert!(result.body.is_none());
    assert!(result.errors.first().unwrap().message.contains("'@'"));
}

#[test]
fn test_nesting_limit() {
    let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
    assert!(expr_error_codes(&deep).contains(&ErrorCode::NESTING_LIMIT_EXCEEDED));
    let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
    expr_ok(&shallow);
}

#[test]
fn test_block_recovery_reports_multiple_errors() {
    let result = parse_block("{\n let = 1\n let b = )\n b\n}");
    assert!(result.body.is_none());
    assert!(result.errors.total_errors >= 2);
}

#[test]
fn test_diagnostic_carries_source_line() {
    let result = parse_block("{\n  let a = 1\n  a +* 2\n}");
    let err = result.errors.first().unwrap();
    assert_eq!(err.span.start_line, 3);
    assert_eq!(err.source_line, "  a +* 2");
    assert_eq!(err.file, "Test.value");
}

#[test]
fn test_parser_determinism_100_iterations() {
    let source = "if num > 1 { math.max(num, $2) } else { \"${args[0]}\" ?? nil }";
    let first = format!("{:?}", parse_expr(source).body);
    for _ in 0..100 {
        assert_eq!(format!("{:?}", parse_expr(source).body), first);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Brace-less statement bodies
// ─────────────────────────────────────────────────────────────────────

fn parse_stmts(source: &str) -> ParseResult {
    semviz_parser::parse_statement_body(&SourceText::new("Test.value", source))
}

#[test]
fn test_statement_body_without_braces() {
    let result = parse_stmts("let a = num\nreturn a * 2");
    match result.body {
        Some(Body::Block(block)) => assert_eq!(block.stmts.len(), 2),
        other => panic!("expected block body, got {other:?}"),
    }
}

#[test]
fn test_statement_body_spans_match_source() {
    let result = parse_stmts("let a = 1\nlet = 2");
    let err = result.errors.first().unwrap();
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.span.start_col, 5);
    assert_eq!(err.source_line, "let = 2");
}
