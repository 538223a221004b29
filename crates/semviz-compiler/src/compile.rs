//! Body compilation: argument checks, parsing and the compiled form.

use crate::error::CompileError;
use crate::infer::RESERVED_NAMES;
use crate::source::{ActionSource, Fingerprint};
use semviz_eval::{Environment, EvalResult, Interpreter, Value};
use semviz_lexer::{Lexer, TokenKind};
use semviz_parser::{parse_block_body, parse_expression_body, parse_statement_body, ParseResult};
use semviz_types::ast::Body;
use semviz_types::{Diagnostic, Diagnostics, ErrorCode, SourceText, Span};

/// An installed action for one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledAction {
    rule_name: String,
    args: Vec<String>,
    body: Body,
    source: ActionSource,
    fingerprint: Fingerprint,
}

/// Result of running a compiled body once.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    pub result: EvalResult<Value>,
    /// Lines written by `core.log`.
    pub log: Vec<String>,
    pub gas_used: u64,
}

impl CompiledAction {
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The argument names and body text this action was compiled from.
    pub fn decompile(&self) -> ActionSource {
        self.source.clone()
    }

    /// The complete binding environment for one invocation.
    ///
    /// `args` is every child result and `this` describes the node. Each
    /// child is also bound positionally as `$1`, `$2`, … and under its
    /// argument name. Argument names bind last and win on conflict.
    pub fn environment(&self, children: &[Value], this: Value) -> Environment {
        let mut env = Environment::new();
        env.define("args", Value::List(children.to_vec()));
        env.define("this", this);
        for (i, child) in children.iter().enumerate() {
            env.define(&format!("${}", i + 1), child.clone());
        }
        for (name, child) in self.args.iter().zip(children) {
            env.define(name, child.clone());
        }
        env
    }

    pub fn run(&self, env: Environment, gas_limit: u64) -> ActionOutput {
        let mut interp = Interpreter::with_environment(env, gas_limit);
        let result = interp.eval_body(&self.body);
        ActionOutput {
            result,
            log: interp.take_log_output(),
            gas_used: interp.gas_used(),
        }
    }
}

/// Compile `body_text` for `rule_name` with the given argument names.
///
/// The text is read as a single expression first. If that fails it is read
/// as statements, with or without surrounding braces. Diagnostics name the
/// body `{rule_name}.{action_name}`.
pub fn compile_action(
    action_name: &str,
    rule_name: &str,
    args: Vec<String>,
    body_text: &str,
) -> Result<CompiledAction, CompileError> {
    let file = format!("{rule_name}.{action_name}");
    validate_arguments(&file, rule_name, &args)?;
    let src = SourceText::new(file, body_text);
    let body = parse_action_body(&src).map_err(|diagnostics| CompileError::Syntax {
        rule: rule_name.to_string(),
        diagnostics,
    })?;
    let source = ActionSource::new(args.clone(), body_text);
    Ok(CompiledAction {
        rule_name: rule_name.to_string(),
        fingerprint: source.fingerprint(),
        args,
        body,
        source,
    })
}

fn parse_action_body(src: &SourceText) -> Result<Body, Diagnostics> {
    let expr = parse_expression_body(src);
    if let Some(body) = expr.body {
        return Ok(body);
    }
    if src.text.trim().is_empty() {
        return Err(expr.errors);
    }

    let fallback: ParseResult = if src.text.trim_start().starts_with('{') {
        let block = parse_block_body(src);
        if block.body.is_some() {
            block
        } else {
            let stmts = parse_statement_body(src);
            if stmts.body.is_some() {
                stmts
            } else {
                block
            }
        }
    } else {
        parse_statement_body(src)
    };
    fallback.body.ok_or(fallback.errors)
}

/// Merge editor overrides onto the inferred names, then validate.
///
/// A missing or blank override keeps the default.
pub fn resolve_arguments(
    action_name: &str,
    rule_name: &str,
    defaults: &[String],
    overrides: &[Option<String>],
) -> Result<Vec<String>, CompileError> {
    let file = format!("{rule_name}.{action_name}");
    if overrides.len() > defaults.len() {
        let mut diagnostics = Diagnostics::empty();
        diagnostics.push_error(Diagnostic::new(
            &file,
            ErrorCode::TOO_MANY_ARGUMENTS,
            format!(
                "{rule_name} takes {} argument(s), got {}",
                defaults.len(),
                overrides.len()
            ),
            Span::point(1, defaults.len() as u32 + 1),
            "",
        ));
        return Err(CompileError::Arguments {
            rule: rule_name.to_string(),
            diagnostics,
        });
    }

    let args: Vec<String> = defaults
        .iter()
        .enumerate()
        .map(|(i, default)| {
            overrides
                .get(i)
                .and_then(|o| o.as_deref())
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map_or_else(|| default.clone(), str::to_string)
        })
        .collect();
    validate_arguments(&file, rule_name, &args)?;
    Ok(args)
}

/// Every name must lex as one identifier, must not be reserved, and must be distinct.
pub fn validate_arguments(file: &str, rule_name: &str, args: &[String]) -> Result<(), CompileError> {
    let header = args.join(", ");
    let mut diagnostics = Diagnostics::empty();
    for (i, name) in args.iter().enumerate() {
        let span = Span::point(1, i as u32 + 1);
        if RESERVED_NAMES.contains(&name.as_str()) {
            diagnostics.push_error(
                Diagnostic::new(
                    file,
                    ErrorCode::INVALID_ARGUMENT_NAME,
                    format!("'{name}' is reserved"),
                    span,
                    &header,
                )
                .with_suggestion(format!("'{name}' is always bound; pick another name")),
            );
        } else if !is_identifier(name) {
            diagnostics.push_error(Diagnostic::new(
                file,
                ErrorCode::INVALID_ARGUMENT_NAME,
                format!("'{name}' is not a valid argument name"),
                span,
                &header,
            ));
        } else if args[..i].contains(name) {
            diagnostics.push_error(Diagnostic::new(
                file,
                ErrorCode::DUPLICATE_ARGUMENT_NAME,
                format!("argument '{name}' is declared twice"),
                span,
                &header,
            ));
        }
    }
    if diagnostics.has_errors() {
        return Err(CompileError::Arguments {
            rule: rule_name.to_string(),
            diagnostics,
        });
    }
    Ok(())
}

/// Whether `name` lexes as exactly one identifier token.
fn is_identifier(name: &str) -> bool {
    let src = SourceText::new("argument", name);
    let lex = Lexer::new(&src).lex();
    !lex.errors.has_errors()
        && matches!(
            lex.tokens.as_slice(),
            [first, eof] if matches!(&first.kind, TokenKind::Identifier(n) if n == name)
                && eof.kind == TokenKind::Eof
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("num_1"));
        assert!(is_identifier("$2"));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier("let"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let defaults = strings(&["num_1", "$2", "num_2"]);
        let args = resolve_arguments(
            "value",
            "Sum",
            &defaults,
            &[Some("left".into()), None, Some("  ".into())],
        )
        .unwrap();
        assert_eq!(args, strings(&["left", "$2", "num_2"]));
    }

    #[test]
    fn test_too_many_overrides() {
        let err = resolve_arguments("value", "Num", &strings(&["$1"]), &[None, None]).unwrap_err();
        assert_eq!(
            err.diagnostics().first().unwrap().code,
            ErrorCode::TOO_MANY_ARGUMENTS
        );
    }

    #[test]
    fn test_statement_fallback_keeps_source_text() {
        let compiled = compile_action(
            "value",
            "Num",
            strings(&["digits"]),
            "let n = convert.to_number(this.source)\nreturn n",
        )
        .unwrap();
        assert!(matches!(compiled.body(), Body::Block(_)));
        assert_eq!(
            compiled.decompile().body,
            "let n = convert.to_number(this.source)\nreturn n"
        );
    }
}
