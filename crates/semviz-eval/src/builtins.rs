//! Builtin modules callable from action bodies.
//!
//! Calls are qualified (`math.max(a, b)`) or written as methods on a value
//! (`s.upper()` is `string.upper(s)`). `core.log` is handled by the
//! interpreter because it writes captured output.

use crate::error::{EvalError, EvalResult};
use crate::limits::{Footprint, MAX_VALUE_BYTES};
use crate::value::format_number;
use crate::Value;

/// Module names recognized in qualified calls.
pub const MODULES: &[&str] = &["core", "math", "string", "list", "record", "convert"];

pub fn is_module(name: &str) -> bool {
    MODULES.contains(&name)
}

/// Module-level constants such as `math.PI`.
pub fn constant(module: &str, name: &str) -> Option<Value> {
    match (module, name) {
        ("math", "PI") => Some(Value::Number(std::f64::consts::PI)),
        ("math", "E") => Some(Value::Number(std::f64::consts::E)),
        ("math", "INFINITY") => Some(Value::Number(f64::INFINITY)),
        _ => None,
    }
}

/// Call `module.function(args)`.
pub fn call(module: &str, function: &str, args: Vec<Value>) -> EvalResult<Value> {
    let call = Call {
        module,
        function,
        args,
    };
    match module {
        "core" => call_core(call),
        "math" => call_math(call),
        "string" => call_string(call),
        "list" => call_list(call),
        "record" => call_record(call),
        "convert" => call_convert(call),
        _ => Err(EvalError::UnknownFunction(format!("unknown module '{module}'"))),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Argument helpers
// ══════════════════════════════════════════════════════════════════════════════

struct Call<'a> {
    module: &'a str,
    function: &'a str,
    args: Vec<Value>,
}

impl Call<'_> {
    fn name(&self) -> String {
        format!("{}.{}", self.module, self.function)
    }

    fn unknown(&self) -> EvalError {
        EvalError::UnknownFunction(self.name())
    }

    fn arity(&self, min: usize, max: usize) -> EvalResult<()> {
        let n = self.args.len();
        if n < min || n > max {
            let expected = if min == max {
                format!("{min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(EvalError::BuiltinError(format!(
                "{} expects {expected} argument(s), got {n}",
                self.name()
            )));
        }
        Ok(())
    }

    fn arg(&self, i: usize) -> &Value {
        self.args.get(i).unwrap_or(&Value::Nil)
    }

    fn mismatch(&self, i: usize, expected: &str) -> EvalError {
        EvalError::TypeMismatch(format!(
            "{} argument {} must be a {expected}, got {}",
            self.name(),
            i + 1,
            self.arg(i).type_name()
        ))
    }

    fn number(&self, i: usize) -> EvalResult<f64> {
        self.arg(i).as_number().ok_or_else(|| self.mismatch(i, "number"))
    }

    fn string(&self, i: usize) -> EvalResult<&str> {
        self.arg(i).as_str().ok_or_else(|| self.mismatch(i, "string"))
    }

    fn list(&self, i: usize) -> EvalResult<&[Value]> {
        self.arg(i).as_list().ok_or_else(|| self.mismatch(i, "list"))
    }

    fn opt_number(&self, i: usize) -> EvalResult<Option<f64>> {
        match self.arg(i) {
            Value::Nil => Ok(None),
            _ => self.number(i).map(Some),
        }
    }
}

/// Resolve a possibly-negative slice bound against `len`.
fn clamp_index(n: f64, len: usize) -> usize {
    let len_f = len as f64;
    let i = if n < 0.0 { len_f + n.trunc() } else { n.trunc() };
    i.clamp(0.0, len_f) as usize
}

// ══════════════════════════════════════════════════════════════════════════════
// core
// ══════════════════════════════════════════════════════════════════════════════

fn call_core(call: Call<'_>) -> EvalResult<Value> {
    match call.function {
        "type_of" => {
            call.arity(1, 1)?;
            Ok(Value::string(call.arg(0).type_name()))
        }
        "is_nil" => {
            call.arity(1, 1)?;
            Ok(Value::Bool(call.arg(0).is_nil()))
        }
        _ => Err(call.unknown()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// math
// ══════════════════════════════════════════════════════════════════════════════

fn call_math(call: Call<'_>) -> EvalResult<Value> {
    let unary = |f: fn(f64) -> f64| -> EvalResult<Value> {
        call.arity(1, 1)?;
        Ok(Value::Number(f(call.number(0)?)))
    };
    match call.function {
        "abs" => unary(f64::abs),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "trunc" => unary(f64::trunc),
        "sqrt" => unary(f64::sqrt),
        "sign" => unary(|n| if n == 0.0 || n.is_nan() { n } else { n.signum() }),
        "pow" => {
            call.arity(2, 2)?;
            Ok(Value::Number(call.number(0)?.powf(call.number(1)?)))
        }
        "min" | "max" => {
            if call.args.is_empty() {
                return Err(EvalError::BuiltinError(format!(
                    "{} expects at least 1 argument",
                    call.name()
                )));
            }
            let mut acc = call.number(0)?;
            for i in 1..call.args.len() {
                let n = call.number(i)?;
                acc = if call.function == "min" { acc.min(n) } else { acc.max(n) };
            }
            Ok(Value::Number(acc))
        }
        "clamp" => {
            call.arity(3, 3)?;
            let (n, lo, hi) = (call.number(0)?, call.number(1)?, call.number(2)?);
            Ok(Value::Number(n.max(lo).min(hi)))
        }
        _ => Err(call.unknown()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// string
// ══════════════════════════════════════════════════════════════════════════════

fn call_string(call: Call<'_>) -> EvalResult<Value> {
    match call.function {
        "length" => {
            call.arity(1, 1)?;
            Ok(Value::Number(call.string(0)?.chars().count() as f64))
        }
        "upper" => {
            call.arity(1, 1)?;
            Ok(Value::string(call.string(0)?.to_uppercase()))
        }
        "lower" => {
            call.arity(1, 1)?;
            Ok(Value::string(call.string(0)?.to_lowercase()))
        }
        "trim" => {
            call.arity(1, 1)?;
            Ok(Value::string(call.string(0)?.trim()))
        }
        "contains" => {
            call.arity(2, 2)?;
            Ok(Value::Bool(call.string(0)?.contains(call.string(1)?)))
        }
        "starts_with" => {
            call.arity(2, 2)?;
            Ok(Value::Bool(call.string(0)?.starts_with(call.string(1)?)))
        }
        "ends_with" => {
            call.arity(2, 2)?;
            Ok(Value::Bool(call.string(0)?.ends_with(call.string(1)?)))
        }
        "index_of" => {
            call.arity(2, 2)?;
            let (s, needle) = (call.string(0)?, call.string(1)?);
            let index = s
                .find(needle)
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            Ok(Value::Number(index))
        }
        "split" => {
            call.arity(2, 2)?;
            let (s, sep) = (call.string(0)?, call.string(1)?);
            let parts: Vec<Value> = if sep.is_empty() {
                Footprint::chars(s.chars().count()).check("string.split")?;
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                Footprint::chars(s.matches(sep).count() + 1).check("string.split")?;
                s.split(sep).map(Value::string).collect()
            };
            Ok(Value::List(parts))
        }
        "chars" => {
            call.arity(1, 1)?;
            Footprint::chars(call.string(0)?.chars().count()).check("string.chars")?;
            Ok(Value::List(
                call.string(0)?
                    .chars()
                    .map(|c| Value::string(c.to_string()))
                    .collect(),
            ))
        }
        "replace" => {
            call.arity(3, 3)?;
            let (s, from, to) = (call.string(0)?, call.string(1)?, call.string(2)?);
            // an empty pattern matches between every character
            let matches = if from.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(from).count()
            };
            let len = (s.len() - matches * from.len())
                .saturating_add(matches.saturating_mul(to.len()));
            Footprint::string(len).check("string.replace")?;
            Ok(Value::string(s.replace(from, to)))
        }
        "repeat" => {
            call.arity(2, 2)?;
            let n = call.number(1)?;
            if !(0.0..=MAX_VALUE_BYTES as f64).contains(&n) {
                return Err(EvalError::BuiltinError(format!(
                    "string.repeat count {} out of range",
                    format_number(n)
                )));
            }
            let s = call.string(0)?;
            Footprint::string(s.len().saturating_mul(n as usize)).check("string.repeat")?;
            Ok(Value::string(s.repeat(n as usize)))
        }
        "slice" => {
            call.arity(2, 3)?;
            let chars: Vec<char> = call.string(0)?.chars().collect();
            let start = clamp_index(call.number(1)?, chars.len());
            let end = call
                .opt_number(2)?
                .map_or(chars.len(), |n| clamp_index(n, chars.len()));
            let out: String = if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            };
            Ok(Value::string(out))
        }
        _ => Err(call.unknown()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// list
// ══════════════════════════════════════════════════════════════════════════════

fn call_list(call: Call<'_>) -> EvalResult<Value> {
    match call.function {
        "length" => {
            call.arity(1, 1)?;
            Ok(Value::Number(call.list(0)?.len() as f64))
        }
        "is_empty" => {
            call.arity(1, 1)?;
            Ok(Value::Bool(call.list(0)?.is_empty()))
        }
        "first" => {
            call.arity(1, 1)?;
            Ok(call.list(0)?.first().cloned().unwrap_or(Value::Nil))
        }
        "last" => {
            call.arity(1, 1)?;
            Ok(call.list(0)?.last().cloned().unwrap_or(Value::Nil))
        }
        "get" => {
            call.arity(2, 2)?;
            let items = call.list(0)?;
            let i = call.number(1)?;
            let found = if i.fract() == 0.0 && i >= 0.0 {
                items.get(i as usize).cloned()
            } else {
                None
            };
            Ok(found.unwrap_or(Value::Nil))
        }
        "push" => {
            call.arity(2, 2)?;
            let mut items = call.list(0)?.to_vec();
            items.push(call.arg(1).clone());
            Ok(Value::List(items))
        }
        "concat" => {
            call.arity(2, 2)?;
            let mut items = call.list(0)?.to_vec();
            items.extend_from_slice(call.list(1)?);
            Ok(Value::List(items))
        }
        "reverse" => {
            call.arity(1, 1)?;
            let mut items = call.list(0)?.to_vec();
            items.reverse();
            Ok(Value::List(items))
        }
        "contains" => {
            call.arity(2, 2)?;
            Ok(Value::Bool(call.list(0)?.contains(call.arg(1))))
        }
        "index_of" => {
            call.arity(2, 2)?;
            let index = call
                .list(0)?
                .iter()
                .position(|v| v == call.arg(1))
                .map_or(-1.0, |i| i as f64);
            Ok(Value::Number(index))
        }
        "slice" => {
            call.arity(2, 3)?;
            let items = call.list(0)?;
            let start = clamp_index(call.number(1)?, items.len());
            let end = call
                .opt_number(2)?
                .map_or(items.len(), |n| clamp_index(n, items.len()));
            let out = if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            };
            Ok(Value::List(out))
        }
        "sum" => {
            call.arity(1, 1)?;
            let mut total = 0.0;
            for item in call.list(0)? {
                total += item.as_number().ok_or_else(|| {
                    EvalError::TypeMismatch(format!(
                        "list.sum requires numbers, found {}",
                        item.type_name()
                    ))
                })?;
            }
            Ok(Value::Number(total))
        }
        "join" => {
            call.arity(2, 2)?;
            let sep = call.string(1)?;
            let mut out = String::new();
            for (i, item) in call.list(0)?.iter().enumerate() {
                let part = item.to_string();
                let sep_len = if i > 0 { sep.len() } else { 0 };
                Footprint::string(out.len() + sep_len + part.len()).check("list.join")?;
                if i > 0 {
                    out.push_str(sep);
                }
                out.push_str(&part);
            }
            Ok(Value::string(out))
        }
        "sort" => {
            call.arity(1, 1)?;
            let mut items = call.list(0)?.to_vec();
            if items.iter().all(|v| v.as_number().is_some()) {
                items.sort_by(|a, b| {
                    let (a, b) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
                    a.total_cmp(&b)
                });
            } else if items.iter().all(|v| v.as_str().is_some()) {
                items.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
            } else {
                return Err(EvalError::TypeMismatch(
                    "list.sort requires all numbers or all strings".into(),
                ));
            }
            Ok(Value::List(items))
        }
        "range" => {
            call.arity(2, 2)?;
            let (start, end) = (call.number(0)?.trunc(), call.number(1)?.trunc());
            if end - start > 100_000.0 {
                return Err(EvalError::LimitExceeded("list.range is limited to 100000 items".into()));
            }
            let mut items = Vec::new();
            let mut n = start;
            while n < end {
                items.push(Value::Number(n));
                n += 1.0;
            }
            Ok(Value::List(items))
        }
        _ => Err(call.unknown()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// record
// ══════════════════════════════════════════════════════════════════════════════

fn call_record(call: Call<'_>) -> EvalResult<Value> {
    let fields = match call.arg(0) {
        Value::Record(fields) => fields,
        _ => return Err(call.mismatch(0, "record")),
    };
    match call.function {
        "keys" => {
            call.arity(1, 1)?;
            Ok(Value::List(fields.keys().map(|k| Value::string(k.as_str())).collect()))
        }
        "values" => {
            call.arity(1, 1)?;
            Ok(Value::List(fields.values().cloned().collect()))
        }
        "has" => {
            call.arity(2, 2)?;
            Ok(Value::Bool(fields.contains_key(call.string(1)?)))
        }
        "get" => {
            call.arity(2, 3)?;
            let default = call.arg(2).clone();
            Ok(fields.get(call.string(1)?).cloned().unwrap_or(default))
        }
        _ => Err(call.unknown()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// convert
// ══════════════════════════════════════════════════════════════════════════════

fn call_convert(call: Call<'_>) -> EvalResult<Value> {
    call.arity(1, 1)?;
    let value = call.arg(0);
    match call.function {
        "to_string" => Ok(Value::string(value.to_string())),
        "to_number" => Ok(Value::Number(to_number(value))),
        "to_int" => Ok(Value::Number(to_number(value).trunc())),
        "to_bool" => Ok(Value::Bool(value.is_truthy())),
        _ => Err(call.unknown()),
    }
}

/// Numeric reading of a value; unparseable strings are `NaN`.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Nil => 0.0,
        Value::List(_) | Value::Record(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_math_min_max_variadic() {
        assert_eq!(call("math", "max", vec![num(2.0), num(7.0), num(3.0)]), Ok(num(7.0)));
        assert_eq!(call("math", "min", vec![num(2.0), num(-1.0)]), Ok(num(-1.0)));
        assert!(matches!(
            call("math", "max", vec![]),
            Err(EvalError::BuiltinError(_))
        ));
    }

    #[test]
    fn test_arity_message() {
        let err = call("math", "pow", vec![num(2.0)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "builtin error: math.pow expects 2 argument(s), got 1"
        );
    }

    #[test]
    fn test_string_slice_negative_bounds() {
        assert_eq!(
            call("string", "slice", vec!["héllo".into(), num(-3.0)]),
            Ok("llo".into())
        );
        assert_eq!(
            call("string", "slice", vec!["abc".into(), num(2.0), num(1.0)]),
            Ok("".into())
        );
    }

    #[test]
    fn test_convert_to_number() {
        assert_eq!(call("convert", "to_number", vec![" 42 ".into()]), Ok(num(42.0)));
        let nan = call("convert", "to_number", vec!["4x".into()]).unwrap();
        assert!(nan.as_number().unwrap().is_nan());
        assert_eq!(call("convert", "to_int", vec!["3.9".into()]), Ok(num(3.0)));
    }

    #[test]
    fn test_list_sort_mixed_rejected() {
        assert!(call("list", "sort", vec![Value::List(vec![num(1.0), "a".into()])]).is_err());
        assert_eq!(
            call("list", "sort", vec![Value::List(vec![num(3.0), num(1.0)])]),
            Ok(Value::List(vec![num(1.0), num(3.0)]))
        );
    }

    #[test]
    fn test_repeat_and_replace_respect_size_limit() {
        let chunk: Value = "x".repeat(100_000).into();
        assert_eq!(
            call("string", "repeat", vec!["ab".into(), num(3.0)]),
            Ok("ababab".into())
        );
        assert!(matches!(
            call("string", "repeat", vec![chunk, num(10_000.0)]),
            Err(EvalError::LimitExceeded(_))
        ));
        let big = "x".repeat(MAX_VALUE_BYTES / 2);
        assert!(matches!(
            call("string", "replace", vec![big.into(), "x".into(), "yyy".into()]),
            Err(EvalError::LimitExceeded(_))
        ));
        assert_eq!(
            call("string", "replace", vec!["ab".into(), "".into(), "-".into()]),
            Ok("-a-b-".into())
        );
    }

    #[test]
    fn test_join_respects_size_limit() {
        let half: Value = "x".repeat(MAX_VALUE_BYTES / 2).into();
        let items = Value::List(vec![half.clone(), half.clone(), half]);
        assert!(matches!(
            call("list", "join", vec![items, ",".into()]),
            Err(EvalError::LimitExceeded(_))
        ));
        let small = Value::List(vec![num(1.0), "a".into()]);
        assert_eq!(call("list", "join", vec![small, "-".into()]), Ok("1-a".into()));
    }

    #[test]
    fn test_unknown_function_and_module() {
        assert_eq!(
            call("math", "nope", vec![]),
            Err(EvalError::UnknownFunction("math.nope".into()))
        );
        assert!(!is_module("Math"));
        assert!(call("json", "parse", vec![]).is_err());
    }
}
