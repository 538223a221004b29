//! Allocation limits for action bodies.
//!
//! Gas counts steps, not bytes. Every value a body builds is measured here:
//! it must stay under [`MAX_VALUE_BYTES`] and [`MAX_VALUE_DEPTH`], and its
//! size is charged as extra gas so that copying large values is not free.

use crate::error::{EvalError, EvalResult};
use crate::Value;

/// Largest value a body may build, in approximate heap bytes.
pub const MAX_VALUE_BYTES: usize = 4 << 20;

/// Deepest nesting of lists and records.
pub const MAX_VALUE_DEPTH: usize = 64;

/// Bytes built or copied per extra unit of gas.
pub const BYTES_PER_GAS: usize = 1024;

/// Cost of one value slot, before any string contents.
const SLOT_BYTES: usize = 16;

/// Approximate heap size and container nesting of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footprint {
    pub bytes: usize,
    pub depth: usize,
}

impl Footprint {
    /// Measure `value` without recursing.
    pub fn of(value: &Value) -> Self {
        let mut bytes = 0usize;
        let mut depth = 0usize;
        // (value, number of enclosing containers)
        let mut stack = vec![(value, 0usize)];
        while let Some((v, level)) = stack.pop() {
            bytes = bytes.saturating_add(SLOT_BYTES);
            match v {
                Value::String(s) => bytes = bytes.saturating_add(s.len()),
                Value::List(items) => {
                    depth = depth.max(level + 1);
                    stack.extend(items.iter().map(|item| (item, level + 1)));
                }
                Value::Record(fields) => {
                    depth = depth.max(level + 1);
                    for (name, item) in fields {
                        bytes = bytes.saturating_add(name.len());
                        stack.push((item, level + 1));
                    }
                }
                Value::Nil | Value::Bool(_) | Value::Number(_) => {}
            }
        }
        Self { bytes, depth }
    }

    /// An empty list or record.
    pub fn container() -> Self {
        Self {
            bytes: SLOT_BYTES,
            depth: 1,
        }
    }

    /// A string of `len` bytes.
    pub fn string(len: usize) -> Self {
        Self {
            bytes: SLOT_BYTES.saturating_add(len),
            depth: 0,
        }
    }

    /// `self` as a container with `item` added to it.
    pub fn with_item(self, item: Footprint) -> Self {
        Self {
            bytes: self.bytes.saturating_add(item.bytes),
            depth: self.depth.max(item.depth + 1),
        }
    }

    /// A list of `count` one-character strings.
    pub fn chars(count: usize) -> Self {
        Self {
            bytes: count.saturating_mul(SLOT_BYTES + 4).saturating_add(SLOT_BYTES),
            depth: 1,
        }
    }

    pub fn gas(&self) -> u64 {
        (self.bytes / BYTES_PER_GAS) as u64
    }

    /// Fails when a value of this footprint is over the limits.
    pub fn check(self, what: &str) -> EvalResult<Self> {
        if self.bytes > MAX_VALUE_BYTES {
            return Err(EvalError::LimitExceeded(format!(
                "{what} would exceed {MAX_VALUE_BYTES} bytes"
            )));
        }
        if self.depth > MAX_VALUE_DEPTH {
            return Err(EvalError::LimitExceeded(format!(
                "{what} would nest deeper than {MAX_VALUE_DEPTH} levels"
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_counts_strings_and_nesting() {
        assert_eq!(Footprint::of(&Value::Number(1.0)), Footprint { bytes: 16, depth: 0 });
        let nested = Value::List(vec![Value::List(vec!["abcd".into()])]);
        assert_eq!(Footprint::of(&nested), Footprint { bytes: 52, depth: 2 });
        let record = Value::record([("ab", Value::Nil)]);
        assert_eq!(Footprint::of(&record), Footprint { bytes: 34, depth: 1 });
    }

    #[test]
    fn test_check_rejects_oversized_and_deep() {
        assert!(Footprint::string(MAX_VALUE_BYTES).check("string").is_err());
        assert!(Footprint::string(1024).check("string").is_ok());
        let mut deep = Footprint::default();
        for _ in 0..=MAX_VALUE_DEPTH {
            deep = Footprint::container().with_item(deep);
        }
        assert!(matches!(deep.check("list"), Err(EvalError::LimitExceeded(_))));
    }

    #[test]
    fn test_deeply_nested_value_measures_without_recursion() {
        let mut value = Value::Nil;
        for _ in 0..10_000 {
            value = Value::List(vec![value]);
        }
        assert_eq!(Footprint::of(&value).depth, 10_000);
        // unwind iteratively; the derived drop would recurse
        while let Value::List(mut items) = value {
            value = items.pop().unwrap_or(Value::Nil);
        }
    }
}
