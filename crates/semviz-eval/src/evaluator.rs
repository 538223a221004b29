//! Tree-walking interpreter for action bodies.

use crate::builtins;
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::limits::Footprint;
use crate::value::format_number;
use crate::Value;
use semviz_types::ast::*;

/// Steps a single body may take before it is stopped.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000;

/// Evaluates one action body against an explicit environment.
///
/// Every expression and statement costs one unit of gas; `for` iterations
/// cost one more each. Building or copying a value costs extra gas in
/// proportion to its size. Exhausting the limit is an
/// [`EvalError::GasExhausted`].
#[derive(Debug)]
pub struct Interpreter {
    env: Environment,
    gas: u64,
    gas_limit: u64,
    log_output: Vec<String>,
}

impl Interpreter {
    pub fn new(gas_limit: u64) -> Self {
        Self::with_environment(Environment::new(), gas_limit)
    }

    pub fn with_environment(env: Environment, gas_limit: u64) -> Self {
        Self {
            env,
            gas: 0,
            gas_limit,
            log_output: Vec::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn gas_used(&self) -> u64 {
        self.gas
    }

    /// Lines written by `core.log` so far.
    pub fn log_output(&self) -> &[String] {
        &self.log_output
    }

    pub fn take_log_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log_output)
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.charge(1)
    }

    fn charge(&mut self, gas: u64) -> EvalResult<()> {
        self.gas = self.gas.saturating_add(gas);
        if self.gas > self.gas_limit {
            return Err(EvalError::GasExhausted);
        }
        Ok(())
    }

    /// Check `value` against the allocation limits and pay for its size.
    fn measure(&mut self, value: Value, what: &str) -> EvalResult<Value> {
        let size = Footprint::of(&value).check(what)?;
        self.charge(size.gas())?;
        Ok(value)
    }

    /// Evaluate a whole body. A `return` anywhere ends the body with its value.
    pub fn eval_body(&mut self, body: &Body) -> EvalResult<Value> {
        let result = match body {
            Body::Expr(expr) => self.eval_expr(expr),
            Body::Block(block) => self.eval_block(block),
        };
        match result {
            Err(EvalError::Return(value)) => Ok(value),
            other => other,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NilLit => Ok(Value::Nil),
            ExprKind::StringInterpolation(parts) => self.eval_string_interpolation(parts),
            ExprKind::ListLit(items) => self.eval_list_literal(items),
            ExprKind::RecordLit(fields) => self.eval_record_literal(fields),
            ExprKind::Identifier(name) => self.eval_identifier(name),
            ExprKind::FieldAccess { object, field } => self.eval_field_access(object, field),
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => self.eval_method_call(object, method, args),
            ExprKind::Index { object, index } => self.eval_index(object, index),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::NilCoalesce { left, right } => self.eval_nil_coalesce(left, right),
            ExprKind::If(if_expr) => self.eval_if_expr(if_expr),
            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    fn eval_string_interpolation(&mut self, parts: &[StringPart]) -> EvalResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                StringPart::Literal(s) => out.push_str(s),
                StringPart::Expr(expr) => {
                    let value = self.eval_expr(expr)?.to_string();
                    Footprint::string(out.len() + value.len()).check("string")?;
                    out.push_str(&value);
                }
            }
        }
        self.charge(Footprint::string(out.len()).gas())?;
        Ok(Value::String(out))
    }

    fn eval_list_literal(&mut self, items: &[Expr]) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(items.len());
        let mut size = Footprint::container();
        for item in items {
            let value = self.eval_expr(item)?;
            size = size.with_item(Footprint::of(&value)).check("list")?;
            values.push(value);
        }
        self.charge(size.gas())?;
        Ok(Value::List(values))
    }

    fn eval_record_literal(&mut self, fields: &[RecordField]) -> EvalResult<Value> {
        let mut record = std::collections::BTreeMap::new();
        let mut size = Footprint::container();
        for field in fields {
            let value = self.eval_expr(&field.value)?;
            size = size
                .with_item(Footprint::of(&value))
                .with_item(Footprint::string(field.name.name.len()))
                .check("record")?;
            record.insert(field.name.name.clone(), value);
        }
        self.charge(size.gas())?;
        Ok(Value::Record(record))
    }

    fn eval_identifier(&mut self, name: &str) -> EvalResult<Value> {
        let value = self
            .env
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
        self.charge(Footprint::of(&value).gas())?;
        Ok(value)
    }

    /// An identifier that names a builtin module and is not shadowed by a binding.
    fn builtin_module<'e>(&self, object: &'e Expr) -> Option<&'e str> {
        match &object.kind {
            ExprKind::Identifier(name)
                if !self.env.is_bound(name) && builtins::is_module(name) =>
            {
                Some(name)
            }
            _ => None,
        }
    }

    fn eval_field_access(&mut self, object: &Expr, field: &Ident) -> EvalResult<Value> {
        if let Some(module) = self.builtin_module(object) {
            return builtins::constant(module, &field.name).ok_or_else(|| {
                EvalError::UnknownFunction(format!("{module}.{} is not a constant", field.name))
            });
        }
        let obj = self.eval_expr(object)?;
        match (&obj, field.name.as_str()) {
            (Value::Record(fields), name) => Ok(fields.get(name).cloned().unwrap_or(Value::Nil)),
            (Value::List(items), "length") => Ok(Value::Number(items.len() as f64)),
            (Value::String(s), "length") => Ok(Value::Number(s.chars().count() as f64)),
            (Value::Nil, name) => Err(EvalError::NilAccess(format!(
                "cannot read field '{name}' of nil"
            ))),
            (other, name) => Err(EvalError::TypeMismatch(format!(
                "{} has no field '{name}'",
                other.type_name()
            ))),
        }
    }

    fn eval_method_call(
        &mut self,
        object: &Expr,
        method: &Ident,
        args: &[Expr],
    ) -> EvalResult<Value> {
        if let Some(module) = self.builtin_module(object) {
            let arg_vals = self.eval_args(args)?;
            return self.call_builtin(module, &method.name, arg_vals);
        }

        // `value.method(args)` is `module.method(value, args)` for the value's type
        let obj = self.eval_expr(object)?;
        let module = match &obj {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Number(_) => "math",
            Value::Record(_) => "record",
            Value::Nil => {
                return Err(EvalError::NilAccess(format!(
                    "cannot call '{}' on nil",
                    method.name
                )));
            }
            Value::Bool(_) => {
                return Err(EvalError::TypeMismatch(format!(
                    "bool has no method '{}'",
                    method.name
                )));
            }
        };
        let mut all_args = vec![obj];
        all_args.extend(self.eval_args(args)?);
        self.call_builtin(module, &method.name, all_args)
    }

    fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    fn eval_index(&mut self, object: &Expr, index: &Expr) -> EvalResult<Value> {
        let obj = self.eval_expr(object)?;
        let idx = self.eval_expr(index)?;
        match (&obj, &idx) {
            (Value::List(items), Value::Number(n)) => {
                let i = list_index(*n, items.len())?;
                Ok(items[i].clone())
            }
            (Value::String(s), Value::Number(n)) => {
                let len = s.chars().count();
                let i = list_index(*n, len)?;
                Ok(Value::String(
                    s.chars().nth(i).map(String::from).unwrap_or_default(),
                ))
            }
            (Value::Record(fields), Value::String(key)) => {
                Ok(fields.get(key).cloned().unwrap_or(Value::Nil))
            }
            (Value::Nil, _) => Err(EvalError::NilAccess(format!("cannot index nil with {idx}"))),
            _ => Err(EvalError::TypeMismatch(format!(
                "cannot index {} with {}",
                obj.type_name(),
                idx.type_name()
            ))),
        }
    }

    // ── Operators ──

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        // Short-circuit
        match op {
            BinOp::And => {
                let l = self.eval_expr(left)?;
                if !l.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_expr(right)?.is_truthy()))
            }
            BinOp::Or => {
                let l = self.eval_expr(left)?;
                if l.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_expr(right)?.is_truthy()))
            }
            _ => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                let value = eval_strict_binary(l, op, r)?;
                if matches!(op, BinOp::Add) {
                    self.measure(value, "sum")
                } else {
                    Ok(value)
                }
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnaryOp::Neg => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(EvalError::TypeMismatch(format!(
                    "cannot negate {}",
                    other.type_name()
                ))),
            },
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        }
    }

    fn eval_nil_coalesce(&mut self, left: &Expr, right: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(left)?;
        if value.is_nil() {
            self.eval_expr(right)
        } else {
            Ok(value)
        }
    }

    fn eval_if_expr(&mut self, if_expr: &IfExpr) -> EvalResult<Value> {
        let condition = self.eval_expr(&if_expr.condition)?;
        if condition.is_truthy() {
            self.eval_scoped_block(&if_expr.then_block)
        } else if let Some(else_branch) = &if_expr.else_branch {
            match else_branch {
                ElseBranch::ElseIf(elif) => self.eval_if_expr(elif),
                ElseBranch::Block(block) => self.eval_scoped_block(block),
            }
        } else {
            Ok(Value::Nil)
        }
    }

    fn eval_for_expr(&mut self, for_expr: &ForExpr) -> EvalResult<Value> {
        let iterable = self.eval_expr(&for_expr.iterable)?;
        let items = match iterable {
            Value::List(items) => items,
            Value::String(s) => {
                Footprint::chars(s.chars().count()).check("for loop over string")?;
                s.chars().map(|c| Value::String(c.to_string())).collect()
            }
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "for loop requires list, got {}",
                    other.type_name()
                )));
            }
        };

        let mut last = Value::Nil;
        for (i, item) in items.into_iter().enumerate() {
            self.tick()?;
            self.env.push_scope();
            self.env.define(&for_expr.item.name, item);
            if let Some(idx) = &for_expr.index {
                self.env.define(&idx.name, Value::Number(i as f64));
            }
            let result = self.eval_block(&for_expr.body);
            self.env.pop_scope();
            last = result?;
        }
        Ok(last)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Block & Statement execution
    // ══════════════════════════════════════════════════════════════════════

    /// Execute a block of statements. Returns the value of the last statement, or Nil.
    pub fn eval_block(&mut self, block: &Block) -> EvalResult<Value> {
        let mut last = Value::Nil;
        for stmt in &block.stmts {
            last = self.eval_stmt(stmt)?;
        }
        Ok(last)
    }

    fn eval_scoped_block(&mut self, block: &Block) -> EvalResult<Value> {
        self.env.push_scope();
        let result = self.eval_block(block);
        self.env.pop_scope();
        result
    }

    pub fn eval_stmt(&mut self, stmt: &Stmt) -> EvalResult<Value> {
        self.tick()?;
        match stmt {
            Stmt::Let(binding) => {
                let value = self.eval_expr(&binding.value)?;
                self.env.define(&binding.name.name, value);
                Ok(Value::Nil)
            }
            Stmt::If(if_expr) => self.eval_if_expr(if_expr),
            Stmt::For(for_expr) => self.eval_for_expr(for_expr),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Err(EvalError::Return(value))
            }
            Stmt::Assert(assert) => self.eval_assert(assert),
            Stmt::Throw(throw) => {
                let value = self.eval_expr(&throw.value)?;
                Err(EvalError::Thrown(value))
            }
            Stmt::Expr(expr_stmt) => self.eval_expr(&expr_stmt.expr),
        }
    }

    fn eval_assert(&mut self, assert: &AssertStmt) -> EvalResult<Value> {
        let val = self.eval_expr(&assert.condition)?;
        if !val.is_truthy() {
            let msg = assert
                .message
                .clone()
                .unwrap_or_else(|| "assertion failed".into());
            return Err(EvalError::AssertionFailed(msg));
        }
        Ok(Value::Nil)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Builtin dispatch
    // ══════════════════════════════════════════════════════════════════════

    /// Call a builtin by module and function name.
    pub fn call_builtin(
        &mut self,
        module: &str,
        function: &str,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        // core.log → captured output
        if module == "core" && function == "log" {
            let line = args
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            self.charge(Footprint::string(line.len()).gas())?;
            self.log_output.push(line);
            return Ok(args.into_iter().next().unwrap_or(Value::Nil));
        }
        let value = builtins::call(module, function, args)?;
        self.measure(value, &format!("{module}.{function}"))
    }
}

fn eval_strict_binary(l: Value, op: BinOp, r: Value) -> EvalResult<Value> {
    match op {
        BinOp::Add => eval_add(l, r),
        BinOp::Sub => eval_arith(&l, &r, |a, b| a - b, op),
        BinOp::Mul => eval_arith(&l, &r, |a, b| a * b, op),
        BinOp::Div => eval_arith(&l, &r, |a, b| a / b, op),
        BinOp::Mod => eval_arith(&l, &r, |a, b| a % b, op),
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::NotEq => Ok(Value::Bool(l != r)),
        BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => {
            eval_comparison(&l, &r, op)
        }
        BinOp::And => Ok(Value::Bool(l.is_truthy() && r.is_truthy())),
        BinOp::Or => Ok(Value::Bool(l.is_truthy() || r.is_truthy())),
    }
}

fn list_index(n: f64, len: usize) -> EvalResult<usize> {
    if n.fract() != 0.0 || n < 0.0 || n >= len as f64 {
        return Err(EvalError::IndexOutOfRange(format!(
            "index {} out of range for length {len}",
            format_number(n)
        )));
    }
    Ok(n as usize)
}

fn eval_add(l: Value, r: Value) -> EvalResult<Value> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(mut a), r) => {
            let r = r.to_string();
            Footprint::string(a.len() + r.len()).check("string")?;
            a.push_str(&r);
            Ok(Value::String(a))
        }
        (l, Value::String(b)) => {
            let mut l = l.to_string();
            Footprint::string(l.len() + b.len()).check("string")?;
            l.push_str(&b);
            Ok(Value::String(l))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (l, r) => Err(EvalError::TypeMismatch(format!(
            "cannot add {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

/// IEEE arithmetic: `1 / 0` is `Infinity`, `0 / 0` is `NaN`.
fn eval_arith(l: &Value, r: &Value, f: fn(f64, f64) -> f64, op: BinOp) -> EvalResult<Value> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(EvalError::TypeMismatch(format!(
            "'{}' requires numbers, got {} and {}",
            op.symbol(),
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn eval_comparison(l: &Value, r: &Value, op: BinOp) -> EvalResult<Value> {
    let ordering = match (l, r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EvalError::TypeMismatch(format!(
                "cannot compare {} and {} with '{}'",
                l.type_name(),
                r.type_name(),
                op.symbol()
            )));
        }
    };
    // NaN compares false every way
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinOp::Less => ordering.is_lt(),
        BinOp::Greater => ordering.is_gt(),
        BinOp::LessEq => ordering.is_le(),
        BinOp::GreaterEq => ordering.is_ge(),
        _ => false,
    };
    Ok(Value::Bool(result))
}
