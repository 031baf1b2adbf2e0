use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::comparison::{compare, values_equal};
use crate::errors::{EvalError, Result};
use crate::expression::{BinaryOp, Expr, Script, Stmt, UnaryOp};
use crate::functions::Registry;
use crate::value::{render, truthy, type_name, GString, ScriptValue};

/// Names visible to one execution: script locals shadow the binding.
pub(crate) struct Scope<'b> {
    env: HashMap<String, &'b Value>,
    locals: HashMap<String, ScriptValue>,
}

impl<'b> Scope<'b> {
    pub(crate) fn new(env: HashMap<String, &'b Value>) -> Self {
        Self {
            env,
            locals: HashMap::new(),
        }
    }

    fn lookup(&self, name: &str) -> Result<ScriptValue> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        self.env
            .get(name)
            .map(|v| ScriptValue::Plain((*v).clone()))
            .ok_or_else(|| EvalError::MissingProperty(name.to_string()))
    }
}

/// Tree-walking interpreter over a parsed [`Script`].
pub(crate) struct Engine<'r> {
    registry: &'r Registry,
}

impl<'r> Engine<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Runs every statement; the script's value is the last statement's value
    /// or whatever `return` hands back.
    pub(crate) fn run(&self, script: &Script, scope: &mut Scope<'_>) -> Result<ScriptValue> {
        debug!(statements = script.statements.len(), "running script");
        let mut last = ScriptValue::Plain(Value::Null);
        for stmt in &script.statements {
            last = match stmt {
                Stmt::Def(name, init) => {
                    let v = match init {
                        Some(e) => self.eval(e, scope)?,
                        None => ScriptValue::Plain(Value::Null),
                    };
                    scope.locals.insert(name.clone(), v);
                    ScriptValue::Plain(Value::Null)
                }
                Stmt::Assign(name, e) => {
                    let v = self.eval(e, scope)?;
                    scope.locals.insert(name.clone(), v.clone());
                    v
                }
                Stmt::Return(e) => {
                    return match e {
                        Some(e) => self.eval(e, scope),
                        None => Ok(ScriptValue::Plain(Value::Null)),
                    };
                }
                Stmt::Expr(e) => self.eval(e, scope)?,
            };
        }
        Ok(last)
    }

    fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Result<ScriptValue> {
        let v = match expr {
            Expr::Var(name) => return scope.lookup(name),
            Expr::Interpolated { strings, values } => {
                let values = values
                    .iter()
                    .map(|e| self.eval_plain(e, scope))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(ScriptValue::Interpolated(GString::new(strings.clone(), values)));
            }
            Expr::Ternary { cond, then, otherwise } => {
                return if truthy(&self.eval_plain(cond, scope)?) {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                };
            }
            Expr::Elvis(value, fallback) => {
                let v = self.eval(value, scope)?;
                let keep = match &v {
                    ScriptValue::Plain(p) => truthy(p),
                    ScriptValue::Interpolated(g) => !g.to_string().is_empty(),
                };
                return if keep { Ok(v) } else { self.eval(fallback, scope) };
            }
            Expr::Literal(v) => v.clone(),
            Expr::List(items) => Value::Array(
                items
                    .iter()
                    .map(|e| self.eval_plain(e, scope))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Expr::Map(entries) => {
                let mut m = Map::new();
                for (k, e) in entries {
                    m.insert(k.clone(), self.eval_plain(e, scope)?);
                }
                Value::Object(m)
            }
            Expr::Unary(op, inner) => unary(*op, self.eval_plain(inner, scope)?)?,
            Expr::Binary(BinaryOp::And, l, r) => {
                Value::Bool(truthy(&self.eval_plain(l, scope)?) && truthy(&self.eval_plain(r, scope)?))
            }
            Expr::Binary(BinaryOp::Or, l, r) => {
                Value::Bool(truthy(&self.eval_plain(l, scope)?) || truthy(&self.eval_plain(r, scope)?))
            }
            Expr::Binary(op, l, r) => {
                binary(*op, self.eval_plain(l, scope)?, self.eval_plain(r, scope)?)?
            }
            Expr::Property { target, name, null_safe } => {
                property(self.eval_plain(target, scope)?, name, *null_safe)?
            }
            Expr::Index { target, index: idx } => {
                index(self.eval_plain(target, scope)?, self.eval_plain(idx, scope)?)?
            }
            Expr::Method { target, name, args, null_safe } => {
                let receiver = self.eval_plain(target, scope)?;
                if receiver.is_null() {
                    if *null_safe {
                        return Ok(ScriptValue::Plain(Value::Null));
                    }
                    return Err(EvalError::Runtime(format!(
                        "cannot invoke method {name}() on null object"
                    )));
                }
                let mut argv = Vec::with_capacity(args.len() + 1);
                argv.push(receiver);
                for a in args {
                    argv.push(self.eval_plain(a, scope)?);
                }
                self.registry.call(name, &argv)?
            }
            Expr::Call { name, args } => {
                let argv = args
                    .iter()
                    .map(|a| self.eval_plain(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                self.registry.call(name, &argv)?
            }
        };
        Ok(ScriptValue::Plain(v))
    }

    /// Evaluates and collapses interpolated strings, for places that need a
    /// concrete value: operands, receivers, arguments, collection elements.
    fn eval_plain(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
        Ok(self.eval(expr, scope)?.into_plain())
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(v: &Value) -> Option<Num> {
        match v {
            Value::Number(n) => n.as_i64().map(Num::Int).or_else(|| n.as_f64().map(Num::Float)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

/// Longest string `'s' * n` may build, in bytes.
const MAX_REPEAT_LEN: usize = 1 << 24;

fn float(f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Runtime("arithmetic produced a non-finite number".into()))
}

fn overflow() -> EvalError {
    EvalError::Runtime("integer overflow".into())
}

fn division_by_zero() -> EvalError {
    EvalError::Runtime("division by zero".into())
}

fn type_mismatch(op: &str, a: &Value, b: &Value) -> EvalError {
    EvalError::Runtime(format!(
        "cannot apply '{op}' to {} and {}",
        type_name(a),
        type_name(b)
    ))
}

fn numeric(
    op: &str,
    a: &Value,
    b: &Value,
    int: fn(i64, i64) -> Option<i64>,
    fl: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (Num::of(a), Num::of(b)) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => int(x, y).map(Value::from).ok_or_else(overflow),
        (Some(x), Some(y)) => float(fl(x.as_f64(), y.as_f64())),
        _ => Err(type_mismatch(op, a, b)),
    }
}

fn unary(op: UnaryOp, v: Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!truthy(&v))),
        UnaryOp::Neg => match Num::of(&v) {
            Some(Num::Int(i)) => i.checked_neg().map(Value::from).ok_or_else(overflow),
            Some(Num::Float(f)) => float(-f),
            None => Err(EvalError::Runtime(format!("cannot negate {}", type_name(&v)))),
        },
    }
}

fn binary(op: BinaryOp, a: Value, b: Value) -> Result<Value> {
    match op {
        BinaryOp::Or => Ok(Value::Bool(truthy(&a) || truthy(&b))),
        BinaryOp::And => Ok(Value::Bool(truthy(&a) && truthy(&b))),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&a, &b))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&a, &b))),
        BinaryOp::Lt => Ok(Value::Bool(compare(&a, &b)? == Ordering::Less)),
        BinaryOp::Lte => Ok(Value::Bool(compare(&a, &b)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare(&a, &b)? == Ordering::Greater)),
        BinaryOp::Gte => Ok(Value::Bool(compare(&a, &b)? != Ordering::Less)),
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => numeric("-", &a, &b, i64::checked_sub, |x, y| x - y),
        BinaryOp::Mul => match (&a, &b) {
            (Value::String(s), Value::Number(n)) => {
                let times = n
                    .as_u64()
                    .and_then(|t| usize::try_from(t).ok())
                    .ok_or_else(|| type_mismatch("*", &a, &b))?;
                match s.len().checked_mul(times) {
                    Some(len) if len <= MAX_REPEAT_LEN => Ok(Value::String(s.repeat(times))),
                    _ => Err(EvalError::Runtime(format!(
                        "repeated string would exceed {MAX_REPEAT_LEN} bytes"
                    ))),
                }
            }
            _ => numeric("*", &a, &b, i64::checked_mul, |x, y| x * y),
        },
        BinaryOp::Div => divide(&a, &b),
        BinaryOp::Mod => match (Num::of(&a), Num::of(&b)) {
            (Some(_), Some(Num::Int(0))) => Err(division_by_zero()),
            (Some(_), Some(Num::Float(y))) if y == 0.0 => Err(division_by_zero()),
            _ => numeric("%", &a, &b, i64::checked_rem, |x, y| x % y),
        },
    }
}

fn add(a: Value, b: Value) -> Result<Value> {
    match (a, b) {
        (Value::String(mut x), b) => {
            x.push_str(&render(&b));
            Ok(Value::String(x))
        }
        (a, Value::String(y)) => Ok(Value::String(render(&a) + &y)),
        (Value::Array(mut x), Value::Array(y)) => {
            x.extend(y);
            Ok(Value::Array(x))
        }
        (Value::Array(mut x), b) => {
            x.push(b);
            Ok(Value::Array(x))
        }
        (Value::Object(mut x), Value::Object(y)) => {
            x.extend(y);
            Ok(Value::Object(x))
        }
        (a, b) => numeric("+", &a, &b, i64::checked_add, |x, y| x + y),
    }
}

/// Integer division stays integral only when it is exact.
fn divide(a: &Value, b: &Value) -> Result<Value> {
    match (Num::of(a), Num::of(b)) {
        (Some(_), Some(Num::Int(0))) => Err(division_by_zero()),
        (Some(Num::Int(x)), Some(Num::Int(y))) => {
            match x.checked_rem(y) {
                None => Err(overflow()),
                Some(0) => x.checked_div(y).map(Value::from).ok_or_else(overflow),
                Some(_) => float(x as f64 / y as f64),
            }
        }
        (Some(x), Some(y)) => {
            let d = y.as_f64();
            if d == 0.0 {
                return Err(division_by_zero());
            }
            float(x.as_f64() / d)
        }
        _ => Err(type_mismatch("/", a, b)),
    }
}

/// `map.key` reads the key, `list.key` collects it from every element.
fn property(target: Value, name: &str, null_safe: bool) -> Result<Value> {
    match target {
        Value::Object(mut m) => Ok(m.remove(name).unwrap_or(Value::Null)),
        Value::Null if null_safe => Ok(Value::Null),
        Value::Null => Err(EvalError::Runtime(format!(
            "cannot get property '{name}' on null object"
        ))),
        Value::Array(items) => items
            .into_iter()
            .map(|item| property(item, name, null_safe))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(EvalError::Runtime(format!(
            "no such property '{name}' on {}",
            type_name(&other)
        ))),
    }
}

fn index(target: Value, idx: Value) -> Result<Value> {
    match (target, idx) {
        (Value::Array(items), Value::Number(n)) => {
            let i = n
                .as_i64()
                .ok_or_else(|| EvalError::Runtime("list index must be an integer".into()))?;
            Ok(position(i, items.len())
                .and_then(|p| items.into_iter().nth(p))
                .unwrap_or(Value::Null))
        }
        (Value::Object(mut m), key) => Ok(m.remove(&render(&key)).unwrap_or(Value::Null)),
        (Value::String(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            n.as_i64()
                .and_then(|i| position(i, chars.len()))
                .map(|p| Value::String(chars[p].to_string()))
                .ok_or_else(|| {
                    EvalError::Runtime(format!("string index {n} out of range for length {}", chars.len()))
                })
        }
        (Value::Null, _) => Err(EvalError::Runtime("cannot index a null object".into())),
        (t, i) => Err(EvalError::Runtime(format!(
            "cannot index {} with {}",
            type_name(&t),
            type_name(&i)
        ))),
    }
}

/// Resolves a possibly negative index against `len`.
fn position(i: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let pos = if i < 0 { len + i } else { i };
    if (0..len).contains(&pos) {
        usize::try_from(pos).ok()
    } else {
        None
    }
}
