use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::errors::{EvalError, Result};

/// Trait for pluggable functions. A method call `recv.name(a, b)` arrives
/// here as `call(&[recv, a, b])`, a bare call `name(a, b)` as `call(&[a, b])`.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let all: [Arc<dyn Function>; 17] = [
            Arc::new(builtins::ToUpperCase),
            Arc::new(builtins::ToLowerCase),
            Arc::new(builtins::Trim),
            Arc::new(builtins::Size),
            Arc::new(builtins::AsString),
            Arc::new(builtins::Contains),
            Arc::new(builtins::StartsWith),
            Arc::new(builtins::EndsWith),
            Arc::new(builtins::Replace),
            Arc::new(builtins::Substring),
            Arc::new(builtins::Split),
            Arc::new(builtins::Join),
            Arc::new(builtins::First),
            Arc::new(builtins::Last),
            Arc::new(builtins::Unique),
            Arc::new(builtins::IsEmpty),
            Arc::new(builtins::KeySet),
        ];
        let map = all.into_iter().map(|f| (f.name(), f)).collect();
        Self { inner: Arc::new(map) }
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    /// Looks up `name`, checks the argument count and runs it.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let missing = || EvalError::MissingMethod {
            name: name.to_string(),
            arity: args.len(),
        };
        let f = self.get(name).ok_or_else(missing)?;
        if !f.arity().contains(&args.len()) {
            return Err(missing());
        }
        trace!(function = name, argc = args.len(), "dispatch");
        f.call(args)
    }
}

pub mod builtins {
    use super::*;
    use crate::comparison::values_equal;
    use crate::value::{render, type_name};
    use itertools::Itertools;

    fn receiver_str<'v>(args: &'v [Value], method: &str) -> Result<&'v str> {
        arg_str(args, 0, method)
    }

    fn arg_str<'v>(args: &'v [Value], i: usize, method: &str) -> Result<&'v str> {
        match args.get(i) {
            Some(Value::String(s)) => Ok(s.as_str()),
            other => Err(EvalError::Runtime(format!(
                "{method}() expects a String at position {i}, got {}",
                other.map(type_name).unwrap_or("nothing")
            ))),
        }
    }

    fn arg_index(args: &[Value], i: usize, method: &str) -> Result<usize> {
        args.get(i)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                EvalError::Runtime(format!("{method}() expects a non-negative index at position {i}"))
            })
    }

    fn unsupported(method: &str, v: &Value) -> EvalError {
        EvalError::Runtime(format!("{method}() is not supported on {}", type_name(v)))
    }

    pub struct ToUpperCase;
    impl Function for ToUpperCase {
        fn name(&self) -> &'static str { "toUpperCase" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(receiver_str(args, self.name())?.to_uppercase()))
        }
    }

    pub struct ToLowerCase;
    impl Function for ToLowerCase {
        fn name(&self) -> &'static str { "toLowerCase" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(receiver_str(args, self.name())?.to_lowercase()))
        }
    }

    pub struct Trim;
    impl Function for Trim {
        fn name(&self) -> &'static str { "trim" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(receiver_str(args, self.name())?.trim().to_string()))
        }
    }

    pub struct Size;
    impl Function for Size {
        fn name(&self) -> &'static str { "size" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(m) => m.len(),
                other => return Err(unsupported(self.name(), other)),
            };
            Ok(Value::from(len))
        }
    }

    pub struct AsString;
    impl Function for AsString {
        fn name(&self) -> &'static str { "toString" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(render(&args[0])))
        }
    }

    pub struct Contains;
    impl Function for Contains {
        fn name(&self) -> &'static str { "contains" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let found = match &args[0] {
                Value::String(s) => s.contains(arg_str(args, 1, self.name())?),
                Value::Array(a) => a.iter().any(|v| values_equal(v, &args[1])),
                Value::Object(m) => m.contains_key(arg_str(args, 1, self.name())?),
                other => return Err(unsupported(self.name(), other)),
            };
            Ok(Value::Bool(found))
        }
    }

    pub struct StartsWith;
    impl Function for StartsWith {
        fn name(&self) -> &'static str { "startsWith" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = receiver_str(args, self.name())?;
            Ok(Value::Bool(s.starts_with(arg_str(args, 1, self.name())?)))
        }
    }

    pub struct EndsWith;
    impl Function for EndsWith {
        fn name(&self) -> &'static str { "endsWith" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = receiver_str(args, self.name())?;
            Ok(Value::Bool(s.ends_with(arg_str(args, 1, self.name())?)))
        }
    }

    pub struct Replace;
    impl Function for Replace {
        fn name(&self) -> &'static str { "replace" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 3..=3 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = receiver_str(args, self.name())?;
            let from = arg_str(args, 1, self.name())?;
            let to = arg_str(args, 2, self.name())?;
            Ok(Value::String(s.replace(from, to)))
        }
    }

    /// Character offsets, end exclusive, like `String.substring`.
    pub struct Substring;
    impl Function for Substring {
        fn name(&self) -> &'static str { "substring" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 2..=3 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let chars: Vec<char> = receiver_str(args, self.name())?.chars().collect();
            let start = arg_index(args, 1, self.name())?;
            let end = if args.len() == 3 {
                arg_index(args, 2, self.name())?
            } else {
                chars.len()
            };
            if start > end || end > chars.len() {
                return Err(EvalError::Runtime(format!(
                    "substring({start}, {end}) out of range for length {}",
                    chars.len()
                )));
            }
            Ok(Value::String(chars[start..end].iter().collect()))
        }
    }

    /// Without a separator splits on whitespace; otherwise on the literal separator.
    pub struct Split;
    impl Function for Split {
        fn name(&self) -> &'static str { "split" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = receiver_str(args, self.name())?;
            let parts: Vec<Value> = if args.len() == 2 {
                let sep = arg_str(args, 1, self.name())?;
                if sep.is_empty() {
                    return Err(EvalError::Runtime("split() separator must not be empty".into()));
                }
                s.split(sep).map(|p| Value::String(p.to_string())).collect()
            } else {
                s.split_whitespace().map(|p| Value::String(p.to_string())).collect()
            };
            Ok(Value::Array(parts))
        }
    }

    pub struct Join;
    impl Function for Join {
        fn name(&self) -> &'static str { "join" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let sep = if args.len() == 2 { arg_str(args, 1, self.name())? } else { "" };
            match &args[0] {
                Value::Array(a) => Ok(Value::String(a.iter().map(render).join(sep))),
                other => Err(unsupported(self.name(), other)),
            }
        }
    }

    pub struct First;
    impl Function for First {
        fn name(&self) -> &'static str { "first" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match &args[0] {
                Value::Array(a) => Ok(a.first().cloned().unwrap_or(Value::Null)),
                other => Err(unsupported(self.name(), other)),
            }
        }
    }

    pub struct Last;
    impl Function for Last {
        fn name(&self) -> &'static str { "last" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match &args[0] {
                Value::Array(a) => Ok(a.last().cloned().unwrap_or(Value::Null)),
                other => Err(unsupported(self.name(), other)),
            }
        }
    }

    /// Keeps the first occurrence of each element, in order.
    pub struct Unique;
    impl Function for Unique {
        fn name(&self) -> &'static str { "unique" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match &args[0] {
                Value::Array(a) => {
                    let dedup = a
                        .iter()
                        .cloned()
                        .unique_by(|x| serde_json::to_string(x).unwrap_or_default())
                        .collect::<Vec<_>>();
                    Ok(Value::Array(dedup))
                }
                other => Err(unsupported(self.name(), other)),
            }
        }
    }

    pub struct IsEmpty;
    impl Function for IsEmpty {
        fn name(&self) -> &'static str { "isEmpty" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let empty = match &args[0] {
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(m) => m.is_empty(),
                other => return Err(unsupported(self.name(), other)),
            };
            Ok(Value::Bool(empty))
        }
    }

    pub struct KeySet;
    impl Function for KeySet {
        fn name(&self) -> &'static str { "keySet" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match &args[0] {
                Value::Object(m) => Ok(Value::Array(
                    m.keys().map(|k| Value::String(k.clone())).collect(),
                )),
                other => Err(unsupported(self.name(), other)),
            }
        }
    }
}
