use serde_json::Value;
use std::fmt;

/// A double-quoted string with placeholders. The literal fragments and the
/// evaluated placeholder values are kept apart and only joined when the
/// string is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct GString {
    strings: Vec<String>,
    values: Vec<Value>,
}

impl GString {
    /// `strings` surround `values`: there is always one more fragment than value.
    pub(crate) fn new(strings: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(strings.len(), values.len() + 1);
        Self { strings, values }
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.strings.iter().enumerate() {
            f.write_str(s)?;
            if let Some(v) = self.values.get(i) {
                f.write_str(&render(v))?;
            }
        }
        Ok(())
    }
}

/// What a script produces before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Plain(Value),
    Interpolated(GString),
}

impl ScriptValue {
    /// Collapses an interpolated string into a plain string; every other
    /// value passes through untouched.
    pub fn into_plain(self) -> Value {
        match self {
            ScriptValue::Plain(v) => v,
            ScriptValue::Interpolated(g) => Value::String(g.to_string()),
        }
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self, ScriptValue::Interpolated(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScriptValue::Plain(v) => type_name(v),
            ScriptValue::Interpolated(_) => "GString",
        }
    }
}

impl From<Value> for ScriptValue {
    fn from(v: Value) -> Self {
        ScriptValue::Plain(v)
    }
}

/// String form used by interpolation, concatenation and `toString()`.
pub fn render(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "Boolean",
        Value::Number(n) if n.is_f64() => "BigDecimal",
        Value::Number(_) => "Integer",
        Value::String(_) => "String",
        Value::Array(_) => "List",
        Value::Object(_) => "Map",
    }
}
