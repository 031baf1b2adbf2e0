use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::{EvalError, Result};

/// Caller-owned variables visible to a script. The executor only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Binding {
    vars: Map<String, Value>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// Builds the name lookup a single execution sees. With `groovify` every
    /// dotted name is also reachable with its dots turned into underscores;
    /// a name that is already spelled that way keeps its own value.
    pub(crate) fn environment(&self, groovify: bool) -> HashMap<String, &Value> {
        let mut env = HashMap::with_capacity(self.vars.len());
        if groovify {
            for (name, value) in self.vars.iter().filter(|(n, _)| n.contains('.')) {
                env.insert(groovify_name(name), value);
            }
        }
        for (name, value) in &self.vars {
            if !groovify || !name.contains('.') {
                env.insert(name.clone(), value);
            }
        }
        env
    }
}

/// `user.login` -> `user_login`.
pub fn groovify_name(name: &str) -> String {
    name.replace('.', "_")
}

impl From<Map<String, Value>> for Binding {
    fn from(vars: Map<String, Value>) -> Self {
        Self { vars }
    }
}

impl From<HashMap<String, Value>> for Binding {
    fn from(vars: HashMap<String, Value>) -> Self {
        vars.into_iter().collect()
    }
}

impl TryFrom<Value> for Binding {
    type Error = EvalError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(vars) => Ok(Self { vars }),
            other => Err(EvalError::Runtime(format!(
                "binding must be a JSON object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Binding {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
