//! FILENAME: core/formula/src/context.rs
//! PURPOSE: Name-to-value mapping consulted for free identifiers.
//! CONTEXT: Supplied by the caller per evaluation. The engine only reads it.

use crate::error::FormulaResult;
use crate::value::Value;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct Context {
    variables: FxHashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a variable, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.variables.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Builds a context from a JSON object, e.g. `{"abc": 5, "xs": [1, 2]}`.
    pub fn from_json(json: &str) -> FormulaResult<Self> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        Ok(object
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        context.extend(iter);
        context
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}
