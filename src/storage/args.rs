// src/storage/args.rs

use std::collections::BTreeMap;

use serde_json::Value;

/// Positional and named values passed to every hook invocation.
///
/// ```
/// use jobdag::storage::Arguments;
///
/// let args = Arguments::new()
///     .arg("deploy")
///     .named("target", "staging")
///     .named("dry_run", false);
///
/// assert_eq!(args.get_str("target"), Some("staging"));
/// assert!(!args.get_bool("dry_run"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named_values(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.named.get(key).and_then(Value::as_str)
    }

    /// Missing or non-boolean values read as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.named.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.named.get(key).and_then(Value::as_i64)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}
