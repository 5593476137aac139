// src/storage/mod.rs

//! Key/value stores handed to job hooks.
//!
//! - [`Storage`] is a plain string-keyed map of JSON values.
//! - [`StorageManager`] owns the global store (alive for the whole
//!   execution) and issues a fresh local store for every attempt cycle.
//! - [`Arguments`] is the positional + named bundle passed unchanged to
//!   every hook.
//!
//! Everything runs on the scheduler thread, so nothing here is locked. A
//! parallel scheduler would have to guard the global store.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod args;

pub use args::Arguments;

/// String-keyed map of JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Storage {
    entries: BTreeMap<String, Value>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Deserialize the value under `key`; `None` if missing or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(Value::as_i64)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Add `by` to the integer under `key` (missing or non-integer counts
    /// as 0) and return the new value.
    pub fn increment(&mut self, key: &str, by: i64) -> i64 {
        let next = self.get_i64(key).unwrap_or(0) + by;
        self.entries.insert(key.to_string(), Value::from(next));
        next
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Owns the global store and hands out per-attempt local stores.
#[derive(Debug, Default)]
pub struct StorageManager {
    global: Storage,
    locals_issued: u64,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &Storage {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut Storage {
        &mut self.global
    }

    /// A new, empty local store for the start of an attempt cycle.
    ///
    /// The caller replaces the node's previous local store with it, so
    /// nothing written during a failed attempt survives into the retry.
    pub fn fresh_local(&mut self) -> Storage {
        self.locals_issued += 1;
        Storage::new()
    }

    /// Number of local stores issued so far (one per attempt cycle).
    pub fn locals_issued(&self) -> u64 {
        self.locals_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn increment_starts_from_zero() {
        let mut storage = Storage::new();
        assert_eq!(storage.increment("runs", 1), 1);
        assert_eq!(storage.increment("runs", 2), 3);
        assert_eq!(storage.get_i64("runs"), Some(3));
    }

    #[test]
    fn get_as_deserializes_structured_values() {
        let mut storage = Storage::new();
        storage.insert("guests", json!(["ada", "grace"]));

        let guests: Vec<String> = storage.get_as("guests").unwrap();
        assert_eq!(guests, vec!["ada", "grace"]);
        assert_eq!(storage.get_as::<u32>("guests"), None);
    }

    #[test]
    fn fresh_local_is_always_empty() {
        let mut manager = StorageManager::new();
        let mut local = manager.fresh_local();
        local.insert("flag", true);

        let next = manager.fresh_local();
        assert!(next.is_empty());
        assert_eq!(manager.locals_issued(), 2);
    }

    #[test]
    fn global_store_persists() {
        let mut manager = StorageManager::new();
        manager.global_mut().insert("release", "v1");
        let _ = manager.fresh_local();
        assert_eq!(manager.global().get_str("release"), Some("v1"));
    }
}
