//! Keyed handler registries
//!
//! Each [`Compiler`](crate::Compiler) owns one registry per extension point:
//! decoders by encoding name, unmarshalers by media type, and loaders by URI
//! scheme. Registration overwrites; the last handler registered for a key wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// A mapping from a key to a shared handler.
///
/// Lookups hand out a cloned `Arc` so no lock is held while the handler runs.
pub struct Registry<T: ?Sized> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the handler for `key`
    pub fn insert(&self, key: impl Into<String>, handler: Arc<T>) {
        self.entries.write().insert(key.into(), handler);
    }

    /// Get the handler for `key`
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.read().get(key).cloned()
    }

    /// Whether a handler is registered for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Remove the handler for `key`, returning it
    pub fn remove(&self, key: &str) -> Option<Arc<T>> {
        self.entries.write().remove(key)
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_registration_wins() {
        let registry: Registry<str> = Registry::new();
        registry.insert("k", Arc::from("first"));
        registry.insert("k", Arc::from("second"));
        assert_eq!(registry.get("k").as_deref(), Some("second"));
        assert_eq!(registry.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn test_missing_key() {
        let registry: Registry<str> = Registry::new();
        assert!(registry.get("nope").is_none());
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_remove() {
        let registry: Registry<str> = Registry::new();
        registry.insert("k", Arc::from("v"));
        assert!(registry.remove("k").is_some());
        assert!(!registry.contains("k"));
    }
}
