//! In-memory storage backend.
//!
//! Thread-safe in-memory implementation of [`DocumentStore`]. It is intended
//! for embedded usage, tests, and as a reference implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::storage::traits::{validate_key, DocumentStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.docs.read().map_err(|_| lock_err("document.len"))?.len())
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(key)?;
        let docs = self.docs.read().map_err(|_| lock_err("document.get"))?;
        Ok(docs.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut docs = self.docs.write().map_err(|_| lock_err("document.set"))?;
        docs.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut docs = self.docs.write().map_err(|_| lock_err("document.remove"))?;
        docs.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_replace() {
        let store = InMemoryDocumentStore::new();
        assert!(store.get("pm_state").unwrap().is_none());

        store.set("pm_state", json!({ "totalRemaining": 10 })).unwrap();
        store.set("pm_state", json!({ "totalRemaining": 5 })).unwrap();
        assert_eq!(store.get("pm_state").unwrap().unwrap()["totalRemaining"], 5);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let store = InMemoryDocumentStore::new();
        store.remove("pm_history").unwrap();
        store.set("pm_history", json!([])).unwrap();
        store.remove("pm_history").unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_rejects_invalid_key_on_every_call() {
        let store = InMemoryDocumentStore::new();
        let err = store.set("a/b", json!(1)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(matches!(store.get("../pm_state"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.remove(""), Err(StorageError::InvalidKey(_))));
    }
}
