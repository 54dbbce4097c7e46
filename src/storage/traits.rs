//! Abstract document store for pocketmoney.
//!
//! The engine persists two JSON documents (settings and state) through this
//! trait. By using a trait, we enable:
//! - In-memory backends for testing and embedded use
//! - A file-backed backend for the command-line front end
//! - Host-provided backends (browser storage, mobile key-value stores)

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key contains characters the backend cannot store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Another process owns the store.
    #[error("Store is locked: {0}")]
    Locked(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored bytes failed an integrity check.
    #[error("Corrupted entry '{key}': {message}")]
    Corrupted {
        /// Key of the damaged entry.
        key: String,
        /// What the integrity check reported.
        message: String,
    },
}

/// Synchronous key-value store of JSON documents.
///
/// # Safety Considerations
/// - `set` replaces the whole document; there is no partial update
/// - Implementations must be safe to share across threads
/// - A `get` must never observe a half-written document
pub trait DocumentStore: Send + Sync {
    /// Get the document stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Store `value` under `key`, replacing any previous document.
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError>;

    /// Remove the document under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Rejects keys outside `[A-Za-z0-9_-]`, or empty keys.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let ok = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_document_store_object_safe(_: &dyn DocumentStore) {}

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::InvalidKey("../etc".to_string());
        assert!(err.to_string().contains("Invalid key"));

        let err = StorageError::BackendError("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("pm_state").is_ok());
        assert!(validate_key("pm-settings-2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../pm_state").is_err());
        assert!(validate_key("pm state").is_err());
    }
}
