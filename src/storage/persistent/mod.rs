//! Persistent storage backend for pocketmoney.
//!
//! This module provides durable, crash-safe document storage with:
//! - Atomic replace (temp file + rename) for every write
//! - File locking for single-process ownership of a data directory
//! - CRC32 checksums for corruption detection
//!
//! # Layout
//!
//! ```text
//! <data dir>/
//! ├── .pocketmoney.lock   exclusive flock / LockFileEx
//! ├── pm_settings.doc     [MAGIC][version][len][JSON][crc32]
//! └── pm_state.doc
//! ```

mod codec;
mod file_lock;
mod store;

pub use store::FileDocumentStore;

use std::path::Path;

use crate::error::BudgetResult;

/// Configuration for persistent storage.
#[derive(Debug, Clone)]
pub struct PersistentConfig {
    /// Whether to fsync after every write (slower but safer).
    pub sync_on_write: bool,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
        }
    }
}

/// Open or create a persistent document store at the given path.
///
/// # Errors
/// - If the path cannot be created or accessed
/// - If another process holds the lock
///
/// # Example
/// ```rust,ignore
/// use std::sync::Arc;
/// use pocketmoney::{BudgetEngine, EngineConfig, SystemClock};
/// use pocketmoney::storage::open_store;
///
/// let store = open_store("./budget", None)?;
/// let config = EngineConfig::default();
/// let engine = BudgetEngine::new(Arc::new(store), Arc::new(SystemClock), config)?;
/// ```
pub fn open_store(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> BudgetResult<FileDocumentStore> {
    Ok(FileDocumentStore::open(path.as_ref(), config.unwrap_or_default())?)
}
