//! Document storage for pocketmoney.
//!
//! The engine only sees the [`DocumentStore`] trait. An in-memory backend is
//! always available; the file-backed backend requires the `persistent` feature.

mod memory;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryDocumentStore;
pub use traits::{validate_key, DocumentStore, StorageError};

#[cfg(feature = "persistent")]
pub use persistent::{open_store, FileDocumentStore, PersistentConfig};
