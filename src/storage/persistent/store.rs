//! File-backed document store.
//!
//! Each key lives in its own `<key>.doc` file inside the data directory.
//! Writes go to a temporary sibling that is synced and then renamed over the
//! target, so a reader sees either the old or the new document, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::traits::{validate_key, DocumentStore, StorageError};

use super::codec::{self, StoredDocument};
use super::file_lock::FileLock;
use super::PersistentConfig;

const DOC_EXTENSION: &str = "doc";
const TMP_EXTENSION: &str = "doc.tmp";

fn io_err(context: &str, e: &std::io::Error) -> StorageError {
    StorageError::BackendError(format!("{context}: {e}"))
}

/// Document store persisted in a locked directory.
#[derive(Debug)]
pub struct FileDocumentStore {
    dir: PathBuf,
    config: PersistentConfig,
    write_guard: Mutex<()>,
    _lock: FileLock,
}

/// A crash between write and rename leaves a stale temp file behind.
fn remove_interrupted_writes(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not scan for interrupted writes");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.to_string_lossy().ends_with(TMP_EXTENSION) {
            continue;
        }
        warn!(path = %path.display(), "removing interrupted document write");
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "could not remove interrupted write");
        }
    }
}

/// Reads and verifies one document file; a missing file is `None`.
fn read_document(key: &str, path: &Path) -> Result<Option<Value>, StorageError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err("read document", &e)),
    };

    let stored = codec::decode(&bytes).map_err(|e| {
        warn!(key, error = %e, "stored document failed verification");
        StorageError::Corrupted {
            key: key.to_string(),
            message: e.to_string(),
        }
    })?;

    if stored.key != key {
        return Err(StorageError::Corrupted {
            key: key.to_string(),
            message: format!("file holds document for key '{}'", stored.key),
        });
    }
    Ok(Some(stored.value))
}

impl FileDocumentStore {
    /// Open (creating if needed) the store in `dir` and take its lock.
    ///
    /// # Errors
    /// - `StorageError::Locked` if another process owns the directory
    /// - `StorageError::BackendError` if the directory cannot be created
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| io_err("create data directory", &e))?;

        let lock = FileLock::acquire(dir)?;
        remove_interrupted_writes(dir);

        debug!(dir = %dir.display(), "opened document store");
        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            write_guard: Mutex::new(()),
            _lock: lock,
        })
    }

    fn doc_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{DOC_EXTENSION}"))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{TMP_EXTENSION}"))
    }

    fn sync_dir(&self) -> Result<(), StorageError> {
        #[cfg(unix)]
        {
            File::open(&self.dir)
                .and_then(|d| d.sync_all())
                .map_err(|e| io_err("sync data directory", &e))?;
        }
        Ok(())
    }
}

impl DocumentStore for FileDocumentStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(key)?;
        read_document(key, &self.doc_path(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        validate_key(key)?;
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::BackendError("poisoned lock: document.set".to_string()))?;

        let stored = StoredDocument {
            key: key.to_string(),
            written_at: Utc::now(),
            value,
        };
        let encoded = codec::encode(&stored)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let tmp = self.tmp_path(key);
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)
                .map_err(|e| io_err("create temp document", &e))?;
            file.write_all(&encoded)
                .map_err(|e| io_err("write document", &e))?;
            if self.config.sync_on_write {
                file.sync_all().map_err(|e| io_err("sync document", &e))?;
            }
        }

        fs::rename(&tmp, self.doc_path(key)).map_err(|e| io_err("commit document", &e))?;
        if self.config.sync_on_write {
            self.sync_dir()?;
        }
        debug!(key, "document written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::BackendError("poisoned lock: document.remove".to_string()))?;

        match fs::remove_file(self.doc_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err("remove document", &e)),
        }
    }
}
