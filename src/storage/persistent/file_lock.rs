//! Single-owner lock on a data directory.
//!
//! Two processes settling against the same directory would interleave their
//! read-modify-write cycles and lose updates. The first opener takes an
//! advisory lock on `.pocketmoney.lock` and writes its process id into it, so
//! a refused opener can name the holder.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::storage::traits::StorageError;

/// Name of the lock file inside the data directory.
pub const LOCK_FILE_NAME: &str = ".pocketmoney.lock";

/// Held lock on a data directory; released on drop.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Takes the lock on `dir` and records this process as its owner.
    ///
    /// # Errors
    /// - `StorageError::Locked` naming the holder when the directory is owned elsewhere
    /// - `StorageError::BackendError` for any other I/O failure
    pub fn acquire(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(LOCK_FILE_NAME);
        let backend = |context: &str, e: &io::Error| {
            StorageError::BackendError(format!("{context} {}: {e}", path.display()))
        };

        // Not truncated on open: the current holder's pid must survive a refused attempt.
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| backend("open lock file", &e))?;

        if !try_lock_exclusive(&file).map_err(|e| backend("lock", &e))? {
            return Err(StorageError::Locked(format!(
                "{} is in use by {}",
                dir.display(),
                describe_holder(&mut file)
            )));
        }

        file.set_len(0)
            .and_then(|()| file.seek(SeekFrom::Start(0)))
            .and_then(|_| writeln!(file, "{}", std::process::id()))
            .map_err(|e| backend("record owner in", &e))?;

        debug!(path = %path.display(), pid = std::process::id(), "data directory locked");
        Ok(Self { _file: file })
    }
}

fn describe_holder(file: &mut File) -> String {
    let mut contents = String::new();
    let pid = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_string(&mut contents))
        .ok()
        .and_then(|_| contents.trim().parse::<u32>().ok());
    match pid {
        Some(pid) => format!("process {pid}"),
        None => "another process".to_string(),
    }
}

/// `Ok(false)` when another owner holds the lock.
#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Ok(false)
    } else {
        Err(err)
    }
}

/// `Ok(false)` when another owner holds the lock.
#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    // SAFETY: the handle is owned by `file`; OVERLAPPED is plain data and may be zeroed.
    let ok = unsafe {
        let mut overlapped = std::mem::zeroed::<OVERLAPPED>();
        LockFileEx(
            file.as_raw_handle() as HANDLE,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };
    if ok != 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == i32::try_from(ERROR_LOCK_VIOLATION).ok() {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(not(any(unix, windows)))]
fn try_lock_exclusive(_file: &File) -> io::Result<bool> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "directory locking is not supported on this platform",
    ))
}
