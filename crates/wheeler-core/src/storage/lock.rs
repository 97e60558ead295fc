//! Advisory file locks with bounded backoff
//!
//! Every mutation of a shared JSON artifact (chunk index, chunk metadata,
//! rotation stats, stability metrics) is a whole-file read-modify-write
//! under an exclusive advisory lock on a `.lock` sibling. Readers that only
//! need a recent snapshot skip the lock entirely.
//!
//! Acquisition never blocks indefinitely: contention retries with
//! exponential backoff up to a ceiling, then surfaces [`MemoryError::Busy`]
//! so the caller can retry at its own pace.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

use crate::error::{MemoryError, Result};

/// Initial retry delay on contention.
const BACKOFF_INITIAL: Duration = Duration::from_millis(10);

/// Per-retry delay ceiling.
const BACKOFF_CEILING: Duration = Duration::from_millis(320);

/// Total time budget before surfacing `Busy`.
const ACQUIRE_BUDGET: Duration = Duration::from_secs(3);

/// An acquired exclusive advisory lock. Released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock guarding `target` (a `.lock` sibling file).
    ///
    /// Contention backs off exponentially; if the budget elapses the call
    /// returns [`MemoryError::Busy`] carrying the guarded path.
    pub fn acquire(target: &Path) -> Result<Self> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let start = Instant::now();
        let mut delay = BACKOFF_INITIAL;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %path.display(), "acquired file lock");
                    return Ok(Self { file, path });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if start.elapsed() >= ACQUIRE_BUDGET {
                        return Err(MemoryError::Busy {
                            path: target.to_path_buf(),
                        });
                    }
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(BACKOFF_CEILING);
                }
                Err(e) => return Err(MemoryError::Io(e)),
            }
        }
    }

    /// Path of the lock file itself.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| std::ffi::OsString::from("file"));
    name.push(".lock");
    target.with_file_name(name)
}

// ============================================================================
// TESTS
// ============================================================================
