use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::foundation::error::{DcpError, DcpResult};

/// Registry of per-path locks for recovery index files.
///
/// Every [`InfoFileHandle`] for a given path holds that path's lock, so a resuming check and an
/// in-progress encode never interleave their reads and writes.
#[derive(Debug, Default)]
pub struct InfoFiles {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl InfoFiles {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the index file at `path`, blocking until no other handle for it is alive.
    ///
    /// Read-only opening of a missing file is an error; writable opening creates it.
    pub fn open(&self, path: &Path, read_only: bool) -> DcpResult<InfoFileHandle> {
        let lock = self
            .locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone();
        let guard = lock.lock_arc();

        let file = if read_only {
            OpenOptions::new().read(true).open(path)
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DcpError::io(parent, "create index directory", e))?;
            }
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
        }
        .map_err(|e| DcpError::io(path, "open index file", e))?;

        Ok(InfoFileHandle {
            _guard: guard,
            file,
            path: path.to_path_buf(),
        })
    }
}

/// Exclusive access to one open recovery index file.
pub struct InfoFileHandle {
    _guard: ArcMutexGuard<RawMutex, ()>,
    file: File,
    path: PathBuf,
}

impl std::fmt::Debug for InfoFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoFileHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl InfoFileHandle {
    /// Path of the open file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the file in bytes.
    pub fn len(&self) -> DcpResult<u64> {
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| DcpError::io(&self.path, "stat index file", e))
    }

    /// Return `true` if the file holds no bytes.
    pub fn is_empty(&self) -> DcpResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Fill `buf` from `pos`; `false` if the file ends first.
    pub(crate) fn read_exact_at(&mut self, pos: u64, buf: &mut [u8]) -> DcpResult<bool> {
        if pos + buf.len() as u64 > self.len()? {
            return Ok(false);
        }
        self.file
            .seek(SeekFrom::Start(pos))
            .map_err(|e| DcpError::io(&self.path, "seek index file", e))?;
        match self.file.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(DcpError::io(&self.path, "read index file", e)),
        }
    }

    pub(crate) fn write_all_at(&mut self, pos: u64, bytes: &[u8]) -> DcpResult<()> {
        self.file
            .seek(SeekFrom::Start(pos))
            .map_err(|e| DcpError::io(&self.path, "seek index file", e))?;
        self.file
            .write_all(bytes)
            .map_err(|e| DcpError::io(&self.path, "write index file", e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/recovery/handle.rs"]
mod tests;
