//! Byte sources for snapshot blobs: a local cache plus a remote fetch.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::DATA_FILE_NAME;
use crate::error::{CacheOperation, Error, Result};

/// Response bodies are read in chunks of this size, checking for cancellation in between.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Cooperative cancellation for an in-flight fetch.
///
/// Clones share the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Where a [`Checker`](crate::Checker) gets snapshot bytes from.
///
/// `read_cache` and `write_cache` address a single local blob; `fetch`
/// downloads a fresh one, must honor `timeout`, and should give up with
/// [`Error::Cancelled`] soon after `cancel` is set.
pub trait SnapshotSource: Send + Sync {
    /// Read the cached snapshot blob.
    fn read_cache(&self) -> Result<Vec<u8>>;

    /// Persist a snapshot blob. Callers treat failure as non-fatal.
    fn write_cache(&self, data: &[u8]) -> Result<()>;

    /// Download a fresh snapshot blob.
    fn fetch(&self, url: &str, timeout: Duration, cancel: &CancelFlag) -> Result<Vec<u8>>;
}

/// HTTP download with a file cache on local disk.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    cache_dir: PathBuf,
}

impl RemoteSource {
    /// Create a source caching into `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: &Path) -> Result<Self> {
        fs::create_dir_all(cache_dir)
            .map_err(|e| Error::cache(cache_dir, CacheOperation::Create, e))?;
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path to the cached snapshot file.
    pub fn data_path(&self) -> PathBuf {
        self.cache_dir.join(DATA_FILE_NAME)
    }
}

impl SnapshotSource for RemoteSource {
    fn read_cache(&self) -> Result<Vec<u8>> {
        let path = self.data_path();
        fs::read(&path).map_err(|e| Error::cache(path, CacheOperation::Read, e))
    }

    fn write_cache(&self, data: &[u8]) -> Result<()> {
        let path = self.data_path();
        let write_err = |e| Error::cache(&path, CacheOperation::Write, e);

        // Temp file in the same directory so the rename stays atomic
        let mut temp = NamedTempFile::new_in(&self.cache_dir).map_err(write_err)?;
        temp.write_all(data).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&path).map_err(|e| write_err(e.error))?;

        log::debug!("Saved snapshot to cache: {:?} ({} bytes)", path, data.len());
        Ok(())
    }

    fn fetch(&self, url: &str, timeout: Duration, cancel: &CancelFlag) -> Result<Vec<u8>> {
        cancel.check()?;
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        let response = agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                Error::download(url, Some(code), format!("HTTP {}", code))
            }
            ureq::Error::Transport(t) => Error::download(url, None, t.to_string()),
        })?;

        let mut reader = response.into_reader();
        let mut data = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            cancel.check()?;
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::download(
                        url,
                        None,
                        format!("failed to read response: {}", e),
                    ))
                }
            }
        }

        log::info!("Downloaded snapshot from {}: {} bytes", url, data.len());
        Ok(data)
    }
}
