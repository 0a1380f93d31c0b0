//! Error types for disposable email detection.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Cache operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    /// Reading a stored snapshot
    Read,
    /// Persisting a downloaded snapshot
    Write,
    /// Creating the cache directory
    Create,
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheOperation::Read => "read",
            CacheOperation::Write => "write",
            CacheOperation::Create => "create",
        })
    }
}

/// Where a snapshot blob came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// The local cache file
    Cache,
    /// A fresh download
    Download,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Cache => "cache",
            DataSource::Download => "download",
        })
    }
}

/// Error type for snapshot encoding and decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input is not a valid gzip stream
    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),

    /// Decompressed payload is not a snapshot
    #[error("malformed snapshot payload: {0}")]
    Payload(String),

    /// Serializer fault while encoding
    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    /// IO error on the underlying reader or writer
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Error type for disposable email operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot download failed
    #[error("download failed from {url}: {reason}")]
    Download {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// Local cache read/write/create failed
    #[error("cache {operation} failed for {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        operation: CacheOperation,
        source: io::Error,
    },

    /// Snapshot bytes could not be decoded
    #[error("failed to decode snapshot from {origin}: {cause}")]
    Decode {
        origin: DataSource,
        #[source]
        cause: CodecError,
    },

    /// No usable checker could be constructed
    #[error("initialization failed: {reason}: {cause}")]
    Initialization {
        reason: String,
        #[source]
        cause: Box<Error>,
    },

    /// A background refresh was stopped before it completed
    #[error("refresh cancelled")]
    Cancelled,

    /// Default checker used before initialization
    #[error("checker not initialized")]
    NotInitialized,

    /// Default checker initialized twice
    #[error("checker already initialized")]
    AlreadyInitialized,

    /// Merged lists could not be encoded
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] CodecError),

    /// Malformed line in a sources file
    #[error("invalid source at line {line}: {reason}")]
    InvalidSource { line: usize, reason: String },

    /// Every list source failed to download
    #[error("all sources failed, refusing to overwrite existing data")]
    AllSourcesFailed,

    /// Merged blocklist ended up empty
    #[error("blocklist is empty after processing, refusing to overwrite existing data")]
    EmptyBlocklist,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn download(url: &str, status: Option<u16>, reason: impl Into<String>) -> Self {
        Error::Download {
            url: url.to_string(),
            status,
            reason: reason.into(),
        }
    }

    pub(crate) fn cache(
        path: impl Into<PathBuf>,
        operation: CacheOperation,
        source: io::Error,
    ) -> Self {
        Error::Cache {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Strip `Initialization` wrappers down to the underlying failure.
    pub fn root(&self) -> &Error {
        match self {
            Error::Initialization { cause, .. } => cause.root(),
            other => other,
        }
    }

    /// Returns true if this is (or wraps) a download error.
    pub fn is_download(&self) -> bool {
        matches!(self.root(), Error::Download { .. })
    }

    /// Returns true if this is (or wraps) a cache error.
    pub fn is_cache(&self) -> bool {
        matches!(self.root(), Error::Cache { .. })
    }

    /// Returns true if this is (or wraps) a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self.root(), Error::Decode { .. })
    }

    /// Returns true if this is an initialization error.
    pub fn is_initialization(&self) -> bool {
        matches!(self, Error::Initialization { .. })
    }

    /// Returns true if the operation was cancelled by `close`.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }

    /// HTTP status code of a download error, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self.root() {
            Error::Download { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias for disposable email operations.
pub type Result<T> = std::result::Result<T, Error>;
