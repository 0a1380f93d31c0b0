//! Disposable email detection.
//!
//! This crate decides whether an email address (or bare domain) belongs to a
//! disposable / temporary email provider. Domain lists are distributed as a
//! compressed snapshot that is downloaded, cached on disk, and refreshed in
//! the background.
//!
//! # Features
//!
//! - **Hierarchical matching**: `mail.tempmail.com` matches a `tempmail.com` entry
//! - **Allowlist precedence**: allowlisted domains are never reported as disposable
//! - **Offline start**: a cached snapshot is used before any network access
//! - **Background refresh**: lists are swapped atomically, queries never block on I/O
//! - **Runtime additions**: add blocklist/allowlist entries without reloading
//! - **Thread-safe**: all operations take `&self`
//!
//! # Quick Start
//!
//! ```ignore
//! use disposable::{Checker, Config};
//! use std::time::Duration;
//!
//! let checker = Checker::new(
//!     Config::default()
//!         .with_auto_refresh(Duration::from_secs(6 * 60 * 60))
//!         .with_custom_allowlist(["mycompany.com"]),
//! )?;
//!
//! assert!(checker.is_disposable("user@tempmail.com"));
//! assert!(!checker.is_disposable("user@gmail.com"));
//!
//! checker.close();
//! ```
//!
//! # Default Checker
//!
//! Applications that want a single process-wide checker install it once:
//!
//! ```ignore
//! disposable::init_default(disposable::Config::default())?;
//!
//! if disposable::is_disposable("user@tempmail.com") {
//!     println!("rejected");
//! }
//!
//! disposable::shutdown_default();
//! ```
//!
//! # Snapshot Format
//!
//! A snapshot is a gzip stream wrapping a CBOR map with the fields `version`,
//! `created_at` (Unix seconds), `domain_count`, `blocklist` and `allowlist`.
//! See [`snapshot`] and the `disposable-update` tool that produces it.

mod error;
mod global;

pub mod checker;
pub mod config;
pub mod domain;
pub mod snapshot;
pub mod source;
pub mod trie;
pub mod update;

// Re-export core types
pub use error::{CacheOperation, CodecError, DataSource, Error, Result};
pub use trie::DomainTrie;

// Re-export checker types
pub use checker::{Checker, Statistics};
pub use config::{Config, LogCallback, Mode};
pub use snapshot::{DecodedSnapshot, Snapshot, SnapshotInfo};
pub use source::{CancelFlag, RemoteSource, SnapshotSource};

// Re-export global API functions
pub use global::{
    add_allowlist, add_domains, default_checker, get_allowlist, get_blocklist, init_default,
    install_default, is_disposable, is_initialized, refresh, shutdown_default, stats,
    try_is_disposable,
};
