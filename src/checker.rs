//! Disposable email checker: live tries, refresh coordination and background updates.
//!
//! A [`Checker`] owns one blocklist and one allowlist [`DomainTrie`] behind a
//! single read/write lock, so a query always sees both lists from the same
//! snapshot. Refreshes build new tries off-lock and swap them in under the
//! write lock; a failed refresh leaves the current tries untouched.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crate::config::{Config, Mode};
use crate::domain::{extract_domain, normalize_domain};
use crate::error::{DataSource, Error, Result};
use crate::snapshot::{self, DecodedSnapshot};
use crate::source::{CancelFlag, RemoteSource, SnapshotSource};
use crate::trie::DomainTrie;

/// Statistics about the current database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Number of blocked domains
    pub blocklist_count: usize,
    /// Number of allowlisted domains
    pub allowlist_count: usize,
    /// Creation time of the loaded snapshot
    #[serde(serialize_with = "snapshot::unix_seconds::serialize")]
    pub last_updated: SystemTime,
    /// Current operating mode
    pub mode: Mode,
    /// Format version of the loaded snapshot
    pub version: String,
}

/// Both lists plus the provenance of the snapshot they came from.
struct Lists {
    blocklist: DomainTrie,
    allowlist: DomainTrie,
    version: String,
    last_updated: SystemTime,
}

impl Lists {
    fn from_decoded(decoded: DecodedSnapshot) -> Self {
        Self {
            blocklist: decoded.blocklist,
            allowlist: decoded.allowlist,
            version: decoded.info.version,
            last_updated: decoded.info.created_at,
        }
    }
}

/// State shared between the checker handle and its refresh thread.
struct Shared {
    config: Config,
    source: Arc<dyn SnapshotSource>,
    lists: RwLock<Lists>,
}

impl Shared {
    fn log(&self, level: log::Level, message: &str) {
        log::log!(level, "{}", message);
        if let Some(logger) = &self.config.logger {
            logger(message);
        }
    }

    /// Load from cache, falling back to a download.
    fn load_initial(
        config: &Config,
        source: &dyn SnapshotSource,
        emit: impl Fn(log::Level, &str),
    ) -> Result<Lists> {
        match source.read_cache() {
            Ok(data) => match snapshot::decode(&data) {
                Ok(decoded) => {
                    emit(log::Level::Info, "Loaded data from cache");
                    return Ok(Lists::from_decoded(decoded));
                }
                Err(e) => {
                    let err = Error::Decode {
                        origin: DataSource::Cache,
                        cause: e,
                    };
                    emit(log::Level::Warn, &format!("Ignoring cached data: {}", err));
                }
            },
            Err(e) => emit(log::Level::Debug, &format!("No usable cache: {}", e)),
        }

        emit(
            log::Level::Info,
            &format!("Downloading data from {}...", config.data_url),
        );
        let cancel = CancelFlag::new();
        let decoded = download(config, source, config.http_timeout, &cancel, &emit).map_err(
            |e| Error::Initialization {
                reason: "no cached data and download failed".to_string(),
                cause: Box::new(e),
            },
        )?;
        Ok(Lists::from_decoded(decoded))
    }

    /// One refresh cycle: fetch, decode, cache, swap.
    ///
    /// Once `cancel` is set the cycle stops without touching the cache or the
    /// live lists.
    fn refresh(&self, timeout: Duration, cancel: &CancelFlag) -> Result<()> {
        let decoded = download(
            &self.config,
            self.source.as_ref(),
            timeout,
            cancel,
            |level, msg| self.log(level, msg),
        )?;
        let new_lists = Lists::from_decoded(decoded);

        let message = {
            let mut lists = self.lists.write();
            // Checked under the lock: after close() has cancelled, no swap can start
            cancel.check()?;
            *lists = new_lists;
            apply_custom_domains(&self.config, &lists);
            format!(
                "Loaded {} blocklist and {} allowlist domains (version: {})",
                lists.blocklist.size(),
                lists.allowlist.size(),
                lists.version
            )
        };
        self.log(log::Level::Info, &message);
        Ok(())
    }
}

/// Fetch and decode a snapshot, then persist it to the cache on a best-effort basis.
fn download(
    config: &Config,
    source: &dyn SnapshotSource,
    timeout: Duration,
    cancel: &CancelFlag,
    emit: impl Fn(log::Level, &str),
) -> Result<DecodedSnapshot> {
    let data = source.fetch(&config.data_url, timeout, cancel)?;

    let decoded = snapshot::decode(&data).map_err(|e| Error::Decode {
        origin: DataSource::Download,
        cause: e,
    })?;
    cancel.check()?;

    // In-memory data is valid even if the cache write fails
    if let Err(e) = source.write_cache(&data) {
        emit(log::Level::Warn, &format!("Failed to save to cache: {}", e));
    }

    Ok(decoded)
}

/// Insert the configured custom domains. Caller holds the write lock.
fn apply_custom_domains(config: &Config, lists: &Lists) {
    for domain in &config.custom_blocklist {
        lists.blocklist.insert(&normalize_domain(domain));
    }
    for domain in &config.custom_allowlist {
        lists.allowlist.insert(&normalize_domain(domain));
    }
}

/// Handle to the background refresh thread.
struct RefreshWorker {
    stop: Sender<()>,
    cancel: CancelFlag,
    handle: JoinHandle<()>,
}

impl RefreshWorker {
    fn spawn(shared: Arc<Shared>) -> std::io::Result<Self> {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();
        let interval = shared.config.refresh_interval;

        let handle = thread::Builder::new()
            .name("disposable-refresh".to_string())
            .spawn(move || loop {
                // Wakes immediately on stop or when the sender is dropped
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        match shared.refresh(shared.config.http_timeout, &worker_cancel) {
                            Ok(()) => {
                                shared.log(log::Level::Info, "Auto-refresh completed successfully")
                            }
                            Err(Error::Cancelled) => break,
                            Err(e) => {
                                shared.log(log::Level::Warn, &format!("Auto-refresh failed: {}", e))
                            }
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop,
            cancel,
            handle,
        })
    }

    fn stop(self) {
        // Cancel first so an in-flight download gives up instead of being awaited
        self.cancel.cancel();
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::error!("Auto-refresh thread panicked");
        }
    }
}

/// Disposable email checker.
///
/// # Example
///
/// ```ignore
/// use disposable::{Checker, Config};
/// use std::time::Duration;
///
/// let checker = Checker::new(
///     Config::default()
///         .with_auto_refresh(Duration::from_secs(24 * 3600))
///         .with_custom_blocklist(["internal-blocked.com"]),
/// )?;
///
/// assert!(checker.is_disposable("user@internal-blocked.com"));
///
/// // Stop the background refresh
/// checker.close();
/// ```
pub struct Checker {
    shared: Arc<Shared>,
    worker: Mutex<Option<RefreshWorker>>,
}

impl Checker {
    /// Create a checker that caches on disk and downloads over HTTP.
    ///
    /// Loads the cached snapshot if present and valid, otherwise downloads it.
    pub fn new(config: Config) -> Result<Self> {
        let source = RemoteSource::new(&config.resolved_cache_dir())?;
        Self::with_source(config, Arc::new(source))
    }

    /// Create a checker reading snapshots from a custom source.
    pub fn with_source(config: Config, source: Arc<dyn SnapshotSource>) -> Result<Self> {
        let lists = Shared::load_initial(&config, source.as_ref(), |level, msg| {
            log::log!(level, "{}", msg);
            if let Some(logger) = &config.logger {
                logger(msg);
            }
        })?;
        apply_custom_domains(&config, &lists);

        let shared = Arc::new(Shared {
            config,
            source,
            lists: RwLock::new(lists),
        });

        let worker = if shared.config.auto_refresh {
            let worker =
                RefreshWorker::spawn(Arc::clone(&shared)).map_err(|e| Error::Initialization {
                    reason: "failed to start auto-refresh".to_string(),
                    cause: Box::new(Error::Io(e)),
                })?;
            Some(worker)
        } else {
            None
        };

        Ok(Self {
            shared,
            worker: Mutex::new(worker),
        })
    }

    /// Check whether an email address or domain belongs to a disposable provider.
    ///
    /// Subdomains of listed domains match too. The allowlist takes
    /// precedence over the blocklist. Empty or unusable input returns `false`.
    pub fn is_disposable(&self, email_or_domain: &str) -> bool {
        let domain = extract_domain(email_or_domain);
        if domain.is_empty() {
            return false;
        }

        let lists = self.shared.lists.read();
        if lists.allowlist.contains_hierarchical(&domain) {
            return false;
        }
        lists.blocklist.contains_hierarchical(&domain)
    }

    /// Download a fresh snapshot and swap it in.
    ///
    /// On failure the current lists stay in place and the error is returned.
    pub fn refresh(&self) -> Result<()> {
        self.refresh_with_timeout(self.shared.config.http_timeout)
    }

    /// Like [`refresh`](Self::refresh) with an explicit download timeout.
    ///
    /// Not affected by [`close`](Self::close).
    pub fn refresh_with_timeout(&self, timeout: Duration) -> Result<()> {
        self.shared.refresh(timeout, &CancelFlag::new()).map_err(|e| {
            self.shared.log(log::Level::Warn, &format!("Refresh failed: {}", e));
            e
        })
    }

    /// Add domains to the blocklist. Not persisted, but kept until the next refresh.
    pub fn add_domains<I, S>(&self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lists = self.shared.lists.write();
        for domain in domains {
            lists.blocklist.insert(&normalize_domain(domain.as_ref()));
        }
    }

    /// Add domains to the allowlist. Not persisted, but kept until the next refresh.
    pub fn add_allowlist<I, S>(&self, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lists = self.shared.lists.write();
        for domain in domains {
            lists.allowlist.insert(&normalize_domain(domain.as_ref()));
        }
    }

    /// Get a copy of all blocked domains. Order is unspecified.
    pub fn get_blocklist(&self) -> Vec<String> {
        self.shared.lists.read().blocklist.enumerate()
    }

    /// Get a copy of all allowlisted domains. Order is unspecified.
    pub fn get_allowlist(&self) -> Vec<String> {
        self.shared.lists.read().allowlist.enumerate()
    }

    /// Get statistics about the current database.
    pub fn stats(&self) -> Statistics {
        let lists = self.shared.lists.read();
        Statistics {
            blocklist_count: lists.blocklist.size(),
            allowlist_count: lists.allowlist.size(),
            last_updated: lists.last_updated,
            mode: self.shared.config.mode,
            version: lists.version.clone(),
        }
    }

    /// Get the configuration this checker was built with.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns true while the background refresh thread is running.
    pub fn is_running_auto_refresh(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the background refresh and wait for it to exit.
    ///
    /// A background download in progress is cancelled and its result
    /// discarded. Safe to call more than once. A refresh running on another
    /// thread via [`refresh`](Self::refresh) is not interrupted.
    pub fn close(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.stop();
            log::debug!("Auto-refresh stopped");
        }
    }
}

impl Drop for Checker {
    fn drop(&mut self) {
        self.close();
    }
}
