//! Checker configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default URL of the published snapshot: the latest release asset of this
/// package's repository.
///
/// Deployments that publish their own snapshot with `disposable-update`
/// should point [`Config::with_data_url`] at it instead.
pub const DEFAULT_DATA_URL: &str = concat!(
    env!("CARGO_PKG_REPOSITORY"),
    "/releases/latest/download/data.bin"
);

/// Name of the snapshot file inside the cache directory.
pub const DATA_FILE_NAME: &str = "data.bin";

/// Default interval between background refreshes (1 day).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(86400);

/// Default timeout for snapshot downloads.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Callback receiving every diagnostic message the checker logs.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// How the checker obtains its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Load from cache, download when missing, refresh over the network.
    #[default]
    Online,
}

impl Mode {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Online => "online",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`Checker`](crate::Checker).
///
/// ```
/// use disposable::Config;
/// use std::time::Duration;
///
/// let config = Config::default()
///     .with_auto_refresh(Duration::from_secs(3600))
///     .with_custom_blocklist(["internal-blocked.com"])
///     .with_custom_allowlist(["partner.example.com"]);
///
/// assert!(config.auto_refresh);
/// ```
#[derive(Clone)]
pub struct Config {
    /// Operating mode
    pub mode: Mode,
    /// Run a background refresh task
    pub auto_refresh: bool,
    /// Interval between background refreshes
    pub refresh_interval: Duration,
    /// Cache directory; `None` uses the platform cache directory
    pub cache_dir: Option<PathBuf>,
    /// Timeout for snapshot downloads
    pub http_timeout: Duration,
    /// Domains always added to the blocklist, surviving refreshes
    pub custom_blocklist: Vec<String>,
    /// Domains always added to the allowlist, surviving refreshes
    pub custom_allowlist: Vec<String>,
    /// Optional sink for diagnostic messages, in addition to `log`
    pub logger: Option<LogCallback>,
    /// Snapshot download URL
    pub data_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Online,
            auto_refresh: false,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cache_dir: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            custom_blocklist: Vec::new(),
            custom_allowlist: Vec::new(),
            logger: None,
            data_url: DEFAULT_DATA_URL.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("auto_refresh", &self.auto_refresh)
            .field("refresh_interval", &self.refresh_interval)
            .field("cache_dir", &self.cache_dir)
            .field("http_timeout", &self.http_timeout)
            .field("custom_blocklist", &self.custom_blocklist)
            .field("custom_allowlist", &self.custom_allowlist)
            .field("logger", &self.logger.is_some())
            .field("data_url", &self.data_url)
            .finish()
    }
}

impl Config {
    /// Set the operating mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable background refresh. A zero interval keeps the current one.
    pub fn with_auto_refresh(mut self, interval: Duration) -> Self {
        self.auto_refresh = true;
        if !interval.is_zero() {
            self.refresh_interval = interval;
        }
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the download timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Add domains to block on top of the snapshot.
    pub fn with_custom_blocklist<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_blocklist.extend(domains.into_iter().map(Into::into));
        self
    }

    /// Add domains to allow on top of the snapshot.
    pub fn with_custom_allowlist<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_allowlist.extend(domains.into_iter().map(Into::into));
        self
    }

    /// Set a callback that receives every diagnostic message.
    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Set the snapshot download URL.
    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    /// Resolved cache directory.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir(),
        }
    }

    /// Path of the cached snapshot file.
    pub fn data_file_path(&self) -> PathBuf {
        self.resolved_cache_dir().join(DATA_FILE_NAME)
    }
}

/// Platform cache directory, falling back to the system temp directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("disposable-email")
}
