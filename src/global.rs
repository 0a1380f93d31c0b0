//! Process-wide default checker and convenience API.
//!
//! Nothing is initialized implicitly: call [`init_default`] (or
//! [`install_default`]) once at startup and [`shutdown_default`] on exit.
//! Until then the convenience functions behave as if every list were empty,
//! and the `try_*` variants return [`Error::NotInitialized`].

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::checker::{Checker, Statistics};
use crate::config::Config;
use crate::error::{Error, Result};

/// Global default checker
static DEFAULT_CHECKER: Lazy<RwLock<Option<Arc<Checker>>>> = Lazy::new(|| RwLock::new(None));

/// Build a checker from `config` and install it as the default.
///
/// Fails with [`Error::AlreadyInitialized`] if a default is already installed.
pub fn init_default(config: Config) -> Result<()> {
    // Building may download; check first so a second call stays cheap
    if is_initialized() {
        return Err(Error::AlreadyInitialized);
    }
    install_default(Checker::new(config)?)
}

/// Install an already-constructed checker as the default.
pub fn install_default(checker: Checker) -> Result<()> {
    let mut guard = DEFAULT_CHECKER.write();
    if guard.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    *guard = Some(Arc::new(checker));

    log::debug!("Installed default checker");
    Ok(())
}

/// Check if a default checker is installed.
pub fn is_initialized() -> bool {
    DEFAULT_CHECKER.read().is_some()
}

/// Get a handle to the default checker.
pub fn default_checker() -> Result<Arc<Checker>> {
    DEFAULT_CHECKER.read().clone().ok_or(Error::NotInitialized)
}

/// Close and remove the default checker. No-op when none is installed.
pub fn shutdown_default() {
    let checker = DEFAULT_CHECKER.write().take();
    if let Some(checker) = checker {
        // Other handles may still be alive; stop the refresh task regardless
        checker.close();
        log::debug!("Default checker shut down");
    }
}

/// Check an email address or domain against the default checker.
///
/// Returns `false` when no default checker is installed.
pub fn is_disposable(email_or_domain: &str) -> bool {
    try_is_disposable(email_or_domain).unwrap_or(false)
}

/// Like [`is_disposable`], but reports a missing default checker.
pub fn try_is_disposable(email_or_domain: &str) -> Result<bool> {
    let guard = DEFAULT_CHECKER.read();
    match guard.as_ref() {
        Some(checker) => Ok(checker.is_disposable(email_or_domain)),
        None => Err(Error::NotInitialized),
    }
}

/// Refresh the default checker from its source.
pub fn refresh() -> Result<()> {
    default_checker()?.refresh()
}

/// Add domains to the default checker's blocklist.
pub fn add_domains<I, S>(domains: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let guard = DEFAULT_CHECKER.read();
    if let Some(checker) = guard.as_ref() {
        checker.add_domains(domains);
    }
}

/// Add domains to the default checker's allowlist.
pub fn add_allowlist<I, S>(domains: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let guard = DEFAULT_CHECKER.read();
    if let Some(checker) = guard.as_ref() {
        checker.add_allowlist(domains);
    }
}

/// Get a copy of the default checker's blocklist (empty when uninitialized).
pub fn get_blocklist() -> Vec<String> {
    default_checker().map(|c| c.get_blocklist()).unwrap_or_default()
}

/// Get a copy of the default checker's allowlist (empty when uninitialized).
pub fn get_allowlist() -> Vec<String> {
    default_checker().map(|c| c.get_allowlist()).unwrap_or_default()
}

/// Get statistics of the default checker.
pub fn stats() -> Option<Statistics> {
    default_checker().ok().map(|c| c.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot;
    use crate::source::{CancelFlag, SnapshotSource};
    use crate::trie::DomainTrie;
    use std::time::Duration;

    struct FixedSource(Vec<u8>);

    impl SnapshotSource for FixedSource {
        fn read_cache(&self) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }

        fn write_cache(&self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn fetch(
            &self,
            _url: &str,
            _timeout: Duration,
            _cancel: &CancelFlag,
        ) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn test_checker() -> Checker {
        let data = snapshot::encode(
            &DomainTrie::from_domains(["tempmail.com"]),
            &DomainTrie::from_domains(["gmail.com"]),
        )
        .unwrap();
        Checker::with_source(Config::default(), Arc::new(FixedSource(data))).unwrap()
    }

    // Global state: keep the whole lifecycle in one test
    #[test]
    fn test_default_checker_lifecycle() {
        assert!(!is_initialized());
        assert!(!is_disposable("user@tempmail.com"));
        assert!(matches!(try_is_disposable("tempmail.com"), Err(Error::NotInitialized)));
        assert!(matches!(refresh(), Err(Error::NotInitialized)));
        assert!(get_blocklist().is_empty());
        assert!(stats().is_none());
        add_domains(["ignored.com"]);

        install_default(test_checker()).unwrap();
        assert!(is_initialized());
        assert!(matches!(install_default(test_checker()), Err(Error::AlreadyInitialized)));
        assert!(matches!(init_default(Config::default()), Err(Error::AlreadyInitialized)));

        assert!(is_disposable("user@tempmail.com"));
        assert!(try_is_disposable("mail.tempmail.com").unwrap());
        assert!(!is_disposable("user@gmail.com"));

        add_domains(["runtime.com"]);
        assert!(is_disposable("runtime.com"));
        add_allowlist(["runtime.com"]);
        assert!(!is_disposable("runtime.com"));

        refresh().unwrap();
        assert_eq!(stats().unwrap().blocklist_count, 1);
        assert_eq!(get_allowlist(), vec!["gmail.com"]);

        shutdown_default();
        assert!(!is_initialized());
        assert!(!is_disposable("user@tempmail.com"));
        shutdown_default();

        // Can be initialized again after teardown
        install_default(test_checker()).unwrap();
        assert!(is_disposable("tempmail.com"));
        shutdown_default();
    }
}
