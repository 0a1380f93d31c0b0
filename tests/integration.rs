//! Integration tests for the public checker API.

use disposable::update::{parse_sources, ListMerger};
use disposable::{
    snapshot, CacheOperation, CancelFlag, Checker, CodecError, Config, DomainTrie, Error, Result,
    SnapshotSource,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// In-memory source with an optional cache and a swappable remote blob.
#[derive(Default)]
struct MockSource {
    cache: Mutex<Option<Vec<u8>>>,
    remote: Mutex<Option<Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MockSource {
    fn remote(data: Vec<u8>) -> Arc<Self> {
        let source = Self::default();
        *source.remote.lock() = Some(data);
        Arc::new(source)
    }

    fn set_remote(&self, data: Option<Vec<u8>>) {
        *self.remote.lock() = data;
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for MockSource {
    fn read_cache(&self) -> Result<Vec<u8>> {
        self.cache.lock().clone().ok_or_else(|| Error::Cache {
            path: "memory".into(),
            operation: CacheOperation::Read,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no cache"),
        })
    }

    fn write_cache(&self, data: &[u8]) -> Result<()> {
        *self.cache.lock() = Some(data.to_vec());
        Ok(())
    }

    fn fetch(&self, url: &str, _timeout: Duration, _cancel: &CancelFlag) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.remote.lock().clone().ok_or_else(|| Error::Download {
            url: url.to_string(),
            status: Some(503),
            reason: "HTTP 503".to_string(),
        })
    }
}

/// Serves a cached snapshot; downloads take the whole timeout unless cancelled.
struct SlowSource {
    cached: Vec<u8>,
    downloading: AtomicBool,
}

impl SnapshotSource for SlowSource {
    fn read_cache(&self) -> Result<Vec<u8>> {
        Ok(self.cached.clone())
    }

    fn write_cache(&self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn fetch(&self, _url: &str, timeout: Duration, cancel: &CancelFlag) -> Result<Vec<u8>> {
        self.downloading.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            cancel.check()?;
            thread::sleep(Duration::from_millis(5));
        }
        Ok(encode_lists(&["late.com"], &[]))
    }
}

fn encode_lists(blocklist: &[&str], allowlist: &[&str]) -> Vec<u8> {
    snapshot::encode(
        &DomainTrie::from_domains(blocklist),
        &DomainTrie::from_domains(allowlist),
    )
    .unwrap()
}

fn checker_with(blocklist: &[&str], allowlist: &[&str]) -> Checker {
    let source = MockSource::remote(encode_lists(blocklist, allowlist));
    Checker::with_source(Config::default(), source).unwrap()
}

#[test]
fn test_blocklist_scenario() {
    let checker = checker_with(&["tempmail.com"], &[]);

    assert!(checker.is_disposable("user@tempmail.com"));
    assert!(checker.is_disposable("mail.tempmail.com"));
    assert!(!checker.is_disposable("nottempmail.com"));
}

#[test]
fn test_allowlist_wins_scenario() {
    let checker = checker_with(&["tempmail.com"], &["tempmail.com"]);

    assert!(!checker.is_disposable("tempmail.com"));
    assert!(!checker.is_disposable("user@sub.tempmail.com"));
}

#[test]
fn test_allowlisted_ancestor_wins() {
    let checker = checker_with(&["mail.example.com"], &["example.com"]);

    assert!(!checker.is_disposable("user@mail.example.com"));
    assert!(!checker.is_disposable("a.mail.example.com"));
}

#[test]
fn test_empty_and_invalid_input() {
    let checker = checker_with(&["tempmail.com"], &[]);

    for input in ["", "@", "user@", "   ", "user@@"] {
        assert!(!checker.is_disposable(input), "input {:?}", input);
    }
}

#[test]
fn test_case_and_whitespace_insensitive() {
    let checker = checker_with(&["tempmail.com"], &[]);

    assert!(checker.is_disposable("  User@TempMail.COM  "));
}

#[test]
fn test_hierarchical_containment() {
    let stored = ["tempmail.com", "guerrillamail.org", "mailinator.net"];
    let trie = DomainTrie::from_domains(stored);

    for domain in stored {
        assert!(trie.contains_hierarchical(domain));
        for prefix in ["a", "mail", "x.y.z"] {
            assert!(trie.contains_hierarchical(&format!("{}.{}", prefix, domain)));
        }
    }
    for unrelated in ["gmail.com", "example.org", "net", "com"] {
        assert!(!trie.contains_hierarchical(unrelated));
    }
}

#[test]
fn test_insert_idempotent() {
    let once = DomainTrie::from_domains(["tempmail.com"]);
    let many = DomainTrie::from_domains(["tempmail.com"; 5]);

    assert_eq!(many.size(), 1);
    assert_eq!(many.enumerate(), once.enumerate());
}

#[test]
fn test_snapshot_round_trip() {
    let domains: HashSet<String> = (0..500).map(|i| format!("d{}.example.com", i)).collect();
    let blocklist = DomainTrie::from_domains(&domains);

    let data = snapshot::encode(&blocklist, &DomainTrie::new()).unwrap();
    let decoded = snapshot::decode(&data).unwrap();

    let round_tripped: HashSet<String> = decoded.blocklist.enumerate().into_iter().collect();
    assert_eq!(round_tripped, domains);
    assert_eq!(decoded.blocklist.size(), domains.len());
}

#[test]
fn test_snapshot_scenario() {
    let data = encode_lists(&["a.com", "b.com"], &[]);
    let decoded = snapshot::decode(&data).unwrap();

    assert_eq!(decoded.blocklist.size(), 2);
    assert_eq!(decoded.allowlist.size(), 0);
}

#[test]
fn test_decode_invalid_compression() {
    let err = snapshot::decode(b"definitely not gzip").unwrap_err();
    assert!(matches!(err, CodecError::Decompress(_)));
}

#[test]
fn test_init_fails_without_cache_or_download() {
    let source = Arc::new(MockSource::default());
    let err = Checker::with_source(Config::default(), source).err().unwrap();

    assert!(err.is_initialization());
    assert!(err.is_download());
    assert_eq!(err.status_code(), Some(503));
}

#[test]
fn test_init_rejects_corrupt_download() {
    let source = MockSource::remote(b"garbage".to_vec());
    let err = Checker::with_source(Config::default(), source).err().unwrap();

    assert!(err.is_initialization());
    assert!(err.is_decode());
}

#[test]
fn test_refresh_failure_keeps_lists() {
    let source = MockSource::remote(encode_lists(&["tempmail.com"], &[]));
    let checker = Checker::with_source(Config::default(), source.clone()).unwrap();

    source.set_remote(None);
    let err = checker.refresh().unwrap_err();
    assert!(err.is_download());
    assert!(checker.is_disposable("tempmail.com"));

    source.set_remote(Some(b"garbage".to_vec()));
    assert!(checker.refresh().unwrap_err().is_decode());
    assert!(checker.is_disposable("tempmail.com"));

    source.set_remote(Some(encode_lists(&["other.com"], &[])));
    checker.refresh().unwrap();
    assert!(!checker.is_disposable("tempmail.com"));
    assert!(checker.is_disposable("other.com"));
}

#[test]
fn test_custom_domains_survive_refresh() {
    let source = MockSource::remote(encode_lists(&["tempmail.com"], &[]));
    let config = Config::default()
        .with_custom_blocklist(["Internal-Blocked.com"])
        .with_custom_allowlist(["tempmail.com"]);
    let checker = Checker::with_source(config, source).unwrap();

    assert!(checker.is_disposable("user@internal-blocked.com"));
    assert!(!checker.is_disposable("user@tempmail.com"));

    checker.refresh().unwrap();
    assert!(checker.is_disposable("user@internal-blocked.com"));
    assert!(!checker.is_disposable("user@tempmail.com"));
}

#[test]
fn test_close_stops_auto_refresh() {
    let source = MockSource::remote(encode_lists(&["tempmail.com"], &[]));
    let config = Config::default().with_auto_refresh(Duration::from_millis(20));
    let checker = Checker::with_source(config, source.clone()).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert!(checker.is_running_auto_refresh());

    let start = Instant::now();
    checker.close();
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!checker.is_running_auto_refresh());

    let fetches = source.fetch_count();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(source.fetch_count(), fetches);

    // Second close is a no-op
    checker.close();
}

#[test]
fn test_drop_stops_auto_refresh() {
    let source = MockSource::remote(encode_lists(&["tempmail.com"], &[]));
    let config = Config::default().with_auto_refresh(Duration::from_secs(3600));
    let checker = Checker::with_source(config, source.clone()).unwrap();

    let start = Instant::now();
    drop(checker);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_close_during_slow_download() {
    let source = Arc::new(SlowSource {
        cached: encode_lists(&["tempmail.com"], &[]),
        downloading: AtomicBool::new(false),
    });
    let config = Config::default()
        .with_auto_refresh(Duration::from_millis(10))
        .with_http_timeout(Duration::from_secs(5));
    let checker = Checker::with_source(config, source.clone()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !source.downloading.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(source.downloading.load(Ordering::SeqCst));

    let start = Instant::now();
    checker.close();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(checker.is_disposable("tempmail.com"));
    assert!(!checker.is_disposable("late.com"));
}

#[test]
fn test_concurrent_queries_and_refresh() {
    // Within one snapshot each of x.com / y.com is both blocked and allowlisted.
    // Pairing one snapshot's blocklist with the other's allowlist flags it.
    let first = encode_lists(&["x.com", "tempmail.com"], &["x.com"]);
    let second = encode_lists(&["y.com", "tempmail.com"], &["y.com"]);
    let source = MockSource::remote(first.clone());
    let checker = Arc::new(Checker::with_source(Config::default(), source.clone()).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let checker = Arc::clone(&checker);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    assert!(!checker.is_disposable("user@x.com"));
                    assert!(!checker.is_disposable("user@y.com"));
                    assert!(checker.is_disposable("user@tempmail.com"));
                }
            })
        })
        .collect();

    for i in 0..200 {
        source.set_remote(Some(if i % 2 == 0 { second.clone() } else { first.clone() }));
        checker.refresh().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        reader.join().unwrap();
    }
    // One initial download plus every refresh
    assert_eq!(source.fetch_count(), 201);
}

#[test]
fn test_remote_source_loads_from_cache_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("data.bin"),
        encode_lists(&["tempmail.com"], &["gmail.com"]),
    )
    .unwrap();

    // Unreachable data URL: the cached snapshot must be enough
    let config = Config::default()
        .with_cache_dir(temp_dir.path())
        .with_data_url("http://127.0.0.1:9/data.bin")
        .with_http_timeout(Duration::from_millis(500));
    let checker = Checker::new(config).unwrap();

    assert!(checker.is_disposable("user@tempmail.com"));
    assert!(!checker.is_disposable("user@gmail.com"));
    assert_eq!(checker.stats().blocklist_count, 1);

    assert!(checker.refresh().unwrap_err().is_download());
    assert!(checker.is_disposable("user@tempmail.com"));
}

#[test]
fn test_update_pipeline_feeds_checker() {
    let sources = parse_sources(
        "blocklist|main|https://example.com/block.txt\n\
         allowlist|allow|https://example.com/allow.txt\n",
    )
    .unwrap();

    let mut merger = ListMerger::new();
    merger.add_source(&sources[0], &["TempMail.com".to_string(), "gmail.com".to_string()]);
    merger.add_source(&sources[1], &["gmail.com".to_string()]);
    let (lists, failed) = merger.finish().unwrap();
    assert!(failed.is_empty());

    let source = MockSource::remote(lists.encode().unwrap());
    let checker = Checker::with_source(Config::default(), source).unwrap();

    assert!(checker.is_disposable("user@tempmail.com"));
    assert!(!checker.is_disposable("user@gmail.com"));
    assert_eq!(checker.get_blocklist(), vec!["tempmail.com"]);
}
