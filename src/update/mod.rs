//! Building snapshots from plain-text domain lists.
//!
//! Used by the `disposable-update` tool: sources are downloaded elsewhere,
//! fed into a [`ListMerger`], and the merged lists are encoded into a
//! snapshot blob.

mod sources;

pub use sources::{load_sources, parse_sources, Source, SourceKind};

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::domain::{is_valid_domain, normalize_domain};
use crate::error::{Error, Result};
use crate::snapshot::{self, Snapshot, FORMAT_VERSION};

/// Parse a plain-text domain list: one entry per line, `#` comments skipped.
pub fn parse_domain_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Counts before and after an update, plus the sources that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub old_blocklist_count: usize,
    pub new_blocklist_count: usize,
    pub old_allowlist_count: usize,
    pub new_allowlist_count: usize,
    pub failed_sources: Vec<String>,
}

impl UpdateStats {
    /// One-line description of what changed.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        describe_change(
            &mut parts,
            self.old_blocklist_count,
            self.new_blocklist_count,
            "blocklist",
        );
        describe_change(
            &mut parts,
            self.old_allowlist_count,
            self.new_allowlist_count,
            "allowlist",
        );

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn describe_change(parts: &mut Vec<String>, old: usize, new: usize, list: &str) {
    if new > old {
        parts.push(format!("{} domains added to {}", new - old, list));
    } else if old > new {
        parts.push(format!("{} domains removed from {}", old - new, list));
    }
}

/// Final, deduplicated lists ready to encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedLists {
    pub blocklist: BTreeSet<String>,
    pub allowlist: BTreeSet<String>,
}

impl MergedLists {
    /// Build a snapshot value, stamped now.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: FORMAT_VERSION.to_string(),
            created_at: SystemTime::now(),
            domain_count: self.blocklist.len() as u64,
            blocklist: self.blocklist.iter().cloned().collect(),
            allowlist: self.allowlist.iter().cloned().collect(),
        }
    }

    /// Encode into a compressed snapshot blob.
    pub fn encode(&self) -> Result<Vec<u8>> {
        snapshot::encode_snapshot(&self.to_snapshot()).map_err(Error::Encode)
    }
}

/// Accumulates domains from many sources into one blocklist/allowlist pair.
#[derive(Debug, Default)]
pub struct ListMerger {
    lists: MergedLists,
    successful_sources: usize,
    failed_sources: Vec<String>,
}

impl ListMerger {
    /// Create an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the entries downloaded from a source.
    ///
    /// An empty list counts as a failed source. Invalid entries are dropped.
    /// Returns the number of valid domains accepted.
    pub fn add_source(&mut self, source: &Source, entries: &[String]) -> usize {
        if entries.is_empty() {
            log::error!("Source {} returned empty data (skipping)", source.name);
            self.failed_sources.push(source.name.clone());
            return 0;
        }

        self.successful_sources += 1;
        let target = match source.kind {
            SourceKind::Blocklist => &mut self.lists.blocklist,
            SourceKind::Allowlist => &mut self.lists.allowlist,
        };
        insert_valid(target, entries)
    }

    /// Record a source that could not be downloaded.
    pub fn add_failure(&mut self, source: &Source) {
        self.failed_sources.push(source.name.clone());
    }

    /// Add manually maintained blocklist entries.
    pub fn add_manual(&mut self, entries: &[String]) -> usize {
        insert_valid(&mut self.lists.blocklist, entries)
    }

    /// Names of the sources that failed so far.
    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }

    /// Remove allowlisted domains from the blocklist and validate the result.
    ///
    /// Fails if every source failed or the blocklist ended up empty, so that
    /// callers never overwrite good data with bad.
    pub fn finish(self) -> Result<(MergedLists, Vec<String>)> {
        if self.successful_sources == 0 {
            return Err(Error::AllSourcesFailed);
        }

        let mut lists = self.lists;
        let allowlist = &lists.allowlist;
        lists.blocklist.retain(|domain| !allowlist.contains(domain));

        if lists.blocklist.is_empty() {
            return Err(Error::EmptyBlocklist);
        }

        Ok((lists, self.failed_sources))
    }
}

fn insert_valid(target: &mut BTreeSet<String>, entries: &[String]) -> usize {
    let mut accepted = 0;
    for entry in entries {
        let domain = normalize_domain(entry);
        if is_valid_domain(&domain) {
            target.insert(domain);
            accepted += 1;
        }
    }
    accepted
}

/// Write a sorted, commented text copy of a domain list.
pub fn write_text_list(path: impl AsRef<Path>, domains: &BTreeSet<String>) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    writeln!(writer, "# Generated by disposable-update")?;
    writeln!(writer, "# Date: {} (unix)", secs)?;
    writeln!(writer, "# Count: {}", domains.len())?;
    writeln!(writer, "#")?;
    for domain in domains {
        writeln!(writer, "{}", domain)?;
    }
    writer.flush()?;
    Ok(())
}
