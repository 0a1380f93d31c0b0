//! Sources file parsing.
//!
//! One source per line, `type|name|url`, where `type` is `blocklist` or
//! `allowlist`. Blank lines and lines starting with `#` are ignored.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Whether a source contributes to the blocklist or the allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Blocklist,
    Allowlist,
}

impl SourceKind {
    /// Parse a source kind (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "blocklist" => Some(SourceKind::Blocklist),
            "allowlist" => Some(SourceKind::Allowlist),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Blocklist => "blocklist",
            SourceKind::Allowlist => "allowlist",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downloadable plain-text domain list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub kind: SourceKind,
    pub name: String,
    pub url: String,
}

/// Parse the contents of a sources file.
pub fn parse_sources(content: &str) -> Result<Vec<Source>> {
    let mut sources = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.splitn(3, '|').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidSource {
                line: line_num,
                reason: format!("expected 'type|name|url', got {:?}", line),
            });
        }

        let kind = SourceKind::from_str(parts[0]).ok_or_else(|| Error::InvalidSource {
            line: line_num,
            reason: format!(
                "expected 'blocklist' or 'allowlist', got {:?}",
                parts[0].trim()
            ),
        })?;

        let name = parts[1].trim();
        let url = parts[2].trim();
        if name.is_empty() || url.is_empty() {
            return Err(Error::InvalidSource {
                line: line_num,
                reason: "name and url cannot be empty".to_string(),
            });
        }

        sources.push(Source {
            kind,
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    if sources.is_empty() {
        return Err(Error::InvalidSource {
            line: 0,
            reason: "no sources found".to_string(),
        });
    }

    Ok(sources)
}

/// Read and parse a sources file.
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)?;
    parse_sources(&content)
}
