//! Versioned, compressed snapshot of a blocklist/allowlist pair.
//!
//! # Format
//!
//! ```text
//! +---------------------------+
//! |  gzip container           |  best compression
//! |  +---------------------+  |
//! |  | CBOR map            |  |  field-named, self-describing
//! |  |  version: text      |  |
//! |  |  created_at: uint   |  |  Unix seconds, UTC
//! |  |  domain_count: uint |  |  blocklist size
//! |  |  blocklist: [text]  |  |
//! |  |  allowlist: [text]  |  |
//! |  +---------------------+  |
//! +---------------------------+
//! ```
//!
//! Domains are stored as flat lists rather than as tree shape; decoding
//! rebuilds fresh tries by re-inserting every entry.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::SystemTime;

use crate::error::CodecError;
use crate::trie::DomainTrie;

/// Format tag written into every snapshot.
pub const FORMAT_VERSION: &str = "1.0";

/// Flat, serializable form of both domain lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    #[serde(with = "unix_seconds")]
    pub created_at: SystemTime,
    pub domain_count: u64,
    pub blocklist: Vec<String>,
    pub allowlist: Vec<String>,
}

impl Snapshot {
    /// Capture the current contents of two tries.
    pub fn from_tries(blocklist: &DomainTrie, allowlist: &DomainTrie) -> Self {
        let blocklist = blocklist.enumerate();
        Self {
            version: FORMAT_VERSION.to_string(),
            created_at: SystemTime::now(),
            domain_count: blocklist.len() as u64,
            blocklist,
            allowlist: allowlist.enumerate(),
        }
    }

    /// Provenance fields without the domain lists.
    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            version: self.version.clone(),
            created_at: self.created_at,
            domain_count: self.domain_count,
        }
    }
}

/// Snapshot provenance: format version, creation time and blocklist size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub version: String,
    #[serde(serialize_with = "unix_seconds::serialize")]
    pub created_at: SystemTime,
    pub domain_count: u64,
}

/// Result of decoding a snapshot: two freshly built tries plus provenance.
#[derive(Debug)]
pub struct DecodedSnapshot {
    pub blocklist: DomainTrie,
    pub allowlist: DomainTrie,
    pub info: SnapshotInfo,
}

pub(crate) mod unix_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

/// Encode a blocklist/allowlist pair into a compressed snapshot blob.
pub fn encode(blocklist: &DomainTrie, allowlist: &DomainTrie) -> Result<Vec<u8>, CodecError> {
    encode_snapshot(&Snapshot::from_tries(blocklist, allowlist))
}

/// Encode an already-built snapshot value.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>, CodecError> {
    let mut payload = Vec::new();
    ciborium::ser::into_writer(snapshot, &mut payload)
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&payload)?;
    Ok(encoder.finish()?)
}

/// Encode a blocklist/allowlist pair and write it to `writer`.
pub fn encode_to_writer<W: Write>(
    blocklist: &DomainTrie,
    allowlist: &DomainTrie,
    mut writer: W,
) -> Result<(), CodecError> {
    let data = encode(blocklist, allowlist)?;
    writer.write_all(&data)?;
    Ok(())
}

/// Decompress and parse a snapshot blob without building tries.
pub fn decode_snapshot(data: &[u8]) -> Result<Snapshot, CodecError> {
    let mut decoder = GzDecoder::new(data);
    let mut payload = Vec::new();
    decoder
        .read_to_end(&mut payload)
        .map_err(CodecError::Decompress)?;

    ciborium::de::from_reader(payload.as_slice()).map_err(|e| CodecError::Payload(e.to_string()))
}

/// Decode a snapshot blob into two fresh tries.
///
/// Entries are inserted verbatim; normalization is the producer's job.
pub fn decode(data: &[u8]) -> Result<DecodedSnapshot, CodecError> {
    let snapshot = decode_snapshot(data)?;
    let info = snapshot.info();

    Ok(DecodedSnapshot {
        blocklist: DomainTrie::from_domains(&snapshot.blocklist),
        allowlist: DomainTrie::from_domains(&snapshot.allowlist),
        info,
    })
}

/// Read a whole snapshot blob from `reader` and decode it.
pub fn decode_from_reader<R: Read>(mut reader: R) -> Result<DecodedSnapshot, CodecError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode(&data)
}
