//! Snapshot wire format.
//!
//! Both pool snapshots share one binary layout with a CRC32 checksum for
//! integrity:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Pool Snapshot                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Magic (4 bytes)   │ Version (1 byte)  │ Pool Kind (1 byte)       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Record Count (4 bytes, little-endian)                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Records, each: Length (4 bytes, little-endian) + Payload         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ CRC32 Checksum (4 bytes, little-endian, over all prior bytes)    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Record payloads are bincode. Decoding is all-or-nothing: any failed
//! check rejects the whole snapshot, so a restore never sees a partially
//! decoded stream. Transaction bytes inside each record must parse as a
//! canonical transaction for the snapshot to be accepted at all; the rest
//! of the record metadata is advisory and re-derived at restore time.

use embercore_mempool::{OrphanEntry, PoolEntry};
use embercore_types::{Transaction, Txid};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Result, SnapshotError};

/// Magic bytes to identify pool snapshot files
const SNAPSHOT_MAGIC: [u8; 4] = [0x45, 0x50, 0x4F, 0x4C]; // "EPOL" - Ember pool

/// Current snapshot format version
const SNAPSHOT_VERSION: u8 = 1;

/// Header size in bytes (magic + version + pool kind + record count)
const HEADER_SIZE: usize = 10;

/// CRC32 checksum size
const CRC_SIZE: usize = 4;

/// Which pool a snapshot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// The admitted transaction pool
    Mempool,
    /// The orphan pool
    Orphans,
}

impl PoolKind {
    /// Kind byte stored in the snapshot header.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Mempool => 1,
            Self::Orphans => 2,
        }
    }

    /// Parses a header kind byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Self::Mempool),
            2 => Ok(Self::Orphans),
            other => Err(SnapshotError::format(format!(
                "invalid pool kind byte: {other}"
            ))),
        }
    }

    /// Label used in log and error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mempool => "mempool",
            Self::Orphans => "orphanpool",
        }
    }

    /// Well-known snapshot file name for this pool.
    pub const fn filename(self) -> &'static str {
        match self {
            Self::Mempool => "mempool.dat",
            Self::Orphans => "orphanpool.dat",
        }
    }
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A record type carried by snapshots of one pool kind.
pub trait SnapshotRecord: Serialize + DeserializeOwned {
    /// The pool kind whose snapshots hold this record type.
    const KIND: PoolKind;

    /// Canonical transaction bytes carried by the record.
    fn raw_tx(&self) -> &[u8];

    /// The entry's original timestamp, restored alongside the transaction.
    fn stamp(&self) -> u64;
}

/// Persisted form of one admitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolRecord {
    /// Canonical transaction bytes
    pub raw_tx: Vec<u8>,
    /// Unix timestamp (seconds) when the node first took the transaction in
    pub admitted_at: u64,
    /// Fee paid at admission; advisory, re-derived at restore
    pub fee: u64,
    /// Ancestor chain depth at admission; advisory, re-derived at restore
    pub ancestor_count: u32,
    /// Ancestor chain bytes at admission; advisory, re-derived at restore
    pub ancestor_size: u64,
}

impl MempoolRecord {
    /// Builds the persisted form of a live pool entry.
    pub fn from_entry(entry: &PoolEntry) -> Self {
        Self {
            raw_tx: entry.tx.rlp_encode(),
            admitted_at: entry.admitted_at,
            fee: entry.fee,
            ancestor_count: entry.ancestor_count,
            ancestor_size: entry.ancestor_size,
        }
    }
}

impl SnapshotRecord for MempoolRecord {
    const KIND: PoolKind = PoolKind::Mempool;

    fn raw_tx(&self) -> &[u8] {
        &self.raw_tx
    }

    fn stamp(&self) -> u64 {
        self.admitted_at
    }
}

/// Persisted form of one orphan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanRecord {
    /// Canonical transaction bytes
    pub raw_tx: Vec<u8>,
    /// Unix timestamp (seconds) when the orphan was first seen
    pub first_seen: u64,
    /// Parents unresolved when the snapshot was taken; advisory, re-derived
    /// at restore
    pub missing: Vec<Txid>,
}

impl OrphanRecord {
    /// Builds the persisted form of a live orphan entry.
    pub fn from_entry(entry: &OrphanEntry) -> Self {
        Self {
            raw_tx: entry.tx.rlp_encode(),
            first_seen: entry.first_seen,
            missing: entry.missing.iter().copied().collect(),
        }
    }
}

impl SnapshotRecord for OrphanRecord {
    const KIND: PoolKind = PoolKind::Orphans;

    fn raw_tx(&self) -> &[u8] {
        &self.raw_tx
    }

    fn stamp(&self) -> u64 {
        self.first_seen
    }
}

/// Serializes a record stream into snapshot bytes.
pub fn encode_snapshot<R: SnapshotRecord>(records: &[R]) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(HEADER_SIZE + CRC_SIZE);

    // Write header
    data.extend_from_slice(&SNAPSHOT_MAGIC);
    data.push(SNAPSHOT_VERSION);
    data.push(R::KIND.as_byte());
    data.extend_from_slice(&(records.len() as u32).to_le_bytes());

    // Write length-prefixed records
    for record in records {
        let payload = bincode::serialize(record)?;
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&payload);
    }

    // Compute and write CRC32 checksum
    let crc = crc32_checksum(&data);
    data.extend_from_slice(&crc.to_le_bytes());

    Ok(data)
}

/// Deserializes snapshot bytes back into records.
///
/// Every structural check must pass for any record to come back; a failed
/// magic, version, kind, length, count, checksum or transaction parse
/// rejects the whole snapshot.
pub fn decode_snapshot<R: SnapshotRecord>(data: &[u8]) -> Result<Vec<R>> {
    if data.len() < HEADER_SIZE + CRC_SIZE {
        return Err(SnapshotError::format(format!(
            "snapshot too short: {} bytes",
            data.len()
        )));
    }

    // Verify magic
    if data[0..4] != SNAPSHOT_MAGIC {
        return Err(SnapshotError::format("invalid magic bytes"));
    }

    // Check version
    let version = data[4];
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::format(format!(
            "unsupported snapshot version: {version} (expected {SNAPSHOT_VERSION})"
        )));
    }

    // Check pool kind
    let kind = PoolKind::from_byte(data[5])?;
    if kind != R::KIND {
        return Err(SnapshotError::format(format!(
            "pool kind mismatch: expected {}, found {}",
            R::KIND,
            kind
        )));
    }

    // Verify CRC before trusting any length field
    let body_len = data.len() - CRC_SIZE;
    let stored_crc = u32::from_le_bytes(data[body_len..].try_into().unwrap());
    let computed_crc = crc32_checksum(&data[..body_len]);
    if stored_crc != computed_crc {
        return Err(SnapshotError::format(format!(
            "CRC mismatch: stored {stored_crc:#x}, computed {computed_crc:#x}"
        )));
    }

    // Parse declared record count
    let declared = u32::from_le_bytes(data[6..10].try_into().unwrap()) as usize;

    // Parse length-prefixed records
    let mut records = Vec::new();
    let mut cursor = HEADER_SIZE;
    while cursor < body_len {
        if body_len - cursor < 4 {
            return Err(SnapshotError::format(format!(
                "truncated record length at offset {cursor}"
            )));
        }
        let len = u32::from_le_bytes(data[cursor..cursor + 4].try_into().unwrap()) as usize;
        cursor += 4;

        if body_len - cursor < len {
            return Err(SnapshotError::format(format!(
                "truncated record at offset {cursor}: expected {len} bytes, got {}",
                body_len - cursor
            )));
        }
        let record: R = bincode::deserialize(&data[cursor..cursor + len]).map_err(|err| {
            SnapshotError::format(format!("record decode failed at offset {cursor}: {err}"))
        })?;
        cursor += len;

        // Reject snapshots whose transaction bytes do not parse at all
        Transaction::rlp_decode(record.raw_tx()).map_err(|err| {
            SnapshotError::format(format!(
                "malformed transaction bytes in record {}: {err}",
                records.len()
            ))
        })?;

        records.push(record);
    }

    if records.len() != declared {
        return Err(SnapshotError::format(format!(
            "record count mismatch: header declares {declared}, stream holds {}",
            records.len()
        )));
    }

    Ok(records)
}

/// CRC32 checksum (IEEE 802.3 polynomial)
fn crc32_checksum(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = generate_crc32_table();

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ TABLE[index];
    }
    !crc
}

/// Generate CRC32 lookup table at compile time
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}
