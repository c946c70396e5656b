//! Admitted transaction pool.
//!
//! This module provides the core transaction pool:
//! - Entries keyed by transaction identifier with admission metadata
//! - A spent-outpoint index for double-spend detection and parent lookup
//! - Admission-ordered copy-out for snapshots, so parents always precede
//!   their children in a dump
//! - A byte budget enforced at insertion

use std::collections::{BTreeMap, HashMap};

use embercore_types::{OutPoint, Transaction, Txid};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{MempoolError, Result};

/// An admitted transaction with its bookkeeping metadata.
///
/// Every entry passed full validation against pool and chain state when it
/// was admitted; membership does not imply validity after the chain has
/// advanced.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    /// The transaction itself
    pub tx: Transaction,
    /// Cached transaction identifier
    pub txid: Txid,
    /// Unix timestamp (seconds) when the node first took the transaction in
    pub admitted_at: u64,
    /// Fee paid (inputs minus outputs), in base units
    pub fee: u64,
    /// Depth of the longest unconfirmed ancestor chain, this entry included
    pub ancestor_count: u32,
    /// Bytes along that ancestor chain, this entry included
    pub ancestor_size: u64,
    /// Canonical encoding size in bytes
    pub size: usize,
}

impl PoolEntry {
    /// Builds an entry, caching the identifier and encoded size.
    pub fn new(
        tx: Transaction,
        admitted_at: u64,
        fee: u64,
        ancestor_count: u32,
        ancestor_size: u64,
    ) -> Self {
        let txid = tx.txid();
        let size = tx.encoded_size();
        Self {
            tx,
            txid,
            admitted_at,
            fee,
            ancestor_count,
            ancestor_size,
            size,
        }
    }
}

/// Internal pool state
struct PoolInner {
    /// All entries by identifier
    by_txid: HashMap<Txid, PoolEntry>,

    /// Admission sequence -> identifier, drives snapshot ordering
    by_seq: BTreeMap<u64, Txid>,

    /// Identifier -> admission sequence, for removal
    seq_of: HashMap<Txid, u64>,

    /// Outpoint -> pooled transaction spending it
    spends: HashMap<OutPoint, Txid>,

    /// Total canonical bytes held
    total_bytes: usize,

    /// Next admission sequence number
    next_seq: u64,
}

impl PoolInner {
    fn new() -> Self {
        Self {
            by_txid: HashMap::new(),
            by_seq: BTreeMap::new(),
            seq_of: HashMap::new(),
            spends: HashMap::new(),
            total_bytes: 0,
            next_seq: 0,
        }
    }
}

/// Transaction pool
///
/// Thread-safe collection of admitted transactions. The pool records which
/// outpoints its entries spend; at most one pooled spender exists per
/// outpoint because conflicting admissions are rejected upstream.
pub struct TxPool {
    /// Internal state protected by RwLock
    inner: RwLock<PoolInner>,
    /// Byte budget for the whole pool
    max_bytes: usize,
}

impl TxPool {
    /// Creates an empty pool with the given byte budget.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: RwLock::new(PoolInner::new()),
            max_bytes,
        }
    }

    /// Inserts a validated entry.
    ///
    /// Fails with [`MempoolError::AlreadyExists`] on a duplicate identifier
    /// and [`MempoolError::PoolFull`] when the byte budget is exhausted.
    pub fn insert(&self, entry: PoolEntry) -> Result<()> {
        let mut inner = self.inner.write();

        if inner.by_txid.contains_key(&entry.txid) {
            return Err(MempoolError::AlreadyExists);
        }
        if inner.total_bytes + entry.size > self.max_bytes {
            return Err(MempoolError::PoolFull);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;

        for input in &entry.tx.inputs {
            inner.spends.insert(input.prevout, entry.txid);
        }
        inner.by_seq.insert(seq, entry.txid);
        inner.seq_of.insert(entry.txid, seq);
        inner.total_bytes += entry.size;

        trace!(txid = %entry.txid, size = entry.size, "transaction entered pool");
        inner.by_txid.insert(entry.txid, entry);
        Ok(())
    }

    /// Removes an entry, unlinking its spent outpoints.
    pub fn remove(&self, txid: &Txid) -> Option<PoolEntry> {
        let mut inner = self.inner.write();

        let entry = inner.by_txid.remove(txid)?;
        if let Some(seq) = inner.seq_of.remove(txid) {
            inner.by_seq.remove(&seq);
        }
        for input in &entry.tx.inputs {
            inner.spends.remove(&input.prevout);
        }
        inner.total_bytes -= entry.size;

        debug!(txid = %txid, "transaction left pool");
        Some(entry)
    }

    /// Whether the identifier is currently pooled.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.inner.read().by_txid.contains_key(txid)
    }

    /// Returns a copy of the entry, if pooled.
    pub fn get(&self, txid: &Txid) -> Option<PoolEntry> {
        self.inner.read().by_txid.get(txid).cloned()
    }

    /// The pooled transaction spending this outpoint, if any.
    pub fn spender_of(&self, outpoint: &OutPoint) -> Option<Txid> {
        self.inner.read().spends.get(outpoint).copied()
    }

    /// Value of a pooled transaction's output, if the outpoint resolves
    /// into the pool.
    pub fn output_value(&self, outpoint: &OutPoint) -> Option<u64> {
        let inner = self.inner.read();
        let entry = inner.by_txid.get(&outpoint.txid)?;
        entry
            .tx
            .outputs
            .get(outpoint.vout as usize)
            .map(|out| out.value)
    }

    /// Recorded ancestor chain `(count, bytes)` of a pooled entry.
    pub fn ancestor_stats(&self, txid: &Txid) -> Option<(u32, u64)> {
        self.inner
            .read()
            .by_txid
            .get(txid)
            .map(|entry| (entry.ancestor_count, entry.ancestor_size))
    }

    /// Copies the current entries out in admission order.
    ///
    /// Admission order puts parents before children, which snapshot
    /// restoration relies on. The lock is held only for the copy; callers
    /// encode and write without it.
    pub fn snapshot_entries(&self) -> Vec<PoolEntry> {
        let inner = self.inner.read();
        inner
            .by_seq
            .values()
            .filter_map(|txid| inner.by_txid.get(txid).cloned())
            .collect()
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.inner.read().by_txid.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_txid.is_empty()
    }

    /// Total canonical bytes held.
    pub fn total_bytes(&self) -> usize {
        self.inner.read().total_bytes
    }

    /// Pool counters.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.read();
        PoolStats {
            count: inner.by_txid.len(),
            bytes: inner.total_bytes,
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_txid.clear();
        inner.by_seq.clear();
        inner.seq_of.clear();
        inner.spends.clear();
        inner.total_bytes = 0;
    }
}

/// Transaction pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of pooled transactions
    pub count: usize,
    /// Total canonical bytes held
    pub bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use embercore_types::{TxInput, TxOutput};

    fn entry_spending(tag: &[u8], prevout: OutPoint) -> PoolEntry {
        let tx = Transaction::new(
            vec![TxInput::new(prevout, tag.to_vec())],
            vec![TxOutput::new(1_000, vec![0xAA])],
        );
        PoolEntry::new(tx, 100, 10, 1, 60)
    }

    #[test]
    fn test_insert_and_lookup() {
        let pool = TxPool::new(1 << 20);
        let prevout = OutPoint::new(Txid::keccak256(b"parent"), 0);
        let entry = entry_spending(b"a", prevout);
        let txid = entry.txid;

        pool.insert(entry).unwrap();

        assert!(pool.contains(&txid));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.spender_of(&prevout), Some(txid));
        assert_eq!(pool.get(&txid).unwrap().fee, 10);
        assert_eq!(pool.output_value(&OutPoint::new(txid, 0)), Some(1_000));
        assert_eq!(pool.output_value(&OutPoint::new(txid, 1)), None);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let pool = TxPool::new(1 << 20);
        let prevout = OutPoint::new(Txid::keccak256(b"parent"), 0);
        pool.insert(entry_spending(b"a", prevout)).unwrap();

        let err = pool.insert(entry_spending(b"a", prevout)).unwrap_err();
        assert!(matches!(err, MempoolError::AlreadyExists));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_byte_budget_enforced() {
        let small = entry_spending(b"a", OutPoint::new(Txid::keccak256(b"p"), 0));
        let pool = TxPool::new(small.size);
        pool.insert(small).unwrap();

        let err = pool
            .insert(entry_spending(b"b", OutPoint::new(Txid::keccak256(b"q"), 0)))
            .unwrap_err();
        assert!(matches!(err, MempoolError::PoolFull));
    }

    #[test]
    fn test_remove_unlinks_spends() {
        let pool = TxPool::new(1 << 20);
        let prevout = OutPoint::new(Txid::keccak256(b"parent"), 0);
        let entry = entry_spending(b"a", prevout);
        let txid = entry.txid;
        let size = entry.size;
        pool.insert(entry).unwrap();

        let removed = pool.remove(&txid).unwrap();
        assert_eq!(removed.txid, txid);
        assert_eq!(removed.size, size);
        assert!(!pool.contains(&txid));
        assert_eq!(pool.spender_of(&prevout), None);
        assert_eq!(pool.total_bytes(), 0);

        assert!(pool.remove(&txid).is_none());
    }

    #[test]
    fn test_snapshot_preserves_admission_order() {
        let pool = TxPool::new(1 << 20);
        let mut expected = Vec::new();
        for i in 0..5u8 {
            let entry = entry_spending(&[i], OutPoint::new(Txid::keccak256(&[i]), 0));
            expected.push(entry.txid);
            pool.insert(entry).unwrap();
        }

        // Removal must not disturb the order of the remaining entries
        pool.remove(&expected[2]).unwrap();
        expected.remove(2);

        let snapshot: Vec<Txid> = pool.snapshot_entries().iter().map(|e| e.txid).collect();
        assert_eq!(snapshot, expected);
    }

    #[test]
    fn test_stats_and_clear() {
        let pool = TxPool::new(1 << 20);
        let entry = entry_spending(b"a", OutPoint::new(Txid::keccak256(b"p"), 0));
        let size = entry.size;
        pool.insert(entry).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.bytes, size);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.stats(), PoolStats { count: 0, bytes: 0 });
    }
}
