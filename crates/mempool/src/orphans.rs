//! Orphan pool: transactions waiting on unresolved parents.
//!
//! Orphans are bounded two ways: a maximum entry count, enforced by
//! evicting the oldest entry first, and a retention window, enforced by an
//! on-access sweep. An orphan leaves the pool by eviction or by promotion
//! into the transaction pool once its parents appear; both are terminal
//! for the entry.

use std::collections::{BTreeSet, HashMap, HashSet};

use embercore_types::{Transaction, Txid};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A transaction parked until its parents appear.
#[derive(Debug, Clone)]
pub struct OrphanEntry {
    /// The transaction itself
    pub tx: Transaction,
    /// Cached transaction identifier
    pub txid: Txid,
    /// Parent identifiers that must appear before another admission attempt
    pub missing: BTreeSet<Txid>,
    /// Unix timestamp (seconds) when the orphan was first seen
    pub first_seen: u64,
    /// Admission attempts made so far
    pub attempts: u32,
    /// Canonical encoding size in bytes
    pub size: usize,
}

impl OrphanEntry {
    /// Builds an entry, caching the identifier and encoded size.
    pub fn new(tx: Transaction, missing: BTreeSet<Txid>, first_seen: u64, attempts: u32) -> Self {
        let txid = tx.txid();
        let size = tx.encoded_size();
        Self {
            tx,
            txid,
            missing,
            first_seen,
            attempts,
            size,
        }
    }
}

/// Internal orphan pool state
struct OrphanInner {
    /// All orphans by identifier
    by_txid: HashMap<Txid, OrphanEntry>,

    /// (first_seen, txid) ordered oldest-first; drives eviction and sweeps
    by_age: BTreeSet<(u64, Txid)>,

    /// Awaited parent -> orphans waiting on it
    by_parent: HashMap<Txid, HashSet<Txid>>,

    /// Total canonical bytes held
    total_bytes: usize,
}

impl OrphanInner {
    fn new() -> Self {
        Self {
            by_txid: HashMap::new(),
            by_age: BTreeSet::new(),
            by_parent: HashMap::new(),
            total_bytes: 0,
        }
    }

    fn link(&mut self, entry: OrphanEntry) {
        self.by_age.insert((entry.first_seen, entry.txid));
        for parent in &entry.missing {
            self.by_parent.entry(*parent).or_default().insert(entry.txid);
        }
        self.total_bytes += entry.size;
        self.by_txid.insert(entry.txid, entry);
    }

    fn unlink(&mut self, txid: &Txid) -> Option<OrphanEntry> {
        let entry = self.by_txid.remove(txid)?;
        self.by_age.remove(&(entry.first_seen, entry.txid));
        for parent in &entry.missing {
            if let Some(waiting) = self.by_parent.get_mut(parent) {
                waiting.remove(txid);
                if waiting.is_empty() {
                    self.by_parent.remove(parent);
                }
            }
        }
        self.total_bytes -= entry.size;
        Some(entry)
    }
}

/// Orphan pool
///
/// Thread-safe collection of dependency-incomplete transactions, bounded
/// by entry count and by residency time.
pub struct OrphanPool {
    /// Internal state protected by RwLock
    inner: RwLock<OrphanInner>,
    /// Maximum resident entries; zero disables the pool
    max_entries: usize,
    /// Retention window in seconds
    expiry_secs: u64,
}

impl OrphanPool {
    /// Creates an empty orphan pool with the given bounds.
    pub fn new(max_entries: usize, expiry_secs: u64) -> Self {
        Self {
            inner: RwLock::new(OrphanInner::new()),
            max_entries,
            expiry_secs,
        }
    }

    /// Inserts or replaces an orphan, evicting the oldest entries if the
    /// pool is at capacity.
    pub fn insert(&self, entry: OrphanEntry) {
        if self.max_entries == 0 {
            return;
        }
        let mut inner = self.inner.write();

        // Re-parking after a failed promotion replaces the old entry
        if inner.by_txid.contains_key(&entry.txid) {
            inner.unlink(&entry.txid);
        }

        while inner.by_txid.len() >= self.max_entries {
            let oldest = inner.by_age.iter().next().map(|(_, txid)| *txid);
            match oldest {
                Some(txid) => {
                    inner.unlink(&txid);
                    debug!(txid = %txid, "orphan evicted at capacity");
                }
                None => break,
            }
        }

        trace!(
            txid = %entry.txid,
            missing = entry.missing.len(),
            attempts = entry.attempts,
            "orphan parked"
        );
        inner.link(entry);
    }

    /// Removes an orphan, unlinking it from the parent index.
    pub fn remove(&self, txid: &Txid) -> Option<OrphanEntry> {
        self.inner.write().unlink(txid)
    }

    /// Evicts every orphan resident past the retention window.
    ///
    /// Returns the number of evicted entries. Callers drive this on
    /// access; the pool runs no timers of its own.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.expiry_secs);
        let mut inner = self.inner.write();

        let expired: Vec<Txid> = inner
            .by_age
            .iter()
            .take_while(|(first_seen, _)| *first_seen <= cutoff)
            .map(|(_, txid)| *txid)
            .collect();

        let count = expired.len();
        for txid in expired {
            inner.unlink(&txid);
            trace!(txid = %txid, "orphan evicted by age");
        }
        if count > 0 {
            debug!(count, "expired orphans swept");
        }
        count
    }

    /// Orphans waiting on the given parent, oldest first.
    pub fn waiting_on(&self, parent: &Txid) -> Vec<Txid> {
        let inner = self.inner.read();
        let waiting = match inner.by_parent.get(parent) {
            Some(waiting) => waiting,
            None => return Vec::new(),
        };
        let mut ordered: Vec<(u64, Txid)> = waiting
            .iter()
            .filter_map(|txid| inner.by_txid.get(txid).map(|e| (e.first_seen, *txid)))
            .collect();
        ordered.sort_unstable();
        ordered.into_iter().map(|(_, txid)| txid).collect()
    }

    /// Whether the identifier is currently parked here.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.inner.read().by_txid.contains_key(txid)
    }

    /// Returns a copy of the orphan entry, if parked.
    pub fn get(&self, txid: &Txid) -> Option<OrphanEntry> {
        self.inner.read().by_txid.get(txid).cloned()
    }

    /// Resident orphan identifiers, oldest first.
    pub fn txids(&self) -> Vec<Txid> {
        self.inner
            .read()
            .by_age
            .iter()
            .map(|(_, txid)| *txid)
            .collect()
    }

    /// Copies the current entries out, oldest first.
    ///
    /// The lock is held only for the copy; callers encode and write
    /// without it.
    pub fn snapshot_entries(&self) -> Vec<OrphanEntry> {
        let inner = self.inner.read();
        inner
            .by_age
            .iter()
            .filter_map(|(_, txid)| inner.by_txid.get(txid).cloned())
            .collect()
    }

    /// Number of resident orphans.
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

    /// Observable counters for callers and tests.
    pub fn info(&self) -> OrphanPoolInfo {
        let inner = self.inner.read();
        OrphanPoolInfo {
            size: inner.by_txid.len(),
            bytes: inner.total_bytes,
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_txid.clear();
        inner.by_age.clear();
        inner.by_parent.clear();
        inner.total_bytes = 0;
    }
}

/// Observable orphan pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanPoolInfo {
    /// Number of resident orphans
    pub size: usize,
    /// Total canonical bytes held
    pub bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use embercore_types::{OutPoint, TxInput, TxOutput};

    fn orphan(tag: u8, parent: Txid, first_seen: u64) -> OrphanEntry {
        let tx = Transaction::new(
            vec![TxInput::new(OutPoint::new(parent, 0), vec![tag])],
            vec![TxOutput::new(1_000, vec![0xAA])],
        );
        let mut missing = BTreeSet::new();
        missing.insert(parent);
        OrphanEntry::new(tx, missing, first_seen, 1)
    }

    #[test]
    fn test_insert_and_parent_index() {
        let pool = OrphanPool::new(10, 3600);
        let parent = Txid::keccak256(b"parent");
        let entry = orphan(1, parent, 100);
        let txid = entry.txid;
        pool.insert(entry);

        assert!(pool.contains(&txid));
        assert_eq!(pool.waiting_on(&parent), vec![txid]);
        assert_eq!(pool.waiting_on(&Txid::keccak256(b"other")), Vec::<Txid>::new());
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let pool = OrphanPool::new(3, 3600);
        let parent = Txid::keccak256(b"parent");

        let ids: Vec<Txid> = (0..4u8)
            .map(|i| {
                let entry = orphan(i, parent, 100 + i as u64);
                let txid = entry.txid;
                pool.insert(entry);
                txid
            })
            .collect();

        // Fourth insert pushed out the oldest (first) entry
        assert_eq!(pool.len(), 3);
        assert!(!pool.contains(&ids[0]));
        assert!(pool.contains(&ids[1]));
        assert!(pool.contains(&ids[3]));

        // Parent index dropped the evicted waiter too
        assert!(!pool.waiting_on(&parent).contains(&ids[0]));
    }

    #[test]
    fn test_sweep_evicts_by_age_under_capacity() {
        let pool = OrphanPool::new(100, 600);
        let parent = Txid::keccak256(b"parent");
        let old = orphan(1, parent, 1_000);
        let fresh = orphan(2, parent, 1_500);
        let old_id = old.txid;
        let fresh_id = fresh.txid;
        pool.insert(old);
        pool.insert(fresh);

        // At 1_599 nothing has been resident for the full window
        assert_eq!(pool.sweep_expired(1_599), 0);
        assert_eq!(pool.len(), 2);

        // At 1_600 the older entry has aged out
        assert_eq!(pool.sweep_expired(1_600), 1);
        assert!(!pool.contains(&old_id));
        assert!(pool.contains(&fresh_id));
    }

    #[test]
    fn test_replacement_keeps_single_entry() {
        let pool = OrphanPool::new(10, 3600);
        let parent = Txid::keccak256(b"parent");
        let entry = orphan(1, parent, 100);
        let txid = entry.txid;
        let mut retry = entry.clone();
        retry.attempts = 2;

        pool.insert(entry);
        pool.insert(retry);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&txid).unwrap().attempts, 2);
        assert_eq!(pool.waiting_on(&parent), vec![txid]);
    }

    #[test]
    fn test_info_matches_live_set() {
        let pool = OrphanPool::new(10, 3600);
        let parent = Txid::keccak256(b"parent");
        let a = orphan(1, parent, 100);
        let b = orphan(2, parent, 101);
        let (a_id, a_size, b_size) = (a.txid, a.size, b.size);
        pool.insert(a);
        pool.insert(b);

        assert_eq!(
            pool.info(),
            OrphanPoolInfo {
                size: 2,
                bytes: a_size + b_size
            }
        );

        pool.remove(&a_id).unwrap();
        let info = pool.info();
        assert_eq!(info.size, 1);
        assert_eq!(info.bytes, b_size);
        assert_eq!(pool.txids().len(), 1);
    }

    #[test]
    fn test_info_serde_shape() {
        let info = OrphanPoolInfo { size: 3, bytes: 420 };
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"size":3,"bytes":420}"#);
    }

    #[test]
    fn test_zero_capacity_disables_pool() {
        let pool = OrphanPool::new(0, 3600);
        pool.insert(orphan(1, Txid::keccak256(b"parent"), 100));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_snapshot_is_oldest_first() {
        let pool = OrphanPool::new(10, 3600);
        let parent = Txid::keccak256(b"parent");
        // Inserted out of age order on purpose
        let newer = orphan(1, parent, 300);
        let older = orphan(2, parent, 200);
        let newer_id = newer.txid;
        let older_id = older.txid;
        pool.insert(newer);
        pool.insert(older);

        let order: Vec<Txid> = pool.snapshot_entries().iter().map(|e| e.txid).collect();
        assert_eq!(order, vec![older_id, newer_id]);
    }
}
