//! Pool coordinator: the single admission doorway.
//!
//! [`PoolService`] owns the transaction pool, the orphan pool and the
//! validator. Every transaction enters through [`PoolService::submit`] or
//! [`PoolService::submit_restored`]; promotion retries run through the
//! same internals, so the pools' invariants hold identically on every
//! path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use embercore_types::{Transaction, Txid};
use tracing::{debug, trace};

use crate::orphans::{OrphanEntry, OrphanPool, OrphanPoolInfo};
use crate::pool::{PoolEntry, PoolStats, TxPool};
use crate::validation::{ChainView, PoolLimits, TxValidator, Verdict};
use crate::{MempoolError, Result};

/// Where a submitted transaction ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Entered the transaction pool
    Admitted(Txid),
    /// Parked in the orphan pool pending parents
    Orphaned(Txid),
}

impl Submission {
    /// The identifier of the submitted transaction.
    pub fn txid(&self) -> Txid {
        match self {
            Self::Admitted(txid) | Self::Orphaned(txid) => *txid,
        }
    }
}

/// Coordinator owning both pools and the admission path.
pub struct PoolService<C: ChainView> {
    /// Admitted transactions
    pool: TxPool,
    /// Dependency-incomplete transactions
    orphans: OrphanPool,
    /// Admission validator
    validator: TxValidator<C>,
    /// Policy limits
    limits: PoolLimits,
}

impl<C: ChainView> PoolService<C> {
    /// Creates a service with empty pools.
    pub fn new(limits: PoolLimits, chain: Arc<C>) -> Self {
        Self {
            pool: TxPool::new(limits.max_pool_bytes),
            orphans: OrphanPool::new(limits.max_orphan_entries, limits.orphan_expiry_secs),
            validator: TxValidator::new(limits.clone(), chain),
            limits,
        }
    }

    /// Submits a freshly received transaction.
    ///
    /// The transaction is validated and either admitted to the pool or
    /// parked as an orphan. Admission immediately re-attempts any orphans
    /// waiting on the new entry.
    pub fn submit(&self, tx: Transaction) -> Result<Submission> {
        let now = unix_now();
        self.orphans.sweep_expired(now);

        let outcome = self.resolve(tx, now, 1)?;
        if let Submission::Admitted(txid) = outcome {
            self.promote_waiting(txid);
        }
        Ok(outcome)
    }

    /// Submits a transaction restored from a snapshot.
    ///
    /// Identical to [`PoolService::submit`] except that `stamp` - the
    /// timestamp persisted with the entry - is kept as the admission or
    /// first-seen time, so pool ages survive a restart. An orphan whose
    /// stamp already falls outside the retention window is not restored.
    pub fn submit_restored(&self, tx: Transaction, stamp: u64) -> Result<Submission> {
        let outcome = self.resolve(tx, stamp, 1)?;
        if let Submission::Admitted(txid) = outcome {
            self.promote_waiting(txid);
        }
        Ok(outcome)
    }

    /// Validates and places one transaction. `stamp` becomes the entry's
    /// admission or first-seen time.
    fn resolve(&self, tx: Transaction, stamp: u64, attempts: u32) -> Result<Submission> {
        let txid = tx.txid();
        match self.validator.validate(&tx, &self.pool)? {
            Verdict::Admit(admission) => {
                let entry = PoolEntry::new(
                    tx,
                    stamp,
                    admission.fee,
                    admission.ancestor_count,
                    admission.ancestor_size,
                );
                self.pool.insert(entry)?;
                Ok(Submission::Admitted(txid))
            }
            Verdict::Orphan(cause) => {
                if unix_now().saturating_sub(stamp) >= self.limits.orphan_expiry_secs {
                    return Err(MempoolError::Expired);
                }
                let entry = OrphanEntry::new(tx, cause.waiting_on, stamp, attempts);
                self.orphans.insert(entry);
                Ok(Submission::Orphaned(txid))
            }
        }
    }

    /// Re-attempts orphans waiting on `parent`, cascading through any
    /// further admissions.
    fn promote_waiting(&self, parent: Txid) {
        let mut worklist: VecDeque<Txid> = self.orphans.waiting_on(&parent).into();

        while let Some(candidate) = worklist.pop_front() {
            let orphan = match self.orphans.remove(&candidate) {
                Some(orphan) => orphan,
                None => continue,
            };

            match self.resolve(orphan.tx, orphan.first_seen, orphan.attempts + 1) {
                Ok(Submission::Admitted(txid)) => {
                    debug!(txid = %txid, "orphan promoted into pool");
                    for waiter in self.orphans.waiting_on(&txid) {
                        worklist.push_back(waiter);
                    }
                }
                Ok(Submission::Orphaned(txid)) => {
                    trace!(txid = %txid, "orphan re-parked, parents still missing");
                }
                Err(err) => {
                    debug!(txid = %candidate, error = %err, "orphan dropped during promotion");
                }
            }
        }
    }

    /// Drops confirmed transactions from the pool and re-attempts orphans
    /// waiting on them.
    ///
    /// Called when a block connects. Children of the removed entries stay
    /// pooled; their inputs now resolve through the chain view.
    pub fn remove_confirmed(&self, txids: &[Txid]) {
        for txid in txids {
            if self.pool.remove(txid).is_some() {
                debug!(txid = %txid, "confirmed transaction removed from pool");
            }
        }
        for txid in txids {
            self.promote_waiting(*txid);
        }
    }

    /// Evicts orphans resident past the retention window.
    pub fn sweep_orphans(&self, now: u64) -> usize {
        self.orphans.sweep_expired(now)
    }

    /// Transaction pool counters.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Orphan pool counters.
    pub fn orphan_info(&self) -> OrphanPoolInfo {
        self.orphans.info()
    }

    /// Resident orphan identifiers, oldest first.
    pub fn orphan_txids(&self) -> Vec<Txid> {
        self.orphans.txids()
    }

    /// Whether the identifier is in the transaction pool.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.pool.contains(txid)
    }

    /// Whether the identifier is parked in the orphan pool.
    pub fn orphan_contains(&self, txid: &Txid) -> bool {
        self.orphans.contains(txid)
    }

    /// Copy of a pooled entry.
    pub fn get(&self, txid: &Txid) -> Option<PoolEntry> {
        self.pool.get(txid)
    }

    /// Copy of a parked orphan entry.
    pub fn orphan_get(&self, txid: &Txid) -> Option<OrphanEntry> {
        self.orphans.get(txid)
    }

    /// Consistent copy of the transaction pool, admission-ordered.
    pub fn snapshot_pool(&self) -> Vec<PoolEntry> {
        self.pool.snapshot_entries()
    }

    /// Consistent copy of the orphan pool, oldest first.
    pub fn snapshot_orphans(&self) -> Vec<OrphanEntry> {
        self.orphans.snapshot_entries()
    }
}

/// Seconds since the Unix epoch.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
