//! Best-effort snapshot restore.
//!
//! Loading is forgiving where dumping is strict: a missing file means a
//! clean start, and an unreadable or structurally invalid file is logged
//! and skipped rather than failing startup. Entries that do decode are
//! pushed through the normal admission path one by one, in file order, so
//! a parent admitted from the snapshot can carry its children in the same
//! pass. Whatever validation rejects is dropped.

use std::fs;
use std::io;
use std::path::Path;

use embercore_mempool::{ChainView, PoolService};
use embercore_types::Transaction;
use tracing::{info, trace, warn};

use crate::codec::{decode_snapshot, MempoolRecord, OrphanRecord, SnapshotRecord};

/// Outcome of restoring one snapshot file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Entries retained after resubmission, in either pool
    pub restored: usize,
    /// Entries rejected by re-validation
    pub dropped: usize,
}

/// Restores the transaction pool from the snapshot at `path`.
///
/// Never fails: problems reading or decoding the file leave the pools
/// untouched and report zero restored entries.
pub fn load_tx_pool<C: ChainView>(service: &PoolService<C>, path: &Path) -> LoadStats {
    restore::<C, MempoolRecord>(service, path)
}

/// Restores the orphan pool from the snapshot at `path`.
///
/// Orphans whose parents have appeared since the dump are promoted
/// straight into the transaction pool; both outcomes count as restored.
pub fn load_orphan_pool<C: ChainView>(service: &PoolService<C>, path: &Path) -> LoadStats {
    restore::<C, OrphanRecord>(service, path)
}

fn restore<C: ChainView, R: SnapshotRecord>(service: &PoolService<C>, path: &Path) -> LoadStats {
    let records: Vec<R> = match read_records(path) {
        Some(records) => records,
        None => return LoadStats::default(),
    };

    let total = records.len();
    let mut stats = LoadStats::default();
    for record in records {
        // The codec already proved these bytes parse; a failure here means
        // the entry is unusable, so it is dropped like any other reject
        let tx = match Transaction::rlp_decode(record.raw_tx()) {
            Ok(tx) => tx,
            Err(err) => {
                trace!("dropping undecodable snapshot entry: {}", err);
                stats.dropped += 1;
                continue;
            }
        };
        match service.submit_restored(tx, record.stamp()) {
            Ok(_) => stats.restored += 1,
            Err(err) => {
                trace!("dropping snapshot entry on resubmission: {}", err);
                stats.dropped += 1;
            }
        }
    }

    info!(
        "restored {} of {} {} snapshot entries from {} ({} dropped)",
        stats.restored,
        total,
        R::KIND,
        path.display(),
        stats.dropped
    );
    stats
}

/// Reads and decodes one snapshot file, mapping every failure to `None`.
fn read_records<R: SnapshotRecord>(path: &Path) -> Option<Vec<R>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("no {} snapshot at {}", R::KIND, path.display());
            return None;
        }
        Err(err) => {
            warn!(
                "unable to read {} snapshot from {}: {}",
                R::KIND,
                path.display(),
                err
            );
            return None;
        }
    };

    match decode_snapshot::<R>(&data) {
        Ok(records) => Some(records),
        Err(err) => {
            warn!(
                "ignoring invalid {} snapshot at {}: {}",
                R::KIND,
                path.display(),
                err
            );
            None
        }
    }
}
