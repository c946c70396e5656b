//! Persistence lifecycle orchestration.
//!
//! The controller ties pool persistence to the node lifecycle: restore at
//! startup, dump at shutdown, plus on-demand dumps for operator tooling.
//! The persistence switch gates only the automatic paths. When it is off
//! the controller performs no file I/O at all, so snapshots from an
//! earlier run stay on disk untouched and load again once the switch
//! comes back on. On-demand dumps run regardless of the switch.

use std::path::PathBuf;
use std::sync::Arc;

use embercore_mempool::{ChainView, PoolService};
use tracing::{error, info};

use crate::codec::{MempoolRecord, OrphanRecord, PoolKind};
use crate::loader::{self, LoadStats};
use crate::writer::write_snapshot;
use crate::Result;

/// Snapshot persistence for both pools of one node
pub struct PersistenceController<C: ChainView> {
    /// Pool service fed at restore and drained at dump
    service: Arc<PoolService<C>>,
    /// Directory holding the snapshot files
    data_dir: PathBuf,
    /// Whether automatic startup/shutdown persistence is on
    enabled: bool,
}

impl<C: ChainView> PersistenceController<C> {
    /// Creates a controller over `data_dir`.
    ///
    /// The directory is expected to exist; the controller never creates
    /// or deletes anything besides the snapshot files themselves.
    pub fn new(service: Arc<PoolService<C>>, data_dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            service,
            data_dir: data_dir.into(),
            enabled,
        }
    }

    /// Whether automatic startup/shutdown persistence is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Path of the snapshot file for one pool.
    pub fn snapshot_path(&self, kind: PoolKind) -> PathBuf {
        self.data_dir.join(kind.filename())
    }

    /// Restores both pools at startup.
    ///
    /// The transaction pool loads first so that restored parents are
    /// visible when the orphan snapshot replays; an orphan whose parents
    /// are all present promotes immediately. Returns the mempool and
    /// orphan pool stats in that order. With persistence off this is a
    /// no-op reporting zero entries.
    pub fn on_startup(&self) -> (LoadStats, LoadStats) {
        if !self.enabled {
            info!("pool persistence disabled, skipping snapshot load");
            return (LoadStats::default(), LoadStats::default());
        }

        let mempool = loader::load_tx_pool(&self.service, &self.snapshot_path(PoolKind::Mempool));
        let orphans =
            loader::load_orphan_pool(&self.service, &self.snapshot_path(PoolKind::Orphans));
        (mempool, orphans)
    }

    /// Dumps both pools at shutdown.
    ///
    /// Dump failures are logged and shutdown proceeds; a node must not
    /// hang on a full disk. With persistence off this is a no-op and any
    /// existing snapshot files are left untouched.
    pub fn on_shutdown(&self) {
        if !self.enabled {
            info!("pool persistence disabled, skipping snapshot dump");
            return;
        }

        if let Err(err) = self.dump_tx_pool() {
            error!("mempool dump failed at shutdown: {}", err);
        }
        if let Err(err) = self.dump_orphan_pool() {
            error!("orphanpool dump failed at shutdown: {}", err);
        }
    }

    /// Dumps the transaction pool now, regardless of the persistence
    /// switch. Errors propagate to the caller unchanged.
    pub fn dump_tx_pool(&self) -> Result<()> {
        let records: Vec<MempoolRecord> = self
            .service
            .snapshot_pool()
            .iter()
            .map(MempoolRecord::from_entry)
            .collect();
        write_snapshot(&records, &self.snapshot_path(PoolKind::Mempool))
    }

    /// Dumps the orphan pool now, regardless of the persistence switch.
    /// Errors propagate to the caller unchanged.
    pub fn dump_orphan_pool(&self) -> Result<()> {
        let records: Vec<OrphanRecord> = self
            .service
            .snapshot_orphans()
            .iter()
            .map(OrphanRecord::from_entry)
            .collect();
        write_snapshot(&records, &self.snapshot_path(PoolKind::Orphans))
    }
}
