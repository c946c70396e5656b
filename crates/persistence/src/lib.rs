//! # Ember Core Persistence
//!
//! Pool snapshot persistence for the Ember Core node:
//!
//! - **Codec**: versioned, checksummed snapshot format shared by both pools
//! - **Writer**: atomic dump to disk (temp file, fsync, rename)
//! - **Loader**: best-effort restore through the normal admission path
//! - **Controller**: startup/shutdown orchestration and on-demand dumps
//!
//! A snapshot captures one pool at a point in time. The transaction pool
//! and the orphan pool each get their own file (`mempool.dat` and
//! `orphanpool.dat`) so a damaged file costs at most one pool's contents.
//! Decoding is all-or-nothing: a snapshot that fails any structural check
//! restores nothing, and the node carries on with empty pools.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod controller;
pub mod loader;
pub mod writer;

// Re-exports for convenience
pub use codec::{
    decode_snapshot, encode_snapshot, MempoolRecord, OrphanRecord, PoolKind, SnapshotRecord,
};
pub use controller::PersistenceController;
pub use loader::{load_orphan_pool, load_tx_pool, LoadStats};
pub use writer::write_snapshot;

use thiserror::Error;

/// Snapshot error types
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot bytes are structurally invalid or of an unsupported version
    #[error("Invalid snapshot: {message}")]
    Format {
        /// What failed to parse
        message: String,
    },

    /// Snapshot file could not be created, written, renamed or read
    #[error("{message}: {source}")]
    Io {
        /// Operation context, e.g. `Unable to dump mempool to disk`
        message: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Record serialization failed while encoding a snapshot
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl SnapshotError {
    /// Builds a [`SnapshotError::Format`] from any message.
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }
}

/// Result type for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;
