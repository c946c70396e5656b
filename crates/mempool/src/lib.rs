//! # Ember Core Mempool
//!
//! Transaction pool implementation for the Ember Core node.
//!
//! This crate provides the two in-memory transaction collections and the
//! single admission path feeding them:
//! - Validates transactions against pool and chain state before acceptance
//! - Tracks which pooled transaction spends which outpoint to reject
//!   double spends
//! - Parks transactions with unresolved inputs in a bounded orphan pool
//! - Promotes orphans as their parents arrive or confirm
//! - Evicts orphans oldest-first at capacity and sweeps out over-age ones
//!
//! ## Architecture
//!
//! The crate maintains two pools behind one coordinator:
//! - **Transaction pool**: transactions whose inputs all resolve and whose
//!   fee clears the relay floor
//! - **Orphan pool**: transactions waiting for missing parents, or held
//!   back by the unconfirmed-ancestor depth limit
//!
//! All admission - fresh from the network, restored from disk, or retried
//! during promotion - flows through [`PoolService::submit`] and its
//! internals, so pool invariants hold identically on every path.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use embercore_mempool::{MockChainView, PoolLimits, PoolService, Submission};
//! use embercore_types::{OutPoint, Transaction, TxInput, TxOutput, Txid};
//!
//! let chain = Arc::new(MockChainView::new());
//! let service = PoolService::new(PoolLimits::default(), Arc::clone(&chain));
//!
//! // Fund an output, then spend it
//! let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
//! chain.add_utxo(funding, 100_000);
//!
//! let tx = Transaction::new(
//!     vec![TxInput::new(funding, vec![])],
//!     vec![TxOutput::new(90_000, vec![0xAA])],
//! );
//! let outcome = service.submit(tx).unwrap();
//! assert!(matches!(outcome, Submission::Admitted(_)));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod orphans;
pub mod pool;
pub mod service;
pub mod validation;

// Re-export main types at crate root
pub use orphans::{OrphanEntry, OrphanPool, OrphanPoolInfo};
pub use pool::{PoolEntry, PoolStats, TxPool};
pub use service::{PoolService, Submission};
pub use validation::{
    Admission, ChainView, MockChainView, OrphanCause, PoolLimits, TxValidator, ValidationError,
    Verdict,
};

/// Result type alias for mempool operations
pub type Result<T> = std::result::Result<T, MempoolError>;

/// Errors that can occur in mempool operations
#[derive(Debug, thiserror::Error)]
pub enum MempoolError {
    /// Transaction already exists in the pool
    #[error("transaction already exists in pool")]
    AlreadyExists,

    /// Transaction validation failed
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Pool byte budget is exhausted
    #[error("transaction pool is full")]
    PoolFull,

    /// Orphan transaction held past the retention window
    #[error("orphan transaction expired")]
    Expired,
}
