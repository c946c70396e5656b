//! # Ember Core Types
//!
//! Core type definitions for the Ember Core node.
//!
//! This crate provides the fundamental types used throughout Ember Core:
//! - [`Txid`] - 32-byte transaction identifiers
//! - [`OutPoint`] - references to a specific output of a prior transaction
//! - [`Transaction`] - the UTXO transaction structure with its RLP wire form
//!
//! ## Example
//!
//! ```rust
//! use embercore_types::{Transaction, Txid};
//!
//! let tx = Transaction::default();
//! let id = tx.txid();
//!
//! // Identifiers round-trip through hex
//! let parsed: Txid = id.to_hex().parse().unwrap();
//! assert_eq!(parsed, id);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod transaction;
pub mod txid;

// Re-export main types at crate root
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
pub use txid::Txid;

/// Result type alias for Ember Core types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with Ember Core types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid hex string
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid length for a fixed-size type
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Invalid transaction identifier format
    #[error("invalid txid format: {0}")]
    InvalidTxid(String),

    /// Invalid transaction
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// RLP decoding error
    #[error("RLP decode error: {0}")]
    RlpDecode(#[from] rlp::DecoderError),
}
