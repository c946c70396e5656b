//! UTXO transaction types.
//!
//! This module provides the transaction structures for Ember Core:
//! - [`Transaction`] - the core transaction: inputs spending prior outputs,
//!   outputs creating new spendable value
//! - [`TxInput`] / [`TxOutput`] - the two sides of a transfer
//! - [`OutPoint`] - a `(txid, vout)` reference to a prior output
//!
//! The canonical wire form is RLP; [`Transaction::txid`] is the Keccak256
//! digest of that encoding.

use crate::{Error, Result, Txid};
use bytes::Bytes;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use std::fmt;

/// Reference to a specific output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    /// Identifier of the transaction carrying the output.
    pub txid: Txid,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    /// Creates a new outpoint.
    pub const fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl Encodable for OutPoint {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.txid);
        s.append(&self.vout);
    }
}

impl Decodable for OutPoint {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            txid: rlp.val_at(0)?,
            vout: rlp.val_at(1)?,
        })
    }
}

/// A transaction input, consuming one prior output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// The output being spent.
    pub prevout: OutPoint,
    /// Unlocking payload satisfying the spent output's script.
    pub unlock: Bytes,
}

impl TxInput {
    /// Creates a new input spending `prevout`.
    pub fn new(prevout: OutPoint, unlock: impl Into<Bytes>) -> Self {
        Self {
            prevout,
            unlock: unlock.into(),
        }
    }
}

impl Encodable for TxInput {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.prevout);
        s.append(&self.unlock.as_ref());
    }
}

impl Decodable for TxInput {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let unlock: Vec<u8> = rlp.val_at(1)?;
        Ok(Self {
            prevout: rlp.val_at(0)?,
            unlock: Bytes::from(unlock),
        })
    }
}

/// A transaction output, creating new spendable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Amount carried by the output, in base units.
    pub value: u64,
    /// Locking script guarding the output.
    pub script: Bytes,
}

impl TxOutput {
    /// Creates a new output of `value` base units.
    pub fn new(value: u64, script: impl Into<Bytes>) -> Self {
        Self {
            value,
            script: script.into(),
        }
    }
}

impl Encodable for TxOutput {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.value);
        s.append(&self.script.as_ref());
    }
}

impl Decodable for TxOutput {
    fn decode(rlp: &Rlp<'_>) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let script: Vec<u8> = rlp.val_at(1)?;
        Ok(Self {
            value: rlp.val_at(0)?,
            script: Bytes::from(script),
        })
    }
}

/// A UTXO transaction.
///
/// Each input names the output it spends by [`OutPoint`]; the difference
/// between total input value and total output value is the fee. The
/// structure carries no signatures of its own - unlocking payloads live in
/// the inputs and are opaque to this crate.
///
/// # Example
///
/// ```rust
/// use embercore_types::{OutPoint, Transaction, TxInput, TxOutput, Txid};
///
/// let parent = Txid::keccak256(b"parent");
/// let tx = Transaction::new(
///     vec![TxInput::new(OutPoint::new(parent, 0), vec![1, 2, 3])],
///     vec![TxOutput::new(50_000, vec![0xAA])],
/// );
///
/// let bytes = tx.rlp_encode();
/// let decoded = Transaction::rlp_decode(&bytes).unwrap();
/// assert_eq!(decoded.txid(), tx.txid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Format version.
    pub version: u32,
    /// Outputs consumed by this transaction.
    pub inputs: Vec<TxInput>,
    /// Outputs created by this transaction.
    pub outputs: Vec<TxOutput>,
    /// Earliest point the transaction may confirm (0 = immediately).
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }
}

impl Transaction {
    /// Creates a version-1 transaction with the given inputs and outputs.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Returns the transaction identifier.
    ///
    /// The identifier is the Keccak256 digest of the RLP encoding, so any
    /// change to the transaction changes its identifier.
    pub fn txid(&self) -> Txid {
        Txid::keccak256(&self.rlp_encode())
    }

    /// RLP encodes the transaction into its canonical wire form.
    pub fn rlp_encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.version);

        stream.begin_list(self.inputs.len());
        for input in &self.inputs {
            stream.append(input);
        }

        stream.begin_list(self.outputs.len());
        for output in &self.outputs {
            stream.append(output);
        }

        stream.append(&self.lock_time);
        stream.out().to_vec()
    }

    /// Decodes a transaction from its canonical wire form.
    ///
    /// Only structural well-formedness is checked here; whether the inputs
    /// resolve or the fee is acceptable is the pool's concern.
    pub fn rlp_decode(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidTransaction("empty transaction bytes".into()));
        }

        let rlp = Rlp::new(data);
        if rlp.item_count()? != 4 {
            return Err(Error::InvalidTransaction("invalid RLP item count".into()));
        }

        Ok(Self {
            version: rlp.val_at(0).map_err(Error::RlpDecode)?,
            inputs: rlp.list_at(1).map_err(Error::RlpDecode)?,
            outputs: rlp.list_at(2).map_err(Error::RlpDecode)?,
            lock_time: rlp.val_at(3).map_err(Error::RlpDecode)?,
        })
    }

    /// Returns the size of the canonical encoding in bytes.
    pub fn encoded_size(&self) -> usize {
        self.rlp_encode().len()
    }

    /// Returns the sum of output values, saturating at `u64::MAX`.
    pub fn total_output_value(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, out| acc.saturating_add(out.value))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx {} ({} in, {} out, {} bytes)",
            self.txid(),
            self.inputs.len(),
            self.outputs.len(),
            self.encoded_size()
        )
    }
}
