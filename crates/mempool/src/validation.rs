//! Transaction validation for pool admission.
//!
//! This module decides what happens to a submitted transaction:
//! - Structural sanity (inputs and outputs present, no duplicate prevouts,
//!   size within bounds)
//! - Duplicate detection against pool and chain
//! - Input resolution against pooled parents and the confirmed UTXO set
//! - Fee and unconfirmed-ancestor depth policy
//!
//! The outcome is a [`Verdict`]: admit with computed metadata, or park as
//! an orphan with the parent set to wait on. Outright failures are
//! [`ValidationError`]s.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use embercore_types::{OutPoint, Transaction, Txid};
use tracing::{debug, trace};

use crate::pool::TxPool;

/// Pool limit configuration
#[derive(Debug, Clone)]
pub struct PoolLimits {
    /// Byte budget for the transaction pool
    pub max_pool_bytes: usize,
    /// Maximum size of a single transaction in bytes
    pub max_tx_size: usize,
    /// Maximum number of entries in the orphan pool
    pub max_orphan_entries: usize,
    /// Seconds an orphan may stay resident before it is swept out
    pub orphan_expiry_secs: u64,
    /// Unconfirmed-ancestor depth beyond which a transaction is held back
    /// as an orphan instead of admitted
    pub max_ancestor_depth: u32,
    /// Minimum fee for admission, in base units
    pub min_relay_fee: u64,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_pool_bytes: 300_000_000, // 300 MB
            max_tx_size: 1_000_000,      // 1 MB
            max_orphan_entries: 100,
            orphan_expiry_secs: 259_200, // 72 hours
            max_ancestor_depth: 50,
            min_relay_fee: 0,
        }
    }
}

/// Errors that make a transaction inadmissible outright
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    /// Transaction spends nothing
    #[error("transaction has no inputs")]
    NoInputs,

    /// Transaction creates nothing
    #[error("transaction has no outputs")]
    NoOutputs,

    /// The same outpoint appears twice within one transaction
    #[error("duplicate prevout within transaction: {0}")]
    DuplicatePrevout(OutPoint),

    /// Transaction exceeds the single-transaction size bound
    #[error("transaction too large: max {max} bytes, got {actual} bytes")]
    TransactionTooLarge {
        /// Maximum allowed size
        max: usize,
        /// Actual size
        actual: usize,
    },

    /// Transaction is already in the pool
    #[error("transaction already in pool: {0}")]
    AlreadyPooled(Txid),

    /// Transaction is already confirmed in the chain
    #[error("transaction already confirmed: {0}")]
    AlreadyConfirmed(Txid),

    /// Another pooled transaction spends the same outpoint
    #[error("outpoint {outpoint} already spent by pooled transaction {spender}")]
    DoubleSpend {
        /// The contested outpoint
        outpoint: OutPoint,
        /// The pooled transaction spending it
        spender: Txid,
    },

    /// A pooled parent exists but the referenced output index does not
    #[error("referenced output does not exist: {0}")]
    MissingOutput(OutPoint),

    /// The referenced output was consumed by a confirmed transaction
    #[error("input already spent in chain: {0}")]
    InputSpent(OutPoint),

    /// Outputs exceed inputs
    #[error("outputs exceed inputs: inputs {inputs}, outputs {outputs}")]
    NegativeFee {
        /// Total resolved input value
        inputs: u64,
        /// Total output value
        outputs: u64,
    },

    /// Fee below the relay floor
    #[error("fee too low: min {min}, got {actual}")]
    FeeTooLow {
        /// Minimum required fee
        min: u64,
        /// Actual fee
        actual: u64,
    },
}

/// Outcome of admission validation
#[derive(Debug, Clone)]
pub enum Verdict {
    /// The transaction can enter the pool now
    Admit(Admission),
    /// The transaction cannot be resolved yet and belongs in the orphan pool
    Orphan(OrphanCause),
}

/// Metadata computed for an admissible transaction
#[derive(Debug, Clone)]
pub struct Admission {
    /// Fee paid (inputs minus outputs), in base units
    pub fee: u64,
    /// Depth of the longest unconfirmed ancestor chain, this entry included
    pub ancestor_count: u32,
    /// Bytes along that ancestor chain, this entry included
    pub ancestor_size: u64,
    /// Canonical encoding size in bytes
    pub size: usize,
}

/// Why a transaction must wait in the orphan pool
#[derive(Debug, Clone)]
pub struct OrphanCause {
    /// Parent identifiers that must appear before another attempt
    pub waiting_on: BTreeSet<Txid>,
    /// Held back by the ancestor depth limit rather than a missing parent
    pub depth_limited: bool,
}

/// Chain state provider for admission checks
///
/// The narrow interface to the node's confirmed chain state. Admission
/// only needs to resolve outputs and recognize confirmed transactions;
/// everything else about the chain stays outside this crate.
pub trait ChainView: Send + Sync {
    /// Value of an unspent confirmed output, if it exists
    fn utxo_value(&self, outpoint: &OutPoint) -> Option<u64>;

    /// Whether the transaction is already confirmed in the chain
    fn tx_confirmed(&self, txid: &Txid) -> bool;
}

/// Mock chain view for tests and restoration drills
#[derive(Default)]
pub struct MockChainView {
    utxos: parking_lot::RwLock<std::collections::HashMap<OutPoint, u64>>,
    confirmed: parking_lot::RwLock<HashSet<Txid>>,
}

impl MockChainView {
    /// Creates an empty mock chain view
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spendable confirmed output
    pub fn add_utxo(&self, outpoint: OutPoint, value: u64) {
        self.utxos.write().insert(outpoint, value);
    }

    /// Marks a transaction confirmed: its outputs become spendable and the
    /// outputs it consumed disappear from the UTXO set
    pub fn confirm(&self, tx: &Transaction) {
        let txid = tx.txid();
        self.confirmed.write().insert(txid);
        let mut utxos = self.utxos.write();
        for (vout, output) in tx.outputs.iter().enumerate() {
            utxos.insert(OutPoint::new(txid, vout as u32), output.value);
        }
        for input in &tx.inputs {
            utxos.remove(&input.prevout);
        }
    }
}

impl ChainView for MockChainView {
    fn utxo_value(&self, outpoint: &OutPoint) -> Option<u64> {
        self.utxos.read().get(outpoint).copied()
    }

    fn tx_confirmed(&self, txid: &Txid) -> bool {
        self.confirmed.read().contains(txid)
    }
}

/// Resolved input state for one transaction
#[derive(Debug, Default)]
struct Resolution {
    /// Total value of the resolved inputs
    input_total: u64,
    /// Distinct in-pool parents
    parents: BTreeSet<Txid>,
    /// Parents visible nowhere
    missing: BTreeSet<Txid>,
}

/// Admission validator
///
/// Decides, for one transaction against current pool and chain state,
/// whether it is admissible, an orphan, or invalid.
pub struct TxValidator<C: ChainView> {
    /// Policy limits
    limits: PoolLimits,
    /// Chain state provider
    chain: Arc<C>,
}

impl<C: ChainView> TxValidator<C> {
    /// Creates a new validator
    pub fn new(limits: PoolLimits, chain: Arc<C>) -> Self {
        Self { limits, chain }
    }

    /// Validates a transaction for admission
    ///
    /// Checks run in order:
    /// 1. Structural sanity and size
    /// 2. Duplicate detection (pool, chain)
    /// 3. Input resolution and double-spend detection
    /// 4. Fee policy
    /// 5. Unconfirmed-ancestor depth policy
    pub fn validate(&self, tx: &Transaction, pool: &TxPool) -> Result<Verdict, ValidationError> {
        let txid = tx.txid();
        trace!(txid = %txid, "validating transaction");

        let size = self.validate_structure(tx)?;

        if pool.contains(&txid) {
            return Err(ValidationError::AlreadyPooled(txid));
        }
        if self.chain.tx_confirmed(&txid) {
            return Err(ValidationError::AlreadyConfirmed(txid));
        }

        let resolution = self.resolve_inputs(tx, pool)?;
        if !resolution.missing.is_empty() {
            debug!(
                txid = %txid,
                missing = resolution.missing.len(),
                "inputs unresolved, transaction is an orphan"
            );
            return Ok(Verdict::Orphan(OrphanCause {
                waiting_on: resolution.missing,
                depth_limited: false,
            }));
        }

        let outputs_total = tx.total_output_value();
        if resolution.input_total < outputs_total {
            return Err(ValidationError::NegativeFee {
                inputs: resolution.input_total,
                outputs: outputs_total,
            });
        }
        let fee = resolution.input_total - outputs_total;
        if fee < self.limits.min_relay_fee {
            return Err(ValidationError::FeeTooLow {
                min: self.limits.min_relay_fee,
                actual: fee,
            });
        }

        let (ancestor_count, ancestor_size) =
            self.ancestor_chain(&resolution.parents, size as u64, pool);
        if ancestor_count > self.limits.max_ancestor_depth {
            debug!(
                txid = %txid,
                depth = ancestor_count,
                limit = self.limits.max_ancestor_depth,
                "ancestor chain too deep, holding transaction back"
            );
            return Ok(Verdict::Orphan(OrphanCause {
                waiting_on: resolution.parents,
                depth_limited: true,
            }));
        }

        debug!(txid = %txid, fee, depth = ancestor_count, "transaction admissible");
        Ok(Verdict::Admit(Admission {
            fee,
            ancestor_count,
            ancestor_size,
            size,
        }))
    }

    fn validate_structure(&self, tx: &Transaction) -> Result<usize, ValidationError> {
        if tx.inputs.is_empty() {
            return Err(ValidationError::NoInputs);
        }
        if tx.outputs.is_empty() {
            return Err(ValidationError::NoOutputs);
        }

        let mut seen = HashSet::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            if !seen.insert(input.prevout) {
                return Err(ValidationError::DuplicatePrevout(input.prevout));
            }
        }

        let size = tx.encoded_size();
        if size > self.limits.max_tx_size {
            return Err(ValidationError::TransactionTooLarge {
                max: self.limits.max_tx_size,
                actual: size,
            });
        }
        Ok(size)
    }

    /// Resolves every input against the pool first, then the chain.
    ///
    /// A prevout can land four ways: spent by a pooled transaction
    /// (conflict), resolved by a pooled parent, resolved by the confirmed
    /// UTXO set, or consumed/unknown. Consumed-by-chain is terminal;
    /// unknown parents accumulate into the missing set.
    fn resolve_inputs(&self, tx: &Transaction, pool: &TxPool) -> Result<Resolution, ValidationError> {
        let mut resolution = Resolution::default();

        for input in &tx.inputs {
            let prevout = input.prevout;

            if let Some(spender) = pool.spender_of(&prevout) {
                return Err(ValidationError::DoubleSpend {
                    outpoint: prevout,
                    spender,
                });
            }

            if let Some(value) = pool.output_value(&prevout) {
                resolution.input_total = resolution.input_total.saturating_add(value);
                resolution.parents.insert(prevout.txid);
            } else if pool.contains(&prevout.txid) {
                // Parent is pooled but has no such output index
                return Err(ValidationError::MissingOutput(prevout));
            } else if let Some(value) = self.chain.utxo_value(&prevout) {
                resolution.input_total = resolution.input_total.saturating_add(value);
            } else if self.chain.tx_confirmed(&prevout.txid) {
                // Parent confirmed but the output is gone
                return Err(ValidationError::InputSpent(prevout));
            } else {
                resolution.missing.insert(prevout.txid);
            }
        }

        Ok(resolution)
    }

    /// Ancestor chain along the deepest in-pool parent.
    fn ancestor_chain(&self, parents: &BTreeSet<Txid>, size: u64, pool: &TxPool) -> (u32, u64) {
        let mut depth = 0u32;
        let mut chain_bytes = 0u64;
        for parent in parents {
            if let Some((count, bytes)) = pool.ancestor_stats(parent) {
                if count > depth || (count == depth && bytes > chain_bytes) {
                    depth = count;
                    chain_bytes = bytes;
                }
            }
        }
        (depth + 1, chain_bytes + size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolEntry;
    use embercore_types::{TxInput, TxOutput};

    fn validator(limits: PoolLimits) -> (TxValidator<MockChainView>, Arc<MockChainView>, TxPool) {
        let chain = Arc::new(MockChainView::new());
        let pool = TxPool::new(limits.max_pool_bytes);
        (TxValidator::new(limits, Arc::clone(&chain)), chain, pool)
    }

    fn spend(outpoint: OutPoint, value: u64, tag: u8) -> Transaction {
        Transaction::new(
            vec![TxInput::new(outpoint, vec![tag])],
            vec![TxOutput::new(value, vec![0xAA])],
        )
    }

    #[test]
    fn test_structural_rejects() {
        let (validator, _chain, pool) = validator(PoolLimits::default());

        let no_inputs = Transaction::new(vec![], vec![TxOutput::new(1, vec![])]);
        assert!(matches!(
            validator.validate(&no_inputs, &pool),
            Err(ValidationError::NoInputs)
        ));

        let prevout = OutPoint::new(Txid::keccak256(b"p"), 0);
        let no_outputs = Transaction::new(vec![TxInput::new(prevout, vec![])], vec![]);
        assert!(matches!(
            validator.validate(&no_outputs, &pool),
            Err(ValidationError::NoOutputs)
        ));

        let doubled = Transaction::new(
            vec![TxInput::new(prevout, vec![1]), TxInput::new(prevout, vec![2])],
            vec![TxOutput::new(1, vec![])],
        );
        assert!(matches!(
            validator.validate(&doubled, &pool),
            Err(ValidationError::DuplicatePrevout(_))
        ));
    }

    #[test]
    fn test_oversized_transaction_rejected() {
        let limits = PoolLimits {
            max_tx_size: 64,
            ..Default::default()
        };
        let (validator, _chain, pool) = validator(limits);

        let prevout = OutPoint::new(Txid::keccak256(b"p"), 0);
        let bloated = Transaction::new(
            vec![TxInput::new(prevout, vec![0u8; 256])],
            vec![TxOutput::new(1, vec![])],
        );
        assert!(matches!(
            validator.validate(&bloated, &pool),
            Err(ValidationError::TransactionTooLarge { .. })
        ));
    }

    #[test]
    fn test_missing_parent_is_orphan_verdict() {
        let (validator, _chain, pool) = validator(PoolLimits::default());
        let parent = Txid::keccak256(b"unseen parent");
        let tx = spend(OutPoint::new(parent, 0), 500, 1);

        match validator.validate(&tx, &pool).unwrap() {
            Verdict::Orphan(cause) => {
                assert!(!cause.depth_limited);
                assert!(cause.waiting_on.contains(&parent));
                assert_eq!(cause.waiting_on.len(), 1);
            }
            other => panic!("expected orphan verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_funded_admission_with_fee() {
        let (validator, chain, pool) = validator(PoolLimits::default());
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 10_000);

        let tx = spend(funding, 9_000, 1);
        match validator.validate(&tx, &pool).unwrap() {
            Verdict::Admit(admission) => {
                assert_eq!(admission.fee, 1_000);
                assert_eq!(admission.ancestor_count, 1);
                assert_eq!(admission.ancestor_size, tx.encoded_size() as u64);
            }
            other => panic!("expected admit verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_fee_rejected() {
        let (validator, chain, pool) = validator(PoolLimits::default());
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 100);

        let tx = spend(funding, 101, 1);
        assert!(matches!(
            validator.validate(&tx, &pool),
            Err(ValidationError::NegativeFee { inputs: 100, outputs: 101 })
        ));
    }

    #[test]
    fn test_fee_floor_enforced() {
        let limits = PoolLimits {
            min_relay_fee: 500,
            ..Default::default()
        };
        let (validator, chain, pool) = validator(limits);
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 1_000);

        let cheap = spend(funding, 900, 1);
        assert!(matches!(
            validator.validate(&cheap, &pool),
            Err(ValidationError::FeeTooLow { min: 500, actual: 100 })
        ));

        let paid = spend(funding, 400, 2);
        assert!(matches!(
            validator.validate(&paid, &pool),
            Ok(Verdict::Admit(_))
        ));
    }

    #[test]
    fn test_pooled_parent_resolution_and_depth() {
        let (validator, chain, pool) = validator(PoolLimits::default());
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 10_000);

        let parent = spend(funding, 9_000, 1);
        let parent_id = parent.txid();
        let parent_size = parent.encoded_size() as u64;
        pool.insert(PoolEntry::new(parent.clone(), 100, 1_000, 1, parent_size))
            .unwrap();

        let child = spend(OutPoint::new(parent_id, 0), 8_000, 2);
        match validator.validate(&child, &pool).unwrap() {
            Verdict::Admit(admission) => {
                assert_eq!(admission.fee, 1_000);
                assert_eq!(admission.ancestor_count, 2);
                assert_eq!(
                    admission.ancestor_size,
                    parent_size + child.encoded_size() as u64
                );
            }
            other => panic!("expected admit verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_depth_limit_produces_orphan_verdict() {
        let limits = PoolLimits {
            max_ancestor_depth: 1,
            ..Default::default()
        };
        let (validator, chain, pool) = validator(limits);
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 10_000);

        let parent = spend(funding, 9_000, 1);
        let parent_id = parent.txid();
        pool.insert(PoolEntry::new(parent, 100, 1_000, 1, 60)).unwrap();

        let child = spend(OutPoint::new(parent_id, 0), 8_000, 2);
        match validator.validate(&child, &pool).unwrap() {
            Verdict::Orphan(cause) => {
                assert!(cause.depth_limited);
                assert!(cause.waiting_on.contains(&parent_id));
            }
            other => panic!("expected orphan verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_double_spend_detected() {
        let (validator, chain, pool) = validator(PoolLimits::default());
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 10_000);

        let first = spend(funding, 9_000, 1);
        let first_id = first.txid();
        pool.insert(PoolEntry::new(first, 100, 1_000, 1, 60)).unwrap();

        let second = spend(funding, 8_500, 2);
        match validator.validate(&second, &pool) {
            Err(ValidationError::DoubleSpend { outpoint, spender }) => {
                assert_eq!(outpoint, funding);
                assert_eq!(spender, first_id);
            }
            other => panic!("expected double spend, got {other:?}"),
        }
    }

    #[test]
    fn test_confirmed_spend_detected() {
        let (validator, chain, pool) = validator(PoolLimits::default());

        // A confirmed parent whose only output gets consumed by another
        // confirmed transaction
        let parent = Transaction::new(
            vec![TxInput::new(
                OutPoint::new(Txid::keccak256(b"root"), 0),
                vec![],
            )],
            vec![TxOutput::new(10_000, vec![0xAA])],
        );
        chain.confirm(&parent);
        let parent_out = OutPoint::new(parent.txid(), 0);

        let spender = spend(parent_out, 9_000, 1);
        chain.confirm(&spender);

        let late = spend(parent_out, 8_000, 2);
        assert!(matches!(
            validator.validate(&late, &pool),
            Err(ValidationError::InputSpent(_))
        ));
    }

    #[test]
    fn test_already_confirmed_rejected() {
        let (validator, chain, pool) = validator(PoolLimits::default());
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 10_000);

        let tx = spend(funding, 9_000, 1);
        chain.confirm(&tx);
        assert!(matches!(
            validator.validate(&tx, &pool),
            Err(ValidationError::AlreadyConfirmed(_))
        ));
    }

    #[test]
    fn test_missing_output_index_rejected() {
        let (validator, chain, pool) = validator(PoolLimits::default());
        let funding = OutPoint::new(Txid::keccak256(b"coinbase"), 0);
        chain.add_utxo(funding, 10_000);

        let parent = spend(funding, 9_000, 1);
        let parent_id = parent.txid();
        pool.insert(PoolEntry::new(parent, 100, 1_000, 1, 60)).unwrap();

        // Parent has a single output at index 0
        let child = spend(OutPoint::new(parent_id, 7), 1_000, 2);
        assert!(matches!(
            validator.validate(&child, &pool),
            Err(ValidationError::MissingOutput(_))
        ));
    }
}
