//! # stakepool-ledger
//!
//! Custodial state of the reward system: the shadow ledger, the balance
//! vault, and the journaled [`Ledger`] through which both are mutated.
//!
//! Every write made while a [`Checkpoint`] is open records the previous
//! value of the touched entry. Rolling back to a checkpoint restores those
//! values in reverse order, which gives each controller operation
//! all-or-nothing semantics even when operations nest.
//!
//! ## Modules
//!
//! - [`shadow`]: Per-member and per-pool realized totals
//! - [`vault`]: Operator and member-pool balances
//! - [`journal`]: Journaled writer with nested checkpoints
//! - [`snapshot`]: Serializable ledger snapshots

pub mod journal;
pub mod shadow;
pub mod snapshot;
pub mod vault;

pub use journal::{Checkpoint, Ledger};
pub use shadow::ShadowLedger;
pub use snapshot::{LedgerSnapshot, PoolSnapshot};
pub use vault::{BalanceVault, PoolBalances};

use stakepool_types::{Address, PoolId};

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A balance would exceed `u64::MAX`.
    #[error("balance overflow in pool {pool}")]
    Overflow {
        /// The pool whose balance overflowed.
        pool: PoolId,
    },

    /// A withdrawal exceeds the balance held.
    #[error("insufficient funds in pool {pool}: have {available}, need {requested}")]
    InsufficientFunds {
        /// The pool being withdrawn from.
        pool: PoolId,
        /// Balance held.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// A shadow decrease exceeds the recorded shadow balance.
    #[error("shadow underflow for {member} in pool {pool}: have {available}, need {requested}")]
    ShadowUnderflow {
        /// The pool.
        pool: PoolId,
        /// The member.
        member: Address,
        /// Shadow balance held.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// Snapshot requested while an operation is in flight.
    #[error("ledger has {0} open checkpoint(s)")]
    OperationInFlight(usize),

    /// Snapshot member totals do not add up.
    #[error("inconsistent snapshot for pool {pool}: members sum to {sum}, total is {total}")]
    InconsistentSnapshot {
        /// The pool.
        pool: PoolId,
        /// Sum of member entries.
        sum: u128,
        /// Recorded total.
        total: u64,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
