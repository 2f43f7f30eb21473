//! # stakepool-rewards
//!
//! Reward distribution for pooled staking.
//!
//! The [`RewardsController`] splits each pool's earnings between its
//! operator and its delegating members. Members' entitlements are never
//! updated on deposit; they are derived on demand from the pool balance, the
//! shadow ledger and the members' stake (see `stakepool-math`).
//!
//! Every public operation is atomic. State changes are journaled and rolled
//! back on any error, and all ledger state reaches its final value before
//! value is transferred out, so a recipient that calls back into the
//! controller observes fully updated balances.
//!
//! ## Modules
//!
//! - [`api`]: The public operation surface, also handed to transfer recipients
//! - [`collaborators`]: Pool registry, stake ledger and value transfer traits
//! - [`controller`]: The rewards controller
//! - [`delegation`]: Hooks applied when stake is delegated or undelegated
//! - [`deposits`]: Crediting pool and operator balances
//! - [`events`]: Events emitted by successful operations
//! - [`config`]: Configuration file and logging setup

pub mod api;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod delegation;
pub mod deposits;
pub mod events;

pub use api::RewardsApi;
pub use collaborators::{PoolRegistry, StakeLedger, TransferError, ValueTransfer};
pub use config::{RewardsConfig, RewardsSettings};
pub use controller::RewardsController;
pub use events::RewardEvent;

use stakepool_ledger::LedgerError;
use stakepool_math::MathError;
use stakepool_types::{Address, PoolId};

/// Error types for reward operations.
#[derive(Debug, thiserror::Error)]
pub enum RewardsError {
    /// Requested amount exceeds what the caller may withdraw.
    #[error("invalid amount: requested {requested}, available {available}")]
    InvalidAmount {
        /// Amount requested.
        requested: u64,
        /// Amount the caller may withdraw.
        available: u64,
    },

    /// Requested amount is below the configured minimum withdrawal.
    #[error("amount {amount} is below minimum {minimum}")]
    BelowMinimum {
        /// Amount requested.
        amount: u64,
        /// Configured minimum.
        minimum: u64,
    },

    /// Caller is not the pool's registered operator.
    #[error("{caller} is not the operator of pool {pool}")]
    Unauthorized {
        /// The caller.
        caller: Address,
        /// The pool.
        pool: PoolId,
    },

    /// The pool registry has no record of the pool.
    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    /// Reward arithmetic fault.
    #[error("arithmetic fault: {0}")]
    Math(#[from] MathError),

    /// Ledger fault.
    #[error("ledger fault: {0}")]
    Ledger(#[from] LedgerError),

    /// The value transfer primitive rejected the payout.
    #[error("transfer of {amount} to {to} failed: {reason}")]
    TransferFailed {
        /// Recipient.
        to: Address,
        /// Amount.
        amount: u64,
        /// Error reported by the transfer primitive.
        reason: String,
    },
}

/// Coarse classification of a [`RewardsError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for more than they may withdraw.
    InvalidAmount,
    /// The caller lacks the operator capability.
    Unauthorized,
    /// Overflow, underflow or division by zero.
    ArithmeticFault,
    /// The pool is not registered.
    UnknownPool,
    /// The outbound transfer failed.
    TransferFailed,
    /// Ledger state could not be captured or restored.
    Storage,
}

impl RewardsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. } | Self::BelowMinimum { .. } => ErrorKind::InvalidAmount,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::UnknownPool(_) => ErrorKind::UnknownPool,
            Self::Math(_) => ErrorKind::ArithmeticFault,
            Self::Ledger(
                LedgerError::Overflow { .. }
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::ShadowUnderflow { .. },
            ) => ErrorKind::ArithmeticFault,
            Self::Ledger(_) => ErrorKind::Storage,
            Self::TransferFailed { .. } => ErrorKind::TransferFailed,
        }
    }
}

/// Convenience result type for reward operations.
pub type Result<T> = std::result::Result<T, RewardsError>;
