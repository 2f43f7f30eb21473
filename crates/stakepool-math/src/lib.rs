//! # stakepool-math
//!
//! Pure reward arithmetic for pooled staking.
//!
//! A member's share of a pool is `member_stake / pool_stake`. Rather than
//! crediting every member on each deposit, the pool tracks how much value
//! has already been realized (the shadow balance). A member's entitlement is
//! their fraction of everything the pool has ever held, minus what they
//! already took:
//!
//! ```text
//! payout = member_stake * (pool_balance + pool_shadow) / pool_stake - member_shadow
//! ```
//!
//! All functions take `u64` amounts and compute products in `u128`.
//!
//! ## Modules
//!
//! - [`payout`]: Entitlement, buy-in and partial payout formulas
//! - [`split`]: Operator/member split of incoming deposits

pub mod payout;
pub mod split;

pub use payout::{compute_buy_in, compute_partial_payout, compute_payout, PartialPayout};
pub use split::{split_deposit, DepositSplit};

/// Error types for reward arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// An intermediate or final value does not fit its type.
    #[error("arithmetic overflow")]
    Overflow,

    /// A divisor was zero where the formula has no zero guard.
    #[error("division by zero")]
    DivisionByZero,

    /// A member claims more stake than the pool holds in total.
    #[error("member stake {member} exceeds pool stake {pool}")]
    StakeExceedsPool {
        /// The member's stake.
        member: u64,
        /// The pool's total stake.
        pool: u64,
    },

    /// A partial amount exceeds the amount it is a part of.
    #[error("partial amount {partial} exceeds whole {whole}")]
    PartialExceedsWhole {
        /// The partial amount.
        partial: u64,
        /// The whole amount.
        whole: u64,
    },

    /// Operator share outside `0..=100`.
    #[error("invalid operator share: {0}%")]
    InvalidShare(u8),
}

/// Convenience result type for reward arithmetic.
pub type Result<T> = std::result::Result<T, MathError>;

/// Narrow a `u128` intermediate back into an amount.
pub(crate) fn narrow(value: u128) -> Result<u64> {
    u64::try_from(value).map_err(|_| MathError::Overflow)
}
