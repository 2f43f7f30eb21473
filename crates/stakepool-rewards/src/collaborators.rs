//! Interfaces to the systems surrounding the reward ledger.
//!
//! Pool registration, stake bookkeeping and value custody are owned
//! elsewhere. The controller only reads the registry and the stake ledger,
//! and pays out through a [`ValueTransfer`].

use stakepool_types::{Address, PoolId};

use crate::api::RewardsApi;

/// Error reported by a [`ValueTransfer`].
pub type TransferError = Box<dyn std::error::Error + Send + Sync>;

/// Registry of pools and their operators.
pub trait PoolRegistry {
    /// The registered operator of `pool`, or `None` for an unknown pool.
    fn operator_of(&self, pool: &PoolId) -> Option<Address>;

    /// The operator's share of deposits in whole percent (`0..=100`).
    fn operator_share_of(&self, pool: &PoolId) -> Option<u8>;
}

/// Read access to delegated stake.
pub trait StakeLedger {
    /// Stake `member` has delegated to `pool`.
    fn delegated_stake(&self, member: &Address, pool: &PoolId) -> u64;

    /// Stake delegated to `pool` by all members.
    fn delegated_stake_total(&self, pool: &PoolId) -> u64;
}

/// Outbound value transfer.
///
/// Implementors move `amount` of the reward asset to `to`. The recipient
/// may run arbitrary logic while accepting the transfer, including calling
/// back into the controller through `reentry`. Returning an error aborts the
/// enclosing operation and rolls back all of its state changes, including
/// those of any reentrant calls.
pub trait ValueTransfer {
    /// Transfer `amount` to `to`.
    fn transfer(
        &mut self,
        reentry: &mut dyn RewardsApi,
        to: &Address,
        amount: u64,
    ) -> std::result::Result<(), TransferError>;
}
