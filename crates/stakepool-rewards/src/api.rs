//! The public operation surface of the rewards controller.
//!
//! [`RewardsApi`] is object safe so that a [`ValueTransfer`] recipient can
//! be handed the controller as `&mut dyn RewardsApi` and call back into it.

use stakepool_types::{Address, PoolId};

use crate::collaborators::ValueTransfer;
use crate::Result;

/// Queries and withdrawals available to members and operators.
pub trait RewardsApi {
    /// Member-pool balance held for `pool`.
    fn get_reward_balance(&self, pool: &PoolId) -> u64;

    /// Operator balance held for `pool`.
    fn get_reward_balance_of_operator(&self, pool: &PoolId) -> u64;

    /// Amount `member` may withdraw from `pool` right now.
    ///
    /// Rounding can leave the members' combined entitlements a few units
    /// above the pool balance, so each entitlement is capped at the live
    /// balance. Near that cap, one member's withdrawal lowers the balance
    /// and can lower the amount another member may withdraw by the same
    /// few units.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::Math`](crate::RewardsError::Math) if the stake
    ///   ledger reports inconsistent stake or the result overflows
    fn compute_reward_balance(&self, pool: &PoolId, member: &Address) -> Result<u64>;

    /// Withdraw `amount` of `member`'s entitlement in `pool`.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::InvalidAmount`](crate::RewardsError::InvalidAmount)
    ///   if `amount` exceeds the entitlement
    /// - [`RewardsError::BelowMinimum`](crate::RewardsError::BelowMinimum)
    ///   if `amount` is below the configured minimum
    /// - [`RewardsError::TransferFailed`](crate::RewardsError::TransferFailed)
    ///   if the payout is rejected
    fn withdraw_reward(
        &mut self,
        pool: &PoolId,
        member: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<()>;

    /// Withdraw `member`'s whole entitlement in `pool`.
    ///
    /// Returns the amount withdrawn.
    ///
    /// # Errors
    ///
    /// As for [`RewardsApi::withdraw_reward`].
    fn withdraw_total_reward(
        &mut self,
        pool: &PoolId,
        member: &Address,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<u64>;

    /// Withdraw `amount` from the operator balance of `pool`.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::UnknownPool`](crate::RewardsError::UnknownPool) if
    ///   the pool is not registered
    /// - [`RewardsError::Unauthorized`](crate::RewardsError::Unauthorized)
    ///   if `operator` is not the pool's operator
    /// - [`RewardsError::InvalidAmount`](crate::RewardsError::InvalidAmount)
    ///   if `amount` exceeds the operator balance
    fn withdraw_operator_reward(
        &mut self,
        pool: &PoolId,
        operator: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<()>;

    /// Withdraw the whole operator balance of `pool`.
    ///
    /// Returns the amount withdrawn.
    ///
    /// # Errors
    ///
    /// As for [`RewardsApi::withdraw_operator_reward`].
    fn withdraw_total_operator_reward(
        &mut self,
        pool: &PoolId,
        operator: &Address,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<u64>;
}
