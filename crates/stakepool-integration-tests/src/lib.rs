//! Integration test harness for the stakepool reward ledger.
//!
//! In-memory stand-ins for the systems around the controller: a pool
//! registry, a stake ledger that drives the delegation hooks the way a
//! delegation system would, and value transfers that record, refuse or
//! call back into the controller.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p stakepool-integration-tests
//! ```

use std::collections::HashMap;

use stakepool_math::MathError;
use stakepool_rewards::{
    PoolRegistry, RewardsApi, RewardsController, RewardsError, StakeLedger, TransferError,
    ValueTransfer,
};
use stakepool_types::{Address, PoolId};

/// Controller wired to the in-memory collaborators.
pub type Controller = RewardsController<MemoryRegistry, MemoryStakes>;

/// Pool id filled with `b`.
pub fn pool(b: u8) -> PoolId {
    PoolId::new([b; 32])
}

/// Address filled with `b`.
pub fn address(b: u8) -> Address {
    Address::new([b; 32])
}

/// A controller with no pools and no stake.
pub fn controller() -> Controller {
    RewardsController::new(MemoryRegistry::default(), MemoryStakes::default())
}

/// Pool registry backed by a map.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    pools: HashMap<PoolId, (Address, u8)>,
}

impl MemoryRegistry {
    /// Register `pool` with its operator and operator share (percent).
    pub fn register(&mut self, pool: PoolId, operator: Address, share: u8) {
        self.pools.insert(pool, (operator, share));
    }
}

impl PoolRegistry for MemoryRegistry {
    fn operator_of(&self, pool: &PoolId) -> Option<Address> {
        self.pools.get(pool).map(|(operator, _)| *operator)
    }

    fn operator_share_of(&self, pool: &PoolId) -> Option<u8> {
        self.pools.get(pool).map(|(_, share)| *share)
    }
}

/// Stake ledger backed by maps, with a running total per pool.
#[derive(Debug, Default)]
pub struct MemoryStakes {
    stakes: HashMap<(Address, PoolId), u64>,
    totals: HashMap<PoolId, u64>,
}

impl MemoryStakes {
    /// Add stake. Returns `false` and changes nothing on overflow.
    pub fn add(&mut self, member: &Address, pool: &PoolId, amount: u64) -> bool {
        let held = self.delegated_stake(member, pool);
        let total = self.delegated_stake_total(pool);
        match (held.checked_add(amount), total.checked_add(amount)) {
            (Some(held), Some(total)) => {
                self.stakes.insert((*member, *pool), held);
                self.totals.insert(*pool, total);
                true
            }
            _ => false,
        }
    }

    /// Remove stake. Returns `false` and changes nothing if `member` holds
    /// less than `amount`.
    pub fn remove(&mut self, member: &Address, pool: &PoolId, amount: u64) -> bool {
        let held = self.delegated_stake(member, pool);
        if amount > held {
            return false;
        }
        self.stakes.insert((*member, *pool), held - amount);
        let total = self.delegated_stake_total(pool);
        self.totals.insert(*pool, total - amount);
        true
    }

    /// Members that have ever delegated to `pool`, in address order.
    pub fn members(&self, pool: &PoolId) -> Vec<Address> {
        let mut members: Vec<Address> = self
            .stakes
            .keys()
            .filter(|(_, p)| p == pool)
            .map(|(member, _)| *member)
            .collect();
        members.sort();
        members
    }
}

impl StakeLedger for MemoryStakes {
    fn delegated_stake(&self, member: &Address, pool: &PoolId) -> u64 {
        self.stakes.get(&(*member, *pool)).copied().unwrap_or(0)
    }

    fn delegated_stake_total(&self, pool: &PoolId) -> u64 {
        self.totals.get(pool).copied().unwrap_or(0)
    }
}

/// Record a delegation in the stake ledger and apply the hook, discarding
/// the stake change if the hook fails.
pub fn delegate(
    controller: &mut Controller,
    pool: &PoolId,
    member: &Address,
    amount: u64,
) -> stakepool_rewards::Result<u64> {
    if !controller.stakes_mut().add(member, pool, amount) {
        return Err(MathError::Overflow.into());
    }
    let result = controller.on_stake_delegated(pool, member, amount);
    if result.is_err() {
        controller.stakes_mut().remove(member, pool, amount);
    }
    result
}

/// Record an undelegation in the stake ledger and apply the hook,
/// restoring the stake if the hook fails.
pub fn undelegate(
    controller: &mut Controller,
    pool: &PoolId,
    member: &Address,
    amount: u64,
    transfer: &mut dyn ValueTransfer,
) -> stakepool_rewards::Result<u64> {
    if !controller.stakes_mut().remove(member, pool, amount) {
        return Err(RewardsError::InvalidAmount {
            requested: amount,
            available: controller.stakes().delegated_stake(member, pool),
        });
    }
    let result = controller.on_stake_undelegated(pool, member, amount, transfer);
    if result.is_err() {
        controller.stakes_mut().add(member, pool, amount);
    }
    result
}

/// Records every transfer it is asked to make.
#[derive(Debug, Default)]
pub struct Wallet {
    /// Transfers in the order they were made.
    pub received: Vec<(Address, u64)>,
}

impl Wallet {
    /// Sum of all transfers.
    pub fn total(&self) -> u64 {
        self.received.iter().map(|(_, amount)| amount).sum()
    }

    /// Sum of transfers to `to`.
    pub fn total_to(&self, to: &Address) -> u64 {
        self.received
            .iter()
            .filter(|(recipient, _)| recipient == to)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl ValueTransfer for Wallet {
    fn transfer(
        &mut self,
        _reentry: &mut dyn RewardsApi,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.received.push((*to, amount));
        Ok(())
    }
}

/// Rejects every transfer.
#[derive(Debug, Default)]
pub struct Refuse;

impl ValueTransfer for Refuse {
    fn transfer(
        &mut self,
        _reentry: &mut dyn RewardsApi,
        _to: &Address,
        _amount: u64,
    ) -> Result<(), TransferError> {
        Err("recipient rejected the transfer".into())
    }
}

/// What a [`Reentrant`] recipient does when it is paid.
#[derive(Clone, Copy, Debug)]
pub enum Reentry {
    /// Withdraw `amount` of the member's entitlement.
    Withdraw {
        pool: PoolId,
        member: Address,
        amount: u64,
    },
    /// Withdraw the member's whole entitlement.
    WithdrawTotal { pool: PoolId, member: Address },
    /// Withdraw the whole operator balance.
    WithdrawTotalOperator { pool: PoolId, operator: Address },
}

/// A recipient that calls back into the controller while being paid.
///
/// Reenters at most `reentries` times, paying nested withdrawals into
/// `inner`. Outcomes of the nested calls are kept in `outcomes`. With
/// `fail_after` set, the outer transfer fails after the nested calls ran.
#[derive(Debug)]
pub struct Reentrant {
    pub action: Reentry,
    pub reentries: u32,
    pub fail_after: bool,
    pub received: Vec<(Address, u64)>,
    pub inner: Wallet,
    pub outcomes: Vec<stakepool_rewards::Result<u64>>,
}

impl Reentrant {
    /// Reenter once with `action`.
    pub fn new(action: Reentry) -> Self {
        Self {
            action,
            reentries: 1,
            fail_after: false,
            received: Vec::new(),
            inner: Wallet::default(),
            outcomes: Vec::new(),
        }
    }

    /// Fail the outer transfer after reentering.
    pub fn failing(mut self) -> Self {
        self.fail_after = true;
        self
    }
}

impl ValueTransfer for Reentrant {
    fn transfer(
        &mut self,
        reentry: &mut dyn RewardsApi,
        to: &Address,
        amount: u64,
    ) -> Result<(), TransferError> {
        self.received.push((*to, amount));

        if self.reentries > 0 {
            self.reentries -= 1;
            let outcome = match self.action {
                Reentry::Withdraw {
                    pool,
                    member,
                    amount: nested,
                } => reentry
                    .withdraw_reward(&pool, &member, nested, &mut self.inner)
                    .map(|()| nested),
                Reentry::WithdrawTotal { pool, member } => {
                    reentry.withdraw_total_reward(&pool, &member, &mut self.inner)
                }
                Reentry::WithdrawTotalOperator { pool, operator } => {
                    reentry.withdraw_total_operator_reward(&pool, &operator, &mut self.inner)
                }
            };
            self.outcomes.push(outcome);
        }

        if self.fail_after {
            return Err("recipient failed after reentering".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_stakes_totals() {
        let mut stakes = MemoryStakes::default();
        assert!(stakes.add(&address(1), &pool(1), 30));
        assert!(stakes.add(&address(2), &pool(1), 20));
        assert!(stakes.add(&address(1), &pool(2), 5));
        assert_eq!(stakes.delegated_stake_total(&pool(1)), 50);
        assert!(!stakes.remove(&address(2), &pool(1), 21));
        assert!(stakes.remove(&address(2), &pool(1), 20));
        assert_eq!(stakes.delegated_stake_total(&pool(1)), 30);
        assert_eq!(stakes.members(&pool(1)), vec![address(1), address(2)]);
    }

    #[test]
    fn test_memory_stakes_overflow() {
        let mut stakes = MemoryStakes::default();
        assert!(stakes.add(&address(1), &pool(1), u64::MAX));
        assert!(!stakes.add(&address(2), &pool(1), 1));
        assert_eq!(stakes.delegated_stake(&address(2), &pool(1)), 0);
    }
}
