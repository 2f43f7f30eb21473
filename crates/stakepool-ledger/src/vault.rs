//! Balance vault.
//!
//! Holds each pool's undistributed reward balance in two disjoint portions:
//! the operator's and the members'. Neither portion can fund withdrawals of
//! the other.

use std::collections::HashMap;

use stakepool_types::PoolId;

use crate::{LedgerError, Result};

/// Balances held for one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolBalances {
    /// Portion reserved for the operator.
    pub operator_balance: u64,
    /// Portion shared by the members.
    pub pool_balance: u64,
}

/// Operator and member-pool balances for every pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceVault {
    pub(crate) pools: HashMap<PoolId, PoolBalances>,
}

impl BalanceVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Member-pool balance of `pool`.
    pub fn balance_of(&self, pool: &PoolId) -> u64 {
        self.balances(pool).pool_balance
    }

    /// Operator balance of `pool`.
    pub fn operator_balance_of(&self, pool: &PoolId) -> u64 {
        self.balances(pool).operator_balance
    }

    /// Both balances of `pool`.
    pub fn balances(&self, pool: &PoolId) -> PoolBalances {
        self.pools.get(pool).copied().unwrap_or_default()
    }

    pub(crate) fn deposit_to_pool(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let next = self
            .balance_of(pool)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { pool: *pool })?;
        self.set_pool_balance(pool, next);
        Ok(())
    }

    pub(crate) fn deposit_to_operator(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let next = self
            .operator_balance_of(pool)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { pool: *pool })?;
        self.set_operator_balance(pool, next);
        Ok(())
    }

    pub(crate) fn withdraw_from_pool(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let available = self.balance_of(pool);
        let next = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                pool: *pool,
                available,
                requested: amount,
            })?;
        self.set_pool_balance(pool, next);
        Ok(())
    }

    pub(crate) fn withdraw_from_operator(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let available = self.operator_balance_of(pool);
        let next = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                pool: *pool,
                available,
                requested: amount,
            })?;
        self.set_operator_balance(pool, next);
        Ok(())
    }

    pub(crate) fn set_pool_balance(&mut self, pool: &PoolId, value: u64) {
        self.pools.entry(*pool).or_default().pool_balance = value;
    }

    pub(crate) fn set_operator_balance(&mut self, pool: &PoolId, value: u64) {
        self.pools.entry(*pool).or_default().operator_balance = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(b: u8) -> PoolId {
        PoolId::new([b; 32])
    }

    #[test]
    fn test_empty_vault() {
        let vault = BalanceVault::new();
        assert_eq!(vault.balance_of(&pool(1)), 0);
        assert_eq!(vault.operator_balance_of(&pool(1)), 0);
    }

    #[test]
    fn test_deposits_are_disjoint() {
        let mut vault = BalanceVault::new();
        vault.deposit_to_pool(&pool(1), 900).expect("deposit");
        vault.deposit_to_operator(&pool(1), 100).expect("deposit");

        assert_eq!(vault.balance_of(&pool(1)), 900);
        assert_eq!(vault.operator_balance_of(&pool(1)), 100);
        assert_eq!(vault.balance_of(&pool(2)), 0);
    }

    #[test]
    fn test_withdraw() {
        let mut vault = BalanceVault::new();
        vault.deposit_to_pool(&pool(1), 900).expect("deposit");
        vault.deposit_to_operator(&pool(1), 100).expect("deposit");
        vault.withdraw_from_pool(&pool(1), 400).expect("withdraw");
        vault.withdraw_from_operator(&pool(1), 100).expect("withdraw");

        assert_eq!(
            vault.balances(&pool(1)),
            PoolBalances {
                operator_balance: 0,
                pool_balance: 500
            }
        );
    }

    #[test]
    fn test_withdraw_insufficient() {
        let mut vault = BalanceVault::new();
        vault.deposit_to_pool(&pool(1), 10).expect("deposit");

        let result = vault.withdraw_from_pool(&pool(1), 11);
        assert_eq!(
            result,
            Err(LedgerError::InsufficientFunds {
                pool: pool(1),
                available: 10,
                requested: 11
            })
        );
        assert_eq!(vault.balance_of(&pool(1)), 10);
    }

    #[test]
    fn test_operator_cannot_draw_member_funds() {
        let mut vault = BalanceVault::new();
        vault.deposit_to_pool(&pool(1), 1_000).expect("deposit");
        assert!(vault.withdraw_from_operator(&pool(1), 1).is_err());
    }

    #[test]
    fn test_deposit_overflow() {
        let mut vault = BalanceVault::new();
        vault.deposit_to_pool(&pool(1), u64::MAX).expect("deposit");
        assert_eq!(
            vault.deposit_to_pool(&pool(1), 1),
            Err(LedgerError::Overflow { pool: pool(1) })
        );
        assert_eq!(vault.balance_of(&pool(1)), u64::MAX);
    }
}
