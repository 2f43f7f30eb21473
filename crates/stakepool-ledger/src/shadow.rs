//! Shadow ledger.
//!
//! A shadow balance is bookkeeping only: the value a member has already
//! realized from a pool, either by withdrawing it or by buying in when
//! delegating. The pool total is kept alongside so it can be read in O(1).

use std::collections::HashMap;

use stakepool_types::{Address, PoolId};

use crate::{LedgerError, Result};

/// Shadow balances of a single pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PoolShadow {
    pub(crate) total: u64,
    pub(crate) members: HashMap<Address, u64>,
}

/// Per-member and per-pool realized totals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowLedger {
    pub(crate) pools: HashMap<PoolId, PoolShadow>,
}

impl ShadowLedger {
    /// Create an empty shadow ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shadow balance of `member` in `pool`. Zero if never observed.
    pub fn get(&self, member: &Address, pool: &PoolId) -> u64 {
        self.pools
            .get(pool)
            .and_then(|p| p.members.get(member))
            .copied()
            .unwrap_or(0)
    }

    /// Shadow balance summed over every member of `pool`.
    pub fn get_total(&self, pool: &PoolId) -> u64 {
        self.pools.get(pool).map(|p| p.total).unwrap_or(0)
    }

    /// Iterate the members of `pool` with their shadow balances.
    pub fn members<'a>(&'a self, pool: &PoolId) -> impl Iterator<Item = (&'a Address, u64)> + 'a {
        self.pools
            .get(pool)
            .into_iter()
            .flat_map(|p| p.members.iter().map(|(a, v)| (a, *v)))
    }

    /// Whether every pool's member entries add up to its total.
    pub fn is_consistent(&self) -> bool {
        self.pools.values().all(|p| {
            p.members.values().map(|v| u128::from(*v)).sum::<u128>() == u128::from(p.total)
        })
    }

    /// Add `amount` to the member entry and the pool total.
    ///
    /// Both new values are computed before either is written, so an
    /// overflow leaves the ledger untouched.
    pub(crate) fn increase(&mut self, member: &Address, pool: &PoolId, amount: u64) -> Result<()> {
        let member_next = self
            .get(member, pool)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { pool: *pool })?;
        let total_next = self
            .get_total(pool)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { pool: *pool })?;
        self.set(member, pool, member_next, total_next);
        Ok(())
    }

    /// Subtract `amount` from the member entry and the pool total.
    pub(crate) fn decrease(&mut self, member: &Address, pool: &PoolId, amount: u64) -> Result<()> {
        let available = self.get(member, pool);
        let member_next = available
            .checked_sub(amount)
            .ok_or(LedgerError::ShadowUnderflow {
                pool: *pool,
                member: *member,
                available,
                requested: amount,
            })?;
        // The total is at least the member entry, so this cannot underflow
        // while the ledger is consistent.
        let total = self.get_total(pool);
        let total_next = total
            .checked_sub(amount)
            .ok_or(LedgerError::ShadowUnderflow {
                pool: *pool,
                member: *member,
                available: total,
                requested: amount,
            })?;
        self.set(member, pool, member_next, total_next);
        Ok(())
    }

    /// Write both values for a member entry. Used by writes and by undo.
    pub(crate) fn set(&mut self, member: &Address, pool: &PoolId, member_value: u64, total: u64) {
        let entry = self.pools.entry(*pool).or_default();
        entry.members.insert(*member, member_value);
        entry.total = total;
    }
}
