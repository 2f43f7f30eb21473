//! Crediting pool and operator balances.
//!
//! Deposits only touch the vault. Member entitlements grow implicitly
//! because they are derived from the pool balance, so a deposit costs the
//! same regardless of how many members the pool has.

use stakepool_math::{split_deposit, DepositSplit};
use stakepool_types::PoolId;
use tracing::info;

use crate::collaborators::{PoolRegistry, StakeLedger};
use crate::controller::RewardsController;
use crate::events::RewardEvent;
use crate::{Result, RewardsError};

impl<R: PoolRegistry, S: StakeLedger> RewardsController<R, S> {
    /// Credit `amount` to the member portion of `pool`.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::UnknownPool`] if the pool is not registered
    /// - [`RewardsError::Ledger`] if the balance would overflow
    pub fn deposit_to_pool(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        self.atomically("deposit_to_pool", |this| {
            this.require_registered(pool)?;
            this.credit(
                pool,
                DepositSplit {
                    operator: 0,
                    members: amount,
                },
            )
        })
    }

    /// Credit `amount` to the operator portion of `pool`.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::UnknownPool`] if the pool is not registered
    /// - [`RewardsError::Ledger`] if the balance would overflow
    pub fn deposit_to_operator(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        self.atomically("deposit_to_operator", |this| {
            this.require_registered(pool)?;
            this.credit(
                pool,
                DepositSplit {
                    operator: amount,
                    members: 0,
                },
            )
        })
    }

    /// Split `amount` by the pool's operator share and credit both portions.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::UnknownPool`] if the pool is not registered
    /// - [`RewardsError::Math`] if the registered share exceeds 100
    /// - [`RewardsError::Ledger`] if a balance would overflow
    pub fn record_deposit(&mut self, pool: &PoolId, amount: u64) -> Result<DepositSplit> {
        self.atomically("record_deposit", |this| this.split_and_credit(pool, amount))
    }

    /// Record several deposits as one unit of work.
    ///
    /// Either every deposit is credited or none is.
    pub fn record_deposits(&mut self, deposits: &[(PoolId, u64)]) -> Result<Vec<DepositSplit>> {
        self.atomically("record_deposits", |this| {
            deposits
                .iter()
                .map(|(pool, amount)| this.split_and_credit(pool, *amount))
                .collect()
        })
    }

    fn require_registered(&self, pool: &PoolId) -> Result<()> {
        self.registry
            .operator_of(pool)
            .map(|_| ())
            .ok_or(RewardsError::UnknownPool(*pool))
    }

    fn split_and_credit(&mut self, pool: &PoolId, amount: u64) -> Result<DepositSplit> {
        let share = self
            .registry
            .operator_share_of(pool)
            .ok_or(RewardsError::UnknownPool(*pool))?;
        let split = split_deposit(amount, share)?;
        self.credit(pool, split)?;
        Ok(split)
    }

    fn credit(&mut self, pool: &PoolId, split: DepositSplit) -> Result<()> {
        if split.operator == 0 && split.members == 0 {
            return Ok(());
        }
        if split.operator > 0 {
            self.ledger.deposit_to_operator(pool, split.operator)?;
        }
        if split.members > 0 {
            self.ledger.deposit_to_pool(pool, split.members)?;
        }
        self.events.push(RewardEvent::Deposited {
            pool: *pool,
            operator_amount: split.operator,
            member_amount: split.members,
        });
        info!(
            %pool,
            operator_amount = split.operator,
            member_amount = split.members,
            "rewards: deposit"
        );
        Ok(())
    }
}
