//! The rewards controller.
//!
//! ## Withdrawal ordering
//!
//! 1. Check the caller's capability and the requested amount.
//! 2. Increase the member's shadow balance (member withdrawals only).
//! 3. Debit the vault.
//! 4. Transfer value to the caller.
//!
//! Steps 2 and 3 are complete before step 4 starts, so a reentrant call
//! made by the recipient during the transfer cannot claim the same value
//! twice. If any step fails, the journal restores the ledger to its state
//! before step 1.

use stakepool_ledger::{Ledger, LedgerSnapshot};
use stakepool_math::compute_payout;
use stakepool_types::{Address, PoolId};
use tracing::{info, trace, warn};

use crate::api::RewardsApi;
use crate::collaborators::{PoolRegistry, StakeLedger, ValueTransfer};
use crate::config::RewardsSettings;
use crate::events::RewardEvent;
use crate::{Result, RewardsError};

/// Splits pool earnings between operators and members.
///
/// Owns the shadow ledger and the vault; reads operators from `R` and stake
/// from `S`.
#[derive(Debug)]
pub struct RewardsController<R, S> {
    pub(crate) ledger: Ledger,
    pub(crate) registry: R,
    pub(crate) stakes: S,
    pub(crate) settings: RewardsSettings,
    pub(crate) events: Vec<RewardEvent>,
}

impl<R: PoolRegistry, S: StakeLedger> RewardsController<R, S> {
    /// Create a controller with an empty ledger and default settings.
    pub fn new(registry: R, stakes: S) -> Self {
        Self::with_settings(registry, stakes, RewardsSettings::default())
    }

    /// Create a controller with an empty ledger.
    pub fn with_settings(registry: R, stakes: S, settings: RewardsSettings) -> Self {
        Self::from_ledger(registry, stakes, settings, Ledger::new())
    }

    /// Create a controller around an existing ledger, e.g. one restored
    /// from a snapshot.
    pub fn from_ledger(registry: R, stakes: S, settings: RewardsSettings, ledger: Ledger) -> Self {
        Self {
            ledger,
            registry,
            stakes,
            settings,
            events: Vec::new(),
        }
    }

    /// The pool registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Mutable access to the pool registry, for its owner.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// The stake ledger.
    pub fn stakes(&self) -> &S {
        &self.stakes
    }

    /// Mutable access to the stake ledger, for the delegation system.
    ///
    /// Every change made here must be followed by the matching
    /// [`on_stake_delegated`](Self::on_stake_delegated) or
    /// [`on_stake_undelegated`](Self::on_stake_undelegated) call.
    pub fn stakes_mut(&mut self) -> &mut S {
        &mut self.stakes
    }

    /// Active settings.
    pub fn settings(&self) -> &RewardsSettings {
        &self.settings
    }

    /// Read access to the ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Shadow balance of `member` in `pool`.
    pub fn shadow_balance_of(&self, pool: &PoolId, member: &Address) -> u64 {
        self.ledger.shadow().get(member, pool)
    }

    /// Shadow balance of `pool` across all members.
    pub fn shadow_balance_total(&self, pool: &PoolId) -> u64 {
        self.ledger.shadow().get_total(pool)
    }

    /// Capture ledger state.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::Ledger`] if called from inside an operation
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        Ok(self.ledger.snapshot()?)
    }

    /// Events recorded since the last drain, oldest first.
    pub fn events(&self) -> &[RewardEvent] {
        &self.events
    }

    /// Take all recorded events.
    pub fn drain_events(&mut self) -> Vec<RewardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run `op` as one all-or-nothing unit of work.
    ///
    /// On error, every ledger write and every event recorded by `op`
    /// (including by reentrant operations nested inside it) is discarded.
    pub(crate) fn atomically<T>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = self.ledger.begin();
        let events_mark = self.events.len();
        match op(self) {
            Ok(value) => {
                self.ledger.commit(checkpoint);
                Ok(value)
            }
            Err(e) => {
                self.ledger.rollback(checkpoint);
                self.events.truncate(events_mark);
                warn!(operation = name, error = %e, "rewards: operation rolled back");
                Err(e)
            }
        }
    }

    /// Resolve the operator of `pool` and require it to be `caller`.
    pub(crate) fn authorize_operator(&self, pool: &PoolId, caller: &Address) -> Result<()> {
        let operator = self
            .registry
            .operator_of(pool)
            .ok_or(RewardsError::UnknownPool(*pool))?;
        if &operator != caller {
            return Err(RewardsError::Unauthorized {
                caller: *caller,
                pool: *pool,
            });
        }
        Ok(())
    }

    /// Reject non-zero amounts below the configured minimum.
    pub(crate) fn check_minimum(&self, amount: u64) -> Result<()> {
        let minimum = self.settings.min_withdrawal;
        if amount != 0 && amount < minimum {
            return Err(RewardsError::BelowMinimum { amount, minimum });
        }
        Ok(())
    }

    /// Send `amount` to `to`. Must be the last step of an operation.
    pub(crate) fn pay_out(
        &mut self,
        transfer: &mut dyn ValueTransfer,
        to: &Address,
        amount: u64,
    ) -> Result<()> {
        if amount == 0 && self.settings.skip_zero_transfers {
            return Ok(());
        }
        transfer
            .transfer(self, to, amount)
            .map_err(|e| RewardsError::TransferFailed {
                to: *to,
                amount,
                reason: e.to_string(),
            })
    }

    fn withdraw_member(
        &mut self,
        pool: &PoolId,
        member: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<()> {
        self.check_minimum(amount)?;
        let available = self.compute_reward_balance(pool, member)?;
        if amount > available {
            return Err(RewardsError::InvalidAmount {
                requested: amount,
                available,
            });
        }

        if amount > 0 {
            self.ledger.increase_shadow(member, pool, amount)?;
            self.ledger.withdraw_from_pool(pool, amount)?;
            self.events.push(RewardEvent::MemberRewardWithdrawn {
                pool: *pool,
                member: *member,
                amount,
            });
            info!(%pool, %member, amount, "rewards: member withdrawal");
        }

        self.pay_out(transfer, member, amount)
    }

    fn withdraw_operator(
        &mut self,
        pool: &PoolId,
        operator: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<()> {
        self.authorize_operator(pool, operator)?;
        self.check_minimum(amount)?;
        let available = self.ledger.vault().operator_balance_of(pool);
        if amount > available {
            return Err(RewardsError::InvalidAmount {
                requested: amount,
                available,
            });
        }

        if amount > 0 {
            self.ledger.withdraw_from_operator(pool, amount)?;
            self.events.push(RewardEvent::OperatorRewardWithdrawn {
                pool: *pool,
                operator: *operator,
                amount,
            });
            info!(%pool, %operator, amount, "rewards: operator withdrawal");
        }

        self.pay_out(transfer, operator, amount)
    }
}

impl<R: PoolRegistry, S: StakeLedger> RewardsApi for RewardsController<R, S> {
    fn get_reward_balance(&self, pool: &PoolId) -> u64 {
        self.ledger.vault().balance_of(pool)
    }

    fn get_reward_balance_of_operator(&self, pool: &PoolId) -> u64 {
        self.ledger.vault().operator_balance_of(pool)
    }

    fn compute_reward_balance(&self, pool: &PoolId, member: &Address) -> Result<u64> {
        let member_stake = self.stakes.delegated_stake(member, pool);
        let pool_stake = self.stakes.delegated_stake_total(pool);
        let shadow = self.ledger.shadow();
        let balance = self.ledger.vault().balance_of(pool);
        let payout = compute_payout(
            member_stake,
            pool_stake,
            shadow.get(member, pool),
            shadow.get_total(pool),
            balance,
        )?
        .min(balance);
        trace!(%pool, %member, member_stake, pool_stake, payout, "rewards: computed balance");
        Ok(payout)
    }

    fn withdraw_reward(
        &mut self,
        pool: &PoolId,
        member: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<()> {
        self.atomically("withdraw_reward", |this| {
            this.withdraw_member(pool, member, amount, transfer)
        })
    }

    fn withdraw_total_reward(
        &mut self,
        pool: &PoolId,
        member: &Address,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<u64> {
        self.atomically("withdraw_total_reward", |this| {
            let amount = this.compute_reward_balance(pool, member)?;
            this.withdraw_member(pool, member, amount, transfer)?;
            Ok(amount)
        })
    }

    fn withdraw_operator_reward(
        &mut self,
        pool: &PoolId,
        operator: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<()> {
        self.atomically("withdraw_operator_reward", |this| {
            this.withdraw_operator(pool, operator, amount, transfer)
        })
    }

    fn withdraw_total_operator_reward(
        &mut self,
        pool: &PoolId,
        operator: &Address,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<u64> {
        self.atomically("withdraw_total_operator_reward", |this| {
            this.authorize_operator(pool, operator)?;
            let amount = this.ledger.vault().operator_balance_of(pool);
            this.withdraw_operator(pool, operator, amount, transfer)?;
            Ok(amount)
        })
    }
}
