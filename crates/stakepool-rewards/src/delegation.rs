//! Hooks applied when stake is delegated or undelegated.
//!
//! The stake ledger is owned by the delegation system. After it records a
//! change it calls the matching hook within the same unit of work; if the
//! hook fails, the delegation system must discard its own change as well.
//!
//! Because the hooks run after the stake change, they reconstruct the stake
//! as it was before it:
//!
//! ```text
//! delegation:    pool_stake_before   = pool_stake_now - amount
//! undelegation:  member_stake_before = member_stake_now + amount
//!                pool_stake_before   = pool_stake_now + amount
//! ```
//!
//! A payout made while undelegating therefore happens with stake, shadow
//! and vault all at their final values.

use stakepool_math::{compute_buy_in, compute_partial_payout, MathError};
use stakepool_types::{Address, PoolId};
use tracing::debug;

use crate::collaborators::{PoolRegistry, StakeLedger, ValueTransfer};
use crate::controller::RewardsController;
use crate::events::RewardEvent;
use crate::{Result, RewardsError};

impl<R: PoolRegistry, S: StakeLedger> RewardsController<R, S> {
    /// Record that `member` delegated `amount` more stake to `pool`.
    ///
    /// The member takes on a shadow balance equal to the value the new stake
    /// would otherwise claim from rewards already in the pool. Returns that
    /// buy-in.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::InvalidAmount`] if the stake ledger does not show
    ///   the delegation
    /// - [`RewardsError::Math`] or [`RewardsError::Ledger`] on overflow
    pub fn on_stake_delegated(&mut self, pool: &PoolId, member: &Address, amount: u64) -> Result<u64> {
        self.atomically("on_stake_delegated", |this| {
            let pool_stake_now = this.stakes.delegated_stake_total(pool);
            let member_stake_now = this.stakes.delegated_stake(member, pool);
            if amount > member_stake_now || amount > pool_stake_now {
                return Err(RewardsError::InvalidAmount {
                    requested: amount,
                    available: member_stake_now,
                });
            }
            let pool_stake_before = pool_stake_now - amount;

            let buy_in = compute_buy_in(
                amount,
                pool_stake_before,
                this.ledger.shadow().get_total(pool),
                this.ledger.vault().balance_of(pool),
            )?;
            if buy_in > 0 {
                this.ledger.increase_shadow(member, pool, buy_in)?;
            }

            this.events.push(RewardEvent::StakeBoughtIn {
                pool: *pool,
                member: *member,
                stake: amount,
                buy_in,
            });
            debug!(%pool, %member, amount, buy_in, "rewards: stake delegated");
            Ok(buy_in)
        })
    }

    /// Record that `member` undelegated `amount` of stake from `pool` and
    /// pay out what that stake is owed.
    ///
    /// Shadow balance is released in proportion to the stake leaving. On a
    /// partial exit the release is bounded by the leaving stake's gross
    /// share, so the members who stay are owed no less afterwards. The
    /// payout never exceeds the member's whole entitlement or the pool
    /// balance. Returns the amount paid.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::Math`] if the stake ledger reports more stake for
    ///   the member than for the pool, or on overflow
    /// - [`RewardsError::TransferFailed`] if the payout is rejected
    pub fn on_stake_undelegated(
        &mut self,
        pool: &PoolId,
        member: &Address,
        amount: u64,
        transfer: &mut dyn ValueTransfer,
    ) -> Result<u64> {
        self.atomically("on_stake_undelegated", |this| {
            let member_stake_before = this
                .stakes
                .delegated_stake(member, pool)
                .checked_add(amount)
                .ok_or(MathError::Overflow)?;
            let pool_stake_before = this
                .stakes
                .delegated_stake_total(pool)
                .checked_add(amount)
                .ok_or(MathError::Overflow)?;

            let shadow = this.ledger.shadow();
            let balance = this.ledger.vault().balance_of(pool);
            let mut payout = compute_partial_payout(
                amount,
                member_stake_before,
                pool_stake_before,
                shadow.get(member, pool),
                shadow.get_total(pool),
                balance,
            )?;
            payout.real = payout.real.min(balance);

            this.ledger.decrease_shadow(member, pool, payout.shadow)?;
            this.ledger.withdraw_from_pool(pool, payout.real)?;
            this.events.push(RewardEvent::StakePaidOut {
                pool: *pool,
                member: *member,
                stake: amount,
                payout: payout.real,
                shadow_released: payout.shadow,
            });
            debug!(
                %pool,
                %member,
                amount,
                payout = payout.real,
                shadow_released = payout.shadow,
                "rewards: stake undelegated"
            );

            this.pay_out(transfer, member, payout.real)?;
            Ok(payout.real)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::api::RewardsApi;
    use crate::controller::tests::{addr, funded, pool, Wallet};
    use crate::ErrorKind;

    #[test]
    fn test_newcomer_cannot_claim_past_rewards() {
        let mut c = funded();
        c.stakes_mut().set(addr(3), pool(1), 100);
        let buy_in = c.on_stake_delegated(&pool(1), &addr(3), 100).expect("delegate");

        // Pool of 100 stake held 100 reward; 100 new stake buys in at 100.
        assert_eq!(buy_in, 100);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(3)).expect("compute"), 0);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(1)).expect("compute"), 50);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(2)).expect("compute"), 50);
    }

    #[test]
    fn test_newcomer_shares_future_rewards() {
        let mut c = funded();
        c.stakes_mut().set(addr(3), pool(1), 100);
        c.on_stake_delegated(&pool(1), &addr(3), 100).expect("delegate");
        c.deposit_to_pool(&pool(1), 200).expect("deposit");

        assert_eq!(c.compute_reward_balance(&pool(1), &addr(3)).expect("compute"), 100);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(1)).expect("compute"), 100);
    }

    #[test]
    fn test_first_delegation_into_empty_pool() {
        let mut c = funded();
        c.stakes_mut().set(addr(1), pool(2), 10);
        let buy_in = c.on_stake_delegated(&pool(2), &addr(1), 10).expect("delegate");
        assert_eq!(buy_in, 0);
        assert_eq!(c.shadow_balance_total(&pool(2)), 0);
    }

    #[test]
    fn test_delegation_not_recorded_rejected() {
        let mut c = funded();
        let err = c
            .on_stake_delegated(&pool(1), &addr(1), 51)
            .expect_err("stake ledger shows only 50");
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert_eq!(c.shadow_balance_total(&pool(1)), 0);
    }

    #[test]
    fn test_full_undelegation_pays_entitlement() {
        let mut c = funded();
        let mut wallet = Wallet::default();
        c.stakes_mut().set(addr(1), pool(1), 0);
        let paid = c
            .on_stake_undelegated(&pool(1), &addr(1), 50, &mut wallet)
            .expect("undelegate");

        assert_eq!(paid, 50);
        assert_eq!(wallet.received, vec![(addr(1), 50)]);
        assert_eq!(c.get_reward_balance(&pool(1)), 50);
        assert_eq!(c.shadow_balance_total(&pool(1)), 0);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(1)).expect("compute"), 0);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(2)).expect("compute"), 50);
    }

    #[test]
    fn test_partial_undelegation_after_withdrawal() {
        let mut c = funded();
        let mut wallet = Wallet::default();
        c.withdraw_reward(&pool(1), &addr(1), 40, &mut wallet).expect("withdraw");

        c.stakes_mut().set(addr(1), pool(1), 25);
        let paid = c
            .on_stake_undelegated(&pool(1), &addr(1), 25, &mut wallet)
            .expect("undelegate");

        // Half the stake leaves with half the shadow: 25 * 100 / 100 - 20.
        assert_eq!(paid, 5);
        assert_eq!(c.shadow_balance_of(&pool(1), &addr(1)), 20);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(1)).expect("compute"), 5);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(2)).expect("compute"), 50);
        assert!(c.ledger().shadow().is_consistent());
    }

    #[test]
    fn test_clamped_partial_exit_leaves_others_owed() {
        let mut c = funded();
        let mut wallet = Wallet::default();
        c.stakes_mut().set(addr(3), pool(1), 100);
        // Gross share of addr(1) is 50 * 140 / 200 = 35, below its shadow.
        c.ledger.increase_shadow(&addr(1), &pool(1), 40).expect("shadow");
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(1)).expect("compute"), 0);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(2)).expect("compute"), 35);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(3)).expect("compute"), 70);

        c.stakes_mut().set(addr(1), pool(1), 25);
        let paid = c
            .on_stake_undelegated(&pool(1), &addr(1), 25, &mut wallet)
            .expect("undelegate");

        // 25 stake leaves with its gross share of 17 in shadow, not ceil(40 / 2).
        assert_eq!(paid, 0);
        assert_eq!(c.shadow_balance_of(&pool(1), &addr(1)), 23);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(2)).expect("compute"), 35);
        assert_eq!(c.compute_reward_balance(&pool(1), &addr(3)).expect("compute"), 70);
        assert!(c.ledger().shadow().is_consistent());
    }

    #[test]
    fn test_refused_payout_rolls_back_shadow() {
        let mut c = funded();
        let mut wallet = Wallet {
            refuse: true,
            ..Default::default()
        };
        c.withdraw_reward(&pool(1), &addr(1), 10, &mut Wallet::default())
            .expect("withdraw");
        c.stakes_mut().set(addr(1), pool(1), 0);

        let err = c
            .on_stake_undelegated(&pool(1), &addr(1), 50, &mut wallet)
            .expect_err("refused");
        assert_eq!(err.kind(), ErrorKind::TransferFailed);
        assert_eq!(c.shadow_balance_of(&pool(1), &addr(1)), 10);
        assert_eq!(c.get_reward_balance(&pool(1)), 90);
    }

    #[test]
    fn test_zero_undelegation_is_noop() {
        let mut c = funded();
        let mut wallet = Wallet::default();
        let paid = c
            .on_stake_undelegated(&pool(1), &addr(9), 0, &mut wallet)
            .expect("undelegate");
        assert_eq!(paid, 0);
        assert!(wallet.received.is_empty());
        assert_eq!(c.get_reward_balance(&pool(1)), 100);
    }
}
