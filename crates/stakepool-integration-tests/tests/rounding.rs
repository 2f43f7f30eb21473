//! Integration test: rounding drift and conservation.
//!
//! Exercises the ledger under many small and random operations:
//! 1. Many one-unit withdrawals add up to the original entitlement
//! 2. Chunked withdrawals of an entitlement lose nothing to rounding
//! 3. Random operation sequences keep shadow totals consistent, conserve
//!    value, and never owe members more than one unit each above the
//!    balance
//! 4. Partial undelegations never lower what the other members are owed
//! 5. Withdrawals above the entitlement fail and leave the ledger untouched
//! 6. After every member withdraws, at most one unit per member is left

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stakepool_integration_tests::{address, controller, delegate, pool, undelegate, Controller, Wallet};
use stakepool_rewards::{ErrorKind, PoolRegistry, RewardsApi, StakeLedger};

const OPERATOR: u8 = 0xA0;

fn three_member_pool(balance: u64) -> Controller {
    let mut c = controller();
    c.registry_mut().register(pool(1), address(OPERATOR), 0);
    for member in 1..=3 {
        delegate(&mut c, &pool(1), &address(member), 1).expect("delegate");
    }
    c.deposit_to_pool(&pool(1), balance).expect("deposit");
    c
}

#[test]
fn unit_withdrawals_sum_to_entitlement() {
    let mut c = three_member_pool(100);
    let mut wallet = Wallet::default();
    let initial = c
        .compute_reward_balance(&pool(1), &address(1))
        .expect("compute");
    assert_eq!(initial, 33);

    let mut withdrawals = 0;
    loop {
        let available = c
            .compute_reward_balance(&pool(1), &address(1))
            .expect("compute");
        if available == 0 {
            break;
        }
        assert_eq!(available, initial - withdrawals);
        c.withdraw_reward(&pool(1), &address(1), 1, &mut wallet)
            .expect("withdraw one unit");
        withdrawals += 1;
    }

    assert_eq!(withdrawals, 33);
    assert_eq!(wallet.total_to(&address(1)), 33);
    for member in 2..=3 {
        let paid = c
            .withdraw_total_reward(&pool(1), &address(member), &mut wallet)
            .expect("withdraw");
        assert_eq!(paid, 33);
    }
    assert_eq!(c.get_reward_balance(&pool(1)), 1);
    assert!(c.ledger().shadow().is_consistent());
}

#[test]
fn chunked_withdrawals_lose_nothing() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for round in 0..50 {
        let balance = rng.gen_range(1_000..1_000_000);
        let mut c = three_member_pool(balance);
        let mut wallet = Wallet::default();
        let entitlement = c
            .compute_reward_balance(&pool(1), &address(2))
            .expect("compute");

        loop {
            let available = c
                .compute_reward_balance(&pool(1), &address(2))
                .expect("compute");
            if available == 0 {
                break;
            }
            let chunk = rng.gen_range(1..=available);
            c.withdraw_reward(&pool(1), &address(2), chunk, &mut wallet)
                .expect("withdraw chunk");
        }

        assert_eq!(wallet.total(), entitlement, "round {round}");
        assert_eq!(
            c.compute_reward_balance(&pool(1), &address(1))
                .expect("compute"),
            entitlement,
            "other members unaffected in round {round}"
        );
    }
}

const POOLS: [u8; 2] = [1, 2];
const MEMBERS: u8 = 5;

fn member_entitlements(c: &Controller, pool_id: u8) -> u64 {
    (1..=MEMBERS)
        .map(|m| {
            c.compute_reward_balance(&pool(pool_id), &address(m))
                .expect("compute")
        })
        .sum()
}

fn held_balances(c: &Controller) -> u64 {
    POOLS
        .iter()
        .map(|p| c.get_reward_balance(&pool(*p)) + c.get_reward_balance_of_operator(&pool(*p)))
        .sum()
}

#[test]
fn random_operations_keep_invariants() {
    let mut rng = StdRng::seed_from_u64(20_240_601);
    let mut c = controller();
    c.registry_mut().register(pool(1), address(OPERATOR), 10);
    c.registry_mut().register(pool(2), address(OPERATOR + 1), 0);
    let mut wallet = Wallet::default();
    let mut deposited: u64 = 0;

    for step in 0..2_000 {
        let p = pool(POOLS[rng.gen_range(0..POOLS.len())]);
        let m = address(rng.gen_range(1..=MEMBERS));

        match rng.gen_range(0..7) {
            0 => {
                let amount = rng.gen_range(0..500);
                c.record_deposit(&p, amount).expect("deposit");
                deposited += amount;
            }
            1 => {
                delegate(&mut c, &p, &m, rng.gen_range(1..100)).expect("delegate");
            }
            2 => {
                let held = c.stakes().delegated_stake(&m, &p);
                if held > 0 {
                    let amount = rng.gen_range(1..=held);
                    let others: Vec<_> = (1..=MEMBERS)
                        .map(address)
                        .filter(|other| *other != m)
                        .map(|other| {
                            let owed = c.compute_reward_balance(&p, &other).expect("compute");
                            (other, owed)
                        })
                        .collect();

                    undelegate(&mut c, &p, &m, amount, &mut wallet).expect("undelegate");

                    if amount < held {
                        let balance = c.get_reward_balance(&p);
                        for (other, before) in others {
                            let after = c.compute_reward_balance(&p, &other).expect("compute");
                            assert!(
                                after >= before || after == balance,
                                "step {step}: {other} owed {after}, was {before}"
                            );
                        }
                    }
                }
            }
            3 => {
                let available = c.compute_reward_balance(&p, &m).expect("compute");
                let amount = rng.gen_range(0..=available);
                c.withdraw_reward(&p, &m, amount, &mut wallet)
                    .expect("withdraw within entitlement");
            }
            4 => {
                c.withdraw_total_reward(&p, &m, &mut wallet)
                    .expect("withdraw total");
            }
            5 => {
                let available = c.compute_reward_balance(&p, &m).expect("compute");
                let before = c.snapshot().expect("snapshot");
                let events = c.events().len();
                let err = c
                    .withdraw_reward(&p, &m, available + rng.gen_range(1..10), &mut wallet)
                    .expect_err("above entitlement");
                assert_eq!(err.kind(), ErrorKind::InvalidAmount, "step {step}");
                assert_eq!(c.snapshot().expect("snapshot"), before, "step {step}");
                assert_eq!(c.events().len(), events, "step {step}");
            }
            _ => {
                let operator = c.registry().operator_of(&p).expect("registered pool");
                let available = c.get_reward_balance_of_operator(&p);
                let amount = rng.gen_range(0..=available);
                c.withdraw_operator_reward(&p, &operator, amount, &mut wallet)
                    .expect("operator withdrawal");
            }
        }

        assert!(c.ledger().shadow().is_consistent(), "step {step}");
        assert_eq!(deposited, wallet.total() + held_balances(&c), "step {step}");
        for pool_id in POOLS {
            let owed = member_entitlements(&c, pool_id);
            let held = c.get_reward_balance(&pool(pool_id));
            assert!(
                owed <= held + u64::from(MEMBERS),
                "step {step}: members owed {owed} against {held}"
            );
        }
    }
    assert_eq!(c.ledger().open_checkpoints(), 0);

    for pool_id in POOLS {
        for m in 1..=MEMBERS {
            c.withdraw_total_reward(&pool(pool_id), &address(m), &mut wallet)
                .expect("final withdrawal never lacks funds");
        }
        let operator = c
            .registry()
            .operator_of(&pool(pool_id))
            .expect("registered pool");
        c.withdraw_total_operator_reward(&pool(pool_id), &operator, &mut wallet)
            .expect("final operator withdrawal");

        assert_eq!(c.get_reward_balance_of_operator(&pool(pool_id)), 0);
        if c.stakes().delegated_stake_total(&pool(pool_id)) > 0 {
            assert!(c.get_reward_balance(&pool(pool_id)) <= u64::from(MEMBERS));
        }
    }
    assert_eq!(deposited, wallet.total() + held_balances(&c));
}
