//! Events emitted by successful controller operations.
//!
//! Events of an operation that rolls back are discarded with it.

use serde::{Deserialize, Serialize};
use stakepool_types::{Address, PoolId};

/// A state change recorded by the controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardEvent {
    /// Rewards credited to a pool.
    Deposited {
        pool: PoolId,
        operator_amount: u64,
        member_amount: u64,
    },
    /// A member withdrew part of their entitlement.
    MemberRewardWithdrawn {
        pool: PoolId,
        member: Address,
        amount: u64,
    },
    /// The operator withdrew from the operator balance.
    OperatorRewardWithdrawn {
        pool: PoolId,
        operator: Address,
        amount: u64,
    },
    /// New stake took on shadow balance for rewards accrued before it.
    StakeBoughtIn {
        pool: PoolId,
        member: Address,
        stake: u64,
        buy_in: u64,
    },
    /// Leaving stake was paid its entitlement.
    StakePaidOut {
        pool: PoolId,
        member: Address,
        stake: u64,
        payout: u64,
        shadow_released: u64,
    },
}

impl RewardEvent {
    /// The pool the event concerns.
    pub fn pool(&self) -> &PoolId {
        match self {
            Self::Deposited { pool, .. }
            | Self::MemberRewardWithdrawn { pool, .. }
            | Self::OperatorRewardWithdrawn { pool, .. }
            | Self::StakeBoughtIn { pool, .. }
            | Self::StakePaidOut { pool, .. } => pool,
        }
    }
}
