//! Serializable ledger snapshots.
//!
//! A snapshot captures both stores keyed by pool. Maps are ordered and zero
//! entries are left out, so ledgers holding the same balances produce the
//! same snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stakepool_types::{Address, PoolId};

use crate::shadow::PoolShadow;
use crate::{BalanceVault, Ledger, LedgerError, PoolBalances, Result, ShadowLedger};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// State of one pool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Operator portion of the vault.
    pub operator_balance: u64,
    /// Member portion of the vault.
    pub pool_balance: u64,
    /// Shadow total across members.
    pub shadow_total: u64,
    /// Shadow balance per member.
    #[serde(default)]
    pub shadow: BTreeMap<Address, u64>,
}

/// State of the whole ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Format version.
    pub version: u32,
    /// Every pool with any recorded state.
    pub pools: BTreeMap<PoolId, PoolSnapshot>,
}

impl Ledger {
    /// Capture the current state.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::OperationInFlight`] if a checkpoint is open
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.ensure_idle()?;

        let mut pools: BTreeMap<PoolId, PoolSnapshot> = BTreeMap::new();
        for (pool, balances) in &self.vault.pools {
            let entry = pools.entry(*pool).or_default();
            entry.operator_balance = balances.operator_balance;
            entry.pool_balance = balances.pool_balance;
        }
        for (pool, shadow) in &self.shadow.pools {
            let entry = pools.entry(*pool).or_default();
            entry.shadow_total = shadow.total;
            entry.shadow = shadow
                .members
                .iter()
                .filter(|(_, v)| **v != 0)
                .map(|(m, v)| (*m, *v))
                .collect();
        }
        // Zero entries carry no state.
        pools.retain(|_, state| *state != PoolSnapshot::default());

        Ok(LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            pools,
        })
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InconsistentSnapshot`] if a pool's member shadow
    ///   balances do not sum to its total
    /// - [`LedgerError::Serialization`] on an unknown version
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::Serialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut shadow = ShadowLedger::new();
        let mut vault = BalanceVault::new();
        for (pool, state) in &snapshot.pools {
            let sum: u128 = state.shadow.values().map(|v| u128::from(*v)).sum();
            if sum != u128::from(state.shadow_total) {
                return Err(LedgerError::InconsistentSnapshot {
                    pool: *pool,
                    sum,
                    total: state.shadow_total,
                });
            }
            vault.pools.insert(
                *pool,
                PoolBalances {
                    operator_balance: state.operator_balance,
                    pool_balance: state.pool_balance,
                },
            );
            shadow.pools.insert(
                *pool,
                PoolShadow {
                    total: state.shadow_total,
                    members: state.shadow.iter().map(|(m, v)| (*m, *v)).collect(),
                },
            );
        }

        tracing::debug!(pools = snapshot.pools.len(), "ledger: restored from snapshot");
        Ok(Self::from_parts(shadow, vault))
    }
}

impl LedgerSnapshot {
    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Serialization`] if encoding fails
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Decode from JSON.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Serialization`] if the input is not a valid snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}
