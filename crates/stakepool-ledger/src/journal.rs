//! Journaled writer over the shadow ledger and the vault.
//!
//! [`Ledger`] is the only type allowed to mutate a [`ShadowLedger`] or a
//! [`BalanceVault`]. While at least one [`Checkpoint`] is open, every write
//! pushes the overwritten value onto an undo journal.
//!
//! Checkpoints nest. Committing an inner checkpoint keeps its entries on the
//! journal so that a rollback of the enclosing checkpoint also undoes the
//! inner work. The journal is cleared once the outermost checkpoint commits.

use stakepool_types::{Address, PoolId};

use crate::{BalanceVault, LedgerError, Result, ShadowLedger};

/// Value overwritten by a journaled write.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Undo {
    Shadow {
        pool: PoolId,
        member: Address,
        member_prev: u64,
        total_prev: u64,
    },
    PoolBalance {
        pool: PoolId,
        prev: u64,
    },
    OperatorBalance {
        pool: PoolId,
        prev: u64,
    },
}

/// Position in the undo journal marking the start of an operation.
#[must_use = "a checkpoint must be committed or rolled back"]
#[derive(Debug, PartialEq, Eq)]
pub struct Checkpoint {
    mark: usize,
    depth: usize,
}

/// Shadow ledger and vault with an undo journal.
#[derive(Debug, Default)]
pub struct Ledger {
    pub(crate) shadow: ShadowLedger,
    pub(crate) vault: BalanceVault,
    journal: Vec<Undo>,
    depth: usize,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger around existing stores.
    pub fn from_parts(shadow: ShadowLedger, vault: BalanceVault) -> Self {
        Self {
            shadow,
            vault,
            journal: Vec::new(),
            depth: 0,
        }
    }

    /// Read access to the shadow ledger.
    pub fn shadow(&self) -> &ShadowLedger {
        &self.shadow
    }

    /// Read access to the vault.
    pub fn vault(&self) -> &BalanceVault {
        &self.vault
    }

    /// Number of checkpoints currently open.
    pub fn open_checkpoints(&self) -> usize {
        self.depth
    }

    /// Open a checkpoint.
    pub fn begin(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            mark: self.journal.len(),
            depth: self.depth,
        }
    }

    /// Keep every write made since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert_eq!(checkpoint.depth, self.depth, "checkpoints must close in order");
        self.close();
    }

    /// Undo every write made since `checkpoint`, including writes of nested
    /// operations that already committed.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        debug_assert_eq!(checkpoint.depth, self.depth, "checkpoints must close in order");
        let undone = self.journal.len().saturating_sub(checkpoint.mark);
        while self.journal.len() > checkpoint.mark {
            if let Some(entry) = self.journal.pop() {
                self.apply(entry);
            }
        }
        tracing::trace!(undone, depth = self.depth, "ledger: rolled back");
        self.close();
    }

    /// Add `amount` to a member's shadow balance and the pool total.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if either value would exceed `u64::MAX`
    pub fn increase_shadow(&mut self, member: &Address, pool: &PoolId, amount: u64) -> Result<()> {
        let undo = self.shadow_undo(member, pool);
        self.shadow.increase(member, pool, amount)?;
        self.record(undo);
        Ok(())
    }

    /// Subtract `amount` from a member's shadow balance and the pool total.
    ///
    /// Only stake undelegation releases shadow balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ShadowUnderflow`] if the member holds less than `amount`
    pub fn decrease_shadow(&mut self, member: &Address, pool: &PoolId, amount: u64) -> Result<()> {
        let undo = self.shadow_undo(member, pool);
        self.shadow.decrease(member, pool, amount)?;
        self.record(undo);
        Ok(())
    }

    /// Credit the member portion of `pool`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the balance would exceed `u64::MAX`
    pub fn deposit_to_pool(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let prev = self.vault.balance_of(pool);
        self.vault.deposit_to_pool(pool, amount)?;
        self.record(Undo::PoolBalance { pool: *pool, prev });
        Ok(())
    }

    /// Credit the operator portion of `pool`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the balance would exceed `u64::MAX`
    pub fn deposit_to_operator(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let prev = self.vault.operator_balance_of(pool);
        self.vault.deposit_to_operator(pool, amount)?;
        self.record(Undo::OperatorBalance { pool: *pool, prev });
        Ok(())
    }

    /// Debit the member portion of `pool`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] if `amount` exceeds the balance
    pub fn withdraw_from_pool(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let prev = self.vault.balance_of(pool);
        self.vault.withdraw_from_pool(pool, amount)?;
        self.record(Undo::PoolBalance { pool: *pool, prev });
        Ok(())
    }

    /// Debit the operator portion of `pool`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] if `amount` exceeds the balance
    pub fn withdraw_from_operator(&mut self, pool: &PoolId, amount: u64) -> Result<()> {
        let prev = self.vault.operator_balance_of(pool);
        self.vault.withdraw_from_operator(pool, amount)?;
        self.record(Undo::OperatorBalance { pool: *pool, prev });
        Ok(())
    }

    pub(crate) fn ensure_idle(&self) -> Result<()> {
        if self.depth > 0 {
            return Err(LedgerError::OperationInFlight(self.depth));
        }
        Ok(())
    }

    fn shadow_undo(&self, member: &Address, pool: &PoolId) -> Undo {
        Undo::Shadow {
            pool: *pool,
            member: *member,
            member_prev: self.shadow.get(member, pool),
            total_prev: self.shadow.get_total(pool),
        }
    }

    fn record(&mut self, undo: Undo) {
        if self.depth > 0 {
            self.journal.push(undo);
        }
    }

    fn apply(&mut self, undo: Undo) {
        match undo {
            Undo::Shadow {
                pool,
                member,
                member_prev,
                total_prev,
            } => self.shadow.set(&member, &pool, member_prev, total_prev),
            Undo::PoolBalance { pool, prev } => self.vault.set_pool_balance(&pool, prev),
            Undo::OperatorBalance { pool, prev } => self.vault.set_operator_balance(&pool, prev),
        }
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }
}
