//! Entitlement, buy-in and partial payout formulas.
//!
//! ## Formulas
//!
//! ```text
//! total   = pool_balance + pool_shadow
//! payout  = max(0, member_stake * total / pool_stake - member_shadow)
//! buy_in  = ceil(amount * total / pool_stake)
//! share   = part * total / pool_stake
//! shadow  = min(ceil(member_shadow * part / member_stake), share)
//! ```
//!
//! Buy-ins round up and payouts round down. The shadow released by a partial
//! exit rounds up but never exceeds the gross share of the stake leaving, so
//! value released from the pool on a partial exit is at most that share and
//! the members who stay are owed no less than before. A full exit releases
//! the member's whole shadow balance.

use crate::{narrow, MathError, Result};

/// Amount of `pool_balance` a member may withdraw right now.
///
/// # Arguments
///
/// * `member_stake` - Stake the member currently delegates to the pool
/// * `pool_stake` - Total stake delegated to the pool
/// * `member_shadow` - Value the member has already realized
/// * `pool_shadow` - Value realized across all members
/// * `pool_balance` - Live member-portion balance held for the pool
///
/// Returns 0 when the pool has no stake. A gross share smaller than the
/// member's shadow balance (possible through buy-in rounding) clamps to 0.
///
/// # Errors
///
/// - [`MathError::StakeExceedsPool`] if `member_stake > pool_stake`
/// - [`MathError::Overflow`] if the product or result does not fit
pub fn compute_payout(
    member_stake: u64,
    pool_stake: u64,
    member_shadow: u64,
    pool_shadow: u64,
    pool_balance: u64,
) -> Result<u64> {
    if pool_stake == 0 {
        return Ok(0);
    }
    if member_stake > pool_stake {
        return Err(MathError::StakeExceedsPool {
            member: member_stake,
            pool: pool_stake,
        });
    }

    let total = u128::from(pool_balance) + u128::from(pool_shadow);
    let gross = u128::from(member_stake)
        .checked_mul(total)
        .ok_or(MathError::Overflow)?
        / u128::from(pool_stake);

    narrow(gross.saturating_sub(u128::from(member_shadow)))
}

/// Shadow balance a member must take on when delegating `amount` more stake.
///
/// The buy-in equals the value the new stake would otherwise claim from
/// rewards accrued before it arrived. Rounds up. Returns 0 when the pool has
/// no stake yet, in which case the new stake owns the whole pool.
///
/// # Arguments
///
/// * `amount` - Stake being delegated
/// * `pool_stake` - Pool stake before the delegation
/// * `pool_shadow` - Pool shadow total before the delegation
/// * `pool_balance` - Live member-portion balance
///
/// # Errors
///
/// - [`MathError::Overflow`] if the product or result does not fit
pub fn compute_buy_in(
    amount: u64,
    pool_stake: u64,
    pool_shadow: u64,
    pool_balance: u64,
) -> Result<u64> {
    if pool_stake == 0 {
        return Ok(0);
    }

    let total = u128::from(pool_balance) + u128::from(pool_shadow);
    let divisor = u128::from(pool_stake);
    let numerator = u128::from(amount)
        .checked_mul(total)
        .ok_or(MathError::Overflow)?
        .checked_add(divisor - 1)
        .ok_or(MathError::Overflow)?;

    narrow(numerator / divisor)
}

/// Result of releasing part of a member's stake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartialPayout {
    /// Value paid out of the pool balance.
    pub real: u64,
    /// Shadow balance released along with the stake.
    pub shadow: u64,
}

/// Payout owed when a member undelegates `partial` of their `member_stake`.
///
/// The member's shadow balance is released in proportion to the stake
/// leaving, rounded up. On a partial exit the release is bounded by the
/// gross share of the leaving stake, so `real + shadow` never exceeds that
/// share. The payout is the entitlement of the leaving stake net of the
/// released shadow, capped at the member's whole entitlement.
///
/// # Errors
///
/// - [`MathError::PartialExceedsWhole`] if `partial > member_stake`
/// - [`MathError::StakeExceedsPool`] if `member_stake > pool_stake`
/// - [`MathError::Overflow`] if an intermediate value does not fit
pub fn compute_partial_payout(
    partial: u64,
    member_stake: u64,
    pool_stake: u64,
    member_shadow: u64,
    pool_shadow: u64,
    pool_balance: u64,
) -> Result<PartialPayout> {
    if partial > member_stake {
        return Err(MathError::PartialExceedsWhole {
            partial,
            whole: member_stake,
        });
    }
    if member_stake > pool_stake {
        return Err(MathError::StakeExceedsPool {
            member: member_stake,
            pool: pool_stake,
        });
    }
    if partial == 0 {
        return Ok(PartialPayout::default());
    }

    let divisor = u128::from(member_stake);
    if divisor == 0 {
        return Err(MathError::DivisionByZero);
    }
    let proportional = narrow(
        u128::from(member_shadow)
            .checked_mul(u128::from(partial))
            .ok_or(MathError::Overflow)?
            .div_ceil(divisor),
    )?;
    let shadow = if partial == member_stake {
        member_shadow
    } else {
        let share = compute_payout(partial, pool_stake, 0, pool_shadow, pool_balance)?;
        proportional.min(share)
    };
    let leaving = compute_payout(partial, pool_stake, shadow, pool_shadow, pool_balance)?;
    let whole = compute_payout(member_stake, pool_stake, member_shadow, pool_shadow, pool_balance)?;

    Ok(PartialPayout {
        real: leaving.min(whole),
        shadow,
    })
}
