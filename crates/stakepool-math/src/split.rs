//! Operator/member split of incoming deposits.
//!
//! The operator receives `amount * share / 100`, rounded down. Members
//! receive the remainder so no unit is lost to rounding.

use stakepool_types::OPERATOR_SHARE_DENOMINATOR;

use crate::{narrow, MathError, Result};

/// A deposit divided between operator and members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositSplit {
    /// Portion credited to the operator.
    pub operator: u64,
    /// Portion credited to the member pool.
    pub members: u64,
}

/// Split a deposit by the pool's operator share (whole percent).
///
/// # Errors
///
/// - [`MathError::InvalidShare`] if `operator_share_pct > 100`
pub fn split_deposit(amount: u64, operator_share_pct: u8) -> Result<DepositSplit> {
    if operator_share_pct > OPERATOR_SHARE_DENOMINATOR {
        return Err(MathError::InvalidShare(operator_share_pct));
    }

    let operator = narrow(
        u128::from(amount) * u128::from(operator_share_pct)
            / u128::from(OPERATOR_SHARE_DENOMINATOR),
    )?;
    let members = amount - operator;

    Ok(DepositSplit { operator, members })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_default() {
        let split = split_deposit(1_000, 10).expect("split");
        assert_eq!(split.operator, 100);
        assert_eq!(split.members, 900);
    }

    #[test]
    fn test_split_remainder_to_members() {
        let split = split_deposit(33, 10).expect("split");
        assert_eq!(split.operator, 3);
        assert_eq!(split.members, 30);
        assert_eq!(split.operator + split.members, 33);
    }

    #[test]
    fn test_split_bounds() {
        assert_eq!(
            split_deposit(500, 0).expect("split"),
            DepositSplit { operator: 0, members: 500 }
        );
        assert_eq!(
            split_deposit(500, 100).expect("split"),
            DepositSplit { operator: 500, members: 0 }
        );
    }

    #[test]
    fn test_split_max_amount() {
        let split = split_deposit(u64::MAX, 100).expect("split");
        assert_eq!(split.operator, u64::MAX);
        assert_eq!(split.members, 0);
    }

    #[test]
    fn test_invalid_share() {
        assert_eq!(split_deposit(1, 101), Err(MathError::InvalidShare(101)));
    }
}
