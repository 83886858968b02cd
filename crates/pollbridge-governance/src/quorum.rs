//! Quorum threshold math.
//!
//! Thresholds are expressed in basis points of the eligible snapshot and
//! rounded up, so a 50% quorum over 101 members needs 51 votes.

use pollbridge_types::MAX_BPS;
use crate::error::GovernanceError;

/// Reject basis-point values above 100%.
pub fn validate_bps(bps: u16) -> Result<(), GovernanceError> {
    if bps > MAX_BPS {
        return Err(GovernanceError::BadBps(bps));
    }
    Ok(())
}

/// Minimum number of votes needed to reach `bps` of `total`.
///
/// Computes `ceil(total * bps / 10000)` without intermediate rounding.
/// Fails with `QuorumOverflow` instead of wrapping when the product does
/// not fit in a u64.
pub fn required_count(total: u64, bps: u16) -> Result<u64, GovernanceError> {
    validate_bps(bps)?;

    if total == 0 || bps == 0 {
        return Ok(0);
    }
    if bps == MAX_BPS {
        return Ok(total);
    }

    let product = total
        .checked_mul(u64::from(bps))
        .ok_or(GovernanceError::QuorumOverflow { total, bps })?;

    Ok(product.div_ceil(u64::from(MAX_BPS)))
}

/// Whether `count` votes meet a `bps` quorum over `total` eligible voters.
pub fn meets_quorum(count: u64, total: u64, bps: u16) -> Result<bool, GovernanceError> {
    Ok(count >= required_count(total, bps)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_required_count_known_values() {
        assert_eq!(required_count(101, 5000).unwrap(), 51);
        assert_eq!(required_count(200, 2500).unwrap(), 50);
        assert_eq!(required_count(3, 3333).unwrap(), 1);
        assert_eq!(required_count(10, 6000).unwrap(), 6);
    }

    #[test]
    fn test_required_count_edges() {
        assert_eq!(required_count(0, 5000).unwrap(), 0);
        assert_eq!(required_count(50, 0).unwrap(), 0);
        assert_eq!(required_count(50, 10_000).unwrap(), 50);
        // Full quorum never multiplies, so it cannot overflow
        assert_eq!(required_count(u64::MAX, 10_000).unwrap(), u64::MAX);
        assert_eq!(required_count(1, 1).unwrap(), 1);
    }

    #[test]
    fn test_bad_bps() {
        assert_eq!(validate_bps(10_001), Err(GovernanceError::BadBps(10_001)));
        assert_eq!(required_count(10, 10_001), Err(GovernanceError::BadBps(10_001)));
        assert!(validate_bps(10_000).is_ok());
    }

    #[test]
    fn test_overflow_is_reported() {
        let result = required_count(u64::MAX, 5000);
        assert_eq!(
            result,
            Err(GovernanceError::QuorumOverflow { total: u64::MAX, bps: 5000 })
        );
    }

    #[test]
    fn test_meets_quorum() {
        assert!(!meets_quorum(5, 10, 6000).unwrap());
        assert!(meets_quorum(6, 10, 6000).unwrap());
        assert!(meets_quorum(0, 0, 6000).unwrap());
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_total(total in 0u64..1_000_000_000_000, bps in 0u16..=10_000) {
            let a = required_count(total, bps).unwrap();
            let b = required_count(total + 1, bps).unwrap();
            prop_assert!(a <= b);
        }

        #[test]
        fn prop_monotonic_in_bps(total in 0u64..1_000_000_000_000, bps in 0u16..10_000) {
            let a = required_count(total, bps).unwrap();
            let b = required_count(total, bps + 1).unwrap();
            prop_assert!(a <= b);
        }

        #[test]
        fn prop_never_exceeds_total(total in 0u64..1_000_000_000_000, bps in 0u16..=10_000) {
            prop_assert!(required_count(total, bps).unwrap() <= total);
        }
    }
}
