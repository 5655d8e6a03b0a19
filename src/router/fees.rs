//! Fee distribution across protocol groups.
//!
//! Global (batch-wide) fees are spread proportionally to how many of the
//! batch's items each group is responsible for, not proportionally to value.
//! A flat referral fee over a 4-item batch where one group holds 3 items
//! gives that group 3/4 of the fee, floor division. Local (per-detail) fees
//! pass through unscaled.

use alloy_primitives::U256;

use crate::error::BuildError;
use crate::types::Fee;

/// Fees for one protocol group: the group's proportional share of every
/// global fee, then every member's own local fees, with unchargeable entries
/// (zero amount or zero recipient) filtered out.
pub fn group_fees<'a>(
    group_len: usize,
    batch_len: usize,
    global_fees: &[Fee],
    local_fees: impl Iterator<Item = &'a Fee>,
) -> Result<Vec<Fee>, BuildError> {
    let mut fees = Vec::new();

    for fee in global_fees {
        let scaled = fee
            .amount
            .checked_mul(U256::from(group_len))
            .ok_or(BuildError::Overflow)?
            / U256::from(batch_len.max(1));
        fees.push(Fee::new(fee.recipient, scaled));
    }

    fees.extend(local_fees.cloned());
    fees.retain(Fee::is_chargeable);

    Ok(fees)
}

/// Sum of fee amounts.
pub fn total(fees: &[Fee]) -> Result<U256, BuildError> {
    let mut sum = U256::ZERO;
    for fee in fees {
        sum = sum.checked_add(fee.amount).ok_or(BuildError::Overflow)?;
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn fee(byte: u8, amount: u64) -> Fee {
        Fee::new(Address::repeat_byte(byte), U256::from(amount))
    }

    #[test]
    fn test_global_fee_scales_by_item_count() {
        // 3 of 4 items in this group => 3/4 of the fee
        let fees = group_fees(3, 4, &[fee(0x01, 1000)], std::iter::empty()).unwrap();
        assert_eq!(fees, vec![fee(0x01, 750)]);
    }

    #[test]
    fn test_split_never_exceeds_requested_total() {
        // 1000 split 2/3 + 1/3: floor(666) + floor(333) = 999, one wei lost
        // to truncation, none fabricated.
        let global = [fee(0x01, 1000)];
        let a = group_fees(2, 3, &global, std::iter::empty()).unwrap();
        let b = group_fees(1, 3, &global, std::iter::empty()).unwrap();

        let distributed = total(&a).unwrap() + total(&b).unwrap();
        assert!(distributed <= U256::from(1000));
        assert!(distributed >= U256::from(999));
    }

    #[test]
    fn test_local_fees_pass_through_unscaled() {
        let locals = [fee(0x02, 77)];
        let fees = group_fees(1, 5, &[fee(0x01, 100)], locals.iter()).unwrap();
        assert_eq!(fees, vec![fee(0x01, 20), fee(0x02, 77)]);
    }

    #[test]
    fn test_unchargeable_entries_dropped() {
        let locals = [
            Fee::new(Address::ZERO, U256::from(50)),
            fee(0x03, 0),
            fee(0x04, 5),
        ];
        let fees = group_fees(1, 1, &[], locals.iter()).unwrap();
        assert_eq!(fees, vec![fee(0x04, 5)]);
    }

    #[test]
    fn test_scaled_to_zero_is_dropped() {
        // 1 wei over a 2-item batch, group of 1 => floor(0.5) = 0, filtered
        let fees = group_fees(1, 2, &[fee(0x01, 1)], std::iter::empty()).unwrap();
        assert!(fees.is_empty());
    }
}
