//! Fee schedule configuration
//!
//! Static rates consumed by the fee/split engine. Two independent views
//! exist over every transfer amount: the creator/platform split (where
//! the gross amount goes) and the per-category commission (the fee
//! annotated for marketplace/withdrawal bookkeeping).

use crate::transaction::TransferCategory;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All static fee/split rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Creator's share of the gross amount
    pub creator_share: Decimal,
    /// Platform's share of the gross amount (creator + platform = 1)
    pub platform_share: Decimal,
    /// Reserve-fund carve-out, applied to the platform's portion
    pub reserve_fund_rate: Decimal,
    /// Commission rates per transfer category
    pub gift_commission: Decimal,
    pub marketplace_commission: Decimal,
    pub subscription_commission: Decimal,
    pub course_commission: Decimal,
    /// Withdrawal fee rate before tier discount
    pub withdrawal_rate: Decimal,
    /// Floor for the withdrawal fee
    pub minimum_fee: Decimal,
}

impl FeeSchedule {
    /// Commission rate for a category.
    ///
    /// Tip (and any future unmatched category) falls back to the
    /// marketplace rate.
    pub fn commission_rate(&self, category: TransferCategory) -> Decimal {
        match category {
            TransferCategory::Gift => self.gift_commission,
            TransferCategory::Marketplace => self.marketplace_commission,
            TransferCategory::Subscription => self.subscription_commission,
            TransferCategory::Course => self.course_commission,
            TransferCategory::Tip => self.marketplace_commission,
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            creator_share: Decimal::from_str_exact("0.70").unwrap(),
            platform_share: Decimal::from_str_exact("0.30").unwrap(),
            reserve_fund_rate: Decimal::from_str_exact("0.05").unwrap(),
            gift_commission: Decimal::from_str_exact("0.12").unwrap(),
            marketplace_commission: Decimal::from_str_exact("0.15").unwrap(),
            subscription_commission: Decimal::from_str_exact("0.20").unwrap(),
            course_commission: Decimal::from_str_exact("0.25").unwrap(),
            withdrawal_rate: Decimal::from_str_exact("0.025").unwrap(),
            minimum_fee: Decimal::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares_sum_to_one() {
        let schedule = FeeSchedule::default();
        assert_eq!(schedule.creator_share + schedule.platform_share, Decimal::ONE);
    }

    #[test]
    fn test_commission_lookup() {
        let schedule = FeeSchedule::default();
        assert_eq!(
            schedule.commission_rate(TransferCategory::Gift),
            Decimal::from_str_exact("0.12").unwrap()
        );
        assert_eq!(
            schedule.commission_rate(TransferCategory::Course),
            Decimal::from_str_exact("0.25").unwrap()
        );
    }

    #[test]
    fn test_tip_falls_back_to_marketplace_rate() {
        let schedule = FeeSchedule::default();
        assert_eq!(
            schedule.commission_rate(TransferCategory::Tip),
            schedule.commission_rate(TransferCategory::Marketplace)
        );
    }
}
