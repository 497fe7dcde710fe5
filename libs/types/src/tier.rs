//! Per-tier transaction limits
//!
//! Static configuration consulted, never mutated, by the ledger store.

use crate::wallet::WalletTier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Limits and discount for a single tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Maximum amount for a single withdrawal or transfer
    pub single_transaction: Decimal,
    /// Maximum total withdrawals per day
    pub daily_withdrawal: Decimal,
    /// Withdrawal fee discount, 0..=1
    pub fee_discount: Decimal,
}

/// Full tier schedule, keyed by tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSchedule {
    pub basic: TierLimits,
    pub premium: TierLimits,
    pub vip: TierLimits,
    pub elite: TierLimits,
    pub celestial: TierLimits,
    pub enterprise: TierLimits,
}

impl TierSchedule {
    /// Look up the limits for a tier.
    pub fn limits(&self, tier: WalletTier) -> &TierLimits {
        match tier {
            WalletTier::Basic => &self.basic,
            WalletTier::Premium => &self.premium,
            WalletTier::Vip => &self.vip,
            WalletTier::Elite => &self.elite,
            WalletTier::Celestial => &self.celestial,
            WalletTier::Enterprise => &self.enterprise,
        }
    }
}

impl Default for TierSchedule {
    fn default() -> Self {
        fn limits(single: u64, daily: u64, discount: &str) -> TierLimits {
            TierLimits {
                single_transaction: Decimal::from(single),
                daily_withdrawal: Decimal::from(daily),
                fee_discount: Decimal::from_str_exact(discount).unwrap(),
            }
        }

        Self {
            basic: limits(500, 2_000, "0"),
            premium: limits(2_000, 10_000, "0.10"),
            vip: limits(10_000, 50_000, "0.20"),
            elite: limits(50_000, 250_000, "0.30"),
            celestial: limits(250_000, 1_000_000, "0.40"),
            enterprise: limits(1_000_000, 5_000_000, "0.50"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_grow_with_tier() {
        let schedule = TierSchedule::default();
        let mut prev = Decimal::ZERO;
        for tier in WalletTier::ALL {
            let single = schedule.limits(tier).single_transaction;
            assert!(single > prev, "{:?} limit should exceed the previous tier", tier);
            prev = single;
        }
    }

    #[test]
    fn test_discounts_within_unit_interval() {
        let schedule = TierSchedule::default();
        for tier in WalletTier::ALL {
            let d = schedule.limits(tier).fee_discount;
            assert!(d >= Decimal::ZERO && d < Decimal::ONE);
        }
    }

    #[test]
    fn test_basic_has_no_discount() {
        let schedule = TierSchedule::default();
        assert_eq!(schedule.limits(WalletTier::Basic).fee_discount, Decimal::ZERO);
    }
}
