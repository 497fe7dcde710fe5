//! Fee and revenue-split computation
//!
//! Two independent views over the same gross amount:
//! - the creator/platform split describes where the money goes
//!   (70% creator, 30% platform, with a reserve-fund carve-out taken
//!   from the platform's portion);
//! - the per-category commission is the fee annotated on the sender
//!   transaction for marketplace/withdrawal bookkeeping.
//!
//! Both are pure functions of `(amount, category)` over a static
//! `FeeSchedule`; no internal state.

use rust_decimal::Decimal;
use types::fee::FeeSchedule;
use types::transaction::TransferCategory;
use types::wallet::WalletTier;
use types::tier::TierSchedule;

/// Result of splitting a gross transfer amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSplit {
    /// 70% of the gross amount, credited to the counterparty
    pub creator_amount: Decimal,
    /// Platform share after the reserve-fund carve-out
    pub platform_amount: Decimal,
    /// Carved out of the platform's portion, not of the gross amount
    pub reserve_fund_amount: Decimal,
    /// Commission annotation: `amount × commission(category)`
    pub total_fees: Decimal,
}

impl FeeSplit {
    /// The three destinations partition the gross amount exactly.
    pub fn partitions(&self, amount: Decimal) -> bool {
        self.creator_amount + self.platform_amount + self.reserve_fund_amount == amount
    }
}

/// Split a gross amount into creator/platform/reserve destinations and
/// annotate the category commission.
pub fn split(schedule: &FeeSchedule, amount: Decimal, category: TransferCategory) -> FeeSplit {
    let creator_amount = amount * schedule.creator_share;
    let platform_gross = amount * schedule.platform_share;
    let reserve_fund_amount = platform_gross * schedule.reserve_fund_rate;
    let platform_amount = platform_gross - reserve_fund_amount;
    let total_fees = amount * schedule.commission_rate(category);

    FeeSplit {
        creator_amount,
        platform_amount,
        reserve_fund_amount,
        total_fees,
    }
}

/// Withdrawal fee: `max(amount × rate × (1 − tier discount), minimum)`.
pub fn withdrawal_fee(
    schedule: &FeeSchedule,
    tiers: &TierSchedule,
    amount: Decimal,
    tier: WalletTier,
) -> Decimal {
    let discount = tiers.limits(tier).fee_discount;
    let fee = amount * schedule.withdrawal_rate * (Decimal::ONE - discount);
    fee.max(schedule.minimum_fee)
}
