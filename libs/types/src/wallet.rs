//! Wallet and balance types
//!
//! A wallet holds exactly one balance record per user, across several
//! unit types (credits, tokens, locked/pending amounts). Wallets are
//! created on first use and never hard-deleted, only deactivated.

use crate::ids::WalletId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Membership tier gating transaction limits and fee discounts.
///
/// Ordered: basic < premium < vip < elite < celestial < enterprise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WalletTier {
    Basic,
    Premium,
    Vip,
    Elite,
    Celestial,
    Enterprise,
}

impl WalletTier {
    /// All tiers in ascending order.
    pub const ALL: [WalletTier; 6] = [
        WalletTier::Basic,
        WalletTier::Premium,
        WalletTier::Vip,
        WalletTier::Elite,
        WalletTier::Celestial,
        WalletTier::Enterprise,
    ];
}

/// KYC verification level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycLevel {
    None,
    Basic,
    Verified,
    Enhanced,
}

/// Wallet status
///
/// Wallets are never hard-deleted; closing an account deactivates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    Active,
    Deactivated,
}

/// Per-wallet balance across all unit types
///
/// Invariant: every field is non-negative at all times. A withdrawal may
/// never drive `credits` negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub credits: Decimal,
    pub tamv_tokens: Decimal,
    pub msr_balance: Decimal,
    pub locked_amount: Decimal,
    pub pending_withdrawal: Decimal,
    pub royalties_earned: Decimal,
}

impl WalletBalance {
    /// Create an empty balance record.
    pub fn zero() -> Self {
        Self {
            credits: Decimal::ZERO,
            tamv_tokens: Decimal::ZERO,
            msr_balance: Decimal::ZERO,
            locked_amount: Decimal::ZERO,
            pending_withdrawal: Decimal::ZERO,
            royalties_earned: Decimal::ZERO,
        }
    }

    /// Check balance invariant: no field is negative.
    pub fn check_invariant(&self) -> bool {
        self.credits >= Decimal::ZERO
            && self.tamv_tokens >= Decimal::ZERO
            && self.msr_balance >= Decimal::ZERO
            && self.locked_amount >= Decimal::ZERO
            && self.pending_withdrawal >= Decimal::ZERO
            && self.royalties_earned >= Decimal::ZERO
    }

    /// Credit spendable credits.
    ///
    /// # Panics
    /// Panics if amount is negative.
    pub fn credit(&mut self, amount: Decimal) {
        assert!(amount >= Decimal::ZERO, "Credit amount must be non-negative");

        self.credits += amount;

        debug_assert!(self.check_invariant(), "Invariant violated after credit");
    }

    /// Debit spendable credits.
    ///
    /// # Panics
    /// Panics if amount exceeds available credits. Callers must validate
    /// sufficiency before mutating.
    pub fn debit(&mut self, amount: Decimal) {
        assert!(amount >= Decimal::ZERO, "Debit amount must be non-negative");
        assert!(amount <= self.credits, "Insufficient credits");

        self.credits -= amount;

        debug_assert!(self.check_invariant(), "Invariant violated after debit");
    }
}

impl Default for WalletBalance {
    fn default() -> Self {
        Self::zero()
    }
}

/// Per-user wallet record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    /// Owning user. Unique: one wallet per user.
    pub user_id: String,
    pub tier: WalletTier,
    pub kyc_level: KycLevel,
    pub status: WalletStatus,
    pub balance: WalletBalance,
    /// Unix nanosecond timestamps
    pub created_at: i64,
    pub updated_at: i64,
    /// Bumped on every mutation; supports optimistic concurrency.
    pub version: u64,
}

impl Wallet {
    /// Create a new active basic-tier wallet for a user.
    pub fn new(user_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: WalletId::new(),
            user_id: user_id.into(),
            tier: WalletTier::Basic,
            kyc_level: KycLevel::None,
            status: WalletStatus::Active,
            balance: WalletBalance::zero(),
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        }
    }

    /// Record a mutation: bump version and update timestamp.
    pub fn touch(&mut self, timestamp: i64) {
        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Check if the wallet can transact.
    pub fn is_active(&self) -> bool {
        matches!(self.status, WalletStatus::Active)
    }

    /// Deactivate the wallet (soft delete).
    pub fn deactivate(&mut self, timestamp: i64) {
        self.status = WalletStatus::Deactivated;
        self.touch(timestamp);
    }
}
