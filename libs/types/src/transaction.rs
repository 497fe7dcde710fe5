//! Transaction lifecycle types
//!
//! Transactions are immutable once created; only `status` may change, and
//! only along the fixed transition path. Never deleted (audit requirement).

use crate::ids::{TransactionId, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction type across deposit, withdrawal, and transfer categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    GiftSent,
    GiftReceived,
    Purchase,
    Sale,
    Subscription,
    Royalty,
    Tip,
    TipReceived,
    CoursePurchase,
    CourseSale,
}

impl TransactionType {
    /// Money flowing into the wallet.
    pub fn is_incoming(&self) -> bool {
        matches!(
            self,
            TransactionType::Deposit
                | TransactionType::GiftReceived
                | TransactionType::Sale
                | TransactionType::Royalty
                | TransactionType::TipReceived
                | TransactionType::CourseSale
        )
    }

    /// Money flowing out of the wallet.
    pub fn is_outgoing(&self) -> bool {
        !self.is_incoming()
    }
}

/// Transfer category driving fee computation and the tx-type pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferCategory {
    Gift,
    Marketplace,
    Subscription,
    Course,
    Tip,
}

impl TransferCategory {
    /// Transaction type recorded on the sender's wallet.
    pub fn sender_type(&self) -> TransactionType {
        match self {
            TransferCategory::Gift => TransactionType::GiftSent,
            TransferCategory::Marketplace => TransactionType::Purchase,
            TransferCategory::Subscription => TransactionType::Subscription,
            TransferCategory::Course => TransactionType::CoursePurchase,
            TransferCategory::Tip => TransactionType::Tip,
        }
    }

    /// Transaction type recorded on the counterparty's wallet.
    pub fn receiver_type(&self) -> TransactionType {
        match self {
            TransferCategory::Gift => TransactionType::GiftReceived,
            TransferCategory::Marketplace => TransactionType::Sale,
            TransferCategory::Subscription => TransactionType::Royalty,
            TransferCategory::Course => TransactionType::CourseSale,
            TransferCategory::Tip => TransactionType::TipReceived,
        }
    }
}

/// Transaction status
///
/// Transitions follow a single fixed path:
/// `Pending → {Processing, Completed, Failed, Cancelled}`,
/// `Processing → {Completed, Failed}`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    /// Check if this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }

    /// Check whether a transition to `to` is legal.
    pub fn can_transition(&self, to: TransactionStatus) -> bool {
        match self {
            TransactionStatus::Pending => to != TransactionStatus::Pending,
            TransactionStatus::Processing => {
                matches!(to, TransactionStatus::Completed | TransactionStatus::Failed)
            }
            _ => false,
        }
    }
}

/// A single ledger transaction
///
/// Invariant: `net_amount = amount - fee`. For incoming types the fee is
/// the withheld portion, so `net_amount` is the amount actually credited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub wallet_id: WalletId,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub currency: String,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub status: TransactionStatus,
    /// Unix nanosecond timestamp
    pub timestamp: i64,
    /// External settlement reference (payment method, bank destination)
    pub settlement_ref: Option<String>,
    /// Content hash linking to the federation audit trail
    pub audit_event_id: Option<String>,
    /// Other wallet for transfer categories
    pub counterparty: Option<WalletId>,
}

impl Transaction {
    /// Create a new transaction with `net_amount = amount - fee`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wallet_id: WalletId,
        tx_type: TransactionType,
        amount: Decimal,
        currency: impl Into<String>,
        fee: Decimal,
        status: TransactionStatus,
        timestamp: i64,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            wallet_id,
            tx_type,
            amount,
            currency: currency.into(),
            fee,
            net_amount: amount - fee,
            status,
            timestamp,
            settlement_ref: None,
            audit_event_id: None,
            counterparty: None,
        }
    }

    /// Attach an external settlement reference.
    pub fn with_settlement_ref(mut self, settlement_ref: impl Into<String>) -> Self {
        self.settlement_ref = Some(settlement_ref.into());
        self
    }

    /// Attach the counterparty wallet for a transfer.
    pub fn with_counterparty(mut self, counterparty: WalletId) -> Self {
        self.counterparty = Some(counterparty);
        self
    }

    /// Check the fee/net identity.
    pub fn check_invariant(&self) -> bool {
        self.net_amount == self.amount - self.fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_amount_identity() {
        let tx = Transaction::new(
            WalletId::new(),
            TransactionType::Withdrawal,
            Decimal::from(40),
            "CREDITS",
            Decimal::ONE,
            TransactionStatus::Pending,
            1_708_123_456_789_000_000,
        );
        assert_eq!(tx.net_amount, Decimal::from(39));
        assert!(tx.check_invariant());
    }

    #[test]
    fn test_incoming_outgoing_classification() {
        assert!(TransactionType::Deposit.is_incoming());
        assert!(TransactionType::Sale.is_incoming());
        assert!(TransactionType::Royalty.is_incoming());
        assert!(TransactionType::Withdrawal.is_outgoing());
        assert!(TransactionType::GiftSent.is_outgoing());
        assert!(TransactionType::Purchase.is_outgoing());
    }

    #[test]
    fn test_category_type_pairs() {
        assert_eq!(TransferCategory::Gift.sender_type(), TransactionType::GiftSent);
        assert_eq!(
            TransferCategory::Gift.receiver_type(),
            TransactionType::GiftReceived
        );
        assert_eq!(
            TransferCategory::Marketplace.sender_type(),
            TransactionType::Purchase
        );
        assert_eq!(TransferCategory::Marketplace.receiver_type(), TransactionType::Sale);
        assert_eq!(
            TransferCategory::Subscription.receiver_type(),
            TransactionType::Royalty
        );
    }

    #[test]
    fn test_status_transitions_from_pending() {
        let pending = TransactionStatus::Pending;
        assert!(pending.can_transition(TransactionStatus::Processing));
        assert!(pending.can_transition(TransactionStatus::Completed));
        assert!(pending.can_transition(TransactionStatus::Failed));
        assert!(pending.can_transition(TransactionStatus::Cancelled));
        assert!(!pending.can_transition(TransactionStatus::Pending));
    }

    #[test]
    fn test_status_transitions_from_processing() {
        let processing = TransactionStatus::Processing;
        assert!(processing.can_transition(TransactionStatus::Completed));
        assert!(processing.can_transition(TransactionStatus::Failed));
        assert!(!processing.can_transition(TransactionStatus::Cancelled));
        assert!(!processing.can_transition(TransactionStatus::Pending));
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        for terminal in [
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            for to in [
                TransactionStatus::Pending,
                TransactionStatus::Processing,
                TransactionStatus::Completed,
                TransactionStatus::Failed,
                TransactionStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition(to));
            }
        }
    }

    #[test]
    fn test_transaction_serialization_roundtrip() {
        let tx = Transaction::new(
            WalletId::new(),
            TransactionType::Deposit,
            Decimal::from(100),
            "CREDITS",
            Decimal::ZERO,
            TransactionStatus::Pending,
            1_708_123_456_789_000_000,
        )
        .with_settlement_ref("card-1");

        let json = serde_json::to_string(&tx).unwrap();
        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, decoded);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = TransactionStatus> {
            prop_oneof![
                Just(TransactionStatus::Pending),
                Just(TransactionStatus::Processing),
                Just(TransactionStatus::Completed),
                Just(TransactionStatus::Failed),
                Just(TransactionStatus::Cancelled),
            ]
        }

        proptest! {
            #[test]
            fn prop_net_amount_identity(
                amount_cents in 1i64..10_000_000i64,
                fee_permille in 0i64..500i64,
            ) {
                let amount = Decimal::new(amount_cents, 2);
                let fee = amount * Decimal::new(fee_permille, 3);
                let tx = Transaction::new(
                    WalletId::new(),
                    TransactionType::Withdrawal,
                    amount,
                    "CREDITS",
                    fee,
                    TransactionStatus::Pending,
                    1_708_123_456_789_000_000,
                );
                prop_assert_eq!(tx.net_amount, amount - fee);
                prop_assert!(tx.check_invariant());
            }

            #[test]
            fn prop_status_machine_is_sound(from in any_status(), to in any_status()) {
                // No self-transitions, and terminal states never move
                prop_assert!(!from.can_transition(from));
                if from.is_terminal() {
                    prop_assert!(!from.can_transition(to));
                }
                if from.can_transition(to) {
                    prop_assert!(!from.is_terminal());
                }
            }
        }
    }
}
