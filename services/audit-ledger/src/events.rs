//! Audit event payloads
//!
//! The payload committed to the federation registries for every balance
//! mutation. Hashing canonicalizes the JSON, so field order here is
//! irrelevant; field *names* are part of the commitment and must stay
//! stable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::transaction::{Transaction, TransactionStatus, TransactionType};

/// Entity type recorded for transaction commitments
pub const ENTITY_TRANSACTION: &str = "transaction";

/// The hashed payload for one transaction state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_type: String,
    pub entity_id: String,
    pub wallet_id: String,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub timestamp: i64,
    pub counterparty: Option<String>,
    /// Opaque attestation token stamped by the committing node
    pub attestation: String,
}

impl AuditEvent {
    /// Snapshot a transaction into a commitment payload.
    pub fn for_transaction(tx: &Transaction, attestation: impl Into<String>) -> Self {
        Self {
            entity_type: ENTITY_TRANSACTION.to_string(),
            entity_id: tx.id.to_string(),
            wallet_id: tx.wallet_id.to_string(),
            tx_type: tx.tx_type,
            status: tx.status,
            amount: tx.amount,
            fee: tx.fee,
            net_amount: tx.net_amount,
            currency: tx.currency.clone(),
            timestamp: tx.timestamp,
            counterparty: tx.counterparty.map(|id| id.to_string()),
            attestation: attestation.into(),
        }
    }
}
