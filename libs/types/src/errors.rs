//! Error types for the credit ledger
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Ledger operation errors
///
/// Validation errors (`InvalidAmount`, `WalletNotFound`,
/// `InsufficientBalance`, `TierLimitExceeded`) are detected before any
/// balance mutation: callers may treat them as "nothing happened".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: String },

    #[error("Wallet not found: {wallet_id}")]
    WalletNotFound { wallet_id: String },

    #[error("Transaction not found: {tx_id}")]
    TransactionNotFound { tx_id: String },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Tier limit exceeded: limit {limit}, requested {requested}")]
    TierLimitExceeded { limit: String, requested: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Wallet deactivated: {wallet_id}")]
    WalletDeactivated { wallet_id: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Audit trail errors
///
/// `WriteDegraded` is a warning, not a rollback: it is raised after a
/// balance mutation has already committed, when one or both federation
/// registry writes failed. The financial effect stands; audit
/// completeness should be rechecked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("Audit write degraded: {detail}")]
    WriteDegraded { detail: String },

    #[error("Registry storage error: {0}")]
    Storage(String),
}
