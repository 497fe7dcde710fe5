//! Types library for the credit ledger platform
//!
//! This library provides all core type definitions used across the ledger
//! system, ensuring type safety and deterministic decimal arithmetic.
//!
//! # Modules
//! - `ids`: Unique identifiers (WalletId, TransactionId, RecordId)
//! - `wallet`: Wallet, tier, and balance types
//! - `transaction`: Transaction lifecycle types
//! - `tier`: Per-tier transaction limits
//! - `fee`: Fee schedule configuration
//! - `errors`: Error taxonomy

pub mod errors;
pub mod fee;
pub mod ids;
pub mod tier;
pub mod transaction;
pub mod wallet;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::fee::*;
    pub use crate::ids::*;
    pub use crate::tier::*;
    pub use crate::transaction::*;
    pub use crate::wallet::*;
}
