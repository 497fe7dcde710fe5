//! Ledger Service
//!
//! Wallet balances, the append-only transaction history, tier-aware
//! limits, and fee/revenue splitting.
//!
//! Provides:
//! - `LedgerStore`: concurrency-safe wallet store with per-wallet
//!   serialization and a write-ahead log for durability
//! - `split`: pure fee and revenue-split computation
//! - `History` / `WalletAggregate`: lazy history iteration and totals

pub mod history;
pub mod split;
pub mod store;
pub mod wal;

pub use history::{History, WalletAggregate};
pub use split::{split, withdrawal_fee, FeeSplit};
pub use store::{ConservationReport, LedgerStore, RevenueAccounts};
pub use wal::{LedgerEvent, LedgerWal, WalError};
