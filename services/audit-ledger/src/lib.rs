//! Audited Ledger Service
//!
//! Ties the ledger store to the federation audit trail: every balance
//! mutation is committed, hashed over canonical JSON, and attested to
//! both the local and continental registries. The settlement watcher
//! drives the two-phase deposit/withdrawal lifecycle.

pub mod config;
pub mod events;
pub mod service;
pub mod watcher;

pub use config::ServiceConfig;
pub use events::AuditEvent;
pub use service::{Audited, AuditStatus, AuditedLedgerService};
pub use watcher::{SettlementOutcome, SettlementSignal, SettlementWatcher};
