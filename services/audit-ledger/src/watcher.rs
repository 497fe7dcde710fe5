//! Settlement watcher
//!
//! Drives the two-phase transaction lifecycle: settlement signals from
//! the payment processor arrive on an mpsc channel and are applied as
//! confirmations, settlements, or failures; a periodic sweep expires
//! anything left `Pending` past the configured timeout.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use types::errors::LedgerError;
use types::ids::TransactionId;
use types::transaction::TransactionType;

use crate::service::AuditedLedgerService;

/// Processor verdict for one pending transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Funds moved: confirm the deposit or settle the withdrawal
    Settled,
    /// Processor rejected: refund and mark failed
    Failed,
}

/// One settlement callback from the payment processor
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSignal {
    pub tx_id: TransactionId,
    pub outcome: SettlementOutcome,
}

/// Background task applying settlement signals and expiring stale
/// pending transactions
pub struct SettlementWatcher {
    service: Arc<AuditedLedgerService>,
    signals: mpsc::Receiver<SettlementSignal>,
}

impl SettlementWatcher {
    pub fn new(
        service: Arc<AuditedLedgerService>,
        signals: mpsc::Receiver<SettlementSignal>,
    ) -> Self {
        Self { service, signals }
    }

    /// Run until the signal channel closes. Spawn with `tokio::spawn`.
    pub async fn run(mut self) {
        let mut expiry = tokio::time::interval(self.service.config().expiry_check_interval);
        // The first tick fires immediately; skip it so startup does not
        // race an in-flight deposit
        expiry.tick().await;

        info!("Settlement watcher started");
        loop {
            tokio::select! {
                signal = self.signals.recv() => {
                    match signal {
                        Some(signal) => self.apply_signal(signal),
                        None => {
                            info!("Signal channel closed, settlement watcher stopping");
                            return;
                        }
                    }
                }
                _ = expiry.tick() => {
                    self.sweep_expired();
                }
            }
        }
    }

    /// Apply one processor verdict. Unknown or already-terminal
    /// transactions are logged and skipped; the processor may retry
    /// callbacks.
    fn apply_signal(&self, signal: SettlementSignal) {
        let result = match signal.outcome {
            SettlementOutcome::Settled => self.settle(signal.tx_id),
            SettlementOutcome::Failed => {
                self.service.fail_transaction(signal.tx_id).map(|_| ())
            }
        };
        match result {
            Ok(()) => debug!(tx_id = %signal.tx_id, outcome = ?signal.outcome, "Settlement applied"),
            Err(
                e @ (LedgerError::TransactionNotFound { .. }
                | LedgerError::InvalidStateTransition { .. }),
            ) => {
                warn!(tx_id = %signal.tx_id, error = %e, "Settlement signal skipped");
            }
            Err(e) => error!(tx_id = %signal.tx_id, error = %e, "Settlement failed"),
        }
    }

    fn settle(&self, tx_id: TransactionId) -> Result<(), LedgerError> {
        let tx = self.service.store().transaction(tx_id)?;
        match tx.tx_type {
            TransactionType::Deposit => self.service.confirm_deposit(tx_id).map(|_| ()),
            TransactionType::Withdrawal => self.service.settle_withdrawal(tx_id).map(|_| ()),
            other => {
                warn!(tx_id = %tx_id, tx_type = ?other, "Settlement signal for non-settleable type");
                Ok(())
            }
        }
    }

    fn sweep_expired(&self) {
        match self.service.expire_stale() {
            Ok(expired) if expired.is_empty() => {}
            Ok(expired) => info!(count = expired.len(), "Expired stale pending transactions"),
            Err(e) => error!(error = %e, "Expiry sweep failed"),
        }
    }
}
