//! Audited ledger service
//!
//! Orchestrates the ledger store and the two federation registries.
//! Every balance-mutating operation commits to the store first, then
//! attests the resulting transaction state to both registries. Registry
//! failure after a committed mutation degrades the audit trail but NEVER
//! rolls the mutation back.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use federation::{FederationReconciler, FederationRegistry, ReconciledRecord};
use ledger::history::WalletAggregate;
use ledger::store::LedgerStore;
use types::errors::{AuditError, LedgerError};
use types::ids::{TransactionId, WalletId};
use types::transaction::{Transaction, TransferCategory};
use types::wallet::Wallet;

use crate::config::ServiceConfig;
use crate::events::{AuditEvent, ENTITY_TRANSACTION};

// ── Audit envelope ──────────────────────────────────────────────────

/// Outcome of the registry writes for one mutation
#[derive(Debug, Clone, PartialEq)]
pub enum AuditStatus {
    /// Both registries hold the commitment
    Recorded,
    /// One or both registry writes failed; the mutation stands
    Degraded { detail: String },
}

impl AuditStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AuditStatus::Recorded)
    }
}

/// A committed result together with its audit outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Audited<T> {
    pub value: T,
    pub audit: AuditStatus,
}

impl<T> Audited<T> {
    fn recorded(value: T) -> Self {
        Self {
            value,
            audit: AuditStatus::Recorded,
        }
    }
}

// ── Service ─────────────────────────────────────────────────────────

/// The audited ledger facade
///
/// Constructed once at startup and shared by reference. All store and
/// registry operations are synchronous; async lives at the watcher edge.
pub struct AuditedLedgerService {
    store: Arc<LedgerStore>,
    local: Arc<FederationRegistry>,
    continental: Arc<FederationRegistry>,
    config: ServiceConfig,
}

impl AuditedLedgerService {
    pub fn new(
        store: Arc<LedgerStore>,
        local: Arc<FederationRegistry>,
        continental: Arc<FederationRegistry>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            local,
            continental,
            config,
        }
    }

    /// Service with in-memory store and registries, default config.
    pub fn in_memory() -> Self {
        let config = ServiceConfig::default();
        Self::new(
            Arc::new(LedgerStore::in_memory()),
            Arc::new(FederationRegistry::in_memory("local", &config.local_signer)),
            Arc::new(FederationRegistry::in_memory(
                "continental",
                &config.continental_signer,
            )),
            config,
        )
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Create (or fetch) the wallet for a user. Wallet creation is not a
    /// balance mutation and carries no audit commitment.
    pub fn create_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        self.store.create_wallet(user_id, now_nanos())
    }

    /// Initiate a deposit. The transaction stays `Pending` until the
    /// settlement watcher (or a direct call) confirms it.
    pub fn deposit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
        payment_method_ref: &str,
    ) -> Result<Audited<Transaction>, LedgerError> {
        let tx = self
            .store
            .deposit(wallet_id, amount, payment_method_ref, now_nanos())?;
        Ok(self.attest(tx))
    }

    /// Confirm a pending deposit, crediting the wallet.
    pub fn confirm_deposit(&self, tx_id: TransactionId) -> Result<Audited<Transaction>, LedgerError> {
        let tx = self.store.confirm_deposit(tx_id, now_nanos())?;
        Ok(self.attest(tx))
    }

    /// Initiate a withdrawal. Fee is collected up front; the net amount
    /// parks in `pending_withdrawal` until settlement.
    pub fn withdraw(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
        destination_ref: &str,
    ) -> Result<Audited<Transaction>, LedgerError> {
        let tx = self
            .store
            .withdraw(wallet_id, amount, destination_ref, now_nanos())?;
        Ok(self.attest(tx))
    }

    /// Settle a pending withdrawal as paid out.
    pub fn settle_withdrawal(
        &self,
        tx_id: TransactionId,
    ) -> Result<Audited<Transaction>, LedgerError> {
        let tx = self.store.settle_withdrawal(tx_id, now_nanos())?;
        Ok(self.attest(tx))
    }

    /// Transfer between wallets with the category's revenue split.
    /// Both legs are attested; the audit outcome covers the pair.
    pub fn transfer(
        &self,
        wallet_id: WalletId,
        counterparty_id: WalletId,
        amount: Decimal,
        category: TransferCategory,
    ) -> Result<Audited<(Transaction, Transaction)>, LedgerError> {
        let (sender_tx, receiver_tx) =
            self.store
                .transfer(wallet_id, counterparty_id, amount, category, now_nanos())?;

        let sender = self.attest(sender_tx);
        let receiver = self.attest(receiver_tx);
        let audit = match (&sender.audit, &receiver.audit) {
            (AuditStatus::Recorded, AuditStatus::Recorded) => AuditStatus::Recorded,
            (AuditStatus::Degraded { detail }, _) | (_, AuditStatus::Degraded { detail }) => {
                AuditStatus::Degraded {
                    detail: detail.clone(),
                }
            }
        };
        Ok(Audited {
            value: (sender.value, receiver.value),
            audit,
        })
    }

    /// Mark a pending transaction failed after a processor rejection.
    /// Failed withdrawals refund in full.
    pub fn fail_transaction(&self, tx_id: TransactionId) -> Result<Audited<Transaction>, LedgerError> {
        let tx = self.store.fail_transaction(tx_id, now_nanos())?;
        Ok(self.attest(tx))
    }

    /// Expire pending transactions older than the configured timeout,
    /// refunding withdrawals. Each expiry is attested.
    pub fn expire_stale(&self) -> Result<Vec<Audited<Transaction>>, LedgerError> {
        let now = now_nanos();
        let cutoff = now - self.config.pending_timeout.as_nanos() as i64;
        let expired = self.store.expire_pending(cutoff, now)?;
        Ok(expired.into_iter().map(|tx| self.attest(tx)).collect())
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn wallet(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError> {
        self.store.wallet(wallet_id)
    }

    pub fn history(&self, wallet_id: WalletId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.store.history(wallet_id)?.collect())
    }

    pub fn aggregate(&self, wallet_id: WalletId) -> Result<WalletAggregate, LedgerError> {
        self.store.aggregate(wallet_id)
    }

    /// Verify recent local audit records against the continental
    /// registry.
    pub fn reconcile_audit(&self, limit: usize) -> Vec<ReconciledRecord> {
        let reconciler =
            FederationReconciler::new(Arc::clone(&self.local), Arc::clone(&self.continental));
        reconciler.reconcile(limit)
    }

    // ── Attestation ─────────────────────────────────────────────────

    /// Commit the transaction state to both registries and link the hash
    /// back onto the transaction. The store mutation has already
    /// committed; nothing here can undo it.
    fn attest(&self, tx: Transaction) -> Audited<Transaction> {
        match self.write_audit(&tx) {
            Ok(hash) => match self.store.link_audit(tx.id, &hash) {
                Ok(linked) => Audited::recorded(linked),
                Err(e) => {
                    warn!(tx_id = %tx.id, error = %e, "Audit hash link failed");
                    Audited {
                        value: tx,
                        audit: AuditStatus::Degraded {
                            detail: format!("audit link failed: {e}"),
                        },
                    }
                }
            },
            Err(e) => {
                warn!(tx_id = %tx.id, error = %e, "Audit write degraded");
                Audited {
                    value: tx,
                    audit: AuditStatus::Degraded {
                        detail: e.to_string(),
                    },
                }
            }
        }
    }

    /// Hash the payload and append to both registries. Both writes are
    /// attempted even when the first fails.
    fn write_audit(&self, tx: &Transaction) -> Result<String, AuditError> {
        let attestation = format!("sig:{}:{}", self.config.local_signer, tx.id);
        let payload = AuditEvent::for_transaction(tx, attestation);
        let hash = federation::commit(&payload).map_err(|e| AuditError::Storage(e.to_string()))?;

        let now = now_nanos();
        let local = self
            .local
            .append(ENTITY_TRANSACTION, &payload.entity_id, &hash, now);
        let continental =
            self.continental
                .append(ENTITY_TRANSACTION, &payload.entity_id, &hash, now);

        match (local, continental) {
            (Ok(_), Ok(_)) => {
                info!(tx_id = %tx.id, hash = %hash, "Audit recorded in both registries");
                Ok(hash)
            }
            (local, continental) => {
                let mut failures = Vec::new();
                if let Err(e) = local {
                    failures.push(format!("local: {e}"));
                }
                if let Err(e) = continental {
                    failures.push(format!("continental: {e}"));
                }
                Err(AuditError::WriteDegraded {
                    detail: failures.join("; "),
                })
            }
        }
    }
}

/// Current wall-clock time as unix nanoseconds.
pub(crate) fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use federation::{RegistryError, RegistryStore};
    use types::transaction::TransactionStatus;

    fn funded_service(user: &str, amount: Decimal) -> (AuditedLedgerService, WalletId) {
        let service = AuditedLedgerService::in_memory();
        let wallet = service.create_wallet(user).unwrap();
        let deposit = service.deposit(wallet.id, amount, "card-on-file").unwrap();
        service.confirm_deposit(deposit.value.id).unwrap();
        (service, wallet.id)
    }

    #[test]
    fn test_deposit_is_attested_in_both_registries() {
        let service = AuditedLedgerService::in_memory();
        let wallet = service.create_wallet("alice").unwrap();
        let deposit = service.deposit(wallet.id, Decimal::from(100), "card-1").unwrap();

        assert!(deposit.audit.is_recorded());
        let tx_id = deposit.value.id.to_string();
        assert_eq!(service.local.records_for("transaction", &tx_id).len(), 1);
        assert_eq!(service.continental.records_for("transaction", &tx_id).len(), 1);
        assert!(deposit.value.audit_event_id.is_some());
    }

    #[test]
    fn test_confirm_appends_a_second_commitment() {
        let service = AuditedLedgerService::in_memory();
        let wallet = service.create_wallet("alice").unwrap();
        let deposit = service.deposit(wallet.id, Decimal::from(100), "card-1").unwrap();
        let confirmed = service.confirm_deposit(deposit.value.id).unwrap();

        assert_eq!(confirmed.value.status, TransactionStatus::Completed);
        let tx_id = confirmed.value.id.to_string();
        // Pending and Completed states each get their own record
        assert_eq!(service.local.records_for("transaction", &tx_id).len(), 2);
    }

    #[test]
    fn test_reconcile_verifies_matching_registries() {
        let (service, wallet_id) = funded_service("alice", Decimal::from(500));
        service.withdraw(wallet_id, Decimal::from(100), "bank-1").unwrap();

        let results = service.reconcile_audit(100);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.verified));
    }

    struct FailingStore;

    impl RegistryStore for FailingStore {
        fn push(&self, _record: &federation::FederationRecord) -> Result<(), RegistryError> {
            Err(RegistryError::Serialization("registry offline".to_string()))
        }

        fn snapshot(&self) -> Vec<federation::FederationRecord> {
            Vec::new()
        }
    }

    #[test]
    fn test_degraded_audit_never_rolls_back_the_mutation() {
        let config = ServiceConfig::default();
        let service = AuditedLedgerService::new(
            Arc::new(LedgerStore::in_memory()),
            Arc::new(FederationRegistry::in_memory("local", &config.local_signer)),
            Arc::new(FederationRegistry::new(
                "continental",
                &config.continental_signer,
                Box::new(FailingStore),
            )),
            config,
        );
        let wallet = service.create_wallet("alice").unwrap();
        let deposit = service.deposit(wallet.id, Decimal::from(100), "card-1").unwrap();

        match &deposit.audit {
            AuditStatus::Degraded { detail } => assert!(detail.contains("continental")),
            AuditStatus::Recorded => panic!("expected degraded audit"),
        }
        // The local registry still attempted (and succeeded) its write
        let tx_id = deposit.value.id.to_string();
        assert_eq!(service.local.records_for("transaction", &tx_id).len(), 1);
        // The deposit itself committed
        let stored = service.store.transaction(deposit.value.id).unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
    }

    #[test]
    fn test_transfer_attests_both_legs() {
        let (service, sender) = funded_service("alice", Decimal::from(500));
        let receiver = service.create_wallet("bob").unwrap();

        let result = service
            .transfer(sender, receiver.id, Decimal::from(100), TransferCategory::Gift)
            .unwrap();
        assert!(result.audit.is_recorded());
        let (sender_tx, receiver_tx) = &result.value;
        assert_eq!(service.local.records_for("transaction", &sender_tx.id.to_string()).len(), 1);
        assert_eq!(
            service
                .local
                .records_for("transaction", &receiver_tx.id.to_string())
                .len(),
            1
        );
    }

    #[test]
    fn test_failed_validation_produces_no_audit_records() {
        let service = AuditedLedgerService::in_memory();
        let wallet = service.create_wallet("alice").unwrap();
        let err = service.withdraw(wallet.id, Decimal::from(50), "bank-1");
        assert!(matches!(err, Err(LedgerError::InsufficientBalance { .. })));
        assert!(service.local.is_empty());
        assert!(service.continental.is_empty());
    }
}
