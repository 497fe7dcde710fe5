//! Ledger store — wallet balances and the append-only transaction history
//!
//! All validation happens before any state is touched; every mutation is
//! all-or-nothing. Operations on the same wallet serialize on a per-wallet
//! lock; operations on different wallets proceed in parallel. Transfers
//! lock both wallets in `WalletId` order.
//!
//! Every state change is expressed as a `LedgerEvent` and applied through
//! a single transition function that validates and mutates under the
//! wallet lock. The same function is the replay path: a store opened over
//! an existing write-ahead log rebuilds exactly the state the events
//! describe, re-validating as it goes. Durable stores check the event,
//! append it to the log, and only then apply it, so memory never holds a
//! mutation the log does not.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};
use types::errors::LedgerError;
use types::fee::FeeSchedule;
use types::ids::{TransactionId, WalletId};
use types::tier::TierSchedule;
use types::transaction::{Transaction, TransactionStatus, TransactionType, TransferCategory};
use types::wallet::Wallet;

use crate::history::{History, WalletAggregate};
use crate::split;
use crate::wal::{LedgerEvent, LedgerWal};

const DAY_NANOS: i64 = 86_400 * 1_000_000_000;

/// Platform-side value accounts
///
/// Together with wallet balances these close the conservation identity:
/// everything confirmed in must still be somewhere.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RevenueAccounts {
    /// Platform share of transfers, after the reserve carve-out
    pub platform_revenue: Decimal,
    /// Reserve-fund carve-out accrued from transfers
    pub reserve_fund: Decimal,
    /// Fees collected on withdrawals
    pub withdrawal_fees: Decimal,
    /// Net amounts settled out to external destinations
    pub settled_out: Decimal,
    /// Total of all confirmed deposits
    pub total_deposited: Decimal,
}

/// Conservation diagnostic: the sum of all value sinks vs. confirmed deposits
#[derive(Debug, Clone, PartialEq)]
pub struct ConservationReport {
    pub wallet_credits: Decimal,
    pub pending_withdrawals: Decimal,
    pub revenue: RevenueAccounts,
}

impl ConservationReport {
    /// No operation may create or destroy value.
    pub fn holds(&self) -> bool {
        self.wallet_credits
            + self.pending_withdrawals
            + self.revenue.platform_revenue
            + self.revenue.reserve_fund
            + self.revenue.withdrawal_fees
            + self.revenue.settled_out
            == self.revenue.total_deposited
    }
}

/// Wallet balances, transaction history, and revenue accounts
///
/// Lock order: wal → wallet mutex(es) → transaction log → revenue.
pub struct LedgerStore {
    wallets: RwLock<HashMap<WalletId, Arc<Mutex<Wallet>>>>,
    by_user: RwLock<HashMap<String, WalletId>>,
    transactions: RwLock<Vec<Transaction>>,
    tx_index: RwLock<HashMap<TransactionId, usize>>,
    revenue: Mutex<RevenueAccounts>,
    tiers: TierSchedule,
    fees: FeeSchedule,
    currency: String,
    wal: Option<Mutex<LedgerWal>>,
}

impl LedgerStore {
    /// Create a store with no durability (tests, ephemeral use).
    pub fn in_memory() -> Self {
        Self::build(TierSchedule::default(), FeeSchedule::default(), "CREDITS", None)
    }

    /// Open a durable store, replaying the write-ahead log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let (wal, events) =
            LedgerWal::open(path.as_ref()).map_err(|e| LedgerError::Storage(e.to_string()))?;
        let store = Self::build(
            TierSchedule::default(),
            FeeSchedule::default(),
            "CREDITS",
            Some(wal),
        );
        let replayed = events.len();
        for event in &events {
            store.apply_event(event)?;
        }
        info!(replayed, "Ledger store recovered from write-ahead log");
        Ok(store)
    }

    /// Build with explicit schedules.
    pub fn with_schedules(tiers: TierSchedule, fees: FeeSchedule) -> Self {
        Self::build(tiers, fees, "CREDITS", None)
    }

    fn build(
        tiers: TierSchedule,
        fees: FeeSchedule,
        currency: &str,
        wal: Option<LedgerWal>,
    ) -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
            by_user: RwLock::new(HashMap::new()),
            transactions: RwLock::new(Vec::new()),
            tx_index: RwLock::new(HashMap::new()),
            revenue: Mutex::new(RevenueAccounts::default()),
            tiers,
            fees,
            currency: currency.to_string(),
            wal: wal.map(Mutex::new),
        }
    }

    /// The fee schedule in force.
    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.fees
    }

    /// The tier schedule in force.
    pub fn tier_schedule(&self) -> &TierSchedule {
        &self.tiers
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Create a wallet for `user_id`, or return the existing one.
    ///
    /// Idempotent: a second call for the same user returns the same
    /// wallet unchanged and never resets its balance.
    pub fn create_wallet(&self, user_id: &str, timestamp: i64) -> Result<Wallet, LedgerError> {
        if let Some(existing) = self.wallet_for_user(user_id) {
            return Ok(existing);
        }

        let wallet = Wallet::new(user_id, timestamp);
        let event = LedgerEvent::WalletCreated {
            wallet: wallet.clone(),
        };
        self.commit(event)?;
        info!(wallet_id = %wallet.id, user_id, "Wallet created");
        self.wallet_for_user(user_id).ok_or_else(|| {
            LedgerError::WalletNotFound {
                wallet_id: wallet.id.to_string(),
            }
        })
    }

    /// Initiate a deposit. Creates a `Pending` transaction with zero fee;
    /// credits nothing until `confirm_deposit`. Deposits are never
    /// rejected on balance grounds.
    pub fn deposit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
        payment_method_ref: &str,
        timestamp: i64,
    ) -> Result<Transaction, LedgerError> {
        validate_amount(amount)?;

        let tx = Transaction::new(
            wallet_id,
            TransactionType::Deposit,
            amount,
            &self.currency,
            Decimal::ZERO,
            TransactionStatus::Pending,
            timestamp,
        )
        .with_settlement_ref(payment_method_ref);

        self.commit(LedgerEvent::DepositInitiated { tx: tx.clone() })?;
        debug!(tx_id = %tx.id, %amount, "Deposit initiated");
        Ok(tx)
    }

    /// Confirm a pending deposit: credits the wallet and completes the
    /// transaction.
    pub fn confirm_deposit(
        &self,
        tx_id: TransactionId,
        timestamp: i64,
    ) -> Result<Transaction, LedgerError> {
        let tx = self.transaction(tx_id)?;
        if tx.tx_type != TransactionType::Deposit {
            return Err(LedgerError::TransactionNotFound {
                tx_id: tx_id.to_string(),
            });
        }

        self.commit(LedgerEvent::DepositConfirmed { tx_id, timestamp })?;
        info!(%tx_id, amount = %tx.amount, "Deposit confirmed");
        self.transaction(tx_id)
    }

    /// Initiate a withdrawal.
    ///
    /// Atomically debits `credits` by the full amount and moves the net
    /// (amount − fee) into `pending_withdrawal`; the fee accrues to the
    /// withdrawal-fee account. Amounts at or below the fee are rejected,
    /// and any failure happens before mutation.
    pub fn withdraw(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
        destination_ref: &str,
        timestamp: i64,
    ) -> Result<Transaction, LedgerError> {
        validate_amount(amount)?;

        // Tier is stable enough to read outside the critical section; the
        // balance checks happen under the wallet lock in apply.
        let tier = self.wallet(wallet_id)?.tier;
        let fee = split::withdrawal_fee(&self.fees, &self.tiers, amount, tier);
        // Below the fee the net would be non-positive
        if amount <= fee {
            return Err(LedgerError::InvalidAmount {
                amount: amount.to_string(),
            });
        }
        let tx = Transaction::new(
            wallet_id,
            TransactionType::Withdrawal,
            amount,
            &self.currency,
            fee,
            TransactionStatus::Pending,
            timestamp,
        )
        .with_settlement_ref(destination_ref);

        self.commit(LedgerEvent::WithdrawalInitiated { tx: tx.clone() })?;
        info!(tx_id = %tx.id, %amount, %fee, "Withdrawal initiated");
        Ok(tx)
    }

    /// Settle a pending withdrawal: the net amount leaves the system and
    /// the transaction completes.
    pub fn settle_withdrawal(
        &self,
        tx_id: TransactionId,
        timestamp: i64,
    ) -> Result<Transaction, LedgerError> {
        let tx = self.transaction(tx_id)?;
        if tx.tx_type != TransactionType::Withdrawal {
            return Err(LedgerError::TransactionNotFound {
                tx_id: tx_id.to_string(),
            });
        }

        self.commit(LedgerEvent::WithdrawalSettled { tx_id, timestamp })?;
        info!(%tx_id, net = %tx.net_amount, "Withdrawal settled");
        self.transaction(tx_id)
    }

    /// Transfer between two wallets: gift, marketplace purchase,
    /// subscription, course, or tip.
    ///
    /// Debits the sender by the gross amount, credits the counterparty
    /// with the creator share, and accrues the platform share and reserve
    /// carve-out; both sides commit as one unit or neither does.
    pub fn transfer(
        &self,
        wallet_id: WalletId,
        counterparty_id: WalletId,
        amount: Decimal,
        category: TransferCategory,
        timestamp: i64,
    ) -> Result<(Transaction, Transaction), LedgerError> {
        validate_amount(amount)?;
        if wallet_id == counterparty_id {
            // Degenerate transfer; treated like a malformed amount
            return Err(LedgerError::InvalidAmount {
                amount: amount.to_string(),
            });
        }

        let fee_split = split::split(&self.fees, amount, category);

        let sender_tx = Transaction::new(
            wallet_id,
            category.sender_type(),
            amount,
            &self.currency,
            fee_split.total_fees,
            TransactionStatus::Completed,
            timestamp,
        )
        .with_counterparty(counterparty_id);

        let receiver_tx = Transaction::new(
            counterparty_id,
            category.receiver_type(),
            amount,
            &self.currency,
            amount - fee_split.creator_amount,
            TransactionStatus::Completed,
            timestamp,
        )
        .with_counterparty(wallet_id);

        self.commit(LedgerEvent::TransferRecorded {
            sender_tx: sender_tx.clone(),
            receiver_tx: receiver_tx.clone(),
        })?;
        info!(
            sender = %wallet_id,
            receiver = %counterparty_id,
            %amount,
            ?category,
            "Transfer recorded"
        );
        Ok((sender_tx, receiver_tx))
    }

    /// Move every `Pending` transaction older than `cutoff` to `Failed`.
    ///
    /// Expired withdrawals refund in full (including the fee, since the
    /// service never performed); expired deposits credit nothing.
    pub fn expire_pending(
        &self,
        cutoff: i64,
        timestamp: i64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let stale: Vec<TransactionId> = {
            let txs = self.transactions.read().expect("transaction log poisoned");
            txs.iter()
                .filter(|tx| tx.status == TransactionStatus::Pending && tx.timestamp < cutoff)
                .map(|tx| tx.id)
                .collect()
        };

        let mut expired = Vec::with_capacity(stale.len());
        for tx_id in stale {
            match self.commit(LedgerEvent::TransactionAborted { tx_id, timestamp }) {
                Ok(()) => {
                    let tx = self.transaction(tx_id)?;
                    warn!(%tx_id, tx_type = ?tx.tx_type, "Pending transaction expired");
                    expired.push(tx);
                }
                // Lost a race against a concurrent confirmation/settlement
                Err(LedgerError::InvalidStateTransition { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(expired)
    }

    /// Mark a pending transaction `Failed` after a processor rejection.
    ///
    /// Shares the abort path with expiry: failed withdrawals refund in
    /// full, failed deposits credit nothing.
    pub fn fail_transaction(
        &self,
        tx_id: TransactionId,
        timestamp: i64,
    ) -> Result<Transaction, LedgerError> {
        self.commit(LedgerEvent::TransactionAborted { tx_id, timestamp })?;
        let tx = self.transaction(tx_id)?;
        warn!(%tx_id, tx_type = ?tx.tx_type, "Pending transaction failed");
        Ok(tx)
    }

    /// Attach the federation audit hash to a committed transaction.
    pub fn link_audit(&self, tx_id: TransactionId, hash: &str) -> Result<Transaction, LedgerError> {
        self.commit(LedgerEvent::AuditLinked {
            tx_id,
            hash: hash.to_string(),
        })?;
        self.transaction(tx_id)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Snapshot of a wallet.
    pub fn wallet(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError> {
        let arc = self.wallet_arc(wallet_id)?;
        let wallet = arc.lock().expect("wallet lock poisoned");
        Ok(wallet.clone())
    }

    /// Wallet for a user, if one exists.
    pub fn wallet_for_user(&self, user_id: &str) -> Option<Wallet> {
        let id = *self.by_user.read().expect("user index poisoned").get(user_id)?;
        self.wallet(id).ok()
    }

    /// Snapshot of a transaction.
    pub fn transaction(&self, tx_id: TransactionId) -> Result<Transaction, LedgerError> {
        let index = self.tx_index.read().expect("transaction index poisoned");
        let txs = self.transactions.read().expect("transaction log poisoned");
        index
            .get(&tx_id)
            .and_then(|&i| txs.get(i))
            .cloned()
            .ok_or_else(|| LedgerError::TransactionNotFound {
                tx_id: tx_id.to_string(),
            })
    }

    /// Transaction history for a wallet, most recent first.
    ///
    /// Lazy and restartable: each call produces a fresh iterator over a
    /// snapshot of the history at call time.
    pub fn history(&self, wallet_id: WalletId) -> Result<History, LedgerError> {
        self.wallet_arc(wallet_id)?;
        let txs = self.transactions.read().expect("transaction log poisoned");
        Ok(History::for_wallet(&txs, wallet_id))
    }

    /// Fold the completed history into per-type totals.
    pub fn aggregate(&self, wallet_id: WalletId) -> Result<WalletAggregate, LedgerError> {
        Ok(WalletAggregate::fold(self.history(wallet_id)?))
    }

    /// Snapshot of the platform revenue accounts.
    pub fn revenue(&self) -> RevenueAccounts {
        self.revenue.lock().expect("revenue lock poisoned").clone()
    }

    /// Conservation diagnostic across all wallets and revenue accounts.
    pub fn conservation(&self) -> ConservationReport {
        let wallets = self.wallets.read().expect("wallet map poisoned");
        let mut credits = Decimal::ZERO;
        let mut pending = Decimal::ZERO;
        for arc in wallets.values() {
            let wallet = arc.lock().expect("wallet lock poisoned");
            credits += wallet.balance.credits;
            pending += wallet.balance.pending_withdrawal;
        }
        ConservationReport {
            wallet_credits: credits,
            pending_withdrawals: pending,
            revenue: self.revenue(),
        }
    }

    // ── State transition ────────────────────────────────────────────

    /// Validate the event, append it to the log, then apply it.
    ///
    /// Every mutation serializes on the log lock, so nothing can
    /// invalidate the event between check and apply, and the log order
    /// always matches the application order; replay depends on that.
    /// An event that fails validation never reaches disk; an event
    /// whose append fails never reaches memory, so a `Storage` error
    /// means the operation did not happen.
    fn commit(&self, event: LedgerEvent) -> Result<(), LedgerError> {
        match &self.wal {
            Some(wal) => {
                let mut wal = wal.lock().expect("wal lock poisoned");
                self.check_event(&event)?;
                wal.append(&event)
                    .map_err(|e| LedgerError::Storage(e.to_string()))?;
                self.apply_event(&event)?;
            }
            None => self.apply_event(&event)?,
        }
        Ok(())
    }

    /// Validation-only mirror of [`Self::apply_event`], run before the
    /// event is written to the log.
    fn check_event(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        match event {
            LedgerEvent::WalletCreated { .. } => Ok(()),

            LedgerEvent::DepositInitiated { tx } => self.require_active(tx.wallet_id),

            LedgerEvent::DepositConfirmed { tx_id, .. }
            | LedgerEvent::WithdrawalSettled { tx_id, .. } => {
                let tx = self.transaction(*tx_id)?;
                self.wallet_arc(tx.wallet_id)?;
                self.check_status(*tx_id, TransactionStatus::Completed)
            }

            LedgerEvent::WithdrawalInitiated { tx } => {
                let arc = self.wallet_arc(tx.wallet_id)?;
                let wallet = arc.lock().expect("wallet lock poisoned");
                self.validate_withdrawal(&wallet, tx)
            }

            LedgerEvent::TransferRecorded {
                sender_tx,
                receiver_tx,
            } => {
                category_of(sender_tx.tx_type).ok_or_else(|| {
                    LedgerError::Storage(format!(
                        "transfer event with non-transfer type {:?}",
                        sender_tx.tx_type
                    ))
                })?;
                let receiver_arc = self.wallet_arc(receiver_tx.wallet_id)?;
                {
                    let receiver = receiver_arc.lock().expect("wallet lock poisoned");
                    if !receiver.is_active() {
                        return Err(LedgerError::WalletDeactivated {
                            wallet_id: receiver_tx.wallet_id.to_string(),
                        });
                    }
                }
                let sender_arc = self.wallet_arc(sender_tx.wallet_id)?;
                let sender = sender_arc.lock().expect("wallet lock poisoned");
                if !sender.is_active() {
                    return Err(LedgerError::WalletDeactivated {
                        wallet_id: sender_tx.wallet_id.to_string(),
                    });
                }
                if sender_tx.amount > sender.balance.credits {
                    return Err(LedgerError::InsufficientBalance {
                        required: sender_tx.amount.to_string(),
                        available: sender.balance.credits.to_string(),
                    });
                }
                Ok(())
            }

            LedgerEvent::TransactionAborted { tx_id, .. } => {
                let tx = self.transaction(*tx_id)?;
                if tx.tx_type == TransactionType::Withdrawal {
                    self.wallet_arc(tx.wallet_id)?;
                }
                self.check_status(*tx_id, TransactionStatus::Failed)
            }

            LedgerEvent::AuditLinked { tx_id, .. } => self.transaction(*tx_id).map(|_| ()),
        }
    }

    /// The single state-transition function, shared by live commits and
    /// write-ahead-log replay.
    ///
    /// Validates and mutates under the wallet lock, so a concurrent
    /// operation on the same wallet cannot slip between check and debit.
    /// Returning an error means no state was touched.
    fn apply_event(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        match event {
            LedgerEvent::WalletCreated { wallet } => {
                let mut by_user = self.by_user.write().expect("user index poisoned");
                if by_user.contains_key(&wallet.user_id) {
                    // Lost a create race; idempotent creation keeps the winner
                    return Ok(());
                }
                by_user.insert(wallet.user_id.clone(), wallet.id);
                self.wallets
                    .write()
                    .expect("wallet map poisoned")
                    .insert(wallet.id, Arc::new(Mutex::new(wallet.clone())));
            }

            LedgerEvent::DepositInitiated { tx } => {
                self.require_active(tx.wallet_id)?;
                self.push_transaction(tx.clone());
            }

            LedgerEvent::DepositConfirmed { tx_id, timestamp } => {
                let tx = self.transaction(*tx_id)?;
                let arc = self.wallet_arc(tx.wallet_id)?;
                let mut wallet = arc.lock().expect("wallet lock poisoned");
                self.set_status(*tx_id, TransactionStatus::Completed)?;
                wallet.balance.credit(tx.amount);
                wallet.touch(*timestamp);
                self.revenue.lock().expect("revenue lock poisoned").total_deposited += tx.amount;
            }

            LedgerEvent::WithdrawalInitiated { tx } => {
                let arc = self.wallet_arc(tx.wallet_id)?;
                let mut wallet = arc.lock().expect("wallet lock poisoned");
                self.validate_withdrawal(&wallet, tx)?;

                wallet.balance.debit(tx.amount);
                wallet.balance.pending_withdrawal += tx.net_amount;
                wallet.touch(tx.timestamp);
                self.push_transaction(tx.clone());
                self.revenue.lock().expect("revenue lock poisoned").withdrawal_fees += tx.fee;
            }

            LedgerEvent::WithdrawalSettled { tx_id, timestamp } => {
                let tx = self.transaction(*tx_id)?;
                let arc = self.wallet_arc(tx.wallet_id)?;
                let mut wallet = arc.lock().expect("wallet lock poisoned");
                self.set_status(*tx_id, TransactionStatus::Completed)?;
                wallet.balance.pending_withdrawal -= tx.net_amount;
                wallet.touch(*timestamp);
                self.revenue.lock().expect("revenue lock poisoned").settled_out += tx.net_amount;
            }

            LedgerEvent::TransferRecorded {
                sender_tx,
                receiver_tx,
            } => {
                let category = category_of(sender_tx.tx_type).ok_or_else(|| {
                    LedgerError::Storage(format!(
                        "transfer event with non-transfer type {:?}",
                        sender_tx.tx_type
                    ))
                })?;
                let fee_split = split::split(&self.fees, sender_tx.amount, category);

                let sender_arc = self.wallet_arc(sender_tx.wallet_id)?;
                let receiver_arc = self.wallet_arc(receiver_tx.wallet_id)?;

                // Lock both wallets in id order to rule out deadlock
                let (lock_a, lock_b) = if sender_tx.wallet_id < receiver_tx.wallet_id {
                    (&sender_arc, &receiver_arc)
                } else {
                    (&receiver_arc, &sender_arc)
                };
                let mut guard_a = lock_a.lock().expect("wallet lock poisoned");
                let mut guard_b = lock_b.lock().expect("wallet lock poisoned");
                let (sender, receiver) = if sender_tx.wallet_id < receiver_tx.wallet_id {
                    (&mut guard_a, &mut guard_b)
                } else {
                    (&mut guard_b, &mut guard_a)
                };

                if !sender.is_active() {
                    return Err(LedgerError::WalletDeactivated {
                        wallet_id: sender_tx.wallet_id.to_string(),
                    });
                }
                if !receiver.is_active() {
                    return Err(LedgerError::WalletDeactivated {
                        wallet_id: receiver_tx.wallet_id.to_string(),
                    });
                }
                if sender_tx.amount > sender.balance.credits {
                    return Err(LedgerError::InsufficientBalance {
                        required: sender_tx.amount.to_string(),
                        available: sender.balance.credits.to_string(),
                    });
                }

                sender.balance.debit(sender_tx.amount);
                sender.touch(sender_tx.timestamp);
                receiver.balance.credit(fee_split.creator_amount);
                if receiver_tx.tx_type == TransactionType::Royalty {
                    receiver.balance.royalties_earned += fee_split.creator_amount;
                }
                receiver.touch(receiver_tx.timestamp);

                self.push_transaction(sender_tx.clone());
                self.push_transaction(receiver_tx.clone());
                let mut revenue = self.revenue.lock().expect("revenue lock poisoned");
                revenue.platform_revenue += fee_split.platform_amount;
                revenue.reserve_fund += fee_split.reserve_fund_amount;
            }

            LedgerEvent::TransactionAborted { tx_id, timestamp } => {
                let tx = self.transaction(*tx_id)?;
                if tx.tx_type == TransactionType::Withdrawal {
                    let arc = self.wallet_arc(tx.wallet_id)?;
                    let mut wallet = arc.lock().expect("wallet lock poisoned");
                    self.set_status(*tx_id, TransactionStatus::Failed)?;
                    wallet.balance.pending_withdrawal -= tx.net_amount;
                    wallet.balance.credit(tx.amount);
                    wallet.touch(*timestamp);
                    self.revenue.lock().expect("revenue lock poisoned").withdrawal_fees -= tx.fee;
                } else {
                    self.set_status(*tx_id, TransactionStatus::Failed)?;
                }
            }

            LedgerEvent::AuditLinked { tx_id, hash } => {
                let index = self.tx_index.read().expect("transaction index poisoned");
                let mut txs = self.transactions.write().expect("transaction log poisoned");
                let i = *index.get(tx_id).ok_or_else(|| LedgerError::TransactionNotFound {
                    tx_id: tx_id.to_string(),
                })?;
                txs[i].audit_event_id = Some(hash.clone());
            }
        }
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn wallet_arc(&self, wallet_id: WalletId) -> Result<Arc<Mutex<Wallet>>, LedgerError> {
        self.wallets
            .read()
            .expect("wallet map poisoned")
            .get(&wallet_id)
            .cloned()
            .ok_or_else(|| LedgerError::WalletNotFound {
                wallet_id: wallet_id.to_string(),
            })
    }

    fn require_active(&self, wallet_id: WalletId) -> Result<(), LedgerError> {
        let arc = self.wallet_arc(wallet_id)?;
        let wallet = arc.lock().expect("wallet lock poisoned");
        if wallet.is_active() {
            Ok(())
        } else {
            Err(LedgerError::WalletDeactivated {
                wallet_id: wallet_id.to_string(),
            })
        }
    }

    fn push_transaction(&self, tx: Transaction) {
        debug_assert!(tx.check_invariant(), "fee/net identity violated");
        let mut index = self.tx_index.write().expect("transaction index poisoned");
        let mut txs = self.transactions.write().expect("transaction log poisoned");
        index.insert(tx.id, txs.len());
        txs.push(tx);
    }

    /// Balance and tier-limit checks for a withdrawal, under the wallet
    /// lock held by the caller.
    fn validate_withdrawal(&self, wallet: &Wallet, tx: &Transaction) -> Result<(), LedgerError> {
        if !wallet.is_active() {
            return Err(LedgerError::WalletDeactivated {
                wallet_id: tx.wallet_id.to_string(),
            });
        }
        if tx.amount > wallet.balance.credits {
            return Err(LedgerError::InsufficientBalance {
                required: tx.amount.to_string(),
                available: wallet.balance.credits.to_string(),
            });
        }
        let limits = self.tiers.limits(wallet.tier);
        if tx.amount > limits.single_transaction {
            return Err(LedgerError::TierLimitExceeded {
                limit: limits.single_transaction.to_string(),
                requested: tx.amount.to_string(),
            });
        }
        let withdrawn = self.withdrawn_since(tx.wallet_id, tx.timestamp - DAY_NANOS);
        if withdrawn + tx.amount > limits.daily_withdrawal {
            return Err(LedgerError::TierLimitExceeded {
                limit: limits.daily_withdrawal.to_string(),
                requested: (withdrawn + tx.amount).to_string(),
            });
        }
        Ok(())
    }

    fn check_status(&self, tx_id: TransactionId, to: TransactionStatus) -> Result<(), LedgerError> {
        let from = self.transaction(tx_id)?.status;
        if !from.can_transition(to) {
            return Err(LedgerError::InvalidStateTransition {
                from: format!("{:?}", from),
                to: format!("{:?}", to),
            });
        }
        Ok(())
    }

    fn set_status(&self, tx_id: TransactionId, to: TransactionStatus) -> Result<(), LedgerError> {
        let index = self.tx_index.read().expect("transaction index poisoned");
        let mut txs = self.transactions.write().expect("transaction log poisoned");
        let i = *index.get(&tx_id).ok_or_else(|| LedgerError::TransactionNotFound {
            tx_id: tx_id.to_string(),
        })?;
        let from = txs[i].status;
        if !from.can_transition(to) {
            return Err(LedgerError::InvalidStateTransition {
                from: format!("{:?}", from),
                to: format!("{:?}", to),
            });
        }
        txs[i].status = to;
        Ok(())
    }

    /// Gross withdrawals (not failed or cancelled) for a wallet since `since`.
    fn withdrawn_since(&self, wallet_id: WalletId, since: i64) -> Decimal {
        let txs = self.transactions.read().expect("transaction log poisoned");
        txs.iter()
            .filter(|tx| {
                tx.wallet_id == wallet_id
                    && tx.tx_type == TransactionType::Withdrawal
                    && tx.timestamp >= since
                    && tx.status != TransactionStatus::Failed
                    && tx.status != TransactionStatus::Cancelled
            })
            .map(|tx| tx.amount)
            .sum()
    }
}

fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount {
            amount: amount.to_string(),
        });
    }
    Ok(())
}

fn category_of(tx_type: TransactionType) -> Option<TransferCategory> {
    match tx_type {
        TransactionType::GiftSent => Some(TransferCategory::Gift),
        TransactionType::Purchase => Some(TransferCategory::Marketplace),
        TransactionType::Subscription => Some(TransferCategory::Subscription),
        TransactionType::CoursePurchase => Some(TransferCategory::Course),
        TransactionType::Tip => Some(TransferCategory::Tip),
        _ => None,
    }
}
