//! Transaction history iteration and aggregation

use rust_decimal::Decimal;
use types::ids::WalletId;
use types::transaction::{Transaction, TransactionStatus, TransactionType};

/// Lazy, restartable iterator over a wallet's transactions,
/// most recent first
///
/// Produced from a snapshot of the history at call time; a concurrent
/// append never invalidates an iterator already handed out.
pub struct History {
    items: Vec<Transaction>,
    pos: usize,
}

impl History {
    /// Snapshot the transactions for one wallet, timestamp-descending.
    pub fn for_wallet(all: &[Transaction], wallet_id: WalletId) -> Self {
        let mut items: Vec<Transaction> = all
            .iter()
            .filter(|tx| tx.wallet_id == wallet_id)
            .cloned()
            .collect();
        // Stable sort: ids are time-ordered, so equal timestamps keep
        // insertion order
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { items, pos: 0 }
    }

    /// Number of transactions remaining.
    pub fn len(&self) -> usize {
        self.items.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for History {
    type Item = Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.get(self.pos)?.clone();
        self.pos += 1;
        Some(item)
    }
}

/// Per-type totals over a wallet's completed transactions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WalletAggregate {
    /// Gross confirmed deposits
    pub total_deposits: Decimal,
    /// Gross withdrawals (initiated or settled, not failed)
    pub total_withdrawals: Decimal,
    /// Net credited from incoming transfers
    pub total_earnings: Decimal,
    /// Gross spent on outgoing transfers
    pub total_spent: Decimal,
}

impl WalletAggregate {
    /// Fold a history down to totals. Only `Completed` transactions count.
    pub fn fold(history: impl Iterator<Item = Transaction>) -> Self {
        let mut agg = Self::default();
        for tx in history {
            if tx.status != TransactionStatus::Completed {
                continue;
            }
            match tx.tx_type {
                TransactionType::Deposit => agg.total_deposits += tx.amount,
                TransactionType::Withdrawal => agg.total_withdrawals += tx.amount,
                t if t.is_incoming() => agg.total_earnings += tx.net_amount,
                _ => agg.total_spent += tx.amount,
            }
        }
        agg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(
        wallet_id: WalletId,
        tx_type: TransactionType,
        amount: u64,
        fee: u64,
        status: TransactionStatus,
        timestamp: i64,
    ) -> Transaction {
        Transaction::new(
            wallet_id,
            tx_type,
            Decimal::from(amount),
            "CREDITS",
            Decimal::from(fee),
            status,
            timestamp,
        )
    }

    #[test]
    fn test_history_filters_and_sorts() {
        let w1 = WalletId::new();
        let w2 = WalletId::new();
        let all = vec![
            tx(w1, TransactionType::Deposit, 10, 0, TransactionStatus::Completed, 100),
            tx(w2, TransactionType::Deposit, 20, 0, TransactionStatus::Completed, 150),
            tx(w1, TransactionType::Withdrawal, 5, 1, TransactionStatus::Pending, 300),
            tx(w1, TransactionType::Deposit, 30, 0, TransactionStatus::Completed, 200),
        ];

        let history = History::for_wallet(&all, w1);
        assert_eq!(history.len(), 3);
        let timestamps: Vec<i64> = history.map(|t| t.timestamp).collect();
        assert_eq!(timestamps, vec![300, 200, 100]);
    }

    #[test]
    fn test_aggregate_skips_non_completed() {
        let w = WalletId::new();
        let all = vec![
            tx(w, TransactionType::Deposit, 100, 0, TransactionStatus::Completed, 1),
            tx(w, TransactionType::Deposit, 50, 0, TransactionStatus::Pending, 2),
            tx(w, TransactionType::Deposit, 25, 0, TransactionStatus::Failed, 3),
        ];
        let agg = WalletAggregate::fold(History::for_wallet(&all, w));
        assert_eq!(agg.total_deposits, Decimal::from(100));
    }

    #[test]
    fn test_aggregate_classification() {
        let w = WalletId::new();
        let all = vec![
            tx(w, TransactionType::Deposit, 200, 0, TransactionStatus::Completed, 1),
            tx(w, TransactionType::Withdrawal, 40, 1, TransactionStatus::Completed, 2),
            tx(w, TransactionType::Sale, 100, 30, TransactionStatus::Completed, 3),
            tx(w, TransactionType::Purchase, 60, 9, TransactionStatus::Completed, 4),
            tx(w, TransactionType::GiftReceived, 10, 3, TransactionStatus::Completed, 5),
        ];
        let agg = WalletAggregate::fold(History::for_wallet(&all, w));
        assert_eq!(agg.total_deposits, Decimal::from(200));
        assert_eq!(agg.total_withdrawals, Decimal::from(40));
        assert_eq!(agg.total_earnings, Decimal::from(70 + 7)); // net amounts
        assert_eq!(agg.total_spent, Decimal::from(60));
    }

    #[test]
    fn test_empty_history() {
        let history = History::for_wallet(&[], WalletId::new());
        assert!(history.is_empty());
        assert_eq!(WalletAggregate::fold(history), WalletAggregate::default());
    }
}
