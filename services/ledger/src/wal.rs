//! Write-ahead log for ledger state
//!
//! Every applied ledger event is appended to a length-prefixed,
//! CRC32C-checksummed binary log before the in-memory mutation is
//! considered committed. Reopening the log replays all intact events so
//! the store survives process restarts; a corrupt tail (torn write at
//! crash) is truncated at the first bad entry.
//!
//! # Binary format (per entry)
//! ```text
//! [payload_len: u32]
//! [payload: bincode(LedgerEvent)]
//! [checksum: u32]  // CRC32C over payload
//! ```

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::ids::TransactionId;
use types::transaction::Transaction;
use types::wallet::Wallet;

#[derive(Error, Debug)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A single ledger state change, as recorded in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    WalletCreated {
        wallet: Wallet,
    },
    DepositInitiated {
        tx: Transaction,
    },
    DepositConfirmed {
        tx_id: TransactionId,
        timestamp: i64,
    },
    WithdrawalInitiated {
        tx: Transaction,
    },
    WithdrawalSettled {
        tx_id: TransactionId,
        timestamp: i64,
    },
    TransferRecorded {
        sender_tx: Transaction,
        receiver_tx: Transaction,
    },
    /// Pending transaction failed (timed out or rejected by the
    /// processor); withdrawals refund in full
    TransactionAborted {
        tx_id: TransactionId,
        timestamp: i64,
    },
    AuditLinked {
        tx_id: TransactionId,
        hash: String,
    },
}

/// Append-only event log backing a `LedgerStore`
pub struct LedgerWal {
    writer: BufWriter<File>,
    path: PathBuf,
    #[cfg(test)]
    fail_next_append: bool,
}

impl LedgerWal {
    /// Open the log at `path`, replaying intact events.
    ///
    /// Returns the writer positioned for appending plus the replayed
    /// events in write order. A corrupt tail is truncated so the next
    /// append lands after the last intact entry.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<LedgerEvent>), WalError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut events = Vec::new();
        let mut valid_len: u64 = 0;

        if path.exists() {
            let data = fs::read(&path)?;
            let mut pos = 0usize;
            while pos < data.len() {
                match Self::decode_entry(&data[pos..]) {
                    Some((event, consumed)) => {
                        events.push(event);
                        pos += consumed;
                        valid_len = pos as u64;
                    }
                    None => break, // torn or corrupt tail
                }
            }
            if valid_len < data.len() as u64 {
                tracing::warn!(
                    path = %path.display(),
                    valid_len,
                    file_len = data.len(),
                    "Truncating corrupt ledger log tail"
                );
                let file = OpenOptions::new().write(true).open(&path)?;
                file.set_len(valid_len)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok((
            Self {
                writer: BufWriter::new(file),
                path,
                #[cfg(test)]
                fail_next_append: false,
            },
            events,
        ))
    }

    /// Make the next append return an IO error, simulating a full or
    /// failing disk.
    #[cfg(test)]
    pub(crate) fn fail_next_append(&mut self) {
        self.fail_next_append = true;
    }

    /// Append one event and force it to disk.
    pub fn append(&mut self, event: &LedgerEvent) -> Result<(), WalError> {
        #[cfg(test)]
        if self.fail_next_append {
            self.fail_next_append = false;
            return Err(WalError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected append failure",
            )));
        }

        let payload =
            bincode::serialize(event).map_err(|e| WalError::Serialization(e.to_string()))?;
        let checksum = crc32c(&payload);

        self.writer
            .write_all(&(payload.len() as u32).to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.write_all(&checksum.to_le_bytes())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode one entry from the front of `data`.
    ///
    /// Returns `None` on any incompleteness or checksum mismatch; the
    /// caller treats that as the end of the intact prefix.
    fn decode_entry(data: &[u8]) -> Option<(LedgerEvent, usize)> {
        if data.len() < 4 {
            return None;
        }
        let payload_len = u32::from_le_bytes(data[0..4].try_into().ok()?) as usize;
        // Reject implausible lengths (likely corruption)
        if payload_len > 16 * 1024 * 1024 {
            return None;
        }
        let total = 4 + payload_len + 4;
        if data.len() < total {
            return None;
        }
        let payload = &data[4..4 + payload_len];
        let stored = u32::from_le_bytes(data[4 + payload_len..total].try_into().ok()?);
        if crc32c(payload) != stored {
            return None;
        }
        let event = bincode::deserialize(payload).ok()?;
        Some((event, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::TempDir;
    use types::transaction::{TransactionStatus, TransactionType};
    use types::ids::WalletId;

    fn sample_event(user: &str) -> LedgerEvent {
        LedgerEvent::WalletCreated {
            wallet: Wallet::new(user, 1_708_123_456_789_000_000),
        }
    }

    fn sample_tx() -> Transaction {
        Transaction::new(
            WalletId::new(),
            TransactionType::Deposit,
            Decimal::from(100),
            "CREDITS",
            Decimal::ZERO,
            TransactionStatus::Pending,
            1_708_123_456_789_000_000,
        )
    }

    #[test]
    fn test_append_and_replay() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.wal");

        {
            let (mut wal, replayed) = LedgerWal::open(&path).unwrap();
            assert!(replayed.is_empty());
            wal.append(&sample_event("user-1")).unwrap();
            wal.append(&LedgerEvent::DepositInitiated { tx: sample_tx() })
                .unwrap();
        }

        let (_wal, replayed) = LedgerWal::open(&path).unwrap();
        assert_eq!(replayed.len(), 2);
        assert!(matches!(replayed[0], LedgerEvent::WalletCreated { .. }));
        assert!(matches!(replayed[1], LedgerEvent::DepositInitiated { .. }));
    }

    #[test]
    fn test_corrupt_tail_is_truncated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.wal");

        {
            let (mut wal, _) = LedgerWal::open(&path).unwrap();
            wal.append(&sample_event("user-1")).unwrap();
        }
        let intact_len = fs::metadata(&path).unwrap().len();

        // Simulate a torn write: garbage after the intact entry
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xde, 0xad, 0xbe]).unwrap();
        }

        let (_wal, replayed) = LedgerWal::open(&path).unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact_len);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.wal");

        {
            let (mut wal, _) = LedgerWal::open(&path).unwrap();
            wal.append(&sample_event("user-1")).unwrap();
            wal.append(&sample_event("user-2")).unwrap();
        }

        // Flip a byte inside the second entry's payload
        let mut data = fs::read(&path).unwrap();
        let second_start = {
            let first_len = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
            4 + first_len + 4
        };
        data[second_start + 8] ^= 0xff;
        fs::write(&path, &data).unwrap();

        let (_wal, replayed) = LedgerWal::open(&path).unwrap();
        assert_eq!(replayed.len(), 1, "tampered entry must not replay");
    }

    #[test]
    fn test_append_after_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.wal");

        {
            let (mut wal, _) = LedgerWal::open(&path).unwrap();
            wal.append(&sample_event("user-1")).unwrap();
        }
        {
            let (mut wal, replayed) = LedgerWal::open(&path).unwrap();
            assert_eq!(replayed.len(), 1);
            wal.append(&sample_event("user-2")).unwrap();
        }

        let (_wal, replayed) = LedgerWal::open(&path).unwrap();
        assert_eq!(replayed.len(), 2);
    }
}
