//! Append-only federation registry
//!
//! Each registry instance ("local", "continental") records content hashes
//! of ledger events under its own signer identity, with its own backing
//! store. Records are append-only and write-once: re-committing the same
//! entity appends a new record, history is cumulative, never overwritten.

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};
use types::ids::RecordId;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// One attested hash in a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationRecord {
    pub id: RecordId,
    pub entity_type: String,
    pub entity_id: String,
    pub hash: String,
    pub signer: String,
    /// Unix nanosecond timestamp
    pub created_at: i64,
}

/// Backing store for one registry instance
pub trait RegistryStore: Send + Sync {
    /// Persist a record at the end of the registry.
    fn push(&self, record: &FederationRecord) -> Result<(), RegistryError>;

    /// All records in append order.
    fn snapshot(&self) -> Vec<FederationRecord>;
}

/// Volatile in-memory store (tests, ephemeral registries)
#[derive(Default)]
pub struct MemoryRegistryStore {
    records: RwLock<Vec<FederationRecord>>,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn push(&self, record: &FederationRecord) -> Result<(), RegistryError> {
        self.records
            .write()
            .expect("registry store poisoned")
            .push(record.clone());
        Ok(())
    }

    fn snapshot(&self) -> Vec<FederationRecord> {
        self.records.read().expect("registry store poisoned").clone()
    }
}

/// Durable file-backed store
///
/// Entries are length-prefixed JSON with a CRC32C trailer; a corrupt tail
/// is dropped on open, everything intact replays into the cache.
pub struct JournalRegistryStore {
    writer: Mutex<BufWriter<File>>,
    cache: RwLock<Vec<FederationRecord>>,
    path: PathBuf,
}

impl JournalRegistryStore {
    /// Open (or create) the registry file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut records = Vec::new();
        if path.exists() {
            let data = fs::read(&path)?;
            let mut pos = 0usize;
            let mut valid_len = 0u64;
            while pos < data.len() {
                match Self::decode_entry(&data[pos..]) {
                    Some((record, consumed)) => {
                        records.push(record);
                        pos += consumed;
                        valid_len = pos as u64;
                    }
                    None => break,
                }
            }
            if valid_len < data.len() as u64 {
                warn!(
                    path = %path.display(),
                    valid_len,
                    file_len = data.len(),
                    "Truncating corrupt registry tail"
                );
                let file = OpenOptions::new().write(true).open(&path)?;
                file.set_len(valid_len)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            cache: RwLock::new(records),
            path,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn decode_entry(data: &[u8]) -> Option<(FederationRecord, usize)> {
        if data.len() < 4 {
            return None;
        }
        let payload_len = u32::from_le_bytes(data[0..4].try_into().ok()?) as usize;
        if payload_len > 1024 * 1024 {
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
        let record = serde_json::from_slice(payload).ok()?;
        Some((record, total))
    }
}

impl RegistryStore for JournalRegistryStore {
    fn push(&self, record: &FederationRecord) -> Result<(), RegistryError> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        let checksum = crc32c(&payload);

        // Hold the writer lock across write + cache update so file order
        // always matches cache order
        let mut writer = self.writer.lock().expect("registry writer poisoned");
        writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.write_all(&checksum.to_le_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        self.cache
            .write()
            .expect("registry store poisoned")
            .push(record.clone());
        Ok(())
    }

    fn snapshot(&self) -> Vec<FederationRecord> {
        self.cache.read().expect("registry store poisoned").clone()
    }
}

/// One federation registry instance with a signer identity
pub struct FederationRegistry {
    name: String,
    signer: String,
    store: Box<dyn RegistryStore>,
}

impl FederationRegistry {
    /// Create a registry over an explicit backing store.
    pub fn new(
        name: impl Into<String>,
        signer: impl Into<String>,
        store: Box<dyn RegistryStore>,
    ) -> Self {
        Self {
            name: name.into(),
            signer: signer.into(),
            store,
        }
    }

    /// In-memory registry (tests, ephemeral use).
    pub fn in_memory(name: impl Into<String>, signer: impl Into<String>) -> Self {
        Self::new(name, signer, Box::new(MemoryRegistryStore::new()))
    }

    /// Registry name ("local", "continental").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signer identity stamped on every record.
    pub fn signer(&self) -> &str {
        &self.signer
    }

    /// Append a record. Never updates or deletes prior records for the
    /// same entity; history is cumulative.
    pub fn append(
        &self,
        entity_type: &str,
        entity_id: &str,
        hash: &str,
        timestamp: i64,
    ) -> Result<RecordId, RegistryError> {
        let record = FederationRecord {
            id: RecordId::new(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            hash: hash.to_string(),
            signer: self.signer.clone(),
            created_at: timestamp,
        };
        self.store.push(&record)?;
        debug!(
            registry = %self.name,
            entity_type,
            entity_id,
            hash,
            "Federation record appended"
        );
        Ok(record.id)
    }

    /// Records for one entity, most recent first.
    pub fn records_for(&self, entity_type: &str, entity_id: &str) -> Vec<FederationRecord> {
        let mut records: Vec<FederationRecord> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|r| r.entity_type == entity_type && r.entity_id == entity_id)
            .collect();
        records.reverse();
        records
    }

    /// The most recent `limit` records, most recent first.
    ///
    /// A bounded snapshot: concurrent appends after the call do not
    /// affect the returned records.
    pub fn recent(&self, limit: usize) -> Vec<FederationRecord> {
        let snapshot = self.store.snapshot();
        snapshot.into_iter().rev().take(limit).collect()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.store.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const T0: i64 = 1_708_123_456_789_000_000;

    #[test]
    fn test_append_is_cumulative() {
        let registry = FederationRegistry::in_memory("local", "node_local");
        registry.append("transaction", "t-1", "h1", T0).unwrap();
        registry.append("transaction", "t-1", "h2", T0 + 1).unwrap();

        let records = registry.records_for("transaction", "t-1");
        assert_eq!(records.len(), 2, "re-commit appends, never overwrites");
        assert_eq!(records[0].hash, "h2", "most recent first");
        assert_eq!(records[1].hash, "h1");
    }

    #[test]
    fn test_signer_is_stamped() {
        let registry = FederationRegistry::in_memory("continental", "node_continental");
        registry.append("transaction", "t-1", "h1", T0).unwrap();
        assert_eq!(registry.records_for("transaction", "t-1")[0].signer, "node_continental");
    }

    #[test]
    fn test_recent_is_bounded() {
        let registry = FederationRegistry::in_memory("local", "node_local");
        for i in 0..10 {
            registry
                .append("transaction", &format!("t-{i}"), &format!("h-{i}"), T0 + i)
                .unwrap();
        }
        let recent = registry.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].entity_id, "t-9");
        assert_eq!(recent[2].entity_id, "t-7");
    }

    #[test]
    fn test_journal_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("local.reg");

        {
            let store = JournalRegistryStore::open(&path).unwrap();
            let registry = FederationRegistry::new("local", "node_local", Box::new(store));
            registry.append("transaction", "t-1", "h1", T0).unwrap();
            registry.append("wallet", "w-1", "h2", T0 + 1).unwrap();
        }

        let store = JournalRegistryStore::open(&path).unwrap();
        let registry = FederationRegistry::new("local", "node_local", Box::new(store));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.records_for("transaction", "t-1")[0].hash, "h1");
    }

    #[test]
    fn test_journal_store_drops_corrupt_tail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("local.reg");

        {
            let store = JournalRegistryStore::open(&path).unwrap();
            let registry = FederationRegistry::new("local", "node_local", Box::new(store));
            registry.append("transaction", "t-1", "h1", T0).unwrap();
        }
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xff, 0x00, 0xff]).unwrap();
        }

        let store = JournalRegistryStore::open(&path).unwrap();
        assert_eq!(store.snapshot().len(), 1);
    }
}
