//! Append-only, crash-recoverable mission journal (spec.md §4.4 "Durability",
//! §6.4). Grounded on the runtime's `reasoning::journal` split between a
//! storage trait and an in-memory implementation, adapted from per-agent
//! journal entries to per-mission `LogRecord`s.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::{LogPayload, LogRecord, MissionId};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal storage error: {0}")]
    Storage(String),
}

/// Durable storage backend for mission log records.
#[async_trait::async_trait]
pub trait JournalStorage: Send + Sync {
    async fn append(&self, mission_id: MissionId, record: &LogRecord) -> Result<(), JournalError>;
    async fn read_from(&self, mission_id: MissionId, since_index: u64) -> Result<Vec<LogRecord>, JournalError>;
    async fn latest_index(&self, mission_id: MissionId) -> Result<Option<u64>, JournalError>;
}

/// In-memory journal storage; the default for a single-process deployment
/// and for tests (spec.md §6.4: "no bespoke schema required for mission
/// correctness").
#[derive(Default)]
pub struct MemoryJournalStorage {
    records: Mutex<HashMap<MissionId, Vec<LogRecord>>>,
}

impl MemoryJournalStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JournalStorage for MemoryJournalStorage {
    async fn append(&self, mission_id: MissionId, record: &LogRecord) -> Result<(), JournalError> {
        self.records
            .lock()
            .await
            .entry(mission_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn read_from(&self, mission_id: MissionId, since_index: u64) -> Result<Vec<LogRecord>, JournalError> {
        let records = self.records.lock().await;
        Ok(records
            .get(&mission_id)
            .map(|v| v.iter().filter(|r| r.index >= since_index).cloned().collect())
            .unwrap_or_default())
    }

    async fn latest_index(&self, mission_id: MissionId) -> Result<Option<u64>, JournalError> {
        let records = self.records.lock().await;
        Ok(records.get(&mission_id).and_then(|v| v.last()).map(|r| r.index))
    }
}

/// Per-mission journal writer: assigns dense, strictly-increasing indices
/// (invariant I3) and persists through a `JournalStorage` backend.
pub struct MissionJournal {
    storage: Arc<dyn JournalStorage>,
    mission_id: MissionId,
    sequence: AtomicU64,
}

impl MissionJournal {
    pub fn new(storage: Arc<dyn JournalStorage>, mission_id: MissionId) -> Self {
        Self {
            storage,
            mission_id,
            sequence: AtomicU64::new(0),
        }
    }

    /// Resume the sequence counter from storage (crash recovery).
    pub async fn initialize(&self) -> Result<(), JournalError> {
        if let Some(latest) = self.storage.latest_index(self.mission_id).await? {
            self.sequence.store(latest + 1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Append a new record, assigning it the next dense index, and persist
    /// it before returning — callers must not advance mission state until
    /// this returns `Ok` (spec.md §4.4 Durability).
    pub async fn append(&self, payload: LogPayload) -> Result<LogRecord, JournalError> {
        let index = self.sequence.fetch_add(1, Ordering::SeqCst);
        let record = LogRecord::new(index, payload);
        self.storage.append(self.mission_id, &record).await?;
        Ok(record)
    }

    /// `get-log(since-index)` query (spec.md §4.4 Queries).
    pub async fn read_from(&self, since_index: u64) -> Result<Vec<LogRecord>, JournalError> {
        self.storage.read_from(self.mission_id, since_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn indices_are_dense_and_increasing() {
        let storage = Arc::new(MemoryJournalStorage::new());
        let journal = MissionJournal::new(storage, MissionId::new());
        let a = journal.append(LogPayload::Control("a".into())).await.unwrap();
        let b = journal.append(LogPayload::Control("b".into())).await.unwrap();
        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
    }

    #[tokio::test]
    async fn resumes_sequence_after_reinitialize() {
        let storage = Arc::new(MemoryJournalStorage::new());
        let mission_id = MissionId::new();
        let first = MissionJournal::new(storage.clone(), mission_id);
        first.append(LogPayload::Control("a".into())).await.unwrap();

        let resumed = MissionJournal::new(storage, mission_id);
        resumed.initialize().await.unwrap();
        let next = resumed.append(LogPayload::Control("b".into())).await.unwrap();
        assert_eq!(next.index, 1);
    }

    #[tokio::test]
    async fn read_from_filters_by_index() {
        let storage = Arc::new(MemoryJournalStorage::new());
        let journal = MissionJournal::new(storage, MissionId::new());
        for i in 0..5 {
            journal.append(LogPayload::Control(format!("e{i}"))).await.unwrap();
        }
        let tail = journal.read_from(3).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].index, 3);
    }
}
