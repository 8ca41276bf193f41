//! In-memory record store.

use std::collections::HashMap;

use crate::storage::records::{FIRST_RECORD_ID, RecordId, RecordStore, RecordStoreError};

/// A payload held in memory, possibly tombstoned.
#[derive(Debug)]
struct MemoryRecord {
    payload: String,
    tombstoned: bool,
}

/// Record store that keeps every payload in a map.
///
/// Tombstoned payloads are kept so that tests can observe them; `fetch`
/// never returns them.
#[derive(Debug)]
pub struct MemoryRecordStore {
    records: HashMap<RecordId, MemoryRecord>,
    next_id: Option<RecordId>,
    live: usize,
}

impl MemoryRecordStore {
    /// Create an empty store whose first identifier is [`FIRST_RECORD_ID`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            next_id: Some(FIRST_RECORD_ID),
            live: 0,
        }
    }

    /// Number of payloads that have not been invalidated.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Whether no live payloads remain.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of tombstoned payloads.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.records.len() - self.live
    }

    /// Whether `id` was appended and later invalidated.
    #[must_use]
    pub fn is_tombstoned(&self, id: RecordId) -> bool {
        self.records.get(&id).is_some_and(|r| r.tombstoned)
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    fn append(&mut self, payload: &str) -> Result<RecordId, RecordStoreError> {
        let id = self.next_id.ok_or(RecordStoreError::IdsExhausted)?;
        self.next_id = id.next();
        self.records.insert(
            id,
            MemoryRecord {
                payload: payload.to_owned(),
                tombstoned: false,
            },
        );
        self.live += 1;
        Ok(id)
    }

    fn fetch(&mut self, id: RecordId) -> Result<Option<String>, RecordStoreError> {
        Ok(self
            .records
            .get(&id)
            .filter(|r| !r.tombstoned)
            .map(|r| r.payload.clone()))
    }

    fn invalidate(&mut self, id: RecordId) -> Result<bool, RecordStoreError> {
        match self.records.get_mut(&id) {
            Some(record) if !record.tombstoned => {
                record.tombstoned = true;
                self.live -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
