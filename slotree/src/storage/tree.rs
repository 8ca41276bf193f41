//! Binary search tree over the slot table.
//!
//! The engine manipulates slot ids only. Payloads go through the record store:
//! an append on insert, append + invalidate on modify, and invalidate on delete.
//!
//! There is no rebalancing. Worst-case depth equals the number of live keys.
//!
//! # Ordering
//!
//! For every live slot, keys in its left subtree are strictly less than its
//! key and keys in its right subtree are greater or equal. Ties route right.

use std::path::Path;

use crate::storage::records::{RecordId, RecordStore, RecordStoreError};
use crate::storage::slot::{Key, Slot, SlotId};
use crate::storage::table::{RestoreOutcome, SlotTable, SlotTableError};
use crate::storage::traversal::{Traversal, TraversalOrder};

/// Result of walking the tree for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Live slot holding the key, if any.
    pub slot: Option<SlotId>,
    /// Last slot visited before `slot`, or the slot a new key would hang from.
    pub parent: Option<SlotId>,
}

/// A key and its payload as produced by [`SlotTree::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Slot holding the key.
    pub slot: SlotId,
    /// The key.
    pub key: Key,
    /// The payload, or `None` if the record store no longer resolves it.
    pub payload: Option<String>,
}

/// Binary search tree whose nodes live in a [`SlotTable`] and whose payloads
/// live in a [`RecordStore`].
pub struct SlotTree<S> {
    table: SlotTable,
    store: S,
}

impl<S: RecordStore> SlotTree<S> {
    /// Create an empty tree with room for `capacity` insertions.
    pub fn new(capacity: u32, store: S) -> Result<Self, IndexError> {
        Ok(Self {
            table: SlotTable::new(capacity)?,
            store,
        })
    }

    /// Assemble a tree from an existing table and store.
    ///
    /// The caller is responsible for the table's record ids resolving in `store`.
    #[must_use]
    pub const fn from_parts(table: SlotTable, store: S) -> Self {
        Self { table, store }
    }

    /// Split the tree into its table and store.
    #[must_use]
    pub fn into_parts(self) -> (SlotTable, S) {
        (self.table, self.store)
    }

    /// The underlying slot table.
    #[must_use]
    pub const fn table(&self) -> &SlotTable {
        &self.table
    }

    /// The underlying record store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying record store.
    #[allow(clippy::missing_const_for_fn)] // mutable references can't be const
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Number of live keys.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.table.live_count()
    }

    /// Whether no keys are live.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.table.root().is_none()
    }

    /// Maximum number of insertions over the tree's lifetime.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.table.capacity()
    }

    /// Insertions left before the tree is full. Deletes do not add to this.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.table.remaining()
    }

    /// Walk from the root toward `key`.
    ///
    /// Descends left when `key` is less than a slot's key and right otherwise.
    /// An equal key at a dead slot keeps descending right.
    #[must_use]
    pub fn locate(&self, key: Key) -> Located {
        let mut parent = None;
        let mut current = self.table.root();

        while let Some(id) = current {
            let slot = self.table.slot(id);
            if slot.live && slot.key == key {
                return Located {
                    slot: Some(id),
                    parent,
                };
            }
            parent = Some(id);
            current = if key < slot.key { slot.left } else { slot.right };
        }

        Located { slot: None, parent }
    }

    /// Whether `key` is live.
    #[must_use]
    pub fn contains(&self, key: Key) -> bool {
        self.locate(key).slot.is_some()
    }

    /// Insert `key` with `payload`.
    ///
    /// Returns the slot the key was stored in.
    ///
    /// # Errors
    ///
    /// - [`IndexError::CapacityExhausted`] once `capacity` slots have ever been
    ///   allocated, regardless of how many are still live
    /// - [`IndexError::DuplicateKey`] if `key` is already live
    pub fn insert(&mut self, key: Key, payload: &str) -> Result<SlotId, IndexError> {
        if self.table.is_full() {
            return Err(IndexError::CapacityExhausted {
                capacity: self.table.capacity(),
            });
        }

        let located = self.locate(key);
        if located.slot.is_some() {
            return Err(IndexError::DuplicateKey(key));
        }

        let record_id = self.store.append(payload)?;
        let Some(id) = self.table.allocate(Slot::live(key, record_id)) else {
            return Err(IndexError::CapacityExhausted {
                capacity: self.table.capacity(),
            });
        };

        match located.parent {
            None => self.table.set_root(Some(id)),
            Some(parent) => {
                let parent = self.table.slot_mut(parent);
                if key < parent.key {
                    parent.left = Some(id);
                } else {
                    parent.right = Some(id);
                }
            }
        }

        tracing::debug!("Inserted key {key} at slot {id} (record {record_id})");
        Ok(id)
    }

    /// Look up the payload stored under `key`.
    pub fn lookup(&mut self, key: Key) -> Result<String, IndexError> {
        let id = self.locate(key).slot.ok_or(IndexError::KeyNotFound(key))?;
        let record_id = self.table.slot(id).record_id;

        match record_id {
            Some(record_id) => self
                .store
                .fetch(record_id)?
                .ok_or(IndexError::MissingRecord {
                    key,
                    record_id: Some(record_id),
                }),
            None => Err(IndexError::MissingRecord {
                key,
                record_id: None,
            }),
        }
    }

    /// Replace the payload stored under `key`.
    ///
    /// A new record is appended and the old one invalidated before the slot
    /// is repointed; the tree's shape does not change. If the store fails the
    /// slot keeps its old record. When invalidating the old record fails, the
    /// new one is invalidated on a best-effort basis so it is not left live
    /// with no slot pointing at it.
    pub fn modify(&mut self, key: Key, payload: &str) -> Result<(), IndexError> {
        let id = self.locate(key).slot.ok_or(IndexError::KeyNotFound(key))?;

        let record_id = self.store.append(payload)?;
        if let Some(old) = self.table.slot(id).record_id {
            if let Err(e) = self.store.invalidate(old) {
                if let Err(cleanup) = self.store.invalidate(record_id) {
                    tracing::warn!(
                        "Record {record_id} left orphaned by failed modify: {cleanup}"
                    );
                }
                return Err(e.into());
            }
        }
        self.table.slot_mut(id).record_id = Some(record_id);

        tracing::debug!("Modified key {key} at slot {id} (record {record_id})");
        Ok(())
    }

    /// Delete `key`.
    ///
    /// Returns the payload that was stored under the key, or `None` if the
    /// record store no longer resolved it.
    ///
    /// A slot with two children keeps its position: the inorder successor's
    /// key and record move into it and the successor's slot dies instead.
    pub fn delete(&mut self, key: Key) -> Result<Option<String>, IndexError> {
        let Located { slot, parent } = self.locate(key);
        let id = slot.ok_or(IndexError::KeyNotFound(key))?;

        let removed = match self.table.slot(id).record_id {
            Some(record_id) => {
                let payload = self.store.fetch(record_id)?;
                self.store.invalidate(record_id)?;
                payload
            }
            None => None,
        };
        if removed.is_none() {
            tracing::warn!("Deleting key {key} at slot {id}: record store has no payload");
        }

        let Slot { left, right, .. } = *self.table.slot(id);
        match (left, right) {
            (None, None) => {
                self.replace_child(parent, id, None);
                self.table.kill(id);
            }
            (Some(child), None) | (None, Some(child)) => {
                self.replace_child(parent, id, Some(child));
                self.table.kill(id);
            }
            (Some(_), Some(right)) => {
                let mut successor_parent = id;
                let mut successor = right;
                while let Some(next) = self.table.slot(successor).left {
                    successor_parent = successor;
                    successor = next;
                }

                let Slot {
                    key: successor_key,
                    record_id: successor_record,
                    right: successor_right,
                    ..
                } = *self.table.slot(successor);

                let target = self.table.slot_mut(id);
                target.key = successor_key;
                target.record_id = successor_record;

                if successor_parent == id {
                    self.table.slot_mut(id).right = successor_right;
                } else {
                    self.table.slot_mut(successor_parent).left = successor_right;
                }
                self.table.kill(successor);
            }
        }

        tracing::debug!("Deleted key {key} from slot {id}");
        Ok(removed)
    }

    /// Point whichever link of `parent` referenced `child` at `replacement`.
    /// A `None` parent means `child` is the root.
    fn replace_child(&mut self, parent: Option<SlotId>, child: SlotId, replacement: Option<SlotId>) {
        match parent {
            None => self.table.set_root(replacement),
            Some(parent) => {
                let parent = self.table.slot_mut(parent);
                if parent.left == Some(child) {
                    parent.left = replacement;
                } else {
                    parent.right = replacement;
                }
            }
        }
    }

    /// Traverse live slots in `order`.
    #[must_use]
    pub fn traverse(&self, order: TraversalOrder) -> Traversal<'_> {
        Traversal::new(&self.table, order)
    }

    /// Live keys in `order`.
    pub fn keys(&self, order: TraversalOrder) -> impl Iterator<Item = Key> + '_ {
        self.traverse(order).map(|id| self.table.slot(id).key)
    }

    /// Live keys with their payloads, in `order`.
    pub fn entries(&mut self, order: TraversalOrder) -> Result<Vec<Entry>, IndexError> {
        let slots: Vec<SlotId> = self.traverse(order).collect();

        let mut entries = Vec::with_capacity(slots.len());
        for id in slots {
            let slot = *self.table.slot(id);
            let payload = match slot.record_id {
                Some(record_id) => self.store.fetch(record_id)?,
                None => None,
            };
            entries.push(Entry {
                slot: id,
                key: slot.key,
                payload,
            });
        }
        Ok(entries)
    }

    /// Persist the slot table to `path`.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        self.table.save(path)?;
        Ok(())
    }

    /// Replace the slot table with the snapshot at `path`.
    ///
    /// Any outcome other than [`RestoreOutcome::Restored`] leaves the tree empty.
    pub fn restore(&mut self, path: &Path) -> Result<RestoreOutcome, IndexError> {
        Ok(self.table.restore(path)?)
    }
}

/// Errors that can occur in tree operations.
#[derive(Debug)]
pub enum IndexError {
    /// Every slot has been allocated at least once.
    CapacityExhausted { capacity: u32 },
    /// The key is already live.
    DuplicateKey(Key),
    /// The key is not live.
    KeyNotFound(Key),
    /// A live slot's record could not be resolved by the record store.
    MissingRecord {
        key: Key,
        record_id: Option<RecordId>,
    },
    /// Record store error.
    Store(RecordStoreError),
    /// Slot table error.
    Table(SlotTableError),
    /// I/O error outside the table and store.
    Io(std::io::Error),
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExhausted { capacity } => {
                write!(f, "capacity exhausted: all {capacity} slots allocated")
            }
            Self::DuplicateKey(key) => write!(f, "duplicate key: {key}"),
            Self::KeyNotFound(key) => write!(f, "key not found: {key}"),
            Self::MissingRecord {
                key,
                record_id: Some(record_id),
            } => write!(f, "record {record_id} for key {key} not found in store"),
            Self::MissingRecord {
                key,
                record_id: None,
            } => write!(f, "key {key} has no record"),
            Self::Store(e) => write!(f, "record store error: {e}"),
            Self::Table(e) => write!(f, "slot table error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Table(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::CapacityExhausted { .. }
            | Self::DuplicateKey(_)
            | Self::KeyNotFound(_)
            | Self::MissingRecord { .. } => None,
        }
    }
}

impl From<RecordStoreError> for IndexError {
    fn from(e: RecordStoreError) -> Self {
        Self::Store(e)
    }
}

impl From<SlotTableError> for IndexError {
    fn from(e: SlotTableError) -> Self {
        Self::Table(e)
    }
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
