//! On-disk index: a slot tree over a record log, opened from configuration.
//!
//! Opening an index creates the data directory if needed, opens the record
//! log, and restores the slot table snapshot when its capacity matches the
//! configured one. Persisting is explicit: [`Index::checkpoint`] or
//! [`Index::close`].

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::IndexConfig;
use crate::storage::records::{FileRecordStore, RecordStore};
use crate::storage::table::RestoreOutcome;
use crate::storage::traversal::TraversalOrder;
use crate::storage::tree::{IndexError, SlotTree};

/// File name of the slot table snapshot inside the data directory.
pub const TREE_FILE_NAME: &str = "tree.dat";

/// File name of the record log inside the data directory.
pub const RECORDS_FILE_NAME: &str = "records.log";

/// A slot tree persisted under a data directory.
pub struct Index {
    tree: SlotTree<FileRecordStore>,
    tree_path: PathBuf,
    restore_outcome: RestoreOutcome,
}

impl Index {
    /// Open (or create) the index described by `config`.
    ///
    /// A snapshot with a different capacity, a truncated snapshot, or a
    /// corrupt one is ignored and the index starts empty. The record log is
    /// kept either way.
    pub fn open(config: &IndexConfig) -> Result<Self, IndexError> {
        std::fs::create_dir_all(&config.data_directory)?;

        let store = FileRecordStore::open(&config.records_path())?;
        let mut tree = SlotTree::new(config.capacity, store)?;
        let tree_path = config.tree_path();
        let restore_outcome = tree.restore(&tree_path)?;

        tracing::info!(
            "Opened index in {}: {} live keys, {} of {} slots remaining",
            config.data_directory.display(),
            tree.len(),
            tree.remaining(),
            tree.capacity()
        );

        Ok(Self {
            tree,
            tree_path,
            restore_outcome,
        })
    }

    /// The tree.
    #[must_use]
    pub const fn tree(&self) -> &SlotTree<FileRecordStore> {
        &self.tree
    }

    /// Mutable access to the tree.
    #[allow(clippy::missing_const_for_fn)] // mutable references can't be const
    pub fn tree_mut(&mut self) -> &mut SlotTree<FileRecordStore> {
        &mut self.tree
    }

    /// What happened to the snapshot when the index was opened.
    #[must_use]
    pub const fn restore_outcome(&self) -> &RestoreOutcome {
        &self.restore_outcome
    }

    /// Sync the record log and save the slot table snapshot.
    pub fn checkpoint(&mut self) -> Result<(), IndexError> {
        self.tree.store_mut().sync()?;
        self.tree.save(&self.tree_path)
    }

    /// Checkpoint and close the index.
    pub fn close(mut self) -> Result<(), IndexError> {
        self.checkpoint()
    }

    /// Render a traversal as one `key: K -> payload` line per live key,
    /// under a heading naming the order.
    pub fn render(&mut self, order: TraversalOrder) -> Result<String, IndexError> {
        let entries = self.tree.entries(order)?;

        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", order.name().to_uppercase());
        for entry in entries {
            let payload = entry.payload.as_deref().unwrap_or("<record not found>");
            let _ = writeln!(out, "key: {} -> {payload}", entry.key);
        }
        Ok(out)
    }
}
