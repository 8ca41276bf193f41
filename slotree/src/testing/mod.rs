#![allow(clippy::expect_used)]

use crate::config::IndexConfig;
use crate::storage::{Key, MemoryRecordStore, SlotTree, TraversalOrder};

/// Create an empty tree over an in-memory record store.
pub fn memory_tree(capacity: u32) -> SlotTree<MemoryRecordStore> {
    SlotTree::new(capacity, MemoryRecordStore::new()).expect("create tree")
}

/// Capacity 10 with seven keys:
///
/// ```text
///         50:A
///       /      \
///     30:B     70:C
///    /   \     /   \
///  20:D 40:E 60:F 80:G
/// ```
pub fn scenario_tree() -> SlotTree<MemoryRecordStore> {
    let mut tree = memory_tree(10);
    for (key, payload) in [
        (50, "A"),
        (30, "B"),
        (70, "C"),
        (20, "D"),
        (40, "E"),
        (60, "F"),
        (80, "G"),
    ] {
        tree.insert(key, payload).expect("insert");
    }
    tree
}

/// Live keys in ascending order.
pub fn inorder_keys<S: crate::storage::RecordStore>(tree: &SlotTree<S>) -> Vec<Key> {
    tree.keys(TraversalOrder::Inorder).collect()
}

/// A configuration pointing at a fresh temporary directory.
///
/// The directory is removed when the returned guard drops.
pub fn temp_config(capacity: u32) -> (tempfile::TempDir, IndexConfig) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = IndexConfig::new(capacity, dir.path().join("index")).expect("valid config");
    (dir, config)
}
