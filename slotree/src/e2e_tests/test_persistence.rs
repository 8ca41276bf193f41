//! Test saving and reopening an index on disk.

use crate::config::IndexConfig;
use crate::storage::{Index, IndexError, RestoreOutcome, TraversalOrder};
use crate::testing::temp_config;

fn populate(index: &mut Index) {
    for (key, payload) in [
        (50, "A"),
        (30, "B"),
        (70, "C"),
        (20, "D"),
        (40, "E"),
        (60, "F"),
        (80, "G"),
    ] {
        index.tree_mut().insert(key, payload).expect("insert");
    }
}

#[test]
fn test_reopen_reproduces_tree() {
    let (_dir, config) = temp_config(10);

    let mut index = Index::open(&config).expect("open");
    populate(&mut index);
    index.tree_mut().delete(50).expect("delete");
    index.tree_mut().modify(20, "D2").expect("modify");
    let before = index.tree().table().clone();
    index.close().expect("close");

    let mut index = Index::open(&config).expect("reopen");
    assert_eq!(
        index.restore_outcome(),
        &RestoreOutcome::Restored { live: 6 }
    );
    assert_eq!(index.tree().table(), &before);

    let tree = index.tree_mut();
    for (key, payload) in [
        (20, "D2"),
        (30, "B"),
        (40, "E"),
        (60, "F"),
        (70, "C"),
        (80, "G"),
    ] {
        assert_eq!(tree.lookup(key).expect("lookup"), payload);
    }
    assert!(matches!(tree.lookup(50), Err(IndexError::KeyNotFound(50))));
}

#[test]
fn test_allocation_cursor_survives_reopen() {
    let (_dir, config) = temp_config(2);

    let mut index = Index::open(&config).expect("open");
    index.tree_mut().insert(1, "one").expect("insert");
    index.tree_mut().delete(1).expect("delete");
    index.close().expect("close");

    let mut index = Index::open(&config).expect("reopen");
    index.tree_mut().insert(2, "two").expect("insert");
    assert!(matches!(
        index.tree_mut().insert(3, "three"),
        Err(IndexError::CapacityExhausted { capacity: 2 })
    ));
}

#[test]
fn test_capacity_mismatch_starts_empty() {
    let (_dir, config) = temp_config(10);

    let mut index = Index::open(&config).expect("open");
    populate(&mut index);
    index.close().expect("close");

    let resized = IndexConfig::new(20, config.data_directory.clone()).expect("config");
    let mut index = Index::open(&resized).expect("reopen");

    assert_eq!(
        index.restore_outcome(),
        &RestoreOutcome::CapacityMismatch {
            stored: 10,
            configured: 20
        }
    );
    assert!(index.tree().is_empty());
    assert_eq!(index.tree().capacity(), 20);
    assert!(index
        .render(TraversalOrder::Inorder)
        .expect("render")
        .ends_with("===\n"));
}

#[test]
fn test_truncated_snapshot_starts_empty() {
    let (_dir, config) = temp_config(10);

    let mut index = Index::open(&config).expect("open");
    populate(&mut index);
    index.close().expect("close");

    let bytes = std::fs::read(config.tree_path()).expect("read snapshot");
    std::fs::write(config.tree_path(), &bytes[..bytes.len() - 5]).expect("truncate");

    let index = Index::open(&config).expect("reopen");
    assert_eq!(index.restore_outcome(), &RestoreOutcome::Truncated);
    assert!(index.tree().is_empty());
}

#[test]
fn test_checkpoint_without_close() {
    let (_dir, config) = temp_config(10);

    let mut index = Index::open(&config).expect("open");
    populate(&mut index);
    index.checkpoint().expect("checkpoint");
    index.tree_mut().insert(90, "late").expect("insert");
    drop(index);

    // Only the checkpointed image is restored.
    let mut index = Index::open(&config).expect("reopen");
    assert_eq!(index.tree().len(), 7);
    assert!(!index.tree().contains(90));
    assert_eq!(index.tree_mut().lookup(80).expect("lookup"), "G");
}
