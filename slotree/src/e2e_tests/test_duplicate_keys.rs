//! Test that inserting a live key is rejected without side effects.

use crate::storage::{IndexError, TraversalOrder};
use crate::testing::{inorder_keys, scenario_tree};

#[test]
fn test_duplicate_insert_rejected() {
    let mut tree = scenario_tree();
    let before = tree.table().clone();

    assert!(matches!(
        tree.insert(40, "dup"),
        Err(IndexError::DuplicateKey(40))
    ));

    assert_eq!(tree.table(), &before);
    assert_eq!(tree.lookup(40).expect("lookup"), "E");
    assert_eq!(tree.store().len(), 7);
}

#[test]
fn test_reinsert_after_delete() {
    let mut tree = scenario_tree();
    let old_slot = tree.locate(20).slot.expect("live");
    tree.delete(20).expect("delete leaf");

    // The dead slot is detached, so the key hangs from 30 again in a fresh slot.
    let new_slot = tree.insert(20, "again").expect("reinsert");
    assert_ne!(new_slot, old_slot);
    let parent = tree.locate(30).slot.expect("live");
    assert_eq!(tree.table().slot(parent).left, Some(new_slot));
    assert_eq!(tree.locate(20).parent, Some(parent));

    assert_eq!(inorder_keys(&tree), vec![20, 30, 40, 50, 60, 70, 80]);
    assert_eq!(tree.lookup(20).expect("lookup"), "again");
    let level: Vec<_> = tree.keys(TraversalOrder::LevelOrder).collect();
    assert_eq!(level, vec![50, 30, 70, 20, 40, 60, 80]);
}
