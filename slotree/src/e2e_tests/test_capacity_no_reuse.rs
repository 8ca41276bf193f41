//! Test that deleted slots are never handed out again.

use crate::storage::IndexError;
use crate::testing::memory_tree;

#[test]
fn test_capacity_one_no_reuse() {
    let mut tree = memory_tree(1);

    tree.insert(5, "X").expect("insert 5");
    assert!(matches!(
        tree.insert(6, "Y"),
        Err(IndexError::CapacityExhausted { capacity: 1 })
    ));

    tree.delete(5).expect("delete 5");
    assert!(tree.is_empty());
    assert!(matches!(
        tree.insert(6, "Y"),
        Err(IndexError::CapacityExhausted { capacity: 1 })
    ));
}

#[test]
fn test_capacity_counts_dead_slots() {
    let mut tree = memory_tree(4);
    for key in 1..=4 {
        tree.insert(key, "payload").expect("insert");
    }
    tree.delete(1).expect("delete");
    tree.delete(2).expect("delete");

    assert_eq!(tree.len(), 2);
    assert_eq!(tree.remaining(), 0);
    assert!(matches!(
        tree.insert(10, "late"),
        Err(IndexError::CapacityExhausted { capacity: 4 })
    ));
}

#[test]
fn test_rejected_insert_appends_no_record() {
    let mut tree = memory_tree(1);
    tree.insert(5, "X").expect("insert");

    let _ = tree.insert(6, "Y");

    assert_eq!(tree.store().len(), 1);
}
