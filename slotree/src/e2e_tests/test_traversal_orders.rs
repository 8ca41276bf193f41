//! Test the four traversal orders after mixed mutations.

use crate::storage::{Key, MemoryRecordStore, SlotTree, TraversalOrder};
use crate::testing::{memory_tree, scenario_tree};

fn keys(tree: &SlotTree<MemoryRecordStore>, order: TraversalOrder) -> Vec<Key> {
    tree.keys(order).collect()
}

#[test]
fn test_orders_on_full_scenario() {
    let tree = scenario_tree();

    assert_eq!(
        keys(&tree, TraversalOrder::Inorder),
        vec![20, 30, 40, 50, 60, 70, 80]
    );
    assert_eq!(
        keys(&tree, TraversalOrder::Preorder),
        vec![50, 30, 20, 40, 70, 60, 80]
    );
    assert_eq!(
        keys(&tree, TraversalOrder::Postorder),
        vec![20, 40, 30, 60, 80, 70, 50]
    );
    assert_eq!(
        keys(&tree, TraversalOrder::LevelOrder),
        vec![50, 30, 70, 20, 40, 60, 80]
    );
}

#[test]
fn test_orders_after_deletes() {
    let mut tree = scenario_tree();
    tree.delete(30).expect("delete 30");
    tree.delete(80).expect("delete 80");

    // 30 had two children: 40 takes its slot.
    assert_eq!(
        keys(&tree, TraversalOrder::Inorder),
        vec![20, 40, 50, 60, 70]
    );
    assert_eq!(
        keys(&tree, TraversalOrder::Preorder),
        vec![50, 40, 20, 70, 60]
    );
    assert_eq!(
        keys(&tree, TraversalOrder::Postorder),
        vec![20, 40, 60, 70, 50]
    );
    assert_eq!(
        keys(&tree, TraversalOrder::LevelOrder),
        vec![50, 40, 70, 20, 60]
    );
}

#[test]
fn test_entries_carry_payloads() {
    let mut tree = scenario_tree();
    let entries = tree.entries(TraversalOrder::Postorder).expect("entries");

    let pairs: Vec<_> = entries
        .iter()
        .map(|entry| (entry.key, entry.payload.as_deref()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (20, Some("D")),
            (40, Some("E")),
            (30, Some("B")),
            (60, Some("F")),
            (80, Some("G")),
            (70, Some("C")),
            (50, Some("A")),
        ]
    );
}

#[test]
fn test_orders_on_empty_tree() {
    let tree = memory_tree(3);
    for order in TraversalOrder::ALL {
        assert!(keys(&tree, order).is_empty(), "{order}");
    }
}
