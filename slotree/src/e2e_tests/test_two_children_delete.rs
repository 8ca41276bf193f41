//! Test deleting a key whose slot has two children.

use crate::storage::{IndexError, TraversalOrder};
use crate::testing::{inorder_keys, scenario_tree};

#[test]
fn test_delete_root_with_two_children() {
    let mut tree = scenario_tree();
    assert_eq!(inorder_keys(&tree), vec![20, 30, 40, 50, 60, 70, 80]);

    let removed = tree.delete(50).expect("delete");
    assert_eq!(removed.as_deref(), Some("A"));

    assert_eq!(inorder_keys(&tree), vec![20, 30, 40, 60, 70, 80]);
    assert!(matches!(tree.lookup(50), Err(IndexError::KeyNotFound(50))));
    assert_eq!(tree.lookup(60).expect("lookup"), "F");
}

#[test]
fn test_successor_moves_into_deleted_slot() {
    let mut tree = scenario_tree();
    let root = tree.table().root().expect("root");

    tree.delete(50).expect("delete");

    // The root slot keeps its position and now holds the successor.
    assert_eq!(tree.table().root(), Some(root));
    assert_eq!(tree.table().slot(root).key, 60);
    let preorder: Vec<_> = tree.keys(TraversalOrder::Preorder).collect();
    assert_eq!(preorder, vec![60, 30, 20, 40, 70, 80]);
}

#[test]
fn test_delete_with_deep_successor() {
    let mut tree = scenario_tree();
    tree.delete(60).expect("delete 60");
    tree.insert(65, "H").expect("insert 65");
    tree.insert(62, "I").expect("insert 62");

    // 50's successor is now 62, two levels below 70.
    tree.delete(50).expect("delete 50");

    assert_eq!(inorder_keys(&tree), vec![20, 30, 40, 62, 65, 70, 80]);
    assert_eq!(tree.lookup(62).expect("lookup"), "I");
    assert_eq!(tree.lookup(65).expect("lookup"), "H");
    assert_eq!(tree.len(), 7);
}

#[test]
fn test_delete_every_key() {
    let mut tree = scenario_tree();
    for key in [50, 20, 70, 30, 80, 40, 60] {
        tree.delete(key).expect("delete");
        let keys = inorder_keys(&tree);
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(!keys.contains(&key));
    }

    assert!(tree.is_empty());
    assert_eq!(tree.table().root(), None);
}
