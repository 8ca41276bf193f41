//! Test replacing payloads in place.

use crate::storage::{IndexError, RecordStore};
use crate::testing::scenario_tree;

#[test]
fn test_modify_replaces_payload() {
    let mut tree = scenario_tree();
    let before = tree.locate(30).slot.expect("slot");
    let old_record = tree.table().slot(before).record_id.expect("record");

    tree.modify(30, "B2").expect("modify");

    assert_eq!(tree.lookup(30).expect("lookup"), "B2");
    assert_eq!(tree.locate(30).slot, Some(before));
    assert_eq!(tree.store_mut().fetch(old_record).expect("fetch"), None);
    assert!(tree.store().is_tombstoned(old_record));
}

#[test]
fn test_modify_keeps_shape() {
    let mut tree = scenario_tree();
    let slots_before: Vec<_> = tree
        .table()
        .slots()
        .iter()
        .map(|slot| (slot.key, slot.left, slot.right, slot.live))
        .collect();

    tree.modify(70, "C2").expect("modify");

    let slots_after: Vec<_> = tree
        .table()
        .slots()
        .iter()
        .map(|slot| (slot.key, slot.left, slot.right, slot.live))
        .collect();
    assert_eq!(slots_before, slots_after);
}

#[test]
fn test_modify_missing_key() {
    let mut tree = scenario_tree();
    assert!(matches!(
        tree.modify(99, "nope"),
        Err(IndexError::KeyNotFound(99))
    ));
    assert_eq!(tree.store().len(), 7);
}
