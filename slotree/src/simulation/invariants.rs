//! Invariant checking for deterministic simulation testing.
//!
//! Verifies the slot table's structure and compares the tree against a
//! `BTreeMap` model after each operation.

use std::collections::{BTreeMap, HashSet};

use crate::storage::{Key, RecordStore, SlotId, SlotTable, SlotTree, TraversalOrder};

/// An invariant violation detected during simulation.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violation.
    pub description: String,
    /// Operation index where it was detected.
    pub operation_index: usize,
    /// Additional context.
    pub context: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op {}: {}", self.operation_index, self.description)?;
        if !self.context.is_empty() {
            write!(f, " ({})", self.context)?;
        }
        Ok(())
    }
}

/// Checker for tree invariants.
#[derive(Debug, Default)]
pub struct InvariantChecker {
    violations: Vec<InvariantViolation>,
}

impl InvariantChecker {
    /// Create a new invariant checker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// Get all violations.
    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    /// Check if any violations were detected.
    #[must_use]
    pub const fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Add a violation.
    pub fn add_violation(
        &mut self,
        operation_index: usize,
        description: impl Into<String>,
        context: impl Into<String>,
    ) {
        self.violations.push(InvariantViolation {
            description: description.into(),
            operation_index,
            context: context.into(),
        });
    }

    /// Check the slot table's structure:
    ///
    /// - the control slot and slots at or past the cursor are not live
    /// - every slot reachable from the root is live, allocated, and reached once
    /// - left subtrees hold strictly smaller keys, right subtrees greater or equal
    /// - every live slot is reachable and the live count matches
    /// - the root is empty iff no slot is live
    pub fn check_table(&mut self, table: &SlotTable, operation_index: usize) {
        let slots = table.slots();
        let next_free = table.next_free().index();

        if slots[SlotId::CONTROL.index()].live {
            self.add_violation(operation_index, "Control slot is live", "");
        }
        if table.allocated() > table.capacity() {
            self.add_violation(
                operation_index,
                "Allocation cursor past capacity",
                format!("allocated {}, capacity {}", table.allocated(), table.capacity()),
            );
        }
        if let Some((index, _)) = slots
            .iter()
            .enumerate()
            .skip(next_free)
            .find(|(_, slot)| slot.live)
        {
            self.add_violation(
                operation_index,
                "Live slot beyond allocation cursor",
                format!("slot {index}, next_free {next_free}"),
            );
        }

        let live_in_array = slots.iter().filter(|slot| slot.live).count();
        if live_in_array != table.live_count() {
            self.add_violation(
                operation_index,
                "Live count out of sync",
                format!("counted {live_in_array}, recorded {}", table.live_count()),
            );
        }
        if table.root().is_none() != (live_in_array == 0) {
            self.add_violation(
                operation_index,
                "Root emptiness disagrees with live slots",
                format!("root {:?}, live {live_in_array}", table.root()),
            );
        }

        let mut visited = HashSet::new();
        let mut stack: Vec<(SlotId, Option<Key>, Option<Key>)> = Vec::new();
        if let Some(root) = table.root() {
            stack.push((root, None, None));
        }
        while let Some((id, lower, upper)) = stack.pop() {
            if id.index() >= next_free || id == SlotId::CONTROL {
                self.add_violation(
                    operation_index,
                    "Link to unallocated slot",
                    format!("slot {id}, next_free {next_free}"),
                );
                continue;
            }
            if !visited.insert(id) {
                self.add_violation(
                    operation_index,
                    "Slot reachable twice",
                    format!("slot {id}"),
                );
                continue;
            }

            let slot = table.slot(id);
            if !slot.live {
                self.add_violation(
                    operation_index,
                    "Dead slot linked into tree",
                    format!("slot {id}, key {}", slot.key),
                );
            }
            if slot.record_id.is_none() {
                self.add_violation(
                    operation_index,
                    "Reachable slot without record",
                    format!("slot {id}, key {}", slot.key),
                );
            }
            if lower.is_some_and(|lower| slot.key < lower)
                || upper.is_some_and(|upper| slot.key >= upper)
            {
                self.add_violation(
                    operation_index,
                    "Key violates ordering",
                    format!(
                        "slot {id}, key {}, bounds [{lower:?}, {upper:?})",
                        slot.key
                    ),
                );
            }

            if let Some(left) = slot.left {
                stack.push((left, lower, Some(slot.key)));
            }
            if let Some(right) = slot.right {
                stack.push((right, Some(slot.key), upper));
            }
        }

        if visited.len() != live_in_array {
            self.add_violation(
                operation_index,
                "Live slots unreachable from root",
                format!("reached {}, live {live_in_array}", visited.len()),
            );
        }
    }

    /// Check that the tree holds exactly the model's keys and payloads.
    ///
    /// Payloads are read through the tree's store, so this must only be run
    /// against a store that is not injecting faults.
    pub fn check_model<S: RecordStore>(
        &mut self,
        tree: &mut SlotTree<S>,
        model: &BTreeMap<Key, String>,
        operation_index: usize,
    ) {
        let keys: Vec<Key> = tree.keys(TraversalOrder::Inorder).collect();
        let expected: Vec<Key> = model.keys().copied().collect();
        if keys != expected {
            self.add_violation(
                operation_index,
                "Inorder keys differ from model",
                format!("tree {keys:?}, model {expected:?}"),
            );
            return;
        }

        for key in keys {
            match tree.lookup(key) {
                Ok(payload) if model.get(&key) == Some(&payload) => {}
                Ok(payload) => self.add_violation(
                    operation_index,
                    "Payload differs from model",
                    format!("key {key}, tree {payload:?}, model {:?}", model.get(&key)),
                ),
                Err(e) => self.add_violation(
                    operation_index,
                    "Live key not resolvable",
                    format!("key {key}: {e}"),
                ),
            }
        }
    }

    /// Check that the allocation cursor matches the number of successful
    /// inserts.
    pub fn check_allocation(&mut self, table: &SlotTable, inserts: u32, operation_index: usize) {
        if table.allocated() != inserts {
            self.add_violation(
                operation_index,
                "Allocation cursor differs from insert count",
                format!("allocated {}, inserts {inserts}", table.allocated()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Slot;
    use crate::testing::{memory_tree, scenario_tree};

    #[test]
    fn test_clean_tree_passes() {
        let mut tree = scenario_tree();
        let model: BTreeMap<Key, String> = [
            (20, "D"),
            (30, "B"),
            (40, "E"),
            (50, "A"),
            (60, "F"),
            (70, "C"),
            (80, "G"),
        ]
        .into_iter()
        .map(|(key, payload)| (key, payload.to_string()))
        .collect();

        let mut checker = InvariantChecker::new();
        checker.check_table(tree.table(), 0);
        checker.check_model(&mut tree, &model, 0);
        checker.check_allocation(tree.table(), 7, 0);

        assert!(!checker.has_violations(), "{:?}", checker.violations());
    }

    #[test]
    fn test_detects_ordering_violation() {
        let tree = scenario_tree();
        let (mut table, _) = tree.into_parts();
        let left = table
            .slot(table.root().expect("root"))
            .left
            .expect("left");
        table.slot_mut(left).key = 99;

        let mut checker = InvariantChecker::new();
        checker.check_table(&table, 3);

        assert!(checker.has_violations());
        assert_eq!(checker.violations()[0].operation_index, 3);
        assert_eq!(checker.violations()[0].description, "Key violates ordering");
    }

    #[test]
    fn test_detects_orphaned_live_slot() {
        let tree = memory_tree(3);
        let (mut table, _) = tree.into_parts();
        let record = crate::storage::FIRST_RECORD_ID;
        table.allocate(Slot::live(1, record)).expect("allocate");

        let mut checker = InvariantChecker::new();
        checker.check_table(&table, 0);

        let descriptions: Vec<_> = checker
            .violations()
            .iter()
            .map(|v| v.description.as_str())
            .collect();
        assert!(descriptions.contains(&"Root emptiness disagrees with live slots"));
        assert!(descriptions.contains(&"Live slots unreachable from root"));
    }

    #[test]
    fn test_detects_model_mismatch() {
        let mut tree = scenario_tree();
        let mut model = BTreeMap::new();
        model.insert(20, "D".to_string());

        let mut checker = InvariantChecker::new();
        checker.check_model(&mut tree, &model, 1);

        assert_eq!(checker.violations().len(), 1);
        assert_eq!(
            checker.violations()[0].description,
            "Inorder keys differ from model"
        );
    }

    #[test]
    fn test_violation_display() {
        let violation = InvariantViolation {
            description: "Slot reachable twice".to_string(),
            operation_index: 4,
            context: "slot 2".to_string(),
        };
        assert_eq!(violation.to_string(), "op 4: Slot reachable twice (slot 2)");
    }
}
