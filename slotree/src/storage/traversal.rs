//! Iterative tree traversals over slot ids.
//!
//! Each traversal is an iterator borrowing the slot table. They walk the
//! structure with explicit stacks or a queue and skip dead slots only when
//! emitting, so the cost is proportional to the slots reachable from the root.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::storage::slot::SlotId;
use crate::storage::table::SlotTable;

/// Order in which a traversal visits slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalOrder {
    /// Left subtree, node, right subtree: ascending keys.
    Inorder,
    /// Node before its subtrees.
    Preorder,
    /// Both subtrees before the node.
    Postorder,
    /// Breadth-first, left to right within a level.
    LevelOrder,
}

impl TraversalOrder {
    /// Every order, in the sequence listings print them.
    pub const ALL: [Self; 4] = [
        Self::Inorder,
        Self::Preorder,
        Self::Postorder,
        Self::LevelOrder,
    ];

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inorder => "inorder",
            Self::Preorder => "preorder",
            Self::Postorder => "postorder",
            Self::LevelOrder => "level order",
        }
    }
}

impl std::fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Inorder traversal: push the left chain, visit, then go right.
pub struct Inorder<'a> {
    table: &'a SlotTable,
    stack: Vec<SlotId>,
    current: Option<SlotId>,
}

impl<'a> Inorder<'a> {
    #[must_use]
    pub const fn new(table: &'a SlotTable) -> Self {
        Self {
            table,
            stack: Vec::new(),
            current: table.root(),
        }
    }
}

impl Iterator for Inorder<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        loop {
            while let Some(id) = self.current {
                self.stack.push(id);
                self.current = self.table.slot(id).left;
            }

            let id = self.stack.pop()?;
            let slot = self.table.slot(id);
            self.current = slot.right;
            if slot.live {
                return Some(id);
            }
        }
    }
}

/// Preorder traversal: pop, emit, push right then left.
pub struct Preorder<'a> {
    table: &'a SlotTable,
    stack: Vec<SlotId>,
}

impl<'a> Preorder<'a> {
    #[must_use]
    pub fn new(table: &'a SlotTable) -> Self {
        Self {
            table,
            stack: table.root().into_iter().collect(),
        }
    }
}

impl Iterator for Preorder<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        loop {
            let id = self.stack.pop()?;
            let slot = self.table.slot(id);
            // Right goes on first so left pops first.
            self.stack.extend(slot.right);
            self.stack.extend(slot.left);
            if slot.live {
                return Some(id);
            }
        }
    }
}

/// Postorder traversal using two stacks.
///
/// The first stack is drained into the second on the first call to `next`;
/// popping the second stack then yields postorder.
pub struct Postorder<'a> {
    table: &'a SlotTable,
    pending: Vec<SlotId>,
    output: Vec<SlotId>,
    primed: bool,
}

impl<'a> Postorder<'a> {
    #[must_use]
    pub fn new(table: &'a SlotTable) -> Self {
        Self {
            table,
            pending: table.root().into_iter().collect(),
            output: Vec::new(),
            primed: false,
        }
    }

    fn prime(&mut self) {
        while let Some(id) = self.pending.pop() {
            self.output.push(id);
            let slot = self.table.slot(id);
            self.pending.extend(slot.left);
            self.pending.extend(slot.right);
        }
        self.primed = true;
    }
}

impl Iterator for Postorder<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        if !self.primed {
            self.prime();
        }
        loop {
            let id = self.output.pop()?;
            if self.table.slot(id).live {
                return Some(id);
            }
        }
    }
}

/// Level-order traversal: dequeue, emit, enqueue left then right.
pub struct LevelOrder<'a> {
    table: &'a SlotTable,
    queue: VecDeque<SlotId>,
}

impl<'a> LevelOrder<'a> {
    #[must_use]
    pub fn new(table: &'a SlotTable) -> Self {
        Self {
            table,
            queue: table.root().into_iter().collect(),
        }
    }
}

impl Iterator for LevelOrder<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        loop {
            let id = self.queue.pop_front()?;
            let slot = self.table.slot(id);
            self.queue.extend(slot.left);
            self.queue.extend(slot.right);
            if slot.live {
                return Some(id);
            }
        }
    }
}

/// A traversal in any [`TraversalOrder`].
pub enum Traversal<'a> {
    Inorder(Inorder<'a>),
    Preorder(Preorder<'a>),
    Postorder(Postorder<'a>),
    LevelOrder(LevelOrder<'a>),
}

impl<'a> Traversal<'a> {
    /// Start a traversal of `table` in `order`.
    #[must_use]
    pub fn new(table: &'a SlotTable, order: TraversalOrder) -> Self {
        match order {
            TraversalOrder::Inorder => Self::Inorder(Inorder::new(table)),
            TraversalOrder::Preorder => Self::Preorder(Preorder::new(table)),
            TraversalOrder::Postorder => Self::Postorder(Postorder::new(table)),
            TraversalOrder::LevelOrder => Self::LevelOrder(LevelOrder::new(table)),
        }
    }
}

impl Iterator for Traversal<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        match self {
            Self::Inorder(it) => it.next(),
            Self::Preorder(it) => it.next(),
            Self::Postorder(it) => it.next(),
            Self::LevelOrder(it) => it.next(),
        }
    }
}

// Each walk drains its stack or queue and never refills it once empty.
impl FusedIterator for Inorder<'_> {}
impl FusedIterator for Preorder<'_> {}
impl FusedIterator for Postorder<'_> {}
impl FusedIterator for LevelOrder<'_> {}
impl FusedIterator for Traversal<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::records::RecordId;
    use crate::storage::slot::Slot;

    /// Link keys into a table in insertion order without the tree engine.
    fn table_with(keys: &[i32]) -> SlotTable {
        let capacity = u32::try_from(keys.len()).expect("small test");
        let mut table = SlotTable::new(capacity).expect("create table");
        for (i, &key) in keys.iter().enumerate() {
            let raw = 1000 + i32::try_from(i).expect("small test");
            let record = RecordId::new(raw).expect("valid id");
            let id = table.allocate(Slot::live(key, record)).expect("alloc");
            let Some(mut current) = table.root() else {
                table.set_root(Some(id));
                continue;
            };
            loop {
                let node = *table.slot(current);
                let next = if key < node.key { node.left } else { node.right };
                match next {
                    Some(next) => current = next,
                    None => {
                        let parent = table.slot_mut(current);
                        if key < parent.key {
                            parent.left = Some(id);
                        } else {
                            parent.right = Some(id);
                        }
                        break;
                    }
                }
            }
        }
        table
    }

    fn keys(table: &SlotTable, order: TraversalOrder) -> Vec<i32> {
        Traversal::new(table, order)
            .map(|id| table.slot(id).key)
            .collect()
    }

    #[test]
    fn test_empty_table() {
        let table = SlotTable::new(3).expect("create table");
        for order in TraversalOrder::ALL {
            assert_eq!(Traversal::new(&table, order).count(), 0, "{order}");
        }
    }

    #[test]
    fn test_orders() {
        //        50
        //      /    \
        //    30      70
        //   /  \    /  \
        //  20  40  60  80
        let table = table_with(&[50, 30, 70, 20, 40, 60, 80]);

        assert_eq!(
            keys(&table, TraversalOrder::Inorder),
            vec![20, 30, 40, 50, 60, 70, 80]
        );
        assert_eq!(
            keys(&table, TraversalOrder::Preorder),
            vec![50, 30, 20, 40, 70, 60, 80]
        );
        assert_eq!(
            keys(&table, TraversalOrder::Postorder),
            vec![20, 40, 30, 60, 80, 70, 50]
        );
        assert_eq!(
            keys(&table, TraversalOrder::LevelOrder),
            vec![50, 30, 70, 20, 40, 60, 80]
        );
    }

    #[test]
    fn test_dead_slots_walked_but_not_emitted() {
        let mut table = table_with(&[50, 30, 70, 20]);
        // Kill 30 while leaving it linked: 20 is still reached through it.
        table.kill(SlotId::new(2));

        assert_eq!(keys(&table, TraversalOrder::Inorder), vec![20, 50, 70]);
        assert_eq!(keys(&table, TraversalOrder::Preorder), vec![50, 20, 70]);
        assert_eq!(keys(&table, TraversalOrder::Postorder), vec![20, 70, 50]);
        assert_eq!(keys(&table, TraversalOrder::LevelOrder), vec![50, 70, 20]);
    }

    #[test]
    fn test_degenerate_chain() {
        let table = table_with(&[1, 2, 3, 4, 5]);

        assert_eq!(keys(&table, TraversalOrder::Inorder), vec![1, 2, 3, 4, 5]);
        assert_eq!(keys(&table, TraversalOrder::Postorder), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_iterators_are_fused_after_exhaustion() {
        let table = table_with(&[2, 1, 3]);
        let mut it = Traversal::new(&table, TraversalOrder::Postorder);

        assert_eq!(it.by_ref().count(), 3);
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_every_order_is_fused() {
        fn drain_twice<I: FusedIterator<Item = SlotId>>(mut it: I) -> usize {
            let count = it.by_ref().count();
            assert_eq!(it.next(), None);
            count
        }

        let table = table_with(&[4, 2, 6, 1, 3]);
        assert_eq!(drain_twice(Inorder::new(&table)), 5);
        assert_eq!(drain_twice(Preorder::new(&table)), 5);
        assert_eq!(drain_twice(Postorder::new(&table)), 5);
        assert_eq!(drain_twice(LevelOrder::new(&table)), 5);
        for order in TraversalOrder::ALL {
            assert_eq!(drain_twice(Traversal::new(&table, order)), 5);
        }
    }
}
