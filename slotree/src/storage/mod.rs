//! Array-backed ordered index storage.
//!
//! The index is a binary search tree whose nodes live in a fixed-capacity
//! slot array instead of individually allocated objects. Tree structure and
//! record payloads are persisted separately:
//!
//! - The slot table snapshot (`tree.dat`): capacity, root, allocation cursor,
//!   and every slot as a fixed-width image
//! - The record log (`records.log`): append-only payload frames and tombstones
//!
//! # Layers
//!
//! - [`slot`]: slot layout and encoding
//! - [`table`]: the slot array, allocation cursor, and snapshot persistence
//! - [`traversal`]: iterative inorder/preorder/postorder/level-order walks
//! - [`records`]: the record store contract and its implementations
//! - [`tree`]: insertion, lookup, modification, and deletion
//! - [`index`]: on-disk index opened from configuration
//!
//! # Usage
//!
//! ```
//! use slotree::storage::{MemoryRecordStore, SlotTree, TraversalOrder};
//!
//! let mut tree = SlotTree::new(10, MemoryRecordStore::new()).unwrap();
//! tree.insert(50, "A").unwrap();
//! tree.insert(30, "B").unwrap();
//! tree.insert(70, "C").unwrap();
//!
//! assert_eq!(tree.lookup(30).unwrap(), "B");
//! let keys: Vec<i32> = tree.keys(TraversalOrder::Inorder).collect();
//! assert_eq!(keys, vec![30, 50, 70]);
//! ```

pub mod index;
pub mod records;
pub mod slot;
pub mod table;
pub mod traversal;
pub mod tree;

pub use index::{Index, RECORDS_FILE_NAME, TREE_FILE_NAME};
pub use records::{
    FIRST_RECORD_ID, FileRecordStore, MemoryRecordStore, RecordId, RecordStore, RecordStoreError,
};
pub use slot::{Key, SLOT_SIZE, Slot, SlotError, SlotId};
pub use table::{HEADER_SIZE, MAX_CAPACITY, RestoreOutcome, SlotTable, SlotTableError};
pub use traversal::{Traversal, TraversalOrder};
pub use tree::{Entry, IndexError, Located, SlotTree};
