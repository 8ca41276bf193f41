// Layout of the index:
// 1. Keys live in a fixed-capacity slot array linked as a binary search tree
// 2. Payloads live in a record store, referenced from slots by record id
// 3. Slots are allocated from a cursor that only moves forward; deleted
//    slots are never handed out again
// 4. The slot table is persisted as a snapshot, the record store as a log
//
// System components:
//  - Slot table and snapshot codec
//  - Tree operations and traversals
//  - Record stores (in-memory and append-only log)

pub mod config;
pub mod simulation;
pub mod storage;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;
