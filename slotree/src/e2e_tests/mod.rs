//! End-to-end scenarios against a whole index.
//!
//! Each test file covers one scenario, driving the public tree and index
//! operations with deterministic inputs.

#![cfg(test)]
#![allow(clippy::expect_used)]

mod test_capacity_no_reuse;
mod test_duplicate_keys;
mod test_modify;
mod test_persistence;
mod test_traversal_orders;
mod test_two_children_delete;
