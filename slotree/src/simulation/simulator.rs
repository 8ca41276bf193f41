//! Main simulator harness for deterministic simulation testing.
//!
//! Replays generated operations against a [`SlotTree`] and a `BTreeMap`
//! model, checks every outcome against what the model predicts, and runs
//! the invariant checker after each operation.

use std::collections::BTreeMap;

use super::faults::{FaultConfig, FaultyRecordStore};
use super::invariants::{InvariantChecker, InvariantViolation};
use super::workload::{Operation, WorkloadConfig, WorkloadGenerator};
use crate::storage::{IndexError, Key, MemoryRecordStore, RestoreOutcome, SlotTable, SlotTree};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Tree capacity.
    pub capacity: u32,
    /// Workload generation configuration.
    pub workload: WorkloadConfig,
    /// Fault injection configuration.
    pub faults: FaultConfig,
    /// Check the snapshot codec after the last operation.
    pub check_snapshot: bool,
}

impl SimulatorConfig {
    /// Create a new simulator config with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            capacity: 256,
            workload: WorkloadConfig::default(),
            faults: FaultConfig::default(),
            check_snapshot: true,
        }
    }

    /// Set the tree capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the workload configuration.
    #[must_use]
    pub const fn with_workload_config(mut self, config: WorkloadConfig) -> Self {
        self.workload = config;
        self
    }

    /// Set the fault configuration.
    #[must_use]
    pub const fn with_fault_config(mut self, config: FaultConfig) -> Self {
        self.faults = config;
        self
    }

    /// Set one failure rate for every record store call.
    #[must_use]
    pub const fn with_fault_rate(mut self, rate: f64) -> Self {
        self.faults = FaultConfig::uniform(rate);
        self
    }
}

/// Results from a simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The seed used for this simulation.
    pub seed: u64,
    /// Number of operations run.
    pub operations_run: u64,
    /// Number of operations that succeeded.
    pub successful_operations: u64,
    /// Number of operations that failed as the model predicted
    /// (duplicates, misses, capacity).
    pub failed_operations: u64,
    /// Number of operations that failed because of an injected store fault.
    pub faulted_operations: u64,
    /// Invariant violations detected.
    pub invariant_violations: Vec<InvariantViolation>,
    /// Whether the simulation ran every operation.
    pub completed_successfully: bool,
    /// Error message if simulation failed.
    pub error: Option<String>,
}

impl SimulationResult {
    /// Check if the simulation passed (no invariant violations).
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.completed_successfully && self.invariant_violations.is_empty()
    }
}

/// What the model says an operation should do.
enum Expected {
    Inserted,
    Found(String),
    Modified,
    Deleted(String),
    CapacityExhausted,
    DuplicateKey,
    KeyNotFound,
}

/// The main simulator harness.
pub struct Simulator {
    config: SimulatorConfig,
    generator: WorkloadGenerator,
    checker: InvariantChecker,
    model: BTreeMap<Key, String>,
    inserts: u32,
    operations_run: u64,
    successful_operations: u64,
    failed_operations: u64,
    faulted_operations: u64,
}

impl Simulator {
    /// Create a new simulator with the given configuration.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let generator = WorkloadGenerator::with_config(config.seed, config.workload.clone());

        Self {
            config,
            generator,
            checker: InvariantChecker::new(),
            model: BTreeMap::new(),
            inserts: 0,
            operations_run: 0,
            successful_operations: 0,
            failed_operations: 0,
            faulted_operations: 0,
        }
    }

    /// Run the simulation for `operation_count` operations on a fresh tree.
    pub fn run(&mut self, operation_count: usize) -> SimulationResult {
        let store = FaultyRecordStore::new(
            MemoryRecordStore::new(),
            self.config.seed.wrapping_add(1),
            self.config.faults.clone(),
        );
        let mut tree = match SlotTree::new(self.config.capacity, store) {
            Ok(tree) => tree,
            Err(e) => {
                return SimulationResult {
                    seed: self.config.seed,
                    operations_run: 0,
                    successful_operations: 0,
                    failed_operations: 0,
                    faulted_operations: 0,
                    invariant_violations: vec![],
                    completed_successfully: false,
                    error: Some(format!("Failed to create tree: {e}")),
                };
            }
        };

        for index in 0..operation_count {
            let operation = self.generator.next_operation();
            self.apply(&mut tree, &operation, index);
            self.operations_run += 1;

            self.checker.check_table(tree.table(), index);
            self.checker
                .check_allocation(tree.table(), self.inserts, index);
            tree.store_mut().set_active(false);
            self.checker.check_model(&mut tree, &self.model, index);
            tree.store_mut().set_active(true);
        }

        if self.config.check_snapshot {
            self.check_snapshot(tree.table(), operation_count);
        }

        SimulationResult {
            seed: self.config.seed,
            operations_run: self.operations_run,
            successful_operations: self.successful_operations,
            failed_operations: self.failed_operations,
            faulted_operations: self.faulted_operations,
            invariant_violations: self.checker.violations().to_vec(),
            completed_successfully: true,
            error: None,
        }
    }

    /// The model's prediction for `operation`.
    fn predict(&self, operation: &Operation) -> Expected {
        match operation {
            Operation::Insert { key, .. } => {
                if self.inserts >= self.config.capacity {
                    Expected::CapacityExhausted
                } else if self.model.contains_key(key) {
                    Expected::DuplicateKey
                } else {
                    Expected::Inserted
                }
            }
            Operation::Lookup { key } => self
                .model
                .get(key)
                .map_or(Expected::KeyNotFound, |payload| Expected::Found(payload.clone())),
            Operation::Modify { key, .. } => {
                if self.model.contains_key(key) {
                    Expected::Modified
                } else {
                    Expected::KeyNotFound
                }
            }
            Operation::Delete { key } => self
                .model
                .get(key)
                .map_or(Expected::KeyNotFound, |payload| {
                    Expected::Deleted(payload.clone())
                }),
        }
    }

    /// Apply `operation` to the tree, compare the outcome with the model,
    /// and update the model on success.
    fn apply(
        &mut self,
        tree: &mut SlotTree<FaultyRecordStore<MemoryRecordStore>>,
        operation: &Operation,
        index: usize,
    ) {
        let expected = self.predict(operation);
        let key = operation.key();

        let outcome: Result<Option<String>, IndexError> = match operation {
            Operation::Insert { key, payload } => tree.insert(*key, payload).map(|_| None),
            Operation::Lookup { key } => tree.lookup(*key).map(Some),
            Operation::Modify { key, payload } => tree.modify(*key, payload).map(|()| None),
            Operation::Delete { key } => tree.delete(*key),
        };

        let matches = match (&expected, &outcome) {
            (_, Err(IndexError::Store(_))) if self.config.faults.is_enabled() => {
                self.faulted_operations += 1;
                return;
            }
            (Expected::Inserted | Expected::Modified, Ok(None)) => {
                self.record_success(operation);
                true
            }
            (Expected::Found(want), Ok(Some(got))) => {
                self.successful_operations += 1;
                want == got
            }
            (Expected::Deleted(want), Ok(Some(got))) => {
                self.record_success(operation);
                want == got
            }
            (Expected::CapacityExhausted, Err(IndexError::CapacityExhausted { .. }))
            | (Expected::DuplicateKey, Err(IndexError::DuplicateKey(_))) => {
                self.failed_operations += 1;
                true
            }
            (Expected::KeyNotFound, Err(IndexError::KeyNotFound(missing))) => {
                self.failed_operations += 1;
                *missing == key
            }
            _ => false,
        };

        if !matches {
            self.checker.add_violation(
                index,
                "Outcome differs from model",
                format!("{operation:?} returned {outcome:?}"),
            );
        }
    }

    fn record_success(&mut self, operation: &Operation) {
        self.successful_operations += 1;
        match operation {
            Operation::Insert { key, payload } => {
                self.inserts += 1;
                self.model.insert(*key, payload.clone());
            }
            Operation::Modify { key, payload } => {
                self.model.insert(*key, payload.clone());
            }
            Operation::Delete { key } => {
                self.model.remove(key);
            }
            Operation::Lookup { .. } => {}
        }
    }

    /// Encode the final table and restore it into a fresh one.
    fn check_snapshot(&mut self, table: &SlotTable, index: usize) {
        let image = table.encode();
        if image.len() != table.snapshot_size() {
            self.checker.add_violation(
                index,
                "Snapshot size mismatch",
                format!("encoded {}, expected {}", image.len(), table.snapshot_size()),
            );
        }

        let restored = SlotTable::new(table.capacity()).and_then(|mut fresh| {
            let outcome = fresh.read_from(&mut image.as_slice())?;
            Ok((fresh, outcome))
        });
        match restored {
            Ok((fresh, RestoreOutcome::Restored { live })) => {
                if live != table.live_count() || &fresh != table {
                    self.checker.add_violation(
                        index,
                        "Restored table differs from original",
                        format!("live {live}, original live {}", table.live_count()),
                    );
                }
            }
            Ok((_, outcome)) => self.checker.add_violation(
                index,
                "Snapshot rejected",
                outcome.to_string(),
            ),
            Err(e) => self
                .checker
                .add_violation(index, "Snapshot restore failed", e.to_string()),
        }
    }

    /// Get the invariant checker.
    #[must_use]
    pub const fn checker(&self) -> &InvariantChecker {
        &self.checker
    }

    /// The model's current contents.
    #[must_use]
    pub const fn model(&self) -> &BTreeMap<Key, String> {
        &self.model
    }
}
