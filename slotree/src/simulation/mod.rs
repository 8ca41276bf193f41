//! Deterministic simulation testing for the slot tree.
//!
//! This module drives a tree with seeded random workloads and compares it
//! against a `BTreeMap` model:
//! - Reproducible random operation generation
//! - A record store wrapper with fault injection
//! - Invariant checking after each operation
//!
//! # Design Principles
//!
//! 1. All randomness is seeded for reproducibility
//! 2. Faults can be injected at the record store boundary
//! 3. Given the same seed, execution is identical
//!
//! # Usage
//!
//! ```
//! use slotree::simulation::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(12345).with_capacity(64);
//! let mut sim = Simulator::new(config);
//! let result = sim.run(200);
//!
//! assert!(result.passed(), "{:?}", result.invariant_violations);
//! ```

mod faults;
mod invariants;
mod simulator;
mod workload;

pub use faults::{FaultConfig, FaultyRecordStore};
pub use invariants::{InvariantChecker, InvariantViolation};
pub use simulator::{SimulationResult, Simulator, SimulatorConfig};
pub use workload::{Operation, WorkloadConfig, WorkloadGenerator};
