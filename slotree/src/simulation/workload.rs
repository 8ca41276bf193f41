//! Workload generator for deterministic simulation testing.
//!
//! Generates random but reproducible sequences of tree operations. Keys are
//! drawn from a small pool so that duplicates, misses, and deletes of
//! existing keys all occur regularly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::Key;

/// Configuration for workload generation.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Keys are drawn from `-key_range..key_range`.
    pub key_range: Key,
    /// Relative weight of inserts.
    pub insert_weight: u32,
    /// Relative weight of lookups.
    pub lookup_weight: u32,
    /// Relative weight of modifications.
    pub modify_weight: u32,
    /// Relative weight of deletes.
    pub delete_weight: u32,
    /// Maximum payload length in characters.
    pub max_payload_length: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            key_range: 64,
            insert_weight: 4,
            lookup_weight: 3,
            modify_weight: 2,
            delete_weight: 2,
            max_payload_length: 32,
        }
    }
}

impl WorkloadConfig {
    const fn total_weight(&self) -> u32 {
        self.insert_weight + self.lookup_weight + self.modify_weight + self.delete_weight
    }
}

/// A single generated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert a key with a payload.
    Insert { key: Key, payload: String },
    /// Look up a key.
    Lookup { key: Key },
    /// Replace a key's payload.
    Modify { key: Key, payload: String },
    /// Delete a key.
    Delete { key: Key },
}

impl Operation {
    /// The key the operation targets.
    #[must_use]
    pub const fn key(&self) -> Key {
        match self {
            Self::Insert { key, .. }
            | Self::Lookup { key }
            | Self::Modify { key, .. }
            | Self::Delete { key } => *key,
        }
    }
}

/// Generator for random [`Operation`] sequences.
///
/// Produces the same sequence for the same seed and configuration.
pub struct WorkloadGenerator {
    rng: StdRng,
    config: WorkloadConfig,
}

impl WorkloadGenerator {
    /// Create a generator with the default configuration.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, WorkloadConfig::default())
    }

    /// Create a generator with a custom configuration.
    #[must_use]
    pub fn with_config(seed: u64, config: WorkloadConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    /// Generate the next operation.
    pub fn next_operation(&mut self) -> Operation {
        let key = self.random_key();
        let total = self.config.total_weight().max(1);
        let mut roll = self.rng.random_range(0..total);

        if roll < self.config.insert_weight {
            return Operation::Insert {
                key,
                payload: self.random_payload(),
            };
        }
        roll -= self.config.insert_weight;
        if roll < self.config.lookup_weight {
            return Operation::Lookup { key };
        }
        roll -= self.config.lookup_weight;
        if roll < self.config.modify_weight {
            return Operation::Modify {
                key,
                payload: self.random_payload(),
            };
        }
        Operation::Delete { key }
    }

    fn random_key(&mut self) -> Key {
        let range = self.config.key_range.max(1);
        self.rng.random_range(-range..range)
    }

    fn random_payload(&mut self) -> String {
        let len = self.rng.random_range(0..=self.config.max_payload_length);
        (0..len)
            .map(|_| char::from(self.rng.random_range(b'a'..=b'z')))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut first = WorkloadGenerator::new(7);
        let mut second = WorkloadGenerator::new(7);

        for _ in 0..100 {
            assert_eq!(first.next_operation(), second.next_operation());
        }
    }

    #[test]
    fn test_keys_within_range() {
        let config = WorkloadConfig {
            key_range: 5,
            ..WorkloadConfig::default()
        };
        let mut generator = WorkloadGenerator::with_config(3, config);

        for _ in 0..200 {
            let key = generator.next_operation().key();
            assert!((-5..5).contains(&key), "key {key} out of range");
        }
    }

    #[test]
    fn test_weights_select_operations() {
        let config = WorkloadConfig {
            insert_weight: 0,
            lookup_weight: 0,
            modify_weight: 0,
            delete_weight: 1,
            ..WorkloadConfig::default()
        };
        let mut generator = WorkloadGenerator::with_config(11, config);

        for _ in 0..50 {
            assert!(matches!(
                generator.next_operation(),
                Operation::Delete { .. }
            ));
        }
    }

    #[test]
    fn test_payload_length_bounded() {
        let config = WorkloadConfig {
            insert_weight: 1,
            lookup_weight: 0,
            modify_weight: 0,
            delete_weight: 0,
            max_payload_length: 4,
            ..WorkloadConfig::default()
        };
        let mut generator = WorkloadGenerator::with_config(5, config);

        for _ in 0..50 {
            let Operation::Insert { payload, .. } = generator.next_operation() else {
                panic!("expected insert");
            };
            assert!(payload.len() <= 4);
            assert!(payload.chars().all(|c| c.is_ascii_lowercase()));
        }
    }
}
