//! Index configuration module.
//!
//! This module provides configuration loading for the index from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `SLOTREE_CAPACITY`: Maximum number of insertions over the index's lifetime (default: `100`)
//! - `SLOTREE_DATA_DIRECTORY`: Directory holding `tree.dat` and `records.log` (default: `./data`)
//!
//! # Invariants
//!
//! - `capacity` is always in `1..=MAX_CAPACITY`
//! - `data_directory` is always a valid path (may not exist yet)

use std::path::PathBuf;

use crate::storage::{MAX_CAPACITY, RECORDS_FILE_NAME, TREE_FILE_NAME};

/// Index configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()` or `new()`:
/// - `capacity` is in the valid range (`1..=MAX_CAPACITY`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum number of slots the tree can ever allocate.
    /// A snapshot only restores into a table of the same capacity.
    pub capacity: u32,
    /// Directory where the tree snapshot and record log are stored.
    pub data_directory: PathBuf,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl IndexConfig {
    /// Default capacity.
    pub const DEFAULT_CAPACITY: u32 = 100;
    /// Default data directory.
    pub const DEFAULT_DATA_DIRECTORY: &'static str = "./data";

    /// Build a configuration directly.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is outside `1..=MAX_CAPACITY`.
    pub fn new(capacity: u32, data_directory: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            capacity: Self::validate_capacity(capacity)?,
            data_directory: data_directory.into(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SLOTREE_CAPACITY`: Capacity (default: `100`)
    /// - `SLOTREE_DATA_DIRECTORY`: Data directory (default: `./data`)
    ///
    /// # Errors
    ///
    /// Returns an error if `SLOTREE_CAPACITY` is set but is not a number in
    /// `1..=MAX_CAPACITY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let capacity = Self::load_capacity()?;
        let data_directory = Self::load_data_directory();

        Ok(Self {
            capacity,
            data_directory,
        })
    }

    /// Path of the slot table snapshot.
    #[must_use]
    pub fn tree_path(&self) -> PathBuf {
        self.data_directory.join(TREE_FILE_NAME)
    }

    /// Path of the record log.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.data_directory.join(RECORDS_FILE_NAME)
    }

    /// Load the capacity from environment.
    ///
    /// Returns the default if not set.
    fn load_capacity() -> Result<u32, ConfigError> {
        match std::env::var("SLOTREE_CAPACITY") {
            Ok(value) => {
                let capacity = value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                    name: "SLOTREE_CAPACITY".to_string(),
                    message: format!("'{value}' is not a valid capacity"),
                })?;
                Self::validate_capacity(capacity)
            }
            Err(_) => Ok(Self::DEFAULT_CAPACITY),
        }
    }

    /// Load the data directory from environment.
    ///
    /// Returns the default if not set.
    fn load_data_directory() -> PathBuf {
        std::env::var("SLOTREE_DATA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_DATA_DIRECTORY))
    }

    fn validate_capacity(capacity: u32) -> Result<u32, ConfigError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(ConfigError::InvalidValue {
                name: "SLOTREE_CAPACITY".to_string(),
                message: format!("{capacity} is out of range (must be 1-{MAX_CAPACITY})"),
            });
        }
        Ok(capacity)
    }
}
