//! Record stores: where the payloads behind each slot live.
//!
//! The tree engine never holds payload text itself. Every live slot carries a
//! [`RecordId`] and the engine talks to a [`RecordStore`] through three calls:
//!
//! - `append` stores a payload and hands back a fresh identifier
//! - `fetch` resolves an identifier to its current payload, if any
//! - `invalidate` tombstones an identifier without physically removing it
//!
//! Two implementations are provided:
//!
//! - [`MemoryRecordStore`]: a map in memory, used by tests and the simulator
//! - [`FileRecordStore`]: an append-only, checksummed log file
//!
//! Identifier generation is owned by each store instance. Identifiers start at
//! [`FIRST_RECORD_ID`] and are never reused.

mod file;
mod memory;

pub use file::{FORMAT_VERSION, FileRecordStore, MAGIC, MAX_PAYLOAD_SIZE};
pub use memory::MemoryRecordStore;

/// First identifier a fresh store hands out.
pub const FIRST_RECORD_ID: RecordId = RecordId(1000);

/// Opaque handle correlating a slot to its payload in a record store.
///
/// # Invariants
///
/// - The wrapped value is never negative (`-1` encodes "none" on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(i32);

impl RecordId {
    /// Wrap a raw identifier.
    ///
    /// Returns `None` for negative values, which are reserved for "none".
    #[must_use]
    pub const fn new(raw: i32) -> Option<Self> {
        if raw < 0 { None } else { Some(Self(raw)) }
    }

    /// The raw identifier value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// The identifier that follows this one, or `None` once the space is exhausted.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage for the payloads referenced by slots.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `append` never returns an identifier it has returned before
/// - `fetch` returns `None` for invalidated or unknown identifiers
/// - `invalidate` is idempotent; the second call reports `false`
pub trait RecordStore {
    /// Store a payload and return its fresh identifier.
    fn append(&mut self, payload: &str) -> Result<RecordId, RecordStoreError>;

    /// Resolve an identifier to its current payload.
    fn fetch(&mut self, id: RecordId) -> Result<Option<String>, RecordStoreError>;

    /// Tombstone an identifier.
    ///
    /// Returns `true` if a live payload was tombstoned, `false` if the identifier
    /// was unknown or already invalidated.
    fn invalidate(&mut self, id: RecordId) -> Result<bool, RecordStoreError>;

    /// Make all previous appends and invalidations durable.
    fn sync(&mut self) -> Result<(), RecordStoreError> {
        Ok(())
    }
}

/// Errors that can occur in a record store.
#[derive(Debug)]
pub enum RecordStoreError {
    /// I/O error.
    Io(std::io::Error),
    /// The log file does not start with the expected magic number.
    InvalidMagic([u8; 8]),
    /// The log file was written by an unknown format version.
    UnsupportedVersion(u32),
    /// Stored bytes could not be interpreted.
    Corrupt(String),
    /// Every identifier has been handed out.
    IdsExhausted,
    /// The payload exceeds the largest frame the log can hold.
    PayloadTooLarge { len: usize, max: usize },
}

impl std::fmt::Display for RecordStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "invalid magic number: {:?}",
                    String::from_utf8_lossy(magic)
                )
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::Corrupt(msg) => write!(f, "corruption: {msg}"),
            Self::IdsExhausted => write!(f, "record identifiers exhausted"),
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload of {len} bytes exceeds maximum of {max} bytes")
            }
        }
    }
}

impl std::error::Error for RecordStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RecordStoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
