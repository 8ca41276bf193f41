//! Node slots and their fixed-width encoding.
//!
//! A slot is one element of the node array. Slots are addressed by [`SlotId`];
//! child links are slot ids rather than pointers.
//!
//! # Slot Format
//!
//! ```text
//! Offset   Size   Field
//! 0-3      4      key (i32)
//! 4-7      4      record_id (i32, -1 = none)
//! 8-11     4      left (i32, -1 = absent)
//! 12-15    4      right (i32, -1 = absent)
//! 16       1      live (0 or 1)
//! 17-19    3      padding (written as zero, ignored on read)
//! ```
//!
//! All integers are little-endian. The padding keeps each slot on a 4-byte
//! stride, the layout of a naturally aligned `{ i32 x4, bool }` record.

use crate::storage::records::RecordId;

/// Ordering key of a slot.
pub type Key = i32;

/// Size of a serialized slot in bytes.
pub const SLOT_SIZE: usize = 20;

/// On-disk value for an absent index or record id.
pub const ABSENT: i32 = -1;

/// Slot field offsets.
mod offsets {
    pub const KEY: usize = 0;
    pub const RECORD_ID: usize = 4;
    pub const LEFT: usize = 8;
    pub const RIGHT: usize = 12;
    pub const LIVE: usize = 16;
    pub const PADDING: usize = 17;
}

/// Index of a slot in the node array.
///
/// Slot 0 is the control position and never holds data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u32);

impl SlotId {
    /// The reserved control slot.
    pub const CONTROL: Self = Self(0);

    /// The first slot that can hold data.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw slot index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw slot index.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The slot index as a position in the node array.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The slot after this one.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0 + 1)
    }

    /// Encode an optional slot id using [`ABSENT`] for `None`.
    // Slot ids are bounded by MAX_CAPACITY, which fits in i32.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub const fn encode(id: Option<Self>) -> i32 {
        match id {
            Some(id) => id.0 as i32,
            None => ABSENT,
        }
    }

    /// Decode an optional slot id written by [`SlotId::encode`].
    pub fn decode(raw: i32) -> Result<Option<Self>, SlotError> {
        if raw == ABSENT {
            return Ok(None);
        }
        u32::try_from(raw)
            .map(|index| Some(Self(index)))
            .map_err(|_| SlotError::InvalidIndex(raw))
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One element of the node array.
///
/// A slot is *unused* until allocated, *live* while it participates in the
/// tree, and *dead* after its key is deleted. Dead slots are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Ordering key.
    pub key: Key,
    /// Handle of the payload in the record store.
    pub record_id: Option<RecordId>,
    /// Left child (all keys strictly less).
    pub left: Option<SlotId>,
    /// Right child (all keys greater or equal).
    pub right: Option<SlotId>,
    /// Whether the slot participates in the tree.
    pub live: bool,
}

impl Slot {
    /// An unused slot.
    pub const EMPTY: Self = Self {
        key: 0,
        record_id: None,
        left: None,
        right: None,
        live: false,
    };

    /// A freshly inserted live slot with no children.
    #[must_use]
    pub const fn live(key: Key, record_id: RecordId) -> Self {
        Self {
            key,
            record_id: Some(record_id),
            left: None,
            right: None,
            live: true,
        }
    }

    /// Whether the slot has neither child.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Serialize the slot.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SLOT_SIZE] {
        let record_id = self.record_id.map_or(ABSENT, RecordId::get);

        let mut bytes = [0u8; SLOT_SIZE];
        bytes[offsets::KEY..offsets::KEY + 4].copy_from_slice(&self.key.to_le_bytes());
        bytes[offsets::RECORD_ID..offsets::RECORD_ID + 4].copy_from_slice(&record_id.to_le_bytes());
        bytes[offsets::LEFT..offsets::LEFT + 4]
            .copy_from_slice(&SlotId::encode(self.left).to_le_bytes());
        bytes[offsets::RIGHT..offsets::RIGHT + 4]
            .copy_from_slice(&SlotId::encode(self.right).to_le_bytes());
        bytes[offsets::LIVE] = u8::from(self.live);
        bytes[offsets::PADDING..].fill(0);
        bytes
    }

    /// Deserialize a slot.
    ///
    /// # Pre-conditions
    /// - `bytes.len() >= SLOT_SIZE`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SlotError> {
        debug_assert!(bytes.len() >= SLOT_SIZE);

        let raw_record_id = read_i32(bytes, offsets::RECORD_ID);
        let record_id = if raw_record_id == ABSENT {
            None
        } else {
            Some(RecordId::new(raw_record_id).ok_or(SlotError::InvalidRecordId(raw_record_id))?)
        };

        let live = match bytes[offsets::LIVE] {
            0 => false,
            1 => true,
            other => return Err(SlotError::InvalidLiveFlag(other)),
        };

        Ok(Self {
            key: read_i32(bytes, offsets::KEY),
            record_id,
            left: SlotId::decode(read_i32(bytes, offsets::LEFT))?,
            right: SlotId::decode(read_i32(bytes, offsets::RIGHT))?,
            live,
        })
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Read a little-endian i32 at `offset`.
pub(crate) const fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Errors that can occur when decoding a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// A child index was negative but not [`ABSENT`].
    InvalidIndex(i32),
    /// A record id was negative but not [`ABSENT`].
    InvalidRecordId(i32),
    /// The live flag was neither 0 nor 1.
    InvalidLiveFlag(u8),
}

impl std::fmt::Display for SlotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIndex(raw) => write!(f, "invalid slot index: {raw}"),
            Self::InvalidRecordId(raw) => write!(f, "invalid record id: {raw}"),
            Self::InvalidLiveFlag(flag) => write!(f, "invalid live flag: {flag}"),
        }
    }
}

impl std::error::Error for SlotError {}
