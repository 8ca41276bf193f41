//! The slot table: a fixed-capacity node array plus its allocation cursor.
//!
//! The table owns every slot, the root pointer, and `next_free`, the cursor
//! into never-used slots. Allocation only ever advances the cursor; slots of
//! deleted keys are left dead and are not reclaimed.
//!
//! # Snapshot Format
//!
//! The table persists as a full memory image, dead and unused slots included:
//!
//! ```text
//! Offset   Size               Field
//! 0-3      4                  capacity (i32)
//! 4-7      4                  root (i32, -1 = empty)
//! 8-11     4                  next_free (i32)
//! 12+      20 * (capacity+1)  slots 0..=capacity (see `storage::slot`)
//! ```
//!
//! There is no version field. A snapshot only restores into a table of the
//! same capacity; anything else leaves the table empty.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::storage::slot::{SLOT_SIZE, Slot, SlotId, read_i32};

/// Size of the snapshot header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Largest supported capacity: `capacity + 1` slot indices must fit in an i32.
pub const MAX_CAPACITY: u32 = 2_147_483_646;

/// Outcome of restoring a snapshot.
///
/// Every outcome other than `Restored` leaves the table freshly initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The snapshot was applied.
    Restored {
        /// Number of live slots after restore.
        live: usize,
    },
    /// No snapshot file exists.
    NoSnapshot,
    /// The snapshot was taken from a table of a different capacity.
    CapacityMismatch {
        /// Capacity recorded in the snapshot.
        stored: i32,
        /// Capacity of this table.
        configured: u32,
    },
    /// The snapshot ended before the last slot.
    Truncated,
    /// The snapshot decoded but describes an impossible table.
    Corrupt(String),
}

impl RestoreOutcome {
    /// Whether the snapshot was applied.
    #[must_use]
    pub const fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

impl std::fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restored { live } => write!(f, "restored {live} live slots"),
            Self::NoSnapshot => write!(f, "no snapshot"),
            Self::CapacityMismatch { stored, configured } => write!(
                f,
                "snapshot capacity {stored} does not match configured capacity {configured}"
            ),
            Self::Truncated => write!(f, "snapshot truncated"),
            Self::Corrupt(reason) => write!(f, "snapshot corrupt: {reason}"),
        }
    }
}

/// Fixed-capacity array of slots.
///
/// # Invariants
///
/// - `slots.len() == capacity + 1`; slot 0 is the control slot
/// - `1 <= next_free <= capacity + 1`
/// - no slot at or beyond `next_free` is live
/// - `root.is_none()` iff `live_count == 0`
/// - `live_count` equals the number of live slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    slots: Vec<Slot>,
    capacity: u32,
    root: Option<SlotId>,
    next_free: SlotId,
    live_count: usize,
}

impl SlotTable {
    /// Create an empty table holding up to `capacity` entries.
    pub fn new(capacity: u32) -> Result<Self, SlotTableError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(SlotTableError::InvalidCapacity(capacity));
        }

        Ok(Self {
            slots: vec![Slot::EMPTY; capacity as usize + 1],
            capacity,
            root: None,
            next_free: SlotId::FIRST,
            live_count: 0,
        })
    }

    /// Maximum number of slots that can ever be allocated.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Root slot, or `None` for an empty tree.
    #[must_use]
    pub const fn root(&self) -> Option<SlotId> {
        self.root
    }

    /// Next slot allocation will use.
    #[must_use]
    pub const fn next_free(&self) -> SlotId {
        self.next_free
    }

    /// Number of live slots.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Number of slots ever allocated, live or dead.
    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.next_free.get() - 1
    }

    /// Number of allocations left before the table is full.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity - self.allocated()
    }

    /// Whether allocation is exhausted. Deleting keys never clears this.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.next_free.get() > self.capacity
    }

    /// All slots, control slot included.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is beyond the capacity. Ids handed out by this table
    /// and ids inside validated snapshots are always in range.
    #[must_use]
    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        &mut self.slots[id.index()]
    }

    pub(crate) const fn set_root(&mut self, root: Option<SlotId>) {
        self.root = root;
    }

    /// Write `slot` at `next_free` and advance the cursor.
    ///
    /// Returns `None` when the table is full.
    pub(crate) fn allocate(&mut self, slot: Slot) -> Option<SlotId> {
        if self.is_full() {
            return None;
        }

        let id = self.next_free;
        self.slots[id.index()] = slot;
        self.next_free = id.successor();
        if slot.live {
            self.live_count += 1;
        }
        Some(id)
    }

    /// Mark a live slot dead. Its fields are left in place.
    pub(crate) fn kill(&mut self, id: SlotId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(slot.live, "slot {id} killed twice");
        if slot.live {
            slot.live = false;
            self.live_count -= 1;
        }
    }

    /// Return to the freshly-initialized state.
    fn reset(&mut self) {
        self.slots.fill(Slot::EMPTY);
        self.root = None;
        self.next_free = SlotId::FIRST;
        self.live_count = 0;
    }

    /// Size of a snapshot of this table in bytes.
    #[must_use]
    pub fn snapshot_size(&self) -> usize {
        HEADER_SIZE + self.slots.len() * SLOT_SIZE
    }

    /// Serialize the full table image.
    // capacity and next_free are bounded by MAX_CAPACITY + 1, which fits in i32.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.snapshot_size());
        bytes.extend_from_slice(&(self.capacity as i32).to_le_bytes());
        bytes.extend_from_slice(&SlotId::encode(self.root).to_le_bytes());
        bytes.extend_from_slice(&(self.next_free.get() as i32).to_le_bytes());
        for slot in &self.slots {
            bytes.extend_from_slice(&slot.to_bytes());
        }
        bytes
    }

    /// Write the full table image to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), SlotTableError> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    /// Persist the table to `path`.
    ///
    /// The image is written to a sibling temporary file, synced, and renamed
    /// over `path`, so a crash leaves either the old or the new snapshot.
    pub fn save(&self, path: &Path) -> Result<(), SlotTableError> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            self.write_to(&mut file)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;

        tracing::info!(
            "Saved slot table to {}: {} live of {} allocated slots",
            path.display(),
            self.live_count,
            self.allocated()
        );
        Ok(())
    }

    /// Restore the table from the snapshot at `path`.
    ///
    /// A missing file is reported as [`RestoreOutcome::NoSnapshot`].
    pub fn restore(&mut self, path: &Path) -> Result<RestoreOutcome, SlotTableError> {
        let outcome = match File::open(path) {
            Ok(mut file) => self.read_from(&mut file)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.reset();
                RestoreOutcome::NoSnapshot
            }
            Err(e) => return Err(SlotTableError::Io(e)),
        };

        match &outcome {
            RestoreOutcome::Restored { live } => {
                tracing::info!("Restored slot table from {}: {live} live slots", path.display());
            }
            RestoreOutcome::NoSnapshot => {
                tracing::info!("No slot table snapshot at {}", path.display());
            }
            rejected => {
                tracing::warn!(
                    "Ignoring slot table snapshot at {}: {rejected}",
                    path.display()
                );
            }
        }

        Ok(outcome)
    }

    /// Restore the table from a snapshot image read from `reader`.
    ///
    /// Nothing is applied unless the whole image decodes and validates.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<RestoreOutcome, SlotTableError> {
        self.reset();

        let mut header = [0u8; HEADER_SIZE];
        if !read_exact_or_eof(reader, &mut header)? {
            return Ok(RestoreOutcome::Truncated);
        }

        let stored_capacity = read_i32(&header, 0);
        if u32::try_from(stored_capacity).ok() != Some(self.capacity) {
            return Ok(RestoreOutcome::CapacityMismatch {
                stored: stored_capacity,
                configured: self.capacity,
            });
        }

        let mut body = vec![0u8; self.slots.len() * SLOT_SIZE];
        if !read_exact_or_eof(reader, &mut body)? {
            return Ok(RestoreOutcome::Truncated);
        }

        match self.decode(&header, &body) {
            Ok(decoded) => {
                let live = decoded.live_count;
                *self = decoded;
                Ok(RestoreOutcome::Restored { live })
            }
            Err(reason) => Ok(RestoreOutcome::Corrupt(reason)),
        }
    }

    /// Decode and validate an image whose capacity already matches.
    fn decode(&self, header: &[u8], body: &[u8]) -> Result<Self, String> {
        let root = SlotId::decode(read_i32(header, 4)).map_err(|e| format!("root: {e}"))?;
        let raw_next_free = read_i32(header, 8);
        let next_free = u32::try_from(raw_next_free)
            .ok()
            .filter(|n| (1..=self.capacity + 1).contains(n))
            .map(SlotId::new)
            .ok_or_else(|| format!("next_free {raw_next_free} out of range"))?;

        let slots = body
            .chunks_exact(SLOT_SIZE)
            .enumerate()
            .map(|(i, bytes)| Slot::from_bytes(bytes).map_err(|e| format!("slot {i}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        let table = Self {
            slots,
            capacity: self.capacity,
            root,
            next_free,
            live_count: 0,
        };
        let live_count = table.validate()?;
        Ok(Self { live_count, ..table })
    }

    /// Check structural invariants of a decoded image.
    ///
    /// Returns the number of live slots.
    fn validate(&self) -> Result<usize, String> {
        let in_range = |id: SlotId| id >= SlotId::FIRST && id.get() <= self.capacity;

        let mut live = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            for child in [slot.left, slot.right].into_iter().flatten() {
                if !in_range(child) {
                    return Err(format!("slot {i} links to out-of-range slot {child}"));
                }
            }
            if slot.live {
                if i == 0 || i >= self.next_free.index() {
                    return Err(format!("slot {i} is live outside the allocated range"));
                }
                if slot.record_id.is_none() {
                    return Err(format!("live slot {i} has no record"));
                }
                live += 1;
            }
        }

        match self.root {
            Some(root) if !in_range(root) => {
                return Err(format!("root {root} out of range"));
            }
            Some(root) if !self.slot(root).live => {
                return Err(format!("root {root} is not live"));
            }
            None if live > 0 => return Err(format!("{live} live slots but no root")),
            _ => {}
        }

        // Every slot reachable from the root is visited exactly once and
        // every live slot is reachable.
        let mut seen = vec![false; self.slots.len()];
        let mut reached_live = 0;
        let mut stack: Vec<SlotId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                return Err(format!("slot {id} is reachable twice"));
            }
            let slot = self.slot(id);
            if slot.live {
                reached_live += 1;
            }
            stack.extend(slot.left);
            stack.extend(slot.right);
        }
        if reached_live != live {
            return Err(format!(
                "{} live slots are unreachable from the root",
                live - reached_live
            ));
        }

        Ok(live)
    }
}

/// Fill `buf` from `reader`, returning `false` if the reader ends first.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, SlotTableError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(SlotTableError::Io(e)),
    }
}

/// Errors that can occur in slot table operations.
#[derive(Debug)]
pub enum SlotTableError {
    /// I/O error.
    Io(std::io::Error),
    /// Capacity is zero or too large for the snapshot layout.
    InvalidCapacity(u32),
}

impl std::fmt::Display for SlotTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidCapacity(capacity) => write!(
                f,
                "invalid capacity {capacity} (must be 1..={MAX_CAPACITY})"
            ),
        }
    }
}

impl std::error::Error for SlotTableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InvalidCapacity(_) => None,
        }
    }
}

impl From<std::io::Error> for SlotTableError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
