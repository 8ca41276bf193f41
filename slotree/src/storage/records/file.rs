//! Append-only record log.
//!
//! Payloads are appended to a single log file. Invalidation appends a
//! tombstone frame instead of rewriting earlier bytes, and an in-memory index
//! maps each live identifier to its payload's offset so `fetch` is one read.
//!
//! # File Format
//!
//! ```text
//! Offset   Size   Field
//! 0-7      8      Magic number ("SLOTRLOG")
//! 8-11     4      Format version
//! 12+      var    Frames
//! ```
//!
//! # Frame Format
//!
//! ```text
//! +----------+--------------------------------------------------+
//! | 0-3      | frame_length (4 bytes, includes header+checksum) |
//! | 4        | frame_type (1 byte)                              |
//! | 5-8      | record_id (4 bytes)                              |
//! | 9-N      | payload (UTF-8, append frames only)              |
//! | N-N+3    | CRC32 checksum (4 bytes)                         |
//! +----------+--------------------------------------------------+
//! ```
//!
//! All integers are little-endian. On open, a torn or corrupt tail (from a
//! crash mid-append) is truncated away.

// Frame lengths are bounded by MAX_PAYLOAD_SIZE and fit in u32.
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::storage::records::{FIRST_RECORD_ID, RecordId, RecordStore, RecordStoreError};

/// Magic number identifying a record log: "SLOTRLOG"
pub const MAGIC: [u8; 8] = *b"SLOTRLOG";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Largest payload a single frame may carry: 16MB
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Size of the file header (magic + version).
const FILE_HEADER_SIZE: u64 = 12;

/// `frame_length` (4) + `frame_type` (1) + `record_id` (4) = 9 bytes
const FRAME_HEADER_SIZE: usize = 9;

/// CRC32 checksum size at end of frame.
const CHECKSUM_SIZE: usize = 4;

/// Smallest valid frame: a tombstone with no payload.
const MIN_FRAME_SIZE: usize = FRAME_HEADER_SIZE + CHECKSUM_SIZE;

/// Frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FrameType {
    /// A payload was stored under a fresh identifier.
    Append = 0x01,
    /// A previously stored payload became obsolete.
    Invalidate = 0x02,
}

impl TryFrom<u8> for FrameType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Append),
            0x02 => Ok(Self::Invalidate),
            _ => Err(value),
        }
    }
}

/// A decoded frame borrowing its payload from the scan buffer.
struct Frame<'a> {
    frame_type: FrameType,
    record_id: RecordId,
    payload: &'a [u8],
    len: usize,
}

/// Where a live payload sits in the file.
#[derive(Debug, Clone, Copy)]
struct Location {
    offset: u64,
    len: usize,
}

/// Record store backed by an append-only log file.
///
/// # Invariants
///
/// - `end` is the file length; every write lands at `end`
/// - `index` holds exactly the identifiers with an append frame and no tombstone frame
/// - `next_id` is greater than every identifier ever written to the log
pub struct FileRecordStore {
    file: File,
    path: PathBuf,
    index: HashMap<RecordId, Location>,
    tombstones: usize,
    next_id: Option<RecordId>,
    end: u64,
}

impl FileRecordStore {
    /// Open the log at `path`, creating it if it does not exist.
    ///
    /// Existing frames are replayed to rebuild the index. A torn or corrupt
    /// tail is truncated.
    pub fn open(path: &Path) -> Result<Self, RecordStoreError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.metadata()?.len() == 0 {
            let mut header = Vec::with_capacity(FILE_HEADER_SIZE as usize);
            header.extend_from_slice(&MAGIC);
            header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
            file.write_all(&header)?;
            file.sync_all()?;
        } else {
            Self::check_header(&mut file)?;
        }

        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(FILE_HEADER_SIZE))?;
        file.read_to_end(&mut bytes)?;

        let mut store = Self {
            file,
            path: path.to_path_buf(),
            index: HashMap::new(),
            tombstones: 0,
            next_id: Some(FIRST_RECORD_ID),
            end: FILE_HEADER_SIZE,
        };
        store.replay(&bytes)?;

        tracing::info!(
            "Opened record log {}: {} live records, {} tombstones",
            store.path.display(),
            store.index.len(),
            store.tombstones
        );

        Ok(store)
    }

    /// Path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live payloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no live payloads remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of tombstone frames in the log.
    #[must_use]
    pub const fn tombstone_count(&self) -> usize {
        self.tombstones
    }

    fn check_header(file: &mut File) -> Result<(), RecordStoreError> {
        let mut header = [0u8; FILE_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                RecordStoreError::Corrupt("record log header truncated".to_string())
            } else {
                RecordStoreError::Io(e)
            }
        })?;

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&header[0..8]);
        if magic != MAGIC {
            return Err(RecordStoreError::InvalidMagic(magic));
        }

        let version = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        if version != FORMAT_VERSION {
            return Err(RecordStoreError::UnsupportedVersion(version));
        }

        Ok(())
    }

    /// Rebuild the index from the frames following the file header.
    fn replay(&mut self, bytes: &[u8]) -> Result<(), RecordStoreError> {
        let mut pos = 0;
        let mut highest: Option<RecordId> = None;

        while pos < bytes.len() {
            let frame = match decode_frame(&bytes[pos..]) {
                Ok(frame) => frame,
                Err(reason) => {
                    let valid_len = FILE_HEADER_SIZE + pos as u64;
                    tracing::warn!(
                        "Truncating record log {} at offset {valid_len}: {reason}",
                        self.path.display()
                    );
                    self.file.set_len(valid_len)?;
                    self.file.sync_all()?;
                    break;
                }
            };

            let frame_offset = FILE_HEADER_SIZE + pos as u64;
            match frame.frame_type {
                FrameType::Append => {
                    self.index.insert(
                        frame.record_id,
                        Location {
                            offset: frame_offset + FRAME_HEADER_SIZE as u64,
                            len: frame.payload.len(),
                        },
                    );
                }
                FrameType::Invalidate => {
                    if self.index.remove(&frame.record_id).is_some() {
                        self.tombstones += 1;
                    }
                }
            }

            highest = highest.max(Some(frame.record_id));
            pos += frame.len;
        }

        self.end = FILE_HEADER_SIZE + pos as u64;
        if let Some(highest) = highest {
            self.next_id = highest.next().map(|next| next.max(FIRST_RECORD_ID));
        }
        Ok(())
    }

    /// Write a frame at the end of the log.
    fn write_frame(&mut self, frame: &[u8]) -> Result<u64, RecordStoreError> {
        let offset = self.end;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(frame)?;
        self.end += frame.len() as u64;
        Ok(offset)
    }
}

impl RecordStore for FileRecordStore {
    fn append(&mut self, payload: &str) -> Result<RecordId, RecordStoreError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RecordStoreError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let id = self.next_id.ok_or(RecordStoreError::IdsExhausted)?;
        let frame = encode_frame(FrameType::Append, id, payload.as_bytes());
        let offset = self.write_frame(&frame)?;

        self.index.insert(
            id,
            Location {
                offset: offset + FRAME_HEADER_SIZE as u64,
                len: payload.len(),
            },
        );
        self.next_id = id.next();
        Ok(id)
    }

    fn fetch(&mut self, id: RecordId) -> Result<Option<String>, RecordStoreError> {
        let Some(location) = self.index.get(&id).copied() else {
            return Ok(None);
        };

        let mut payload = vec![0u8; location.len];
        self.file.seek(SeekFrom::Start(location.offset))?;
        self.file.read_exact(&mut payload)?;

        String::from_utf8(payload)
            .map(Some)
            .map_err(|_| RecordStoreError::Corrupt(format!("record {id} is not valid UTF-8")))
    }

    fn invalidate(&mut self, id: RecordId) -> Result<bool, RecordStoreError> {
        if !self.index.contains_key(&id) {
            return Ok(false);
        }

        let frame = encode_frame(FrameType::Invalidate, id, &[]);
        self.write_frame(&frame)?;
        self.index.remove(&id);
        self.tombstones += 1;
        Ok(true)
    }

    fn sync(&mut self) -> Result<(), RecordStoreError> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Serialize a frame, checksum included.
fn encode_frame(frame_type: FrameType, id: RecordId, payload: &[u8]) -> Vec<u8> {
    let len = MIN_FRAME_SIZE + payload.len();
    let mut bytes = Vec::with_capacity(len);
    bytes.extend_from_slice(&(len as u32).to_le_bytes());
    bytes.push(frame_type as u8);
    bytes.extend_from_slice(&id.get().to_le_bytes());
    bytes.extend_from_slice(payload);
    let checksum = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes
}

/// Decode the frame at the start of `bytes`.
///
/// Returns a description of the problem if the frame is torn or corrupt.
fn decode_frame(bytes: &[u8]) -> Result<Frame<'_>, String> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(format!("torn frame header ({} bytes)", bytes.len()));
    }

    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len < MIN_FRAME_SIZE || len > MIN_FRAME_SIZE + MAX_PAYLOAD_SIZE {
        return Err(format!("invalid frame length {len}"));
    }
    if bytes.len() < len {
        return Err(format!("torn frame ({} of {len} bytes)", bytes.len()));
    }

    let stored_checksum = u32::from_le_bytes([
        bytes[len - 4],
        bytes[len - 3],
        bytes[len - 2],
        bytes[len - 1],
    ]);
    let computed_checksum = crc32fast::hash(&bytes[..len - CHECKSUM_SIZE]);
    if stored_checksum != computed_checksum {
        return Err(format!(
            "checksum mismatch (stored {stored_checksum:#010x}, computed {computed_checksum:#010x})"
        ));
    }

    let frame_type =
        FrameType::try_from(bytes[4]).map_err(|t| format!("unknown frame type {t:#04x}"))?;
    let raw_id = i32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    let record_id = RecordId::new(raw_id).ok_or_else(|| format!("negative record id {raw_id}"))?;

    Ok(Frame {
        frame_type,
        record_id,
        payload: &bytes[FRAME_HEADER_SIZE..len - CHECKSUM_SIZE],
        len,
    })
}
