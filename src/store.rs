//! The key-value facade: record encode/decode, put/get/delete, and the
//! log-replay routine run on open.
//!
//! [`Store`] is the only component that talks to both [`crate::logio::LogFile`]
//! and [`crate::index::Index`]. All file bytes flow through the former, all
//! offset bookkeeping through the latter.

use log::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::index::Index;
use crate::logio::LogFile;
use std::path::Path;

/// Bytes of a packed record header: `record_len(4) record_type(1)
/// key_len(2) val_len(4)`.
const HEADER_LEN: usize = 11;
const RECORD_PUT: u8 = 1;
const RECORD_TOMBSTONE: u8 = 2;

/// A put/delete record's fixed-size, little-endian header.
struct RecordHeader {
    record_len: u32,
    record_type: u8,
    key_len: u16,
    val_len: u32,
}

impl RecordHeader {
    fn put(key_len: u16, val_len: u32) -> Self {
        RecordHeader {
            record_len: HEADER_LEN as u32 + key_len as u32 + val_len,
            record_type: RECORD_PUT,
            key_len,
            val_len,
        }
    }

    fn tombstone(key_len: u16) -> Self {
        RecordHeader {
            record_len: HEADER_LEN as u32 + key_len as u32,
            record_type: RECORD_TOMBSTONE,
            key_len,
            val_len: 0,
        }
    }

    /// Packs the header into an 11-byte little-endian buffer. A pure
    /// byte-level layout transform; never fails, never validates.
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.record_len.to_le_bytes());
        buf[4] = self.record_type;
        buf[5..7].copy_from_slice(&self.key_len.to_le_bytes());
        buf[7..11].copy_from_slice(&self.val_len.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8; HEADER_LEN]) -> Self {
        RecordHeader {
            record_len: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            record_type: buf[4],
            key_len: u16::from_le_bytes(buf[5..7].try_into().unwrap()),
            val_len: u32::from_le_bytes(buf[7..11].try_into().unwrap()),
        }
    }
}

/// A single-file, embeddable key-value store.
///
/// Owns exactly one open log file and one in-memory index. Neither is
/// `Sync`-shareable; a caller that needs the store from more than one thread
/// must serialize access itself (see `SPEC_FULL.md` §5).
pub struct Store {
    log: LogFile,
    index: Index,
}

impl Store {
    /// Creates a new, empty store at `path`, truncating any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let log = LogFile::create(path.as_ref())?;
        let index = Index::init()?;
        debug!("created store at {}", path.as_ref().display());
        Ok(Store { log, index })
    }

    /// Opens an existing store at `path`, replaying its log to rebuild the
    /// in-memory index. Fails if `path` does not exist or the log is
    /// corrupt (as opposed to merely truncated, which replay tolerates).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut log = LogFile::open(path.as_ref())?;
        let mut index = Index::init()?;
        let replayed = replay(&mut log, &mut index)?;
        debug!(
            "opened store at {} ({} live keys after replay)",
            path.as_ref().display(),
            replayed
        );
        Ok(Store { log, index })
    }

    /// Closes the store, releasing the file handle and every owned key
    /// buffer in the index. Consuming `self` makes it a compile error to
    /// use the store again afterwards.
    pub fn close(self) {
        debug!("closing store ({} live keys)", self.index.len());
    }

    /// Number of live keys currently tracked by the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the store currently holds no live keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Appends a put record for `key` / `value` and updates the index.
    ///
    /// If the index insert fails the log is left untouched. If the
    /// subsequent log append fails, the index and log are inconsistent for
    /// this key; a later successful put/delete or a clean replay on reopen
    /// corrects it.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let key_len = u16::try_from(key.len())
            .map_err(|_| StoreError::InvalidArgument("key_len exceeds 16 bits".into()))?;
        let val_len = u32::try_from(value.len())
            .map_err(|_| StoreError::InvalidArgument("val_len exceeds 32 bits".into()))?;

        let header = RecordHeader::put(key_len, val_len);
        let offset = self.log.current_append_offset()?;

        self.index.insert(key, offset as i64)?;

        let encoded = header.encode();
        let mut record = Vec::with_capacity(encoded.len() + key.len() + value.len());
        record.extend_from_slice(&encoded);
        record.extend_from_slice(key);
        record.extend_from_slice(value);
        self.log.append_raw(&record)?;

        Ok(())
    }

    /// Looks up `key` via the index and reads its value straight from the
    /// log at the recorded offset. Returns `Ok(None)` if the key is not
    /// live.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let offset = match self.index.lookup(key) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let mut header_buf = [0u8; HEADER_LEN];
        let n = self.log.read_at(offset as u64, &mut header_buf)?;
        if n < HEADER_LEN {
            // The index points somewhere the log no longer agrees with;
            // treat as not-found rather than propagating an error.
            return Ok(None);
        }
        let header = RecordHeader::decode(&header_buf);
        if header.record_type == RECORD_TOMBSTONE {
            return Ok(None);
        }

        // Defensive check against a corrupt index: verify the stored key
        // actually matches before trusting the value bytes.
        let mut stored_key = vec![0u8; header.key_len as usize];
        let key_offset = offset as u64 + HEADER_LEN as u64;
        let n = self.log.read_at(key_offset, &mut stored_key)?;
        if n < stored_key.len() || stored_key != key {
            return Ok(None);
        }

        let mut value = vec![0u8; header.val_len as usize];
        let val_offset = key_offset + header.key_len as u64;
        let n = self.log.read_at(val_offset, &mut value)?;
        if n < value.len() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    /// Removes `key` by appending a tombstone record. Fails with
    /// [`StoreError::KeyNotFound`] if the key is not currently live.
    ///
    /// The index is updated before the tombstone is appended; a crash
    /// between the two loses the delete, recovered on the next successful
    /// delete or corrected by replay on reopen.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let key_len = u16::try_from(key.len())
            .map_err(|_| StoreError::InvalidArgument("key_len exceeds 16 bits".into()))?;

        self.index.delete(key)?;

        let header = RecordHeader::tombstone(key_len);
        let mut record = Vec::with_capacity(HEADER_LEN + key.len());
        record.extend_from_slice(&header.encode());
        record.extend_from_slice(key);
        self.log.append_raw(&record)?;

        Ok(())
    }

    /// Reference implementation of `get` that ignores the index entirely
    /// and scans the log from offset zero, keeping the most recent record
    /// for `key`. Exists to property-test the indexed [`Store::get`]
    /// against an obviously-correct but O(log size) alternative.
    pub fn get_linear_scan(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.log.rewind()?;

        let mut latest: Option<Option<Vec<u8>>> = None;
        let mut pos = 0u64;
        loop {
            let mut header_buf = [0u8; HEADER_LEN];
            let n = self.log.read_at(pos, &mut header_buf)?;
            if n == 0 {
                break;
            }
            if n < HEADER_LEN {
                break;
            }
            let header = RecordHeader::decode(&header_buf);

            let mut record_key = vec![0u8; header.key_len as usize];
            let n = self.log.read_at(pos + HEADER_LEN as u64, &mut record_key)?;
            if n < record_key.len() {
                break;
            }

            if record_key == key {
                latest = Some(match header.record_type {
                    RECORD_TOMBSTONE => None,
                    _ => {
                        let mut value = vec![0u8; header.val_len as usize];
                        let val_offset = pos + HEADER_LEN as u64 + header.key_len as u64;
                        let n = self.log.read_at(val_offset, &mut value)?;
                        if n < value.len() {
                            break;
                        }
                        Some(value)
                    }
                });
            }

            pos += header.record_len as u64;
        }

        Ok(latest.flatten())
    }
}

/// Replays the log from offset zero, rebuilding `index` so it reflects the
/// last-writer-wins view of every record. Stops cleanly at the first
/// absent or short header (a truncated tail from a crashed append); a
/// record with an unrecognized type, an inconsistent `record_len`, or a
/// short key read past a complete header, is reported as
/// [`StoreError::CorruptLog`].
///
/// Returns the number of live keys after replay.
fn replay(log: &mut LogFile, index: &mut Index) -> Result<usize> {
    log.rewind()?;
    let mut pos = 0u64;
    let mut records_seen = 0u64;

    loop {
        let mut header_buf = [0u8; HEADER_LEN];
        let n = log.read_at(pos, &mut header_buf)?;
        if n == 0 {
            break;
        }
        if n < HEADER_LEN {
            warn!(
                "replay stopped at offset {}: truncated header ({} of {} bytes)",
                pos, n, HEADER_LEN
            );
            break;
        }
        let header = RecordHeader::decode(&header_buf);

        let expected_len = HEADER_LEN as u32 + header.key_len as u32 + header.val_len;
        if header.record_len != expected_len {
            return Err(StoreError::CorruptLog(format!(
                "inconsistent record_len at offset {}: header says {}, expected {}",
                pos, header.record_len, expected_len
            )));
        }

        let mut key = vec![0u8; header.key_len as usize];
        let n = log.read_at(pos + HEADER_LEN as u64, &mut key)?;
        if n < key.len() {
            return Err(StoreError::CorruptLog(format!(
                "short key read at offset {}: got {} of {} bytes",
                pos,
                n,
                key.len()
            )));
        }

        match header.record_type {
            RECORD_PUT => {
                index.insert(&key, pos as i64)?;
            }
            RECORD_TOMBSTONE => {
                // A delete of an already-absent key during replay is not an
                // error: it just means an even later record already won.
                let _ = index.delete(&key);
            }
            other => {
                return Err(StoreError::CorruptLog(format!(
                    "unknown record_type {} at offset {}",
                    other, pos
                )))
            }
        }

        pos += header.val_len as u64 + HEADER_LEN as u64 + header.key_len as u64;
        records_seen += 1;
    }

    info!("replay applied {} record(s)", records_seen);
    Ok(index.len())
}
