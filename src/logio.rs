//! Byte-exact positioned I/O over a single append-only log file.
//!
//! [`LogFile`] owns exactly one open file handle and knows nothing about
//! record layout -- it only seeks, reads, writes and flushes. The record
//! format lives in [`crate::store`].

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A single read/write file handle with byte-exact positioned I/O.
///
/// `LogFile` does not buffer internally: every [`LogFile::append_raw`] and
/// [`LogFile::read_at`] issues its own `seek`, so callers never need to
/// reason about a stale buffered position left over from a previous call.
pub struct LogFile {
    file: File,
}

impl LogFile {
    /// Opens `path` truncating it (creating it if absent) in read/write mode.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(LogFile { file })
    }

    /// Opens `path` in read/write mode without truncating. Fails if the path
    /// does not already exist.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LogFile { file })
    }

    /// Appends `buf` to the end of the log and flushes to the OS.
    pub fn append_raw(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        Ok(())
    }

    /// Reads up to `buf.len()` bytes starting at absolute `offset`.
    ///
    /// Returns the number of bytes actually read. Returns `0` on a clean
    /// EOF at `offset` (rather than an error). Leaves the file position
    /// undefined on return -- callers must not rely on it.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        read_fill(&mut self.file, buf)
    }

    /// Seeks the file position back to the start of the log.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Returns the current absolute append offset, i.e. the length of the
    /// log. Call this immediately before [`LogFile::append_raw`] so the
    /// offset recorded in the index matches the record about to be written.
    pub fn current_append_offset(&mut self) -> io::Result<u64> {
        self.file.seek(SeekFrom::End(0))
    }
}

/// Reads into `buf` until it is full or a clean EOF is hit, returning the
/// number of bytes actually placed into `buf`. Unlike [`Read::read_exact`],
/// a short read at EOF is not an error -- the caller (replay) distinguishes
/// "0 bytes" (clean EOF) from "some but not all" (truncated tail).
fn read_fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
