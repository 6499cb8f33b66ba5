//! Segment File
//!
//! Append-only file wrapper: appends records, serves positional reads.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SyncStrategy;
use crate::error::{CaskError, Result};
use crate::record::{self, RecordHeader, HEADER_SIZE};

use super::segment_path;

/// One append-only segment of the record log
///
/// The file is opened in append mode, so writes always land at the end of
/// the file while reads are positional and never move a shared cursor.
/// `write_offset` mirrors the file length and is what value positions are
/// computed from.
#[derive(Debug)]
pub struct SegmentFile {
    pub(super) id: u32,
    pub(super) path: PathBuf,
    pub(super) file: File,
    /// Bytes from the start of the file; only grows, except when replay
    /// cuts a torn tail
    pub(super) write_offset: u64,
    /// Start of the next record to replay
    pub(super) replay_offset: u64,
    /// Set when the last replay truncated the file
    pub(super) truncated_at: Option<u64>,
    sync_strategy: SyncStrategy,
    unsynced_writes: usize,
    /// Makes the next `sync` fail
    #[cfg(test)]
    fail_next_sync: bool,
}

impl SegmentFile {
    /// Open or create segment `id` inside `dir`
    pub fn open(dir: &Path, id: u32, sync_strategy: SyncStrategy) -> Result<Self> {
        let path = segment_path(dir, id);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let write_offset = file.metadata()?.len();
        debug!(segment = id, path = %path.display(), size = write_offset, "opened segment");

        Ok(Self {
            id,
            path,
            file,
            write_offset,
            replay_offset: 0,
            truncated_at: None,
            sync_strategy,
            unsynced_writes: 0,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Append a record for `key`/`value` stamped with `timestamp`
    ///
    /// The value position is `write_offset + HEADER_SIZE + key.len()`.
    /// Returns the header that was written; `header.record_len()` is the
    /// number of bytes appended.
    pub fn append(&mut self, timestamp: u32, key: &[u8], value: &[u8]) -> Result<RecordHeader> {
        let start = self.write_offset;
        let value_position = start + HEADER_SIZE as u64 + key.len() as u64;
        let record_len = HEADER_SIZE as u64 + key.len() as u64 + value.len() as u64;

        let value_position = u32::try_from(value_position).map_err(|_| CaskError::RecordTooLarge {
            size: start + record_len,
            limit: u32::MAX as u64,
        })?;

        let bytes = record::encode(timestamp, key, value_position, value);
        if let Err(e) = self.file.write_all(&bytes) {
            self.discard_from(start);
            return Err(CaskError::Io(e));
        }

        self.write_offset += record_len;
        self.unsynced_writes += 1;

        let should_sync = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNWrites { count } => self.unsynced_writes >= count,
        };
        if should_sync {
            // A record the caller saw fail must not come back on replay
            if let Err(e) = self.sync() {
                self.discard_from(start);
                self.unsynced_writes = self.unsynced_writes.saturating_sub(1);
                return Err(e);
            }
        }

        Ok(RecordHeader {
            checksum: record::checksum(key, value),
            timestamp,
            key_size: key.len() as u32,
            value_size: value.len() as u32,
            value_position,
        })
    }

    /// Read `len` bytes at `offset` without touching any cursor
    pub fn read(&self, offset: u32, len: u32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        read_exact_at(&self.file, &mut buf, offset as u64)?;
        Ok(buf)
    }

    /// Force buffered writes to disk
    pub fn sync(&mut self) -> Result<()> {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(CaskError::Io(io::Error::new(io::ErrorKind::Other, "injected sync failure")));
        }

        self.file.flush()?;
        self.file.sync_all()?;
        self.unsynced_writes = 0;
        Ok(())
    }

    /// Drop a record that started at `start` so the next append begins on a
    /// record boundary
    fn discard_from(&mut self, start: u64) {
        if let Err(e) = self.file.set_len(start) {
            warn!(segment = self.id, offset = start, error = %e, "failed to discard partial write");
        }
        self.write_offset = start;
    }

    /// Cut the file at `offset`, discarding everything after it
    pub(super) fn truncate(&mut self, offset: u64) -> Result<()> {
        warn!(
            segment = self.id,
            offset,
            discarded = self.write_offset.saturating_sub(offset),
            "truncating torn segment tail"
        );
        self.file.set_len(offset)?;
        self.file.sync_all()?;
        self.write_offset = offset;
        self.truncated_at = Some(offset);
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()?;
        debug!(segment = self.id, size = self.write_offset, "closed segment");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current write cursor, equal to the file length
    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    pub fn len(&self) -> u64 {
        self.write_offset
    }

    pub fn is_empty(&self) -> bool {
        self.write_offset == 0
    }

    /// Offset the last replay truncated the file at, if it did
    pub fn truncated_at(&self) -> Option<u64> {
        self.truncated_at
    }
}

/// Positional read that fills `buf` entirely
#[cfg(unix)]
pub(super) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

/// Positional read that fills `buf` entirely
#[cfg(windows)]
pub(super) fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
