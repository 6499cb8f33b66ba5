//! Segment Replay
//!
//! Sequential record reader used only during recovery.
//!
//! A record that fails its checksum, or that runs past the end of the file,
//! is treated as a write torn by a crash: the file is truncated at the
//! offset where that record began and replay of the segment stops there.
//! Corruption is never reported past this point.

use tracing::debug;

use crate::error::{CaskError, Result};
use crate::record::{Record, RecordHeader, HEADER_SIZE};

use super::file::read_exact_at;
use super::SegmentFile;

impl SegmentFile {
    /// Start replaying the segment from its first record
    pub fn replay(&mut self) -> SegmentReplay<'_> {
        self.replay_offset = 0;
        self.truncated_at = None;
        SegmentReplay {
            segment: self,
            done: false,
        }
    }

    /// Read the record at the replay cursor
    ///
    /// Returns:
    /// - `Ok(Some(record))`: a verified record; `value_position` is its
    ///   physical value offset
    /// - `Ok(None)`: end of segment (possibly after truncating a torn tail)
    /// - `Err(_)`: an I/O error
    pub fn replay_next(&mut self) -> Result<Option<Record>> {
        let start = self.replay_offset;
        let end = self.write_offset;

        if start >= end {
            return Ok(None);
        }

        // Not even a full header left
        if end - start < HEADER_SIZE as u64 {
            self.truncate(start)?;
            return Ok(None);
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        read_exact_at(&self.file, &mut header_buf, start)?;
        let header = RecordHeader::decode(&header_buf);

        // Declared sizes run past end of file
        let record_len = header.record_len();
        if record_len > end - start {
            self.truncate(start)?;
            return Ok(None);
        }

        let mut buf = vec![0u8; record_len as usize];
        read_exact_at(&self.file, &mut buf, start)?;

        match Record::decode(&buf) {
            Ok(mut record) => {
                let value_position = start + HEADER_SIZE as u64 + header.key_size as u64;
                record.value_position = u32::try_from(value_position).map_err(|_| {
                    CaskError::Corrupted(format!(
                        "segment {} holds a value at offset {} beyond u32 range",
                        self.id, value_position
                    ))
                })?;
                self.replay_offset = start + record_len;
                Ok(Some(record))
            }
            Err(CaskError::Checksum { expected, actual }) => {
                debug!(segment = self.id, offset = start, expected, actual, "checksum mismatch during replay");
                self.truncate(start)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Iterator over the verified records of one segment, in append order
///
/// Yields at most one error, after which it is exhausted.
pub struct SegmentReplay<'a> {
    segment: &'a mut SegmentFile,
    done: bool,
}

impl<'a> SegmentReplay<'a> {
    /// Offset the replay truncated the segment at, if it did
    pub fn truncated_at(&self) -> Option<u64> {
        self.segment.truncated_at
    }
}

impl<'a> Iterator for SegmentReplay<'a> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.segment.replay_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
