//! Record Codec
//!
//! Encodes and decodes the on-disk record format.
//!
//! ## Record Format
//! ```text
//! ┌───────────┬───────────┬───────────┬───────────┬───────────┬─────┬───────┐
//! │ CRC32 (4) │ Time (4)  │ KeyLen(4) │ ValLen(4) │ ValPos(4) │ Key │ Value │
//! └───────────┴───────────┴───────────┴───────────┴───────────┴─────┴───────┘
//! ```
//! All header fields are big-endian u32. The checksum covers `key || value`
//! only. `ValLen == 0` marks a tombstone. `ValPos` is the absolute offset of
//! the value bytes inside the segment file.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CaskError, Result};

/// Header size: 5 x u32 = 20 bytes
pub const HEADER_SIZE: usize = 20;

/// CRC32 (IEEE) over `key || value`
pub fn checksum(key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

/// Serialize `timestamp`, `key`, `value_position` and `value` into one record
pub fn encode(timestamp: u32, key: &[u8], value_position: u32, value: &[u8]) -> Bytes {
    let header = RecordHeader {
        checksum: checksum(key, value),
        timestamp,
        key_size: key.len() as u32,
        value_size: value.len() as u32,
        value_position,
    };
    encode_with_header(&header, key, value)
}

fn encode_with_header(header: &RecordHeader, key: &[u8], value: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + key.len() + value.len());
    header.encode_into(&mut buf);
    buf.put_slice(key);
    buf.put_slice(value);
    buf.freeze()
}

/// Fixed-size record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub checksum: u32,
    /// Unix seconds
    pub timestamp: u32,
    pub key_size: u32,
    pub value_size: u32,
    pub value_position: u32,
}

impl RecordHeader {
    /// Extract the header fields. No validation is performed.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut buf = &buf[..];
        Self {
            checksum: buf.get_u32(),
            timestamp: buf.get_u32(),
            key_size: buf.get_u32(),
            value_size: buf.get_u32(),
            value_position: buf.get_u32(),
        }
    }

    /// Total encoded length of the record this header describes
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.key_size as u64 + self.value_size as u64
    }

    pub fn is_tombstone(&self) -> bool {
        self.value_size == 0
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u32(self.checksum);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.key_size);
        buf.put_u32(self.value_size);
        buf.put_u32(self.value_position);
    }
}

/// A single key/value record as stored in a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub checksum: u32,
    pub timestamp: u32,
    pub value_position: u32,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    /// Build a record, computing its checksum
    pub fn new(timestamp: u32, key: Vec<u8>, value_position: u32, value: Vec<u8>) -> Self {
        Self {
            checksum: checksum(&key, &value),
            timestamp,
            value_position,
            key,
            value,
        }
    }

    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            checksum: self.checksum,
            timestamp: self.timestamp,
            key_size: self.key.len() as u32,
            value_size: self.value.len() as u32,
            value_position: self.value_position,
        }
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    /// Serialize to header + key + value
    pub fn encode(&self) -> Bytes {
        encode_with_header(&self.header(), &self.key, &self.value)
    }

    /// Deserialize a full record and verify its checksum
    ///
    /// Trailing bytes beyond the declared key and value are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header_bytes: &[u8; HEADER_SIZE] = buf
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                CaskError::Corrupted(format!(
                    "buffer of {} bytes is shorter than the {} byte header",
                    buf.len(),
                    HEADER_SIZE
                ))
            })?;
        let header = RecordHeader::decode(header_bytes);

        let key_end = HEADER_SIZE + header.key_size as usize;
        let value_end = key_end + header.value_size as usize;
        if buf.len() < value_end {
            return Err(CaskError::Corrupted(format!(
                "buffer of {} bytes is shorter than the declared record length {}",
                buf.len(),
                value_end
            )));
        }

        let key = buf[HEADER_SIZE..key_end].to_vec();
        let value = buf[key_end..value_end].to_vec();

        let actual = checksum(&key, &value);
        if actual != header.checksum {
            return Err(CaskError::Checksum {
                expected: header.checksum,
                actual,
            });
        }

        Ok(Self {
            checksum: header.checksum,
            timestamp: header.timestamp,
            value_position: header.value_position,
            key,
            value,
        })
    }
}
