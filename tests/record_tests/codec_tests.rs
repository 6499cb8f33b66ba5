//! Tests for the Record Codec
//!
//! These tests verify:
//! - Round-trip encoding for regular records and tombstones
//! - Big-endian header layout
//! - CRC32 corruption detection
//! - Edge cases (truncation, empty buffers, large values)

use caskdb::record::{self, checksum, Record, RecordHeader, HEADER_SIZE};
use caskdb::CaskError;
use proptest::prelude::*;

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_encode_decode_roundtrip() {
    let record = Record::new(1_700_000_000, b"hello".to_vec(), 25, b"world".to_vec());

    let bytes = record.encode();
    let decoded = Record::decode(&bytes).unwrap();

    assert_eq!(decoded, record);
    assert_eq!(decoded.timestamp, 1_700_000_000);
    assert_eq!(decoded.value_position, 25);
}

#[test]
fn test_free_encode_matches_record_encode() {
    let record = Record::new(7, b"k".to_vec(), 21, b"v".to_vec());

    let bytes = record::encode(7, b"k", 21, b"v");

    assert_eq!(bytes, record.encode());
}

#[test]
fn test_encode_decode_tombstone() {
    let record = Record::new(5, b"deleted".to_vec(), 27, Vec::new());

    let decoded = Record::decode(&record.encode()).unwrap();

    assert!(decoded.is_tombstone());
    assert!(decoded.header().is_tombstone());
    assert_eq!(decoded.key, b"deleted");
}

#[test]
fn test_encode_decode_empty_key() {
    let record = Record::new(5, Vec::new(), 20, b"value".to_vec());

    let decoded = Record::decode(&record.encode()).unwrap();

    assert_eq!(decoded, record);
}

#[test]
fn test_large_value() {
    let large_value = vec![0xAB; 1024 * 1024]; // 1 MB value
    let record = Record::new(1, b"big_key".to_vec(), 27, large_value.clone());

    let decoded = Record::decode(&record.encode()).unwrap();

    assert_eq!(decoded.key, b"big_key");
    assert_eq!(decoded.value, large_value);
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_header_layout_is_big_endian() {
    let bytes = record::encode(0x0102_0304, b"ab", 0x0A0B_0C0D, b"xyz");

    assert_eq!(bytes.len(), HEADER_SIZE + 2 + 3);
    assert_eq!(&bytes[0..4], &checksum(b"ab", b"xyz").to_be_bytes());
    assert_eq!(&bytes[4..8], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&bytes[8..12], &[0, 0, 0, 2]);
    assert_eq!(&bytes[12..16], &[0, 0, 0, 3]);
    assert_eq!(&bytes[16..20], &[0x0A, 0x0B, 0x0C, 0x0D]);
    assert_eq!(&bytes[20..22], b"ab");
    assert_eq!(&bytes[22..], b"xyz");
}

#[test]
fn test_decode_header_extracts_fields() {
    let bytes = record::encode(99, b"key", 123, b"value");
    let header_bytes: [u8; HEADER_SIZE] = bytes[..HEADER_SIZE].try_into().unwrap();

    let header = RecordHeader::decode(&header_bytes);

    assert_eq!(
        header,
        RecordHeader {
            checksum: checksum(b"key", b"value"),
            timestamp: 99,
            key_size: 3,
            value_size: 5,
            value_position: 123,
        }
    );
    assert_eq!(header.record_len(), bytes.len() as u64);
}

#[test]
fn test_decode_header_does_not_validate() {
    let header = RecordHeader::decode(&[0xFF; HEADER_SIZE]);

    assert_eq!(header.key_size, u32::MAX);
    assert_eq!(header.value_size, u32::MAX);
}

#[test]
fn test_checksum_covers_key_and_value() {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(b"keyvalue");
    assert_eq!(checksum(b"key", b"value"), hasher.finalize());
}

// =============================================================================
// CRC Corruption Detection Tests
// =============================================================================

#[test]
fn test_value_corruption_detected() {
    let record = Record::new(1, b"key".to_vec(), 23, b"value".to_vec());
    let mut bytes = record.encode().to_vec();

    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    let result = Record::decode(&bytes);
    assert!(matches!(result, Err(CaskError::Checksum { .. })));
}

#[test]
fn test_key_corruption_detected() {
    let record = Record::new(1, b"key".to_vec(), 23, b"value".to_vec());
    let mut bytes = record.encode().to_vec();

    bytes[HEADER_SIZE] ^= 0x01;

    let result = Record::decode(&bytes);
    assert!(matches!(result, Err(CaskError::Checksum { .. })));
}

#[test]
fn test_checksum_field_corruption_detected() {
    let record = Record::new(1, b"key".to_vec(), 23, b"value".to_vec());
    let mut bytes = record.encode().to_vec();

    bytes[0] ^= 0xFF;

    let result = Record::decode(&bytes);
    assert!(matches!(result, Err(CaskError::Checksum { .. })));
}

#[test]
fn test_size_field_corruption_detected() {
    let record = Record::new(1, b"key".to_vec(), 23, b"value".to_vec());

    for offset in 8..16 {
        let mut bytes = record.encode().to_vec();
        bytes[offset] ^= 0xFF;

        assert!(
            Record::decode(&bytes).is_err(),
            "flip at header offset {} went unnoticed",
            offset
        );
    }
}

// =============================================================================
// Edge Case Tests
// =============================================================================

#[test]
fn test_truncated_record() {
    let record = Record::new(1, b"key".to_vec(), 23, b"value".to_vec());
    let bytes = record.encode();

    let result = Record::decode(&bytes[..HEADER_SIZE + 2]);

    assert!(matches!(result, Err(CaskError::Corrupted(_))));
}

#[test]
fn test_header_too_small() {
    let bytes = [0u8; 10];

    let result = Record::decode(&bytes);

    assert!(matches!(result, Err(CaskError::Corrupted(_))));
}

#[test]
fn test_empty_buffer() {
    let result = Record::decode(&[]);

    assert!(result.is_err());
}

#[test]
fn test_trailing_bytes_ignored() {
    let record = Record::new(3, b"k".to_vec(), 21, b"v".to_vec());
    let mut bytes = record.encode().to_vec();
    bytes.extend_from_slice(b"next record");

    let decoded = Record::decode(&bytes).unwrap();

    assert_eq!(decoded, record);
}

#[test]
fn test_encoded_len_matches() {
    let record = Record::new(1, b"test_key".to_vec(), 28, b"test_value".to_vec());

    assert_eq!(record.encode().len(), record.encoded_len());
    assert_eq!(record.header().record_len(), record.encoded_len() as u64);
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_roundtrip(
        timestamp in any::<u32>(),
        key in prop::collection::vec(any::<u8>(), 0..64),
        value in prop::collection::vec(any::<u8>(), 0..256),
        value_position in any::<u32>(),
    ) {
        let bytes = record::encode(timestamp, &key, value_position, &value);
        let decoded = Record::decode(&bytes).unwrap();

        prop_assert_eq!(decoded.timestamp, timestamp);
        prop_assert_eq!(decoded.value_position, value_position);
        prop_assert_eq!(decoded.key, key);
        prop_assert_eq!(decoded.value, value);
    }

    #[test]
    fn prop_payload_byte_flip_detected(
        key in prop::collection::vec(any::<u8>(), 1..32),
        value in prop::collection::vec(any::<u8>(), 1..128),
        flip in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let mut bytes = record::encode(1, &key, 0, &value).to_vec();
        let covered = HEADER_SIZE..bytes.len();
        let at = covered.start + flip.index(covered.len());
        bytes[at] ^= mask;

        let is_checksum_error = matches!(Record::decode(&bytes), Err(CaskError::Checksum { .. }));
        prop_assert!(is_checksum_error);
    }
}
