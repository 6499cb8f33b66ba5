//! Error types for CaskDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CaskError
pub type Result<T> = std::result::Result<T, CaskError>;

/// Unified error type for CaskDB operations
#[derive(Debug, Error)]
pub enum CaskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    /// Stored checksum does not match the checksum of `key || value`.
    ///
    /// Only raised by `Record::decode`; segment replay turns it into a
    /// truncation of the torn tail.
    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("Record corrupted: {0}")]
    Corrupted(String),

    #[error("Record of {size} bytes exceeds segment limit of {limit} bytes")]
    RecordTooLarge { size: u64, limit: u64 },

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("Segment {0} not found")]
    SegmentNotFound(u32),

    /// Rotation past the highest representable segment id
    #[error("No segment id left after {0}")]
    SegmentIdsExhausted(u32),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
