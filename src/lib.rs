//! # CaskDB
//!
//! A log-structured key-value store in the Bitcask style:
//! - Append-only segment files with CRC32-checked records
//! - Segment rotation at a fixed capacity
//! - Crash recovery that replays every segment and cuts torn tails
//! - An in-memory array skip-list index (key → latest value location)
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Engine                                │
//! │            (Single Writer / Multi Reader)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Segments   │          │    Index    │
//!   │  (Append)   │          │ (SkipList)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Record    │
//!   │   Codec     │
//!   └─────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! let engine = caskdb::open("./data").unwrap();
//! engine.put(b"k", b"v1").unwrap();
//! engine.put(b"k", b"v2").unwrap();
//! assert_eq!(engine.get(b"k").unwrap().unwrap().value, b"v2");
//! engine.delete(b"k").unwrap();
//! assert!(engine.get(b"k").unwrap().is_none());
//! engine.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod segment;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CaskError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, RecoveryResult};
pub use record::Record;

use std::path::Path;

/// Open or create a store at `path` with default settings
pub fn open(path: impl AsRef<Path>) -> Result<Engine> {
    Engine::open_path(path.as_ref())
}

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CaskDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
