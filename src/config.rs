//! Configuration for CaskDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CaskError, Result};
use crate::record::HEADER_SIZE;

/// Default segment capacity: 1 GiB
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 1024 * 1024 * 1024;

/// Main configuration for a CaskDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── 1.data
    ///     ├── 2.data
    ///     └── ...
    pub data_dir: PathBuf,

    /// Segment capacity in bytes; a put that would cross it rolls to a new segment.
    /// Value offsets are stored as u32, so this may not exceed `u32::MAX`.
    pub max_segment_size: u64,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the active segment
    pub sync_strategy: SyncStrategy,
}

/// Segment sync strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (a put is durable when it returns)
    #[default]
    EveryWrite,

    /// fsync after N unsynced writes (group commit; up to N-1 acknowledged
    /// writes may be lost on power failure)
    EveryNWrites { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./caskdb_data"),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            sync_strategy: SyncStrategy::EveryWrite,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration can be used to open an engine
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_size <= HEADER_SIZE as u64 {
            return Err(CaskError::Config(format!(
                "max_segment_size must be larger than the {} byte record header, got {}",
                HEADER_SIZE, self.max_segment_size
            )));
        }

        if self.max_segment_size > u32::MAX as u64 {
            return Err(CaskError::Config(format!(
                "max_segment_size must fit in u32 offsets, got {}",
                self.max_segment_size
            )));
        }

        if let SyncStrategy::EveryNWrites { count: 0 } = self.sync_strategy {
            return Err(CaskError::Config(
                "EveryNWrites sync strategy needs a count of at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the segment capacity (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
