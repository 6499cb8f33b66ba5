//! Engine Module
//!
//! The storage engine that coordinates segments and the index.
//!
//! ## Responsibilities
//! - Own every segment file and the ordered index
//! - Append puts to the active segment, rotating when it fills up
//! - Resolve gets through the index to a positional segment read
//! - Rebuild the index on startup by replaying all segments

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::error::{CaskError, Result};
use crate::index::{ArraySkipList, IndexEntry};
use crate::record::{Record, HEADER_SIZE};
use crate::segment::{list_segment_ids, SegmentFile};

/// Id of the segment created in an empty directory
pub const FIRST_SEGMENT_ID: u32 = 1;

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/sync): exclusive `state` write lock
///   - One append and one index mutation at a time
///
/// - **Reads** (get/scan): shared `state` read lock
///   - Segment reads are positional, so readers never share a file cursor
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Segments, active segment id and index
    state: RwLock<EngineState>,

    /// What startup replay found
    recovery: RecoveryResult,
}

struct EngineState {
    /// Open segments keyed by id
    segments: BTreeMap<u32, SegmentFile>,

    /// Id of the writable segment (always the highest id)
    active_id: u32,

    /// key → location of latest value
    index: ArraySkipList,
}

impl EngineState {
    fn active_mut(&mut self) -> Result<&mut SegmentFile> {
        let id = self.active_id;
        self.segments.get_mut(&id).ok_or(CaskError::SegmentNotFound(id))
    }

    /// Read the value an index entry points at
    fn load(&self, entry: &IndexEntry) -> Result<Record> {
        let segment = self
            .segments
            .get(&entry.segment_id)
            .ok_or(CaskError::SegmentNotFound(entry.segment_id))?;
        let value = segment.read(entry.value_position, entry.value_size)?;
        Ok(Record::new(
            entry.timestamp,
            entry.key.clone(),
            entry.value_position,
            value,
        ))
    }
}

/// Result of replaying the segments at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of segments replayed
    pub segments_replayed: usize,

    /// Number of verified records applied to the index
    pub records_replayed: u64,

    /// How many of those were tombstones
    pub tombstones_replayed: u64,

    /// (segment id, offset) of every torn tail that was cut off
    pub truncated_segments: Vec<(u32, u64)>,

    /// Keys live in the index after replay
    pub live_keys: usize,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Discover segments (create segment 1 if there are none)
    /// 3. Replay every segment in ascending id order into the index
    /// 4. Make the highest segment the active one
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Discover and open segments
        let mut ids = list_segment_ids(&config.data_dir)?;
        if ids.is_empty() {
            ids.push(FIRST_SEGMENT_ID);
        }
        let active_id = ids.last().copied().unwrap_or(FIRST_SEGMENT_ID);

        let mut segments = BTreeMap::new();
        for id in ids {
            let segment = SegmentFile::open(&config.data_dir, id, config.sync_strategy)?;
            segments.insert(id, segment);
        }

        // Step 3: Rebuild the index
        let mut index = ArraySkipList::new();
        let recovery = Self::recover(&mut segments, &mut index)?;

        info!(
            data_dir = %config.data_dir.display(),
            segments = recovery.segments_replayed,
            records = recovery.records_replayed,
            tombstones = recovery.tombstones_replayed,
            truncated = recovery.truncated_segments.len(),
            live_keys = recovery.live_keys,
            active_segment = active_id,
            "engine opened"
        );

        Ok(Self {
            config,
            state: RwLock::new(EngineState {
                segments,
                active_id,
                index,
            }),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Replay every segment in ascending id order; later records win
    fn recover(
        segments: &mut BTreeMap<u32, SegmentFile>,
        index: &mut ArraySkipList,
    ) -> Result<RecoveryResult> {
        let mut result = RecoveryResult::default();

        for (&id, segment) in segments.iter_mut() {
            let mut replay = segment.replay();
            let mut records = 0u64;

            for record in replay.by_ref() {
                let record = record?;
                records += 1;
                if record.is_tombstone() {
                    result.tombstones_replayed += 1;
                }

                index.upsert(IndexEntry::new(
                    record.key,
                    id,
                    record.timestamp,
                    record.value.len() as u32,
                    record.value_position,
                ));
            }

            if let Some(offset) = replay.truncated_at() {
                result.truncated_segments.push((id, offset));
            }

            debug!(segment = id, records, "replayed segment");
            result.records_replayed += records;
            result.segments_replayed += 1;
        }

        result.live_keys = index.len();
        Ok(result)
    }

    /// Get the latest record for a key
    ///
    /// Returns `Ok(None)` for keys that were never written or were deleted.
    /// The value bytes are read as-is; checksums are only verified on replay.
    pub fn get(&self, key: &[u8]) -> Result<Option<Record>> {
        let state = self.state.read();

        let entry = match state.index.get(key) {
            Some(entry) => entry,
            None => {
                trace!(key_len = key.len(), "get miss");
                return Ok(None);
            }
        };

        state.load(entry).map(Some)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Rotate to a new segment if this record would overflow the active one
    /// 3. Append the record (synced per the configured strategy)
    /// 4. Upsert the index; an empty value removes the key
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let record_len = HEADER_SIZE as u64 + key.len() as u64 + value.len() as u64;
        let limit = self.config.max_segment_size;
        if record_len > limit {
            return Err(CaskError::RecordTooLarge {
                size: record_len,
                limit,
            });
        }

        let mut guard = self.state.write();
        let state = &mut *guard;

        // Step 2: Rotate if the active segment would overflow
        let active = state.active_mut()?;
        if !active.is_empty() && active.write_offset() + record_len > limit {
            self.rotate(state)?;
        }

        // Step 3: Append
        let segment_id = state.active_id;
        let header = state.active_mut()?.append(unix_timestamp(), key, value)?;

        // Step 4: Index
        let outcome = state.index.upsert(IndexEntry::new(
            key.to_vec(),
            segment_id,
            header.timestamp,
            header.value_size,
            header.value_position,
        ));

        trace!(
            segment = segment_id,
            position = header.value_position,
            value_size = header.value_size,
            ?outcome,
            "put"
        );

        Ok(())
    }

    /// Delete a key by writing a tombstone (a put with an empty value)
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.put(key, b"")
    }

    /// Records for live keys with `start <= key <= end`, ascending
    pub fn scan(&self, start: &[u8], end: &[u8]) -> Result<Vec<Record>> {
        let state = self.state.read();
        state
            .index
            .range(start, end)
            .map(|entry| state.load(entry))
            .collect()
    }

    /// Records for live keys with `key >= start`, ascending
    pub fn scan_from(&self, start: &[u8]) -> Result<Vec<Record>> {
        let state = self.state.read();
        state
            .index
            .range_from(start)
            .map(|entry| state.load(entry))
            .collect()
    }

    /// All live keys, ascending
    pub fn keys(&self) -> Vec<Vec<u8>> {
        let state = self.state.read();
        state.index.iter().map(|entry| entry.key.clone()).collect()
    }

    /// Force the active segment to disk
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.write();
        state.active_mut()?.sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs and closes every segment file
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner();
        let segments = state.segments.len();

        for (_, segment) in state.segments {
            segment.close()?;
        }

        info!(segments, "engine closed");
        Ok(())
    }

    /// Start a new segment with the next id and make it active
    fn rotate(&self, state: &mut EngineState) -> Result<()> {
        let previous = state.active_id;
        let next_id = previous
            .checked_add(1)
            .ok_or(CaskError::SegmentIdsExhausted(previous))?;

        // Anything left unsynced under group commit goes down with the old segment
        state.active_mut()?.sync()?;

        let segment = SegmentFile::open(&self.config.data_dir, next_id, self.config.sync_strategy)?;
        state.segments.insert(next_id, segment);
        state.active_id = next_id;

        debug!(from = previous, to = next_id, "rotated active segment");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the number of open segments
    pub fn segment_count(&self) -> usize {
        self.state.read().segments.len()
    }

    /// Ids of all open segments, ascending
    pub fn segment_ids(&self) -> Vec<u32> {
        self.state.read().segments.keys().copied().collect()
    }

    /// Id of the segment currently receiving writes
    pub fn active_segment_id(&self) -> u32 {
        self.state.read().active_id
    }

    /// What the startup replay found
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Seconds since the Unix epoch, saturating into u32
fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
