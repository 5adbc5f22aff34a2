//! In-process storage engine.
//!
//! Holds shares and crawler state in memory. Used by tests and by callers
//! that embed the status surface without a disk store.

use super::{BucketCounter, StatsMap, StorageEngine};
use crate::crawler::{BucketCounterState, CrawlerProgressState};
use crate::si::StorageIndex;
use crate::utils::errors::{Result, StatusError};
use bytes::Bytes;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryBucketCounter {
    state: BucketCounterState,
    progress: CrawlerProgressState,
    failing: bool,
}

impl BucketCounter for MemoryBucketCounter {
    fn get_state(&self) -> Result<BucketCounterState> {
        if self.failing {
            return Err(engine_failure());
        }
        Ok(self.state.clone())
    }

    fn get_progress(&self) -> Result<CrawlerProgressState> {
        if self.failing {
            return Err(engine_failure());
        }
        Ok(self.progress.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    stats: StatsMap,
    shares: HashMap<(StorageIndex, u32), Bytes>,
    bucket_counter: MemoryBucketCounter,
    failing: bool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stat(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.stats.insert(key.into(), value.into());
        self
    }

    pub fn with_share(
        mut self,
        storage_index: StorageIndex,
        share_number: u32,
        data: impl Into<Bytes>,
    ) -> Self {
        self.shares.insert((storage_index, share_number), data.into());
        self
    }

    pub fn with_bucket_state(mut self, state: BucketCounterState) -> Self {
        self.bucket_counter.state = state;
        self
    }

    pub fn with_progress(mut self, progress: CrawlerProgressState) -> Self {
        self.bucket_counter.progress = progress;
        self
    }

    /// Make every engine call fail with an I/O error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self.bucket_counter.failing = true;
        self
    }
}

impl StorageEngine for MemoryEngine {
    fn get_stats(&self) -> Result<StatsMap> {
        if self.failing {
            return Err(engine_failure());
        }
        Ok(self.stats.clone())
    }

    fn get_immutable_share_data(
        &self,
        storage_index: &StorageIndex,
        share_number: u32,
        offset: u64,
        length: u64,
    ) -> Result<Bytes> {
        if self.failing {
            return Err(engine_failure());
        }

        let data = self
            .shares
            .get(&(*storage_index, share_number))
            .ok_or_else(|| StatusError::NotFound(format!("share {storage_index}/{share_number}")))?;

        let end = offset
            .checked_add(length)
            .filter(|end| *end <= data.len() as u64)
            .ok_or_else(|| {
                StatusError::NotFound(format!(
                    "bytes {offset}+{length} of share {storage_index}/{share_number} ({} bytes)",
                    data.len()
                ))
            })?;

        Ok(data.slice(offset as usize..end as usize))
    }

    fn bucket_counter(&self) -> &dyn BucketCounter {
        &self.bucket_counter
    }
}

fn engine_failure() -> StatusError {
    StatusError::Engine(std::io::Error::other("storage engine unavailable"))
}
