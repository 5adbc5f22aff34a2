//! Interface to the storage engine that owns shares, disk accounting and
//! the bucket-counting crawler.
//!
//! Every method may block on disk I/O. Async callers should run them on a
//! blocking thread and must not hold locks across the call.

pub mod memory;

use crate::crawler::{BucketCounterState, CrawlerProgressState};
use crate::si::StorageIndex;
use crate::utils::errors::Result;
use bytes::Bytes;
use std::collections::BTreeMap;

pub use memory::MemoryEngine;

/// Flat, namespaced counters as reported by the engine
pub type StatsMap = BTreeMap<String, serde_json::Value>;

pub trait StorageEngine: Send + Sync {
    /// Counters from every subsystem, keyed like `storage_server.disk_total`
    fn get_stats(&self) -> Result<StatsMap>;

    /// Read `length` bytes at `offset` of an immutable share.
    ///
    /// Fails with `StatusError::NotFound` when the share is missing or the
    /// span runs past the end of its data.
    fn get_immutable_share_data(
        &self,
        storage_index: &StorageIndex,
        share_number: u32,
        offset: u64,
        length: u64,
    ) -> Result<Bytes>;

    fn bucket_counter(&self) -> &dyn BucketCounter;
}

/// Read-only view of the background bucket-counting crawler
pub trait BucketCounter: Send + Sync {
    fn get_state(&self) -> Result<BucketCounterState>;

    fn get_progress(&self) -> Result<CrawlerProgressState>;
}
