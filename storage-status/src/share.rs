//! Byte-range reads of immutable shares.
//!
//! Only a single closed range of the form `bytes=<first>-<last>` is served.
//! There is no whole-share fetch: a request without a range is an error.

use crate::engine::StorageEngine;
use crate::si::StorageIndex;
use crate::utils::errors::{Result, StatusError};
use bytes::Bytes;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

static RANGE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn range_pattern() -> &'static Regex {
    RANGE_PATTERN.get_or_init(|| {
        Regex::new(r"^bytes=([0-9]+)-([0-9]+)$").expect("range pattern is valid")
    })
}

/// Inclusive byte span `first..=last` of a share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub first: u64,
    pub last: u64,
}

impl ByteRange {
    pub fn new(first: u64, last: u64) -> Result<Self> {
        if last < first {
            return Err(StatusError::Range(format!(
                "last byte {last} is before first byte {first}"
            )));
        }
        if last == u64::MAX {
            return Err(StatusError::Range("range end is too large".into()));
        }
        Ok(Self { first, last })
    }

    /// Number of bytes in the span, always at least one
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}", self.first, self.last)
    }
}

/// Parse a `Range` header value of the exact form `bytes=<first>-<last>`.
pub fn parse_range(value: &str) -> Result<ByteRange> {
    let captures = range_pattern()
        .captures(value)
        .ok_or_else(|| StatusError::Range(format!("unsupported range {value:?}")))?;

    let bound = |i: usize| -> Result<u64> {
        captures[i]
            .parse()
            .map_err(|_| StatusError::Range(format!("range bound {:?} is too large", &captures[i])))
    };

    ByteRange::new(bound(1)?, bound(2)?)
}

/// Like [`parse_range`], treating a missing header as an error.
pub fn require_range(value: Option<&str>) -> Result<ByteRange> {
    match value {
        Some(value) => parse_range(value),
        None => Err(StatusError::Range("a Range header is required".into())),
    }
}

/// A served span together with the range it answers
#[derive(Debug, Clone)]
pub struct ShareSlice {
    pub range: ByteRange,
    pub data: Bytes,
}

/// Serves byte spans of immutable shares from a storage engine
pub struct ShareReader<'a> {
    engine: &'a dyn StorageEngine,
}

impl<'a> ShareReader<'a> {
    pub fn new(engine: &'a dyn StorageEngine) -> Self {
        Self { engine }
    }

    /// Return exactly the bytes of `range`, or fail.
    pub fn serve(
        &self,
        storage_index: &StorageIndex,
        share_number: u32,
        range: ByteRange,
    ) -> Result<Bytes> {
        let length = range.len();
        let data = self
            .engine
            .get_immutable_share_data(storage_index, share_number, range.first, length)?;

        if data.len() as u64 != length {
            debug!(
                storage_index = %storage_index,
                share_number,
                requested = length,
                returned = data.len(),
                "Engine returned a short read"
            );
            return Err(StatusError::NotFound(format!(
                "{range} of share {storage_index}/{share_number}"
            )));
        }

        Ok(data)
    }

    /// Decode the index text, parse the range header, then serve.
    pub fn fetch(
        &self,
        storage_index: &str,
        share_number: u32,
        range_header: Option<&str>,
    ) -> Result<ShareSlice> {
        let storage_index: StorageIndex = storage_index.parse()?;
        let range = require_range(range_header)?;
        let data = self.serve(&storage_index, share_number, range)?;
        Ok(ShareSlice { range, data })
    }
}
