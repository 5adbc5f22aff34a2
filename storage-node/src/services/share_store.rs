//! Disk-backed storage engine.
//!
//! Shares live at `<shares_dir>/<prefix>/<storage index>/<share number>`.
//! An immutable share file is a 12-byte big-endian header (version, unused,
//! lease count), the share data, then one 72-byte record per lease.

use crate::services::bucket_counter::BucketCountingCrawler;
use bytes::Bytes;
use nix::sys::statvfs::statvfs;
use serde_json::json;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage_status::engine::{BucketCounter, StatsMap, StorageEngine};
use storage_status::{Result, StatusError, StorageIndex};
use tracing::warn;

const SHARE_VERSION: u32 = 1;
const HEADER_SIZE: u64 = 0x0c;
const LEASE_SIZE: u64 = 72;

#[derive(Debug, Clone, Copy)]
struct DiskStats {
    total: u64,
    used: u64,
    free_for_root: u64,
    free_for_nonroot: u64,
    avail: u64,
}

fn disk_stats(path: &Path, reserved_space: u64) -> nix::Result<DiskStats> {
    let vfs = statvfs(path)?;
    let fragment = vfs.fragment_size() as u64;
    let total = fragment.saturating_mul(vfs.blocks() as u64);
    let free_for_root = fragment.saturating_mul(vfs.blocks_free() as u64);
    let free_for_nonroot = fragment.saturating_mul(vfs.blocks_available() as u64);

    Ok(DiskStats {
        total,
        used: total.saturating_sub(free_for_root),
        free_for_root,
        free_for_nonroot,
        avail: free_for_nonroot.saturating_sub(reserved_space),
    })
}

fn invalid_share(path: &Path, msg: impl std::fmt::Display) -> StatusError {
    StatusError::Engine(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: {msg}", path.display()),
    ))
}

/// Read `length` bytes at `offset` of the data region of a share file.
fn read_share_range(path: &Path, offset: u64, length: u64) -> Result<Bytes> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StatusError::NotFound(format!("share {}", path.display())));
        }
        Err(e) => return Err(e.into()),
    };

    let file_size = file.metadata()?.len();
    let mut header = [0u8; HEADER_SIZE as usize];
    file.read_exact(&mut header)
        .map_err(|e| invalid_share(path, format!("short header: {e}")))?;

    let version = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if version != SHARE_VERSION {
        return Err(invalid_share(path, format!("unsupported share version {version}")));
    }
    let lease_count = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);

    let data_len = file_size
        .checked_sub(HEADER_SIZE + u64::from(lease_count) * LEASE_SIZE)
        .ok_or_else(|| invalid_share(path, format!("{lease_count} leases do not fit")))?;

    offset
        .checked_add(length)
        .filter(|end| *end <= data_len)
        .ok_or_else(|| {
            StatusError::NotFound(format!(
                "bytes {offset}+{length} of {} ({data_len} bytes of data)",
                path.display()
            ))
        })?;

    file.seek(SeekFrom::Start(HEADER_SIZE + offset))?;
    let mut buf = vec![0u8; length as usize];
    file.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

pub struct DiskEngine {
    base_dir: PathBuf,
    shares_dir: PathBuf,
    reserved_space: u64,
    bucket_counter: Arc<BucketCountingCrawler>,
}

impl DiskEngine {
    pub fn new(
        base_dir: PathBuf,
        reserved_space: u64,
        bucket_counter: Arc<BucketCountingCrawler>,
    ) -> Self {
        Self {
            shares_dir: base_dir.join("shares"),
            base_dir,
            reserved_space,
            bucket_counter,
        }
    }

    pub fn share_path(&self, storage_index: &StorageIndex, share_number: u32) -> PathBuf {
        self.shares_dir
            .join(storage_index.prefix())
            .join(storage_index.to_string())
            .join(share_number.to_string())
    }
}

impl StorageEngine for DiskEngine {
    fn get_stats(&self) -> Result<StatsMap> {
        let mut stats = StatsMap::new();
        stats.insert("storage_server.allocated".into(), json!(0));
        stats.insert("storage_server.reserved_space".into(), json!(self.reserved_space));

        match disk_stats(&self.base_dir, self.reserved_space) {
            Ok(disk) => {
                for (key, value) in [
                    ("disk_total", disk.total),
                    ("disk_used", disk.used),
                    ("disk_free_for_root", disk.free_for_root),
                    ("disk_free_for_nonroot", disk.free_for_nonroot),
                    ("disk_avail", disk.avail),
                ] {
                    stats.insert(format!("storage_server.{key}"), json!(value));
                }
                stats.insert(
                    "storage_server.accepting_immutable_shares".into(),
                    json!(disk.avail > 0),
                );
            }
            Err(e) => {
                warn!(base_dir = %self.base_dir.display(), error = %e, "Disk stats unavailable");
            }
        }

        Ok(stats)
    }

    fn get_immutable_share_data(
        &self,
        storage_index: &StorageIndex,
        share_number: u32,
        offset: u64,
        length: u64,
    ) -> Result<Bytes> {
        read_share_range(&self.share_path(storage_index, share_number), offset, length)
    }

    fn bucket_counter(&self) -> &dyn BucketCounter {
        self.bucket_counter.as_ref()
    }
}
