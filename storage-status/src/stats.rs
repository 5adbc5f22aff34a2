//! Disk and usage statistics for the status view.

use crate::engine::{StatsMap, StorageEngine};
use crate::utils::errors::Result;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace of the storage server's own counters in the engine stats
pub const STORAGE_SERVER_PREFIX: &str = "storage_server.";

/// Namespace given to bucket-counter state in [`raw_stats`]
pub const BUCKET_COUNTER_PREFIX: &str = "bucket_counter.";

/// A counter that the engine may or may not have reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Known(u64),
    Unknown,
}

impl Metric {
    fn from_value(value: Option<&serde_json::Value>) -> Self {
        let Some(value) = value else {
            return Metric::Unknown;
        };
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .map_or(Metric::Unknown, Metric::Known)
    }

    pub fn known(&self) -> Option<u64> {
        match self {
            Metric::Known(v) => Some(*v),
            Metric::Unknown => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Known(v) => write!(f, "{v}"),
            Metric::Unknown => f.write_str("?"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Metric::Known(v) => serializer.serialize_u64(*v),
            Metric::Unknown => serializer.serialize_none(),
        }
    }
}

/// Storage server statistics with the namespace stripped.
///
/// The six disk fields are always present; a field the engine did not report
/// is [`Metric::Unknown`], never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub disk_total: Metric,
    pub disk_used: Metric,
    pub disk_free_for_root: Metric,
    pub disk_free_for_nonroot: Metric,
    pub reserved_space: Metric,
    pub disk_avail: Metric,
    pub accepting_immutable_shares: Option<bool>,
    /// Remaining storage server counters, keyed without the prefix
    pub other: BTreeMap<String, serde_json::Value>,
}

impl StatsSnapshot {
    /// Canonical disk fields in display order
    pub fn disk_fields(&self) -> [(&'static str, Metric); 6] {
        [
            ("disk_total", self.disk_total),
            ("disk_used", self.disk_used),
            ("disk_free_for_root", self.disk_free_for_root),
            ("disk_free_for_nonroot", self.disk_free_for_nonroot),
            ("reserved_space", self.reserved_space),
            ("disk_avail", self.disk_avail),
        ]
    }
}

/// Reshape raw engine counters into a [`StatsSnapshot`].
///
/// Keys outside the storage server namespace belong to other subsystems and
/// are dropped.
pub fn summarize(raw: &StatsMap) -> StatsSnapshot {
    let mut stripped: BTreeMap<String, serde_json::Value> = raw
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(STORAGE_SERVER_PREFIX)
                .map(|name| (name.to_string(), v.clone()))
        })
        .collect();

    let mut take = |name: &str| Metric::from_value(stripped.remove(name).as_ref());

    let disk_total = take("disk_total");
    let disk_used = take("disk_used");
    let disk_free_for_root = take("disk_free_for_root");
    let disk_free_for_nonroot = take("disk_free_for_nonroot");
    let reserved_space = take("reserved_space");
    let disk_avail = take("disk_avail");

    let accepting_immutable_shares = stripped
        .remove("accepting_immutable_shares")
        .and_then(|v| v.as_bool());

    StatsSnapshot {
        disk_total,
        disk_used,
        disk_free_for_root,
        disk_free_for_nonroot,
        reserved_space,
        disk_avail,
        accepting_immutable_shares,
        other: stripped,
    }
}

/// Engine counters merged with the bucket-counter state for machine export.
pub fn raw_stats(engine: &dyn StorageEngine) -> Result<StatsMap> {
    let mut stats = engine.get_stats()?;
    let state = serde_json::to_value(engine.bucket_counter().get_state()?)?;

    if let serde_json::Value::Object(entries) = state {
        for (key, value) in entries {
            stats.insert(format!("{BUCKET_COUNTER_PREFIX}{key}"), value);
        }
    }

    Ok(stats)
}
