//! Status page assembly.
//!
//! A status request first resolves which representation it wants, then
//! hands off to exactly one renderer for that representation.

use crate::abbreviate::abbreviate_space;
use crate::crawler::{self, BucketCount, CrawlProgress};
use crate::engine::StorageEngine;
use crate::stats::{self, Metric, StatsSnapshot};
use crate::utils::errors::Result;
use serde_json::json;

/// Representation requested for a status response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFormat {
    #[default]
    Html,
    Json,
}

impl StatusFormat {
    /// Resolve from the `t` query argument. Only `t=json` selects JSON.
    pub fn from_query(t: Option<&str>) -> Self {
        match t {
            Some("json") => StatusFormat::Json,
            _ => StatusFormat::Html,
        }
    }
}

/// Everything the human status view shows, read once per request
#[derive(Debug, Clone)]
pub struct StatusView {
    pub stats: StatsSnapshot,
    pub bucket_count: BucketCount,
    pub progress: CrawlProgress,
}

impl StatusView {
    pub fn collect(engine: &dyn StorageEngine) -> Result<Self> {
        let counter = engine.bucket_counter();
        Ok(Self {
            stats: stats::summarize(&engine.get_stats()?),
            bucket_count: crawler::last_complete_bucket_count(&counter.get_state()?),
            progress: crawler::report(&counter.get_progress()?),
        })
    }
}

/// Produce the response body for `format`.
pub fn render(engine: &dyn StorageEngine, format: StatusFormat) -> Result<String> {
    match format {
        StatusFormat::Html => Ok(render_html(&StatusView::collect(engine)?)),
        StatusFormat::Json => render_json(engine),
    }
}

/// Machine-readable status: merged stats plus the raw crawler state.
pub fn render_json(engine: &dyn StorageEngine) -> Result<String> {
    let document = json!({
        "stats": stats::raw_stats(engine)?,
        "bucket-counter": engine.bucket_counter().get_state()?,
    });
    Ok(serde_json::to_string_pretty(&document)? + "\n")
}

fn space(metric: Metric) -> String {
    match metric {
        Metric::Known(bytes) => format!("{} ({bytes})", abbreviate_space(bytes)),
        Metric::Unknown => "?".to_string(),
    }
}

fn label(field: &str) -> &'static str {
    match field {
        "disk_total" => "Total disk space",
        "disk_used" => "Disk space used",
        "disk_free_for_root" => "Disk space free (root)",
        "disk_free_for_nonroot" => "Disk space free (non-root)",
        "reserved_space" => "Reserved space",
        "disk_avail" => "Space available to storage",
        _ => "Other",
    }
}

/// Human-readable status document.
pub fn render_html(view: &StatusView) -> String {
    let accepting = match view.stats.accepting_immutable_shares {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "?",
    };

    let rows: String = view
        .stats
        .disk_fields()
        .into_iter()
        .map(|(field, metric)| {
            format!(
                "      <tr><td>{}:</td><td class=\"{field}\">{}</td></tr>\n",
                label(field),
                space(metric)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Storage Server Status</title>
  </head>
  <body>
    <h1>Storage Server Status</h1>
    <table class="storage-stats">
{rows}    </table>
    <ul>
      <li>Accepting new shares: {accepting}</li>
      <li>Total buckets: {count} (the number of files and directories for which this server holds shares)</li>
      <li>Crawler: {crawl}</li>
    </ul>
    <p>Page rendered at {rendered}</p>
  </body>
</html>
"#,
        count = view.bucket_count,
        crawl = crawler::format(&view.progress).concat(),
        rendered = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
