//! Background crawler that counts buckets (storage index directories).
//!
//! One cycle visits every two-character prefix directory under the shares
//! directory, one prefix per unit of work, pausing between units. After a
//! cycle the crawler waits until the minimum cycle time has passed since the
//! cycle started.

use crate::config::CrawlerConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use storage_status::crawler::{BucketCounterState, CrawlerProgressState};
use storage_status::engine::BucketCounter;
use storage_status::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const BASE32_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz234567";

static PREFIXES: OnceLock<Vec<String>> = OnceLock::new();

/// Every possible share directory prefix, in sorted order
fn prefixes() -> &'static [String] {
    PREFIXES.get_or_init(|| {
        let mut all: Vec<String> = BASE32_ALPHABET
            .chars()
            .flat_map(|a| BASE32_ALPHABET.chars().map(move |b| format!("{a}{b}")))
            .collect();
        all.sort();
        all
    })
}

fn count_buckets(prefix_dir: &Path) -> usize {
    WalkDir::new(prefix_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .count()
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

#[derive(Debug)]
struct CrawlerInner {
    state: BucketCounterState,
    in_progress: bool,
    next_wake: Instant,
    cycle_started: Option<Instant>,
    prefixes_done: usize,
    running_count: u64,
    last_cycle_time: Option<Duration>,
}

pub struct BucketCountingCrawler {
    shares_dir: PathBuf,
    config: CrawlerConfig,
    inner: Mutex<CrawlerInner>,
}

impl BucketCountingCrawler {
    pub fn new(shares_dir: PathBuf, config: CrawlerConfig) -> Self {
        let next_wake = Instant::now() + config.slow_start();
        Self {
            shares_dir,
            config,
            inner: Mutex::new(CrawlerInner {
                state: BucketCounterState::default(),
                in_progress: false,
                next_wake,
                cycle_started: None,
                prefixes_done: 0,
                running_count: 0,
                last_cycle_time: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CrawlerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Crawl until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(shares_dir = %self.shares_dir.display(), "Bucket counter started");

        let slow_start = self.config.slow_start();
        self.lock().next_wake = Instant::now() + slow_start;
        if !sleep_or_cancel(slow_start, &cancel).await {
            return;
        }

        loop {
            let started = Instant::now();
            if !self.run_cycle(&cancel).await {
                break;
            }

            let wait = self.config.minimum_cycle_time().saturating_sub(started.elapsed());
            self.lock().next_wake = Instant::now() + wait;
            if !sleep_or_cancel(wait, &cancel).await {
                break;
            }
        }

        info!("Bucket counter stopped");
    }

    /// Run one full cycle. Returns false if cancelled part way through.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> bool {
        self.begin_cycle(Instant::now());
        let pause = self.config.prefix_pause();
        let all = prefixes();

        for (i, prefix) in all.iter().enumerate() {
            if cancel.is_cancelled() {
                return false;
            }

            let dir = self.shares_dir.join(prefix);
            let count = match tokio::task::spawn_blocking(move || count_buckets(&dir)).await {
                Ok(count) => count as u64,
                Err(e) => {
                    warn!(prefix = %prefix, error = %e, "Bucket count task failed");
                    0
                }
            };
            self.finish_prefix(prefix, count);

            if i + 1 < all.len() && !pause.is_zero() {
                self.lock().next_wake = Instant::now() + pause;
                if !sleep_or_cancel(pause, cancel).await {
                    return false;
                }
            }
        }

        self.finish_cycle(Instant::now());
        true
    }

    fn begin_cycle(&self, now: Instant) {
        let mut inner = self.lock();
        inner.in_progress = true;
        inner.cycle_started = Some(now);
        inner.next_wake = now;
        inner.prefixes_done = 0;
        inner.running_count = 0;
        inner.state.current_cycle = Some(inner.state.current_cycle.map_or(0, |c| c + 1));
        debug!(cycle = ?inner.state.current_cycle, "Bucket count cycle started");
    }

    fn finish_prefix(&self, prefix: &str, count: u64) {
        let mut inner = self.lock();
        inner.running_count += count;
        inner.prefixes_done += 1;
        inner.state.last_complete_prefix = Some(prefix.to_string());
    }

    fn finish_cycle(&self, now: Instant) {
        let mut inner = self.lock();
        let elapsed = inner
            .cycle_started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();

        inner.in_progress = false;
        inner.last_cycle_time = Some(elapsed);
        inner.state.last_complete_bucket_count = Some(inner.running_count);
        inner.state.last_cycle_finished = Some(chrono::Utc::now().timestamp().max(0) as u64);

        info!(
            buckets = inner.running_count,
            elapsed_secs = elapsed.as_secs(),
            "Bucket count cycle complete"
        );
    }

    /// Progress as seen at `now`
    pub fn progress_at(&self, now: Instant) -> CrawlerProgressState {
        let inner = self.lock();
        let remaining = inner.next_wake.saturating_duration_since(now).as_secs_f64();
        let estimated_time_per_cycle = inner.last_cycle_time.map(|d| d.as_secs_f64());

        if !inner.in_progress {
            return CrawlerProgressState {
                cycle_in_progress: false,
                remaining_wait_time: Some(remaining),
                estimated_time_per_cycle,
                ..Default::default()
            };
        }

        let fraction = inner.prefixes_done as f64 / prefixes().len() as f64;
        let elapsed = inner
            .cycle_started
            .map(|started| now.saturating_duration_since(started).as_secs_f64())
            .unwrap_or_default();
        let eta = (inner.prefixes_done > 0).then(|| elapsed / fraction - elapsed);

        CrawlerProgressState {
            cycle_in_progress: true,
            cycle_complete_percentage: Some(fraction * 100.0),
            remaining_sleep_time: Some(remaining),
            estimated_cycle_complete_time_left: eta,
            estimated_time_per_cycle,
            ..Default::default()
        }
    }
}

impl BucketCounter for BucketCountingCrawler {
    fn get_state(&self) -> Result<BucketCounterState> {
        Ok(self.lock().state.clone())
    }

    fn get_progress(&self) -> Result<CrawlerProgressState> {
        Ok(self.progress_at(Instant::now()))
    }
}
