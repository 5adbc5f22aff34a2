//! Bucket-counting crawler progress and totals.
//!
//! The engine reports progress as a loose record of optional timings;
//! [`report`] turns it into a [`CrawlProgress`] so formatting never has to
//! check which fields are present.

use crate::abbreviate::abbreviate_time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Raw crawler progress as published by the engine. Times are seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerProgressState {
    #[serde(default)]
    pub cycle_in_progress: bool,
    #[serde(default)]
    pub cycle_complete_percentage: Option<f64>,
    #[serde(default)]
    pub remaining_sleep_time: Option<f64>,
    #[serde(default)]
    pub remaining_wait_time: Option<f64>,
    #[serde(default)]
    pub estimated_cycle_complete_time_left: Option<f64>,
    #[serde(default)]
    pub estimated_time_per_cycle: Option<f64>,
}

/// Persistent crawler state. Keys the crawler has not produced yet are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BucketCounterState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_complete_bucket_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_cycle: Option<u64>,
    /// Unix timestamp of the end of the last full cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cycle_finished: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_complete_prefix: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Where the crawler is right now
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlProgress {
    InCycle {
        /// 0-100
        percent: f64,
        next_work_in: Duration,
        eta: Option<Duration>,
        cycle_time: Option<Duration>,
    },
    Idle {
        next_cycle_in: Duration,
        cycle_time: Option<Duration>,
    },
}

fn seconds(value: Option<f64>) -> Option<Duration> {
    value.map(|s| {
        if s.is_nan() || s <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(s).unwrap_or(Duration::MAX)
        }
    })
}

/// Convert the engine's progress record into a [`CrawlProgress`].
pub fn report(progress: &CrawlerProgressState) -> CrawlProgress {
    let cycle_time = seconds(progress.estimated_time_per_cycle);

    if progress.cycle_in_progress {
        let percent = progress
            .cycle_complete_percentage
            .filter(|p| p.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);

        CrawlProgress::InCycle {
            percent,
            next_work_in: seconds(progress.remaining_sleep_time).unwrap_or_default(),
            eta: seconds(progress.estimated_cycle_complete_time_left),
            cycle_time,
        }
    } else {
        CrawlProgress::Idle {
            next_cycle_in: seconds(progress.remaining_wait_time).unwrap_or_default(),
            cycle_time,
        }
    }
}

/// Render progress as ordered display segments.
///
/// Segments for unknown estimates are left out entirely.
pub fn format(progress: &CrawlProgress) -> Vec<String> {
    let cycle_time_segment = |cycle_time: &Option<Duration>| {
        cycle_time.map(|t| format!(" (estimated cycle time {})", abbreviate_time(t)))
    };

    match progress {
        CrawlProgress::InCycle {
            percent,
            next_work_in,
            eta,
            cycle_time,
        } => {
            let mut lines = vec![format!("Current crawl {percent:.1}% complete")];
            if let Some(eta) = eta {
                lines.push(format!(" (ETA {}s)", eta.as_secs()));
            }
            lines.push(format!(" (next work in {})", abbreviate_time(*next_work_in)));
            lines.extend(cycle_time_segment(cycle_time));
            lines
        }
        CrawlProgress::Idle {
            next_cycle_in,
            cycle_time,
        } => {
            let mut lines = vec![format!("Next crawl in {}", abbreviate_time(*next_cycle_in))];
            lines.extend(cycle_time_segment(cycle_time));
            lines
        }
    }
}

/// Total buckets seen by the last full crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketCount {
    Counted(u64),
    NotComputed,
}

impl fmt::Display for BucketCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketCount::Counted(n) => write!(f, "{n}"),
            BucketCount::NotComputed => f.write_str("Not computed yet"),
        }
    }
}

pub fn last_complete_bucket_count(state: &BucketCounterState) -> BucketCount {
    state
        .last_complete_bucket_count
        .map_or(BucketCount::NotComputed, BucketCount::Counted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn progress(value: serde_json::Value) -> CrawlerProgressState {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_report_in_cycle() {
        let p = progress(json!({
            "cycle-in-progress": true,
            "cycle-complete-percentage": 42.25,
            "remaining-sleep-time": 30.0,
            "estimated-cycle-complete-time-left": 95.7,
            "estimated-time-per-cycle": null,
        }));
        assert_eq!(
            report(&p),
            CrawlProgress::InCycle {
                percent: 42.25,
                next_work_in: Duration::from_secs(30),
                eta: Some(Duration::from_secs_f64(95.7)),
                cycle_time: None,
            }
        );
    }

    #[test]
    fn test_report_idle() {
        let p = progress(json!({
            "cycle-in-progress": false,
            "remaining-wait-time": 3600.0,
            "estimated-time-per-cycle": 7200.0,
        }));
        assert_eq!(
            report(&p),
            CrawlProgress::Idle {
                next_cycle_in: Duration::from_secs(3600),
                cycle_time: Some(Duration::from_secs(7200)),
            }
        );
    }

    #[test]
    fn test_report_clamps_bad_values() {
        let p = progress(json!({
            "cycle-in-progress": true,
            "cycle-complete-percentage": 140.0,
            "remaining-sleep-time": -3.0,
        }));
        match report(&p) {
            CrawlProgress::InCycle {
                percent,
                next_work_in,
                eta,
                ..
            } => {
                assert_eq!(percent, 100.0);
                assert_eq!(next_work_in, Duration::ZERO);
                assert_eq!(eta, None);
            }
            other => panic!("expected in-cycle progress, got {other:?}"),
        }
    }

    #[test]
    fn test_report_saturates_huge_times() {
        let p = progress(json!({
            "cycle-in-progress": false,
            "remaining-wait-time": 10.0,
            "estimated-time-per-cycle": 1e30,
        }));
        let reported = report(&p);
        assert_eq!(
            reported,
            CrawlProgress::Idle {
                next_cycle_in: Duration::from_secs(10),
                cycle_time: Some(Duration::MAX),
            }
        );
        assert_eq!(format(&reported).len(), 2);
    }

    #[test]
    fn test_format_idle_without_cycle_time() {
        let lines = format(&CrawlProgress::Idle {
            next_cycle_in: Duration::from_secs(90),
            cycle_time: None,
        });
        assert_eq!(lines, vec!["Next crawl in 90 seconds".to_string()]);
    }

    #[test]
    fn test_format_idle_with_cycle_time() {
        let lines = format(&CrawlProgress::Idle {
            next_cycle_in: Duration::from_secs(90),
            cycle_time: Some(Duration::from_secs(4 * 3600)),
        });
        assert_eq!(
            lines,
            vec![
                "Next crawl in 90 seconds".to_string(),
                " (estimated cycle time 4 hours)".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_in_cycle_with_eta() {
        let lines = format(&CrawlProgress::InCycle {
            percent: 12.34,
            next_work_in: Duration::from_secs(5),
            eta: Some(Duration::from_secs_f64(300.9)),
            cycle_time: Some(Duration::from_secs(600)),
        });
        assert_eq!(
            lines,
            vec![
                "Current crawl 12.3% complete".to_string(),
                " (ETA 300s)".to_string(),
                " (next work in 5 seconds)".to_string(),
                " (estimated cycle time 10 minutes)".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_in_cycle_without_eta() {
        let lines = format(&CrawlProgress::InCycle {
            percent: 0.0,
            next_work_in: Duration::from_secs(1),
            eta: None,
            cycle_time: None,
        });
        assert_eq!(
            lines,
            vec![
                "Current crawl 0.0% complete".to_string(),
                " (next work in 1 second)".to_string(),
            ]
        );
        assert!(lines.iter().all(|l| !l.contains("ETA")));
    }

    #[test]
    fn test_bucket_count_not_computed() {
        let state: BucketCounterState = serde_json::from_value(json!({})).unwrap();
        let count = last_complete_bucket_count(&state);
        assert_eq!(count, BucketCount::NotComputed);
        assert_eq!(count.to_string(), "Not computed yet");
    }

    #[test]
    fn test_bucket_count_zero_is_a_count() {
        let state: BucketCounterState =
            serde_json::from_value(json!({ "last-complete-bucket-count": 0 })).unwrap();
        assert_eq!(last_complete_bucket_count(&state), BucketCount::Counted(0));
    }

    #[test]
    fn test_bucket_state_keeps_unknown_keys() {
        let state: BucketCounterState = serde_json::from_value(json!({
            "last-complete-bucket-count": 9,
            "version": 1,
        }))
        .unwrap();
        assert_eq!(state.extra.get("version"), Some(&json!(1)));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value, json!({ "last-complete-bucket-count": 9, "version": 1 }));
    }
}
