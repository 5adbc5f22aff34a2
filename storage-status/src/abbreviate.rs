//! Compact human-readable durations and sizes for status views.

use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const MONTH: u64 = 31 * DAY;
const YEAR: u64 = 365 * DAY;

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Format a duration using the largest unit that keeps the count readable
pub fn abbreviate_time(duration: Duration) -> String {
    let s = duration.as_secs();
    if s < 2 * MINUTE {
        plural(s, "second")
    } else if s < 3 * HOUR {
        plural(s / MINUTE, "minute")
    } else if s < 2 * DAY {
        plural(s / HOUR, "hour")
    } else if s < 2 * MONTH {
        plural(s / DAY, "day")
    } else if s < 4 * YEAR {
        plural(s / MONTH, "month")
    } else {
        plural(s / YEAR, "year")
    }
}

/// Format a byte count with SI units. Values up to 1023 stay in bytes.
pub fn abbreviate_space(bytes: u64) -> String {
    const UNITS: &[&str] = &["kB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64 / 1000.0;
    let mut unit_index = 0;
    while size >= 1000.0 && unit_index < UNITS.len() - 1 {
        size /= 1000.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
