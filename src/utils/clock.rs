use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

static LAST_NOW_MS: AtomicU64 = AtomicU64::new(1);

/// Wall clock in unix milliseconds. Never returns zero and never goes backwards within
/// the process, so `synced_at` / `expired_at` stamps stay ordered across clock steps.
pub fn now_ms() -> u64 {
    let sample = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64);
    normalize_now_ms(sample)
}

fn normalize_now_ms(sample_ms: Option<u64>) -> u64 {
    let mut prev = LAST_NOW_MS.load(Ordering::Relaxed);
    loop {
        let normalized = sample_ms.unwrap_or(prev).max(prev).max(1);
        match LAST_NOW_MS.compare_exchange_weak(prev, normalized, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return normalized,
            Err(actual) => prev = actual,
        }
    }
}

pub fn days_ago_ms(now_ms: u64, days: i64) -> u64 {
    let delta = (days.max(0) as u64).saturating_mul(super::constants::DAY_MS);
    now_ms.saturating_sub(delta)
}

fn to_datetime(ts_ms: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(ts_ms).ok()?)
}

pub fn format_date(ts_ms: u64) -> String {
    to_datetime(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn format_minute(ts_ms: u64) -> String {
    to_datetime(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
