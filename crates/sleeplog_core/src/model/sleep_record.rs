//! Sleep session record and derived stats.
//!
//! # Invariants
//! - `date` is the UTC calendar day of `recorded_at` for recorder-built records.
//! - `duration_secs` is never negative (unsigned).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// One confirmed sleep session.
///
/// Serialized as `{ date, sleepTime, memo, timestamp }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepRecord {
    /// Calendar day the session is filed under (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Elapsed sleep in whole seconds.
    #[serde(rename = "sleepTime")]
    pub duration_secs: u64,
    /// Free-text note, possibly empty.
    #[serde(default)]
    pub memo: String,
    /// Moment the session was confirmed.
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
}

impl SleepRecord {
    /// Builds a record filed under the UTC day of `recorded_at`.
    pub fn new(duration_secs: u64, memo: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            date: recorded_at.date_naive(),
            duration_secs,
            memo: memo.into(),
            recorded_at,
        }
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_secs as f64 / SECONDS_PER_HOUR
    }
}

/// Aggregate figures written back onto the profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepStats {
    /// Mean hours slept per recorded day.
    pub average_sleep_hours: f64,
    /// Number of distinct days with at least one record.
    pub total_days: u32,
}

impl SleepStats {
    /// Derives stats from the full record log.
    ///
    /// Several records on one day count as one day; their durations add up.
    pub fn from_records(records: &[SleepRecord]) -> Self {
        let days: BTreeSet<NaiveDate> = records.iter().map(|record| record.date).collect();
        let total_days = u32::try_from(days.len()).unwrap_or(u32::MAX);
        if total_days == 0 {
            return Self {
                average_sleep_hours: 0.0,
                total_days: 0,
            };
        }

        let total_secs: u64 = records.iter().map(|record| record.duration_secs).sum();
        Self {
            average_sleep_hours: total_secs as f64 / SECONDS_PER_HOUR / f64::from(total_days),
            total_days,
        }
    }
}
