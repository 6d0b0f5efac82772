//! Sleep session capture.
//!
//! # Responsibility
//! - Time a sleep session and turn the elapsed duration plus memo into a
//!   `SleepRecord`.
//! - Hand the record to a `RecordStore`.
//!
//! # Invariants
//! - Storage failures are reported as `SessionError::StorageUnavailable` and
//!   are meant to be shown as a warning, not to abort the session flow.

use crate::model::sleep_record::SleepRecord;
use crate::repo::kv_repo::RepoError;
use crate::repo::record_repo::RecordStore;
use chrono::{DateTime, Utc};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Seconds per captured group: hours, minutes, seconds.
const ELAPSED_PART_SECS: [u64; 3] = [3600, 60, 1];

static UNIT_ELAPSED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?\s*(?:(\d+)\s*s)?$").expect("valid unit regex")
});
static CLOCK_ELAPSED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):([0-5]\d)(?::([0-5]\d))?$").expect("valid clock regex")
});

/// Errors from session capture.
#[derive(Debug)]
pub enum SessionError {
    /// `finish` was called on a timer that was never started.
    TimerNotRunning,
    /// The record could not be persisted.
    StorageUnavailable(RepoError),
}

impl SessionError {
    /// Warning text for the person using the app.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TimerNotRunning => "Start the sleep timer before confirming wake-up.",
            Self::StorageUnavailable(_) => {
                "This sleep session could not be saved on this device. Storage may be full or disabled."
            }
        }
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimerNotRunning => write!(f, "sleep timer is not running"),
            Self::StorageUnavailable(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            Self::TimerNotRunning => None,
        }
    }
}

/// Stopwatch for one night of sleep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SleepTimer {
    started_at: Option<DateTime<Utc>>,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the timer at `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Whole seconds since start; 0 if the clock went backwards.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        self.started_at
            .map(|started_at| u64::try_from((now - started_at).num_seconds()).unwrap_or(0))
    }

    /// Stops the timer and returns the elapsed seconds.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let elapsed = self.elapsed_secs(now);
        self.started_at = None;
        elapsed
    }
}

/// Parses a manually entered sleep duration.
///
/// Accepts plain seconds (`27000`), unit form (`7h 30m`, `45m`, `8h`) and
/// clock form (`7:30`, `7:30:15`).
pub fn parse_elapsed(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Some(secs);
    }

    if let Some(caps) = CLOCK_ELAPSED_RE.captures(trimmed) {
        return sum_parts(&caps);
    }
    let lowered = trimmed.to_ascii_lowercase();
    let caps = UNIT_ELAPSED_RE.captures(&lowered)?;
    sum_parts(&caps)
}

fn sum_parts(caps: &Captures<'_>) -> Option<u64> {
    let mut total = 0u64;
    let mut matched_any = false;
    for (index, factor) in ELAPSED_PART_SECS.iter().enumerate() {
        if let Some(part) = caps.get(index + 1) {
            let value = part.as_str().parse::<u64>().ok()?;
            total = total.checked_add(value.checked_mul(*factor)?)?;
            matched_any = true;
        }
    }
    matched_any.then_some(total)
}

/// Builds sleep records and hands them to a record store.
pub struct SessionRecorder<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> SessionRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records one confirmed session of `duration_secs`.
    ///
    /// The record is filed under the UTC calendar day of `now`.
    pub fn record(
        &self,
        duration_secs: u64,
        memo: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<SleepRecord, SessionError> {
        let record = SleepRecord::new(duration_secs, memo, now);
        match self.store.append(&record) {
            Ok(()) => {
                info!(
                    "event=session_record module=service status=ok date={} duration_secs={}",
                    record.date, record.duration_secs
                );
                Ok(record)
            }
            Err(err) => {
                warn!(
                    "event=session_record module=service status=error error_code=storage_unavailable error={err}"
                );
                Err(SessionError::StorageUnavailable(err))
            }
        }
    }

    /// Stops `timer` at `now` and records the elapsed time.
    pub fn finish(
        &self,
        timer: &mut SleepTimer,
        memo: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<SleepRecord, SessionError> {
        let elapsed = timer.stop(now).ok_or(SessionError::TimerNotRunning)?;
        self.record(elapsed, memo, now)
    }
}
