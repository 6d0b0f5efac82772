//! Sunday-first calendar week projection.
//!
//! # Invariants
//! - Output always has exactly seven entries, Sunday first.
//! - Entries dated outside the week are ignored.

use crate::chart::series::DayValue;
use crate::model::sleep_record::SleepRecord;
use chrono::{Datelike, Days, NaiveDate};

pub const DAYS_PER_WEEK: usize = 7;

/// Short day labels in display order.
pub const WEEKDAY_LABELS: [&str; DAYS_PER_WEEK] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Returns the seven dates of the Sunday-first week containing `reference`.
pub fn week_dates(reference: NaiveDate) -> [NaiveDate; DAYS_PER_WEEK] {
    let offset = u64::from(reference.weekday().num_days_from_sunday());
    let sunday = reference
        .checked_sub_days(Days::new(offset))
        .unwrap_or(reference);
    let mut dates = [sunday; DAYS_PER_WEEK];
    for (index, date) in dates.iter_mut().enumerate() {
        *date = sunday
            .checked_add_days(Days::new(index as u64))
            .unwrap_or(sunday);
    }
    dates
}

/// Total seconds slept per day of the week containing `reference`.
pub fn week_duration_values(records: &[SleepRecord], reference: NaiveDate) -> Vec<DayValue> {
    let dates = week_dates(reference);
    let mut totals = [0u64; DAYS_PER_WEEK];
    for record in records {
        if let Some(index) = dates.iter().position(|date| *date == record.date) {
            totals[index] = totals[index].saturating_add(record.duration_secs);
        }
    }

    WEEKDAY_LABELS
        .iter()
        .zip(totals)
        .map(|(label, secs)| DayValue::new(*label, secs as f64))
        .collect()
}

/// Per-day mean of dated values (e.g. scores) for the week containing
/// `reference`. Days without entries get 0.
pub fn week_values<I>(points: I, reference: NaiveDate) -> Vec<DayValue>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let dates = week_dates(reference);
    let mut sums = [0.0f64; DAYS_PER_WEEK];
    let mut counts = [0u32; DAYS_PER_WEEK];
    for (date, value) in points {
        if let Some(index) = dates.iter().position(|day| *day == date) {
            sums[index] += value;
            counts[index] += 1;
        }
    }

    WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let mean = if counts[index] == 0 {
                0.0
            } else {
                sums[index] / f64::from(counts[index])
            };
            DayValue::new(*label, mean)
        })
        .collect()
}
