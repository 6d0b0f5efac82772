//! Chart data aggregation for the weekly sleep views.
//!
//! # Responsibility
//! - Normalize per-day values into renderable bar series.
//! - Project sleep records onto the Sunday-first calendar week.
//!
//! # Invariants
//! - Everything here is pure: no storage access, no logging.
//! - Bar order equals input order; nothing is sorted.

pub mod series;
pub mod week;
