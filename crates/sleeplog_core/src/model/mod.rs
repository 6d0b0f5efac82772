//! Domain model for sleep sessions and user profiles.
//!
//! # Responsibility
//! - Define the persisted shapes stored under the durable keys.
//! - Keep JSON field naming compatible with the client's stored data.
//!
//! # Invariants
//! - `SleepRecord` values are immutable once appended.
//! - A profile's identity key is `id` when present, otherwise `email`.

pub mod profile;
pub mod sleep_record;
