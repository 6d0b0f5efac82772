//! Core domain logic for SleepLog.
//! This crate owns sleep record persistence, profile reconciliation and
//! chart aggregation; front ends call into it and never touch storage keys.

pub mod chart;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use chart::series::{build_series, format_value, ChartBar, ChartSeries, DayValue, MetricKind};
pub use chart::week::{week_dates, week_duration_values, week_values, WEEKDAY_LABELS};
pub use config::{ChartConfig, ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::profile::{AppStateSnapshot, AuthState, ProfilePatch, UserProfile};
pub use model::sleep_record::{SleepRecord, SleepStats};
pub use repo::kv_repo::{RepoError, RepoResult, SqliteKvStore};
pub use repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
pub use repo::record_repo::{RecordStore, SqliteRecordStore};
pub use service::profile_service::{CurrentUserSource, ProfileService, ProfileServiceError};
pub use service::session_service::{parse_elapsed, SessionError, SessionRecorder, SleepTimer};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
