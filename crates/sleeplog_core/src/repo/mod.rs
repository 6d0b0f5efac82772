//! Repository layer over the durable key-value store.
//!
//! # Responsibility
//! - Map sleep records and profiles onto JSON values under fixed keys.
//! - Absorb malformed stored JSON into defaults at this boundary.
//!
//! # Invariants
//! - Unparseable stored values read as absent, never as errors.
//! - Storage transport failures surface as `RepoError::StorageUnavailable`.

pub mod kv_repo;
pub mod profile_repo;
pub mod record_repo;
