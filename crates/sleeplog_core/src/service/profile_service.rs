//! Profile reconciliation service.
//!
//! # Responsibility
//! - Resolve the current user from the durable slot or the app-state
//!   snapshot, healing the slot when only the snapshot has it.
//! - Merge partial updates and mirror them into the all-users collection.
//!
//! # Invariants
//! - The current-user slot is authoritative; a missing collection entry is
//!   logged and tolerated.
//! - Every successful update stamps `updated_at` and writes the same record
//!   to the slot and, when present, the collection entry.
//! - Read-merge-write is not transactional. Concurrent updates race and the
//!   last full record written wins; callers serialize edits.

use crate::model::profile::{AppStateSnapshot, ProfilePatch, UserProfile};
use crate::model::sleep_record::{SleepRecord, SleepStats};
use crate::repo::kv_repo::RepoError;
use crate::repo::profile_repo::ProfileRepository;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from profile use-cases.
#[derive(Debug)]
pub enum ProfileServiceError {
    /// Neither the durable slot nor the snapshot holds a user.
    NoActiveUser,
    /// The current-user slot could not be written.
    Storage(RepoError),
}

impl ProfileServiceError {
    /// Message suitable for showing to the person using the app.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoActiveUser => "No signed-in user was found. Please sign in again.",
            Self::Storage(_) => "Your profile could not be saved on this device.",
        }
    }
}

impl Display for ProfileServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveUser => write!(f, "no active user in current slot or app state"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProfileServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::NoActiveUser => None,
        }
    }
}

impl From<RepoError> for ProfileServiceError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Where the current user was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentUserSource {
    Slot,
    Snapshot,
}

impl CurrentUserSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Slot => "slot",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Profile service facade over a repository implementation.
pub struct ProfileService<R: ProfileRepository> {
    repo: R,
}

impl<R: ProfileRepository> ProfileService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Resolves the current user without writing anything.
    pub fn current_profile(
        &self,
        snapshot: Option<&AppStateSnapshot>,
    ) -> Option<(UserProfile, CurrentUserSource)> {
        if let Some(profile) = self.read_slot() {
            return Some((profile, CurrentUserSource::Slot));
        }
        snapshot
            .and_then(AppStateSnapshot::user)
            .map(|profile| (profile.clone(), CurrentUserSource::Snapshot))
    }

    /// Merges `patch` into the current user and returns the merged record.
    ///
    /// # Errors
    /// - `NoActiveUser` when neither source yields a user.
    /// - `Storage` when the current-user slot cannot be written.
    pub fn update_profile(
        &self,
        patch: &ProfilePatch,
        snapshot: Option<&AppStateSnapshot>,
    ) -> Result<UserProfile, ProfileServiceError> {
        self.update_profile_at(patch, snapshot, Utc::now())
    }

    /// `update_profile` with an explicit clock reading.
    pub fn update_profile_at(
        &self,
        patch: &ProfilePatch,
        snapshot: Option<&AppStateSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, ProfileServiceError> {
        let Some((resolved, source)) = self.current_profile(snapshot) else {
            warn!("event=profile_update module=service status=error error_code=no_active_user");
            return Err(ProfileServiceError::NoActiveUser);
        };

        if source == CurrentUserSource::Snapshot {
            self.repo.set_current(&resolved)?;
            info!("event=profile_slot_healed module=service status=ok source=snapshot");
        }

        let ignored = patch.reserved_extra_keys();
        if !ignored.is_empty() {
            warn!(
                "event=profile_update module=service status=partial ignored_keys={}",
                ignored.join(",")
            );
        }

        let merged = resolved.merged_with(patch, now);
        self.repo.set_current(&merged)?;
        self.sync_collection_entry(&resolved, &merged);

        info!(
            "event=profile_update module=service status=ok source={}",
            source.as_str()
        );
        Ok(merged)
    }

    /// Makes `profile` the current user and records it in the collection.
    pub fn adopt_user(&self, profile: &UserProfile) -> Result<(), ProfileServiceError> {
        self.repo.set_current(profile)?;
        self.repo.upsert_user(profile)?;
        info!("event=profile_adopt module=service status=ok");
        Ok(())
    }

    /// Empties the current-user slot. The collection keeps its entries.
    pub fn sign_out(&self) -> Result<(), ProfileServiceError> {
        self.repo.clear_current()?;
        info!("event=profile_sign_out module=service status=ok");
        Ok(())
    }

    /// Recomputes sleep stats from `records` and writes them to the profile.
    pub fn refresh_sleep_stats(
        &self,
        records: &[SleepRecord],
        snapshot: Option<&AppStateSnapshot>,
    ) -> Result<UserProfile, ProfileServiceError> {
        let stats = SleepStats::from_records(records);
        self.update_profile(&ProfilePatch::from_stats(&stats), snapshot)
    }

    fn read_slot(&self) -> Option<UserProfile> {
        match self.repo.get_current() {
            Ok(profile) => profile,
            Err(err) => {
                warn!(
                    "event=profile_read module=service status=error error_code=storage_unavailable error={err}"
                );
                None
            }
        }
    }

    fn sync_collection_entry(&self, resolved: &UserProfile, merged: &UserProfile) {
        match self.repo.replace_user(resolved, merged) {
            Ok(true) => {}
            Ok(false) => warn!(
                "event=profile_collection_inconsistent module=service status=partial reason=entry_missing"
            ),
            Err(err) => warn!(
                "event=profile_collection_inconsistent module=service status=error reason=write_failed error={err}"
            ),
        }
    }
}
