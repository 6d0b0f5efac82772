//! Current-user slot and all-users collection.
//!
//! # Responsibility
//! - Read/write the `user` slot and the `users` collection through one
//!   key-value engine.
//! - Provide identity lookups into the collection.
//!
//! # Invariants
//! - Malformed slot data reads as no user; unparseable collection entries
//!   are skipped on read.
//! - Collection writes touch only the matched entry; every other entry,
//!   parseable or not, is written back verbatim.
//! - Collection entries are matched with `UserProfile::same_identity` on
//!   their identity fields.

use crate::model::profile::UserProfile;
use crate::repo::kv_repo::{
    encode_entry, RepoResult, SqliteKvStore, ALL_USERS_KEY, CURRENT_USER_KEY,
};
use rusqlite::Connection;
use serde_json::Value;

/// Profile persistence contract.
pub trait ProfileRepository {
    /// Returns the record in the current-user slot.
    fn get_current(&self) -> RepoResult<Option<UserProfile>>;
    /// Overwrites the current-user slot.
    fn set_current(&self, profile: &UserProfile) -> RepoResult<()>;
    /// Empties the current-user slot.
    fn clear_current(&self) -> RepoResult<()>;
    /// Returns every profile in the all-users collection.
    fn list_users(&self) -> RepoResult<Vec<UserProfile>>;
    /// Overwrites the whole all-users collection.
    fn save_users(&self, users: &[UserProfile]) -> RepoResult<()>;

    /// Finds the collection entry with the same identity as `target`.
    fn find_by_identity(&self, target: &UserProfile) -> RepoResult<Option<UserProfile>> {
        Ok(self
            .list_users()?
            .into_iter()
            .find(|user| user.same_identity(target)))
    }

    /// Replaces the entry matching `target` with `replacement`.
    ///
    /// Returns `false` and leaves the collection untouched when no entry
    /// matches.
    fn replace_user(&self, target: &UserProfile, replacement: &UserProfile) -> RepoResult<bool>;

    /// Replaces the matching entry or appends `profile`.
    fn upsert_user(&self, profile: &UserProfile) -> RepoResult<()>;
}

/// SQLite-backed profile repository.
pub struct SqliteProfileRepository<'conn> {
    kv: SqliteKvStore<'conn>,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            kv: SqliteKvStore::try_new(conn)?,
        })
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn get_current(&self) -> RepoResult<Option<UserProfile>> {
        self.kv.load_json(CURRENT_USER_KEY)
    }

    fn set_current(&self, profile: &UserProfile) -> RepoResult<()> {
        self.kv.store_json(CURRENT_USER_KEY, profile)
    }

    fn clear_current(&self) -> RepoResult<()> {
        self.kv.remove(CURRENT_USER_KEY)?;
        Ok(())
    }

    fn list_users(&self) -> RepoResult<Vec<UserProfile>> {
        self.kv.load_entries(ALL_USERS_KEY)
    }

    fn save_users(&self, users: &[UserProfile]) -> RepoResult<()> {
        self.kv.store_json(ALL_USERS_KEY, users)
    }

    fn replace_user(&self, target: &UserProfile, replacement: &UserProfile) -> RepoResult<bool> {
        let mut entries = self.kv.writable_entries(ALL_USERS_KEY)?;
        let Some(index) = position_of(&entries, target) else {
            return Ok(false);
        };
        entries[index] = encode_entry(ALL_USERS_KEY, replacement)?;
        self.kv.store_json(ALL_USERS_KEY, &entries)?;
        Ok(true)
    }

    fn upsert_user(&self, profile: &UserProfile) -> RepoResult<()> {
        let mut entries = self.kv.writable_entries(ALL_USERS_KEY)?;
        let encoded = encode_entry(ALL_USERS_KEY, profile)?;
        match position_of(&entries, profile) {
            Some(index) => entries[index] = encoded,
            None => entries.push(encoded),
        }
        self.kv.store_json(ALL_USERS_KEY, &entries)
    }
}

fn position_of(entries: &[Value], target: &UserProfile) -> Option<usize> {
    entries.iter().position(|entry| {
        UserProfile::identity_of(entry).is_some_and(|stored| stored.same_identity(target))
    })
}
