//! String-keyed JSON store backed by the `kv_store` table.
//!
//! # Responsibility
//! - Provide get/put/remove of raw values plus typed JSON helpers.
//! - Own the shared `RepoError` type for repositories built on top.
//!
//! # Invariants
//! - `load_json` treats a value that fails to parse as absent.
//! - `put_raw` replaces the whole value stored under a key.
//! - Array helpers work entry by entry: one bad entry is skipped on read and
//!   kept verbatim on write, never dropped together with its neighbours.

use crate::db::DbError;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key of the current-user slot.
pub const CURRENT_USER_KEY: &str = "user";
/// Key of the all-users collection.
pub const ALL_USERS_KEY: &str = "users";
/// Key of the append-only sleep record log.
pub const SLEEP_RECORDS_KEY: &str = "sleepRecords";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for key-value backed persistence.
#[derive(Debug)]
pub enum RepoError {
    /// The durable medium could not be read or written.
    StorageUnavailable(DbError),
    /// A value could not be serialized before writing.
    Encode {
        key: String,
        source: serde_json::Error,
    },
    /// The stored value is not a JSON array; writing would destroy it.
    Corrupted { key: String },
    /// Connection was not migrated.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Encode { key, source } => {
                write!(f, "failed to encode value for key `{key}`: {source}")
            }
            Self::Corrupted { key } => {
                write!(f, "stored value for key `{key}` is not an array; refusing to overwrite")
            }
            Self::MissingRequiredTable(table) => write!(f, "missing required table: {table}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            Self::Encode { source, .. } => Some(source),
            Self::Corrupted { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::StorageUnavailable(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageUnavailable(DbError::Sqlite(value))
    }
}

/// Shape of the value stored under an array key.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredArray {
    Absent,
    Entries(Vec<Value>),
    /// Present but not a JSON array (or not JSON at all).
    Malformed,
}

/// SQLite-backed key-value store.
#[derive(Clone, Copy)]
pub struct SqliteKvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_kv_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by `try_new`.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn get_raw(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1;", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn put_raw(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    /// Removes a key. Returns whether a value was present.
    pub fn remove(&self, key: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }

    /// Loads and parses the value under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent or its value does not parse
    /// as `T`.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> RepoResult<Option<T>> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(
                    "event=kv_load module=repo status=error key={key} error_code=malformed_value error={err}"
                );
                Ok(None)
            }
        }
    }

    /// Loads the raw entries of an array value.
    pub fn load_array(&self, key: &str) -> RepoResult<StoredArray> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(StoredArray::Absent);
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => Ok(StoredArray::Entries(entries)),
            _ => Ok(StoredArray::Malformed),
        }
    }

    /// Parses every entry of an array value, skipping entries that do not
    /// parse as `T`. A missing or malformed array reads as empty.
    pub fn load_entries<T: DeserializeOwned>(&self, key: &str) -> RepoResult<Vec<T>> {
        let entries = match self.load_array(key)? {
            StoredArray::Absent => return Ok(Vec::new()),
            StoredArray::Malformed => {
                warn!(
                    "event=kv_load module=repo status=error key={key} error_code=malformed_value"
                );
                return Ok(Vec::new());
            }
            StoredArray::Entries(entries) => entries,
        };

        let mut parsed = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<T>(entry) {
                Ok(value) => parsed.push(value),
                Err(err) => warn!(
                    "event=kv_load module=repo status=partial key={key} index={index} error_code=malformed_entry error={err}"
                ),
            }
        }
        Ok(parsed)
    }

    /// Raw entries to be modified and written back.
    ///
    /// # Errors
    /// - `Corrupted` when the stored value is not an array, so callers never
    ///   replace data they could not read.
    pub fn writable_entries(&self, key: &str) -> RepoResult<Vec<Value>> {
        match self.load_array(key)? {
            StoredArray::Absent => Ok(Vec::new()),
            StoredArray::Entries(entries) => Ok(entries),
            StoredArray::Malformed => Err(RepoError::Corrupted {
                key: key.to_string(),
            }),
        }
    }

    pub fn store_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> RepoResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| RepoError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.put_raw(key, &raw)
    }
}

/// Serializes `value` into a JSON entry destined for `key`.
pub fn encode_entry<T: Serialize + ?Sized>(key: &str, value: &T) -> RepoResult<Value> {
    serde_json::to_value(value).map_err(|source| RepoError::Encode {
        key: key.to_string(),
        source,
    })
}

fn ensure_kv_connection_ready(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'kv_store'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("kv_store"));
    }
    Ok(())
}
