//! Append-only sleep record log.
//!
//! # Responsibility
//! - Persist `SleepRecord` values as one JSON array under `sleepRecords`.
//!
//! # Invariants
//! - `read_all` returns records in append order.
//! - `read_all` never fails: absent, malformed or unreadable data reads empty,
//!   and a single unparseable entry is skipped without hiding the others.
//! - `append` adds one entry and writes every existing entry back verbatim,
//!   inside one immediate transaction.
//! - `append` refuses to overwrite a stored value that is not an array.

use crate::model::sleep_record::SleepRecord;
use crate::repo::kv_repo::{encode_entry, RepoResult, SqliteKvStore, SLEEP_RECORDS_KEY};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Durable storage for sleep sessions.
pub trait RecordStore {
    /// Appends one record after the existing ones.
    fn append(&self, record: &SleepRecord) -> RepoResult<()>;
    /// Reads every stored record, oldest first.
    fn read_all(&self) -> Vec<SleepRecord>;
    /// Drops the whole log.
    fn clear(&self) -> RepoResult<()>;
}

/// SQLite-backed record log.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        SqliteKvStore::try_new(conn)?;
        Ok(Self { conn })
    }

    fn kv(&self) -> SqliteKvStore<'conn> {
        SqliteKvStore::from_ready(self.conn)
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn append(&self, record: &SleepRecord) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let kv = SqliteKvStore::from_ready(&tx);

        let mut entries = kv.writable_entries(SLEEP_RECORDS_KEY)?;
        entries.push(encode_entry(SLEEP_RECORDS_KEY, record)?);
        kv.store_json(SLEEP_RECORDS_KEY, &entries)?;
        tx.commit()?;

        info!(
            "event=record_append module=repo status=ok date={} total={}",
            record.date,
            entries.len()
        );
        Ok(())
    }

    fn read_all(&self) -> Vec<SleepRecord> {
        match self.kv().load_entries::<SleepRecord>(SLEEP_RECORDS_KEY) {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "event=record_read module=repo status=error error_code=storage_unavailable error={err}"
                );
                Vec::new()
            }
        }
    }

    fn clear(&self) -> RepoResult<()> {
        self.kv().remove(SLEEP_RECORDS_KEY)?;
        Ok(())
    }
}
