//! SQLite-backed [`KeyValueStore`].
//!
//! # Responsibility
//! - Persist cache entries in the `cache_entries` table of a connection
//!   opened through `crate::db`.
//!
//! # Invariants
//! - Construction fails fast when the schema is missing instead of
//!   erroring on first use.

use rusqlite::{Connection, OptionalExtension};

use super::store::{KeyValueStore, StoreError, StoreResult};

const CACHE_TABLE: &str = "cache_entries";

pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Wraps `conn`, verifying the cache table exists.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let present: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [CACHE_TABLE],
                |row| row.get(0),
            )
            .optional()?;
        if present.is_none() {
            return Err(StoreError::MissingTable(CACHE_TABLE));
        }
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO cache_entries (key, value, updated_at)
             VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            [key, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKeyValueStore;
    use crate::cache::store::{KeyValueStore, StoreError};
    use crate::db::open_db_in_memory;

    #[test]
    fn sqlite_store_round_trips_and_deletes() {
        let conn = open_db_in_memory().expect("db should open");
        let mut store = SqliteKeyValueStore::try_new(&conn).expect("schema should exist");

        assert_eq!(store.read("missing").expect("read should succeed"), None);

        store.write("k", "v1").expect("write should succeed");
        store.write("k", "v2").expect("overwrite should succeed");
        assert_eq!(
            store.read("k").expect("read should succeed"),
            Some("v2".to_string())
        );

        store.delete("k").expect("delete should succeed");
        assert_eq!(store.read("k").expect("read should succeed"), None);
    }

    #[test]
    fn missing_schema_is_rejected_at_construction() {
        let conn = rusqlite::Connection::open_in_memory().expect("raw db should open");
        let err = SqliteKeyValueStore::try_new(&conn).expect_err("must reject missing table");
        assert!(matches!(err, StoreError::MissingTable("cache_entries")));
    }
}
