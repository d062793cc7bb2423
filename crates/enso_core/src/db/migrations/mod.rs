//! Forward-only schema migrations.
//!
//! # Responsibility
//! - Track the schema version in `PRAGMA user_version` and apply each
//!   pending migration inside its own transaction.
//!
//! # Invariants
//! - Migrations are ordered, contiguous and never rewritten once shipped;
//!   new schema changes append a new entry.

use log::info;
use rusqlite::Connection;

use super::{DbError, DbResult};

struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_cache.sql"),
}];

/// Newest schema version this build understands.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Brings `conn` up to [`latest_version`], rejecting newer databases.
pub fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let db_version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest_supported = latest_version();

    if db_version > latest_supported {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > db_version) {
        conn.execute_batch("BEGIN")?;
        let applied = conn
            .execute_batch(migration.sql)
            .and_then(|_| conn.pragma_update(None, "user_version", migration.version));
        match applied {
            Ok(()) => conn.execute_batch("COMMIT")?,
            Err(err) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(err.into());
            }
        }
        info!(
            "event=db_migrate status=ok version={version}",
            version = migration.version
        );
    }

    Ok(())
}
