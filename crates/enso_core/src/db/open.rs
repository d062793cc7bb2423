//! Connection bootstrap.
//!
//! # Responsibility
//! - Open file-backed or in-memory connections, apply pragmas, and bring
//!   the schema up to date before handing the connection out.

use log::{error, info};
use rusqlite::Connection;
use std::path::Path;

use super::migrations::apply_migrations;
use super::DbResult;

/// Opens (creating if needed) the cache database at `path`.
pub fn open_db(path: &Path) -> DbResult<Connection> {
    bootstrap(Connection::open(path), &path.display().to_string())
}

/// Opens a throwaway in-memory database with the same schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap(Connection::open_in_memory(), ":memory:")
}

fn bootstrap(opened: rusqlite::Result<Connection>, target: &str) -> DbResult<Connection> {
    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=db_open status=error target={target} error={err}");
            return Err(err.into());
        }
    };

    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;

    apply_migrations(&conn)?;

    info!("event=db_open status=ok target={target}");
    Ok(conn)
}
