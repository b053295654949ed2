//! SQLite connection pool shared by the history store and the event log.

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Pool size and lock-wait settings, taken from `[database]` in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on another writer's lock before giving
    /// up with `SQLITE_BUSY`. Two sessions of one candidate finishing at the
    /// same moment serialize on this instead of failing.
    pub busy_timeout_ms: u64,
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("cannot open examiner database: {0}")]
    Open(#[from] r2d2::Error),
}

/// Opens (creating if needed) the database at `db_path`.
///
/// Every pooled connection runs in WAL mode so event-log reads do not block
/// result appends. With `:memory:` each connection gets its own private
/// database, so anything that shares data across connections needs a file.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let busy_timeout = Duration::from_millis(settings.busy_timeout_ms);
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| prepare_connection(conn, busy_timeout));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;
    tracing::debug!(path = db_path, max_size = settings.pool_max_size, "database pool ready");
    Ok(pool)
}

fn prepare_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if mode != "wal" && mode != "memory" {
        tracing::warn!(journal_mode = %mode, "database is not in WAL mode");
    }
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(busy_timeout)
}
