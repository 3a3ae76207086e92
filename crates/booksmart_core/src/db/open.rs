//! Connection bootstrap for the embedded store.
//!
//! # Invariants
//! - Returned connections wait on competing writers up to the busy timeout.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout applied by [`open_db`] and [`open_db_in_memory`].
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a store file with the default busy timeout.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Opens a store file, waiting up to `busy_timeout` on competing writers.
///
/// # Side effects
/// - Emits `db_open` events with duration and status.
pub fn open_db_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let opened = Connection::open(path)
        .map_err(DbError::from)
        .and_then(|mut conn| {
            bootstrap_connection(&mut conn, busy_timeout)?;
            Ok(conn)
        });
    report_open("file", started_at, opened)
}

/// Opens a private in-memory store; used by tests and smoke checks.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_in_memory_with_timeout(DEFAULT_BUSY_TIMEOUT)
}

/// In-memory variant of [`open_db_with_timeout`].
pub fn open_db_in_memory_with_timeout(busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let opened = Connection::open_in_memory()
        .map_err(DbError::from)
        .and_then(|mut conn| {
            bootstrap_connection(&mut conn, busy_timeout)?;
            Ok(conn)
        });
    report_open("memory", started_at, opened)
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn)?;
    Ok(())
}

fn report_open(
    mode: &str,
    started_at: Instant,
    opened: DbResult<Connection>,
) -> DbResult<Connection> {
    match &opened {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            mode,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    opened
}
