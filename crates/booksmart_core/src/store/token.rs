//! Session token key-value store.
//!
//! # Responsibility
//! - Map opaque refresh tokens to string values with a time-to-live.
//!
//! # Invariants
//! - An expired key is indistinguishable from an absent one.
//! - A zero TTL stores the key without expiry.

use super::sqlite::guarded;
use super::StoreResult;
use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;

/// Key-value collaborator used for session tokens.
pub trait TokenStore {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, ctx: &Context, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Returns the live value under `key`, or `None` when absent/expired.
    fn get(&self, ctx: &Context, key: &str) -> StoreResult<Option<String>>;
}

/// Token store backed by the `kv_entries` table of the embedded store.
pub struct SqliteTokenStore<'conn, C: Clock = SystemClock> {
    conn: &'conn Connection,
    clock: C,
}

impl<'conn> SqliteTokenStore<'conn, SystemClock> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_clock(conn, SystemClock)
    }
}

impl<'conn, C: Clock> SqliteTokenStore<'conn, C> {
    pub fn with_clock(conn: &'conn Connection, clock: C) -> Self {
        Self { conn, clock }
    }

    /// Deletes every expired entry and returns how many were removed.
    pub fn purge_expired(&self, ctx: &Context) -> StoreResult<u64> {
        guarded(self.conn, ctx, || {
            let removed = self.conn.execute(
                "DELETE FROM kv_entries
                 WHERE expires_at IS NOT NULL
                   AND expires_at <= ?1;",
                [self.clock.now_millis()],
            )?;
            Ok(removed as u64)
        })
    }
}

impl<C: Clock> TokenStore for SqliteTokenStore<'_, C> {
    fn set(&self, ctx: &Context, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            Some(self.clock.now_millis().saturating_add(ttl_ms))
        };

        guarded(self.conn, ctx, || {
            self.conn.execute(
                "INSERT INTO kv_entries (key, value, expires_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    expires_at = excluded.expires_at;",
                params![key, value, expires_at],
            )?;
            Ok(())
        })
    }

    fn get(&self, ctx: &Context, key: &str) -> StoreResult<Option<String>> {
        guarded(self.conn, ctx, || {
            let entry = self
                .conn
                .query_row(
                    "SELECT value, expires_at FROM kv_entries WHERE key = ?1;",
                    [key],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?)),
                )
                .optional()?;

            match entry {
                Some((_, Some(expires_at))) if expires_at <= self.clock.now_millis() => {
                    self.conn
                        .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
                    Ok(None)
                }
                Some((value, _)) => Ok(Some(value)),
                None => Ok(None),
            }
        })
    }
}
