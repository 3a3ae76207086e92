//! Embedded document store backed by one migrated SQLite connection.
//!
//! # Responsibility
//! - Persist BSON documents per collection in the `documents` table.
//! - Evaluate filters in-process over the collection scan.
//! - Abort scans and in-flight statements when the caller context is done.
//!
//! # Invariants
//! - `(collection, _id)` is unique.
//! - Default order is insertion order (`seq ASC`).
//! - The connection must be at the latest schema version.

use super::filter::{Filter, Matcher, SetPatch};
use super::{DocumentCollection, FindOptions, StoreError, StoreResult};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::db::migrations::latest_version;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

/// SQLite virtual machine steps between two context checks.
const PROGRESS_STEPS: i32 = 1_000;

const REQUIRED_TABLES: [&str; 3] = ["documents", "collections", "kv_entries"];

/// Embedded document store client.
///
/// Owns the identifier codec handed to every collection handle it creates.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
    codec: IdCodec,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a migrated connection and registers `codec` for all collections.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the schema is incomplete.
    pub fn try_new(conn: &'conn Connection, codec: IdCodec) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn, codec })
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    /// Returns a handle on `name`; the collection is registered on first insert.
    pub fn collection(&self, name: &str) -> SqliteCollection<'conn> {
        SqliteCollection {
            conn: self.conn,
            name: name.to_string(),
            codec: self.codec,
        }
    }

    /// Lists registered collection names in alphabetical order.
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM collections ORDER BY name ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

/// Handle on one collection of a [`SqliteDocumentStore`].
pub struct SqliteCollection<'conn> {
    conn: &'conn Connection,
    name: String,
    codec: IdCodec,
}

impl SqliteCollection<'_> {
    /// Visits matches in insertion order until `visit` returns `false`.
    ///
    /// An exact `_id` filter reads through the `(collection, id_key)` index.
    fn scan(
        &self,
        ctx: &Context,
        filter: &Filter,
        matcher: &Matcher,
        mut visit: impl FnMut(i64, Document) -> StoreResult<bool>,
    ) -> StoreResult<()> {
        let key = indexed_id_key(filter)?;
        let sql = if key.is_some() {
            "SELECT seq, body
             FROM documents
             WHERE collection = ?1 AND id_key = ?2;"
        } else {
            "SELECT seq, body
             FROM documents
             WHERE collection = ?1
             ORDER BY seq ASC;"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match &key {
            Some(key) => stmt.query(params![self.name, key])?,
            None => stmt.query([self.name.as_str()])?,
        };

        while let Some(row) = rows.next()? {
            ctx.check()?;
            let seq: i64 = row.get(0)?;
            let body: Vec<u8> = row.get(1)?;
            let doc = Document::from_reader(body.as_slice())?;
            if matcher.matches(&doc) && !visit(seq, doc)? {
                break;
            }
        }

        Ok(())
    }

    fn collect(
        &self,
        ctx: &Context,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<(i64, Document)>> {
        let matcher = filter.compile()?;
        let mut skipped = 0_u64;
        let mut found = Vec::new();

        self.scan(ctx, filter, &matcher, |seq, doc| {
            if skipped < options.skip {
                skipped += 1;
                return Ok(true);
            }
            found.push((seq, doc));
            Ok(options
                .limit
                .map_or(true, |limit| (found.len() as u64) < limit))
        })?;

        Ok(found)
    }

    fn rewrite(&self, ctx: &Context, seq: i64, doc: &Document) -> StoreResult<()> {
        ctx.check()?;
        self.conn.execute(
            "UPDATE documents SET body = ?1 WHERE seq = ?2;",
            params![encode_body(doc)?, seq],
        )?;
        Ok(())
    }

    fn update(
        &self,
        ctx: &Context,
        filter: &Filter,
        patch: &SetPatch,
        limit: Option<u64>,
    ) -> StoreResult<u64> {
        if patch.touches_id() {
            return Err(StoreError::ImmutableId {
                collection: self.name.clone(),
            });
        }

        guarded(self.conn, ctx, || {
            let matches = self.collect(ctx, filter, FindOptions { skip: 0, limit })?;
            for (seq, mut doc) in matches.iter().cloned() {
                patch.apply(&mut doc);
                self.rewrite(ctx, seq, &doc)?;
            }
            Ok(matches.len() as u64)
        })
    }

    fn register(&self) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO collections (name, created_at)
             VALUES (?1, (strftime('%s', 'now') * 1000));",
            [self.name.as_str()],
        )?;
        Ok(())
    }
}

impl DocumentCollection for SqliteCollection<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn codec(&self) -> &IdCodec {
        &self.codec
    }

    fn insert_one(&self, ctx: &Context, mut doc: Document) -> StoreResult<Bson> {
        guarded(self.conn, ctx, move || {
            let id = match doc.get("_id") {
                Some(id) => id.clone(),
                None => {
                    let generated = Bson::ObjectId(ObjectId::new());
                    doc.insert("_id", generated.clone());
                    generated
                }
            };

            self.register()?;
            let inserted = self.conn.execute(
                "INSERT INTO documents (collection, id_key, body) VALUES (?1, ?2, ?3);",
                params![self.name, id_key(&id)?, encode_body(&doc)?],
            );
            match inserted {
                Ok(_) => Ok(id),
                Err(err) if is_constraint_violation(&err) => Err(StoreError::DuplicateKey {
                    collection: self.name.clone(),
                }),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn find_one(&self, ctx: &Context, filter: &Filter) -> StoreResult<Option<Document>> {
        guarded(self.conn, ctx, || {
            let mut found = self.collect(
                ctx,
                filter,
                FindOptions {
                    skip: 0,
                    limit: Some(1),
                },
            )?;
            Ok(found.pop().map(|(_, doc)| doc))
        })
    }

    fn find(
        &self,
        ctx: &Context,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        guarded(self.conn, ctx, || {
            let found = self.collect(ctx, filter, options)?;
            Ok(found.into_iter().map(|(_, doc)| doc).collect())
        })
    }

    fn update_one(&self, ctx: &Context, filter: &Filter, patch: &SetPatch) -> StoreResult<u64> {
        self.update(ctx, filter, patch, Some(1))
    }

    fn update_many(&self, ctx: &Context, filter: &Filter, patch: &SetPatch) -> StoreResult<u64> {
        self.update(ctx, filter, patch, None)
    }

    fn delete_one(&self, ctx: &Context, filter: &Filter) -> StoreResult<u64> {
        guarded(self.conn, ctx, || {
            let found = self.collect(
                ctx,
                filter,
                FindOptions {
                    skip: 0,
                    limit: Some(1),
                },
            )?;
            let Some((seq, _)) = found.first() else {
                return Ok(0);
            };
            let deleted = self
                .conn
                .execute("DELETE FROM documents WHERE seq = ?1;", [seq])?;
            Ok(deleted as u64)
        })
    }

    fn count_documents(&self, ctx: &Context, filter: &Filter) -> StoreResult<u64> {
        guarded(self.conn, ctx, || {
            let matcher = filter.compile()?;
            let mut count = 0_u64;
            self.scan(ctx, filter, &matcher, |_, _| {
                count += 1;
                Ok(true)
            })?;
            Ok(count)
        })
    }
}

/// Runs `op` with an SQLite progress handler bound to `ctx`.
///
/// The handler interrupts in-flight statements once `ctx` is done; the
/// resulting SQLite error is reported as the context failure instead.
pub(crate) fn guarded<T>(
    conn: &Connection,
    ctx: &Context,
    op: impl FnOnce() -> StoreResult<T>,
) -> StoreResult<T> {
    ctx.check()?;

    let watched = ctx.clone();
    conn.progress_handler(PROGRESS_STEPS, Some(move || watched.is_done()));
    let result = op();
    conn.progress_handler(PROGRESS_STEPS, None::<fn() -> bool>);

    match result {
        Ok(value) => Ok(value),
        Err(err) => match ctx.check() {
            Err(reason) => Err(reason.into()),
            Ok(()) => Err(err),
        },
    }
}

fn encode_body(doc: &Document) -> StoreResult<Vec<u8>> {
    let mut body = Vec::new();
    doc.to_writer(&mut body)?;
    Ok(body)
}

/// Index key for filters that pin `_id` to a value stored without conversion.
///
/// Numeric ids compare across BSON number types, so they keep the full scan.
fn indexed_id_key(filter: &Filter) -> StoreResult<Option<Vec<u8>>> {
    match filter.id_equality() {
        Some(id @ (Bson::Binary(_) | Bson::ObjectId(_) | Bson::String(_))) => id_key(id).map(Some),
        _ => Ok(None),
    }
}

/// Canonical byte key for an `_id` value.
fn id_key(id: &Bson) -> StoreResult<Vec<u8>> {
    encode_body(&doc! { "_id": id.clone() })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                [table],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
