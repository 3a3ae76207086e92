//! Mapping between persisted documents and domain records.
//!
//! # Responsibility
//! - Define the contract every persisted record type implements.
//! - Provide typed field readers shared by the record mappers.
//! - Provide the find/insert/overwrite/delete steps the façades compose.
//!
//! # Invariants
//! - Absent fields decode to the zero value of their type.
//! - Present fields of the wrong wire type are `RepoError::InvalidData`.
//! - Identifier fields always go through the collection's `IdCodec`.

use super::{EntityKind, RepoError, RepoResult};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::store::{DocumentCollection, Filter, FindOptions, SetPatch};
use bson::{Bson, Document};
use uuid::Uuid;

/// Persisted shape of one domain record.
pub trait PersistedDocument: Sized {
    const ENTITY: EntityKind;

    /// Primary key written as `_id`.
    fn id(&self) -> Uuid;

    fn to_document(&self, codec: &IdCodec) -> Document;

    fn from_document(doc: &Document, codec: &IdCodec) -> RepoResult<Self>;
}

/// Filter selecting one record by primary key.
pub fn id_filter(codec: &IdCodec, id: Uuid) -> Filter {
    Filter::new().eq("_id", codec.encode(id))
}

pub(crate) fn read_string(doc: &Document, field: &str) -> RepoResult<String> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(String::new()),
        Some(Bson::String(value)) => Ok(value.clone()),
        Some(other) => Err(wrong_type(field, "string", other)),
    }
}

pub(crate) fn read_u32(doc: &Document, field: &str) -> RepoResult<u32> {
    let value = match doc.get(field) {
        None | Some(Bson::Null) => return Ok(0),
        Some(Bson::Int32(value)) => i64::from(*value),
        Some(Bson::Int64(value)) => *value,
        Some(other) => return Err(wrong_type(field, "integer", other)),
    };
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("field `{field}` out of unsigned range: {value}"))
    })
}

pub(crate) fn read_i32(doc: &Document, field: &str) -> RepoResult<i32> {
    let value = match doc.get(field) {
        None | Some(Bson::Null) => return Ok(0),
        Some(Bson::Int32(value)) => return Ok(*value),
        Some(Bson::Int64(value)) => *value,
        Some(other) => return Err(wrong_type(field, "integer", other)),
    };
    i32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("field `{field}` out of range: {value}")))
}

pub(crate) fn read_bool(doc: &Document, field: &str) -> RepoResult<bool> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(false),
        Some(Bson::Boolean(value)) => Ok(*value),
        Some(other) => Err(wrong_type(field, "boolean", other)),
    }
}

/// Reads a UTC datetime as Unix epoch milliseconds.
pub(crate) fn read_millis(doc: &Document, field: &str) -> RepoResult<i64> {
    match doc.get(field) {
        None | Some(Bson::Null) => Ok(0),
        Some(Bson::DateTime(value)) => Ok(value.timestamp_millis()),
        Some(other) => Err(wrong_type(field, "datetime", other)),
    }
}

pub(crate) fn read_uuid(doc: &Document, field: &str, codec: &IdCodec) -> RepoResult<Uuid> {
    Ok(codec.decode_field(doc, field)?)
}

pub(crate) fn datetime(millis: i64) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(millis))
}

fn wrong_type(field: &str, expected: &str, actual: &Bson) -> RepoError {
    RepoError::InvalidData(format!(
        "field `{field}` expected {expected}, got {:?}",
        actual.element_type()
    ))
}

/// Returns the first match or `NotFound` keyed by `key`.
pub(crate) fn find_one<D, C>(
    collection: &C,
    ctx: &Context,
    filter: &Filter,
    key: impl FnOnce() -> String,
) -> RepoResult<D>
where
    D: PersistedDocument,
    C: DocumentCollection + ?Sized,
{
    match collection.find_one(ctx, filter)? {
        Some(doc) => D::from_document(&doc, collection.codec()),
        None => Err(RepoError::not_found(D::ENTITY, key())),
    }
}

/// Returns every match, treating an empty result as `NotFound`.
pub(crate) fn find_all<D, C>(
    collection: &C,
    ctx: &Context,
    filter: &Filter,
    options: FindOptions,
    key: impl FnOnce() -> String,
) -> RepoResult<Vec<D>>
where
    D: PersistedDocument,
    C: DocumentCollection + ?Sized,
{
    let docs = collection.find(ctx, filter, options)?;
    if docs.is_empty() {
        return Err(RepoError::not_found(D::ENTITY, key()));
    }
    docs.iter()
        .map(|doc| D::from_document(doc, collection.codec()))
        .collect()
}

pub(crate) fn insert<D, C>(collection: &C, ctx: &Context, record: &D) -> RepoResult<()>
where
    D: PersistedDocument,
    C: DocumentCollection + ?Sized,
{
    let doc = record.to_document(collection.codec());
    collection
        .insert_one(ctx, doc)
        .map(|_| ())
        .map_err(|err| RepoError::on_insert(D::ENTITY, err))
}

/// Overwrites every mutable field of the record addressed by `record.id()`.
pub(crate) fn overwrite<D, C>(collection: &C, ctx: &Context, record: &D) -> RepoResult<()>
where
    D: PersistedDocument,
    C: DocumentCollection + ?Sized,
{
    let codec = collection.codec();
    let patch = SetPatch::overwrite_with(&record.to_document(codec));
    let matched = collection.update_one(ctx, &id_filter(codec, record.id()), &patch)?;
    if matched == 0 {
        return Err(RepoError::not_found(D::ENTITY, format!("id={}", record.id())));
    }
    Ok(())
}

pub(crate) fn delete_by_id<C>(
    collection: &C,
    ctx: &Context,
    entity: EntityKind,
    id: Uuid,
) -> RepoResult<()>
where
    C: DocumentCollection + ?Sized,
{
    let deleted = collection.delete_one(ctx, &id_filter(collection.codec(), id))?;
    if deleted == 0 {
        return Err(RepoError::not_found(entity, format!("id={id}")));
    }
    Ok(())
}
