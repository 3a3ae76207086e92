//! Reader accounts, favorite books and refresh-token sessions.
//!
//! # Responsibility
//! - CRUD over the `reader` collection.
//! - Favorite membership over the `favorite_books` join collection.
//! - Refresh-token to reader mapping through a `TokenStore`.
//!
//! # Invariants
//! - Token values and passwords never reach the log.
//! - A token whose reader no longer exists resolves to `NotFound`.

use super::mapper::{self, id_filter, read_string, read_u32, read_uuid, PersistedDocument};
use super::{log_outcome, EntityKind, RepoError, RepoResult};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::model::book::BookId;
use crate::model::reader::{Reader, ReaderId};
use crate::store::{DocumentCollection, Filter, TokenStore};
use bson::{doc, Document};
use log::info;
use std::time::Duration;
use uuid::Uuid;

pub const READER_COLLECTION: &str = "reader";
pub const FAVORITE_COLLECTION: &str = "favorite_books";

/// Persisted shape of a [`Reader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderDocument {
    pub id: ReaderId,
    pub fio: String,
    pub phone_number: String,
    pub age: u32,
    pub password: String,
    pub role: String,
}

impl From<&Reader> for ReaderDocument {
    fn from(reader: &Reader) -> Self {
        Self {
            id: reader.id,
            fio: reader.full_name.clone(),
            phone_number: reader.phone_number.clone(),
            age: reader.age,
            password: reader.password.clone(),
            role: reader.role.clone(),
        }
    }
}

impl From<ReaderDocument> for Reader {
    fn from(doc: ReaderDocument) -> Self {
        Self {
            id: doc.id,
            full_name: doc.fio,
            phone_number: doc.phone_number,
            age: doc.age,
            password: doc.password,
            role: doc.role,
        }
    }
}

impl PersistedDocument for ReaderDocument {
    const ENTITY: EntityKind = EntityKind::Reader;

    fn id(&self) -> ReaderId {
        self.id
    }

    fn to_document(&self, codec: &IdCodec) -> Document {
        doc! {
            "_id": codec.encode(self.id),
            "fio": self.fio.as_str(),
            "phone_number": self.phone_number.as_str(),
            "age": i64::from(self.age),
            "password": self.password.as_str(),
            "role": self.role.as_str(),
        }
    }

    fn from_document(doc: &Document, codec: &IdCodec) -> RepoResult<Self> {
        Ok(Self {
            id: read_uuid(doc, "_id", codec)?,
            fio: read_string(doc, "fio")?,
            phone_number: read_string(doc, "phone_number")?,
            age: read_u32(doc, "age")?,
            password: read_string(doc, "password")?,
            role: read_string(doc, "role")?,
        })
    }
}

/// Membership of one book in one reader's favorites.
///
/// The store assigns the `_id`; the pair itself is the identity callers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteDocument {
    pub reader_id: ReaderId,
    pub book_id: BookId,
}

impl FavoriteDocument {
    pub fn to_document(&self, codec: &IdCodec) -> Document {
        doc! {
            "reader_id": codec.encode(self.reader_id),
            "book_id": codec.encode(self.book_id),
        }
    }

    pub fn filter(&self, codec: &IdCodec) -> Filter {
        Filter::new()
            .eq("reader_id", codec.encode(self.reader_id))
            .eq("book_id", codec.encode(self.book_id))
    }
}

/// Repository interface for readers and their sessions.
pub trait ReaderRepository {
    fn create(&self, ctx: &Context, reader: &Reader) -> RepoResult<()>;
    fn get_by_id(&self, ctx: &Context, id: ReaderId) -> RepoResult<Reader>;
    fn get_by_phone_number(&self, ctx: &Context, phone_number: &str) -> RepoResult<Reader>;
    /// Overwrites every attribute of the stored reader with the same id.
    fn update(&self, ctx: &Context, reader: &Reader) -> RepoResult<()>;
    fn is_favorite(&self, ctx: &Context, reader_id: ReaderId, book_id: BookId)
        -> RepoResult<bool>;
    /// Records `book_id` as a favorite of `reader_id`. Repeated calls add
    /// repeated memberships.
    fn add_to_favorites(&self, ctx: &Context, reader_id: ReaderId, book_id: BookId)
        -> RepoResult<()>;
    /// Maps `token` to `reader_id` for `ttl`; a zero `ttl` never expires.
    fn save_refresh_token(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        token: &str,
        ttl: Duration,
    ) -> RepoResult<()>;
    fn get_by_refresh_token(&self, ctx: &Context, token: &str) -> RepoResult<Reader>;
}

/// Reader repository over document collections and a token store.
pub struct DocumentReaderRepository<C: DocumentCollection, T: TokenStore> {
    readers: C,
    favorites: C,
    tokens: T,
}

impl<C: DocumentCollection, T: TokenStore> DocumentReaderRepository<C, T> {
    pub fn new(readers: C, favorites: C, tokens: T) -> Self {
        Self {
            readers,
            favorites,
            tokens,
        }
    }

    fn find_by_id(&self, ctx: &Context, id: ReaderId) -> RepoResult<Reader> {
        mapper::find_one::<ReaderDocument, _>(
            &self.readers,
            ctx,
            &id_filter(self.readers.codec(), id),
            || format!("id={id}"),
        )
        .map(Reader::from)
    }
}

impl<C: DocumentCollection, T: TokenStore> ReaderRepository for DocumentReaderRepository<C, T> {
    fn create(&self, ctx: &Context, reader: &Reader) -> RepoResult<()> {
        info!("event=reader_create module=repo status=start id={}", reader.id);
        let outcome = mapper::insert(&self.readers, ctx, &ReaderDocument::from(reader));
        log_outcome("reader_create", &outcome);
        outcome
    }

    fn get_by_id(&self, ctx: &Context, id: ReaderId) -> RepoResult<Reader> {
        info!("event=reader_get module=repo status=start by=id id={id}");
        let outcome = self.find_by_id(ctx, id);
        log_outcome("reader_get", &outcome);
        outcome
    }

    fn get_by_phone_number(&self, ctx: &Context, phone_number: &str) -> RepoResult<Reader> {
        info!("event=reader_get module=repo status=start by=phone_number");
        let filter = Filter::new().eq("phone_number", phone_number);
        let outcome = mapper::find_one::<ReaderDocument, _>(&self.readers, ctx, &filter, || {
            "phone_number".to_string()
        })
        .map(Reader::from);
        log_outcome("reader_get", &outcome);
        outcome
    }

    fn update(&self, ctx: &Context, reader: &Reader) -> RepoResult<()> {
        info!("event=reader_update module=repo status=start id={}", reader.id);
        let outcome = mapper::overwrite(&self.readers, ctx, &ReaderDocument::from(reader));
        log_outcome("reader_update", &outcome);
        outcome
    }

    fn is_favorite(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        book_id: BookId,
    ) -> RepoResult<bool> {
        info!(
            "event=favorite_check module=repo status=start reader_id={reader_id} book_id={book_id}"
        );
        let membership = FavoriteDocument { reader_id, book_id };
        let outcome = self
            .favorites
            .count_documents(ctx, &membership.filter(self.favorites.codec()))
            .map(|count| count > 0)
            .map_err(RepoError::from);
        log_outcome("favorite_check", &outcome);
        outcome
    }

    fn add_to_favorites(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        book_id: BookId,
    ) -> RepoResult<()> {
        info!(
            "event=favorite_add module=repo status=start reader_id={reader_id} book_id={book_id}"
        );
        let membership = FavoriteDocument { reader_id, book_id };
        let outcome = self
            .favorites
            .insert_one(ctx, membership.to_document(self.favorites.codec()))
            .map(|_| ())
            .map_err(|err| RepoError::on_insert(EntityKind::Favorite, err));
        log_outcome("favorite_add", &outcome);
        outcome
    }

    fn save_refresh_token(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        token: &str,
        ttl: Duration,
    ) -> RepoResult<()> {
        info!(
            "event=token_save module=repo status=start reader_id={reader_id} ttl_ms={}",
            ttl.as_millis()
        );
        let outcome = self
            .tokens
            .set(ctx, token, &reader_id.to_string(), ttl)
            .map_err(RepoError::from);
        log_outcome("token_save", &outcome);
        outcome
    }

    fn get_by_refresh_token(&self, ctx: &Context, token: &str) -> RepoResult<Reader> {
        info!("event=token_resolve module=repo status=start");
        let outcome = self
            .tokens
            .get(ctx, token)
            .map_err(RepoError::from)
            .and_then(|value| {
                value.ok_or_else(|| RepoError::not_found(EntityKind::Reader, "refresh_token"))
            })
            .and_then(|value| {
                Uuid::parse_str(&value).map_err(|err| {
                    RepoError::InvalidData(format!("refresh token maps to a malformed id: {err}"))
                })
            })
            .and_then(|reader_id| self.find_by_id(ctx, reader_id));
        log_outcome("token_resolve", &outcome);
        outcome
    }
}
