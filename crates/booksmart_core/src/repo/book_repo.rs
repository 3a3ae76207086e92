//! Book catalogue repository.
//!
//! # Responsibility
//! - CRUD and parametric search over the `book` collection.
//!
//! # Invariants
//! - Title lookup is whole-field and case-insensitive.
//! - Parametric search follows `repo::query` and paginates with find options.

use super::mapper::{self, id_filter, read_string, read_u32, read_uuid, PersistedDocument};
use super::query::{book_filter, find_options};
use super::{log_outcome, EntityKind, RepoResult};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::model::book::{Book, BookId, BookParams};
use crate::store::{DocumentCollection, Filter};
use bson::{doc, Document};
use log::info;

pub const BOOK_COLLECTION: &str = "book";

/// Persisted shape of a [`Book`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDocument {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub copies_number: u32,
    pub rarity: String,
    pub genre: String,
    pub publishing_year: u32,
    pub language: String,
    pub age_limit: u32,
}

impl From<&Book> for BookDocument {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            copies_number: book.copies_number,
            rarity: book.rarity.clone(),
            genre: book.genre.clone(),
            publishing_year: book.publishing_year,
            language: book.language.clone(),
            age_limit: book.age_limit,
        }
    }
}

impl From<BookDocument> for Book {
    fn from(doc: BookDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            author: doc.author,
            publisher: doc.publisher,
            copies_number: doc.copies_number,
            rarity: doc.rarity,
            genre: doc.genre,
            publishing_year: doc.publishing_year,
            language: doc.language,
            age_limit: doc.age_limit,
        }
    }
}

impl PersistedDocument for BookDocument {
    const ENTITY: EntityKind = EntityKind::Book;

    fn id(&self) -> BookId {
        self.id
    }

    fn to_document(&self, codec: &IdCodec) -> Document {
        doc! {
            "_id": codec.encode(self.id),
            "title": self.title.as_str(),
            "author": self.author.as_str(),
            "publisher": self.publisher.as_str(),
            "copies_number": i64::from(self.copies_number),
            "rarity": self.rarity.as_str(),
            "genre": self.genre.as_str(),
            "publishing_year": i64::from(self.publishing_year),
            "language": self.language.as_str(),
            "age_limit": i64::from(self.age_limit),
        }
    }

    fn from_document(doc: &Document, codec: &IdCodec) -> RepoResult<Self> {
        Ok(Self {
            id: read_uuid(doc, "_id", codec)?,
            title: read_string(doc, "title")?,
            author: read_string(doc, "author")?,
            publisher: read_string(doc, "publisher")?,
            copies_number: read_u32(doc, "copies_number")?,
            rarity: read_string(doc, "rarity")?,
            genre: read_string(doc, "genre")?,
            publishing_year: read_u32(doc, "publishing_year")?,
            language: read_string(doc, "language")?,
            age_limit: read_u32(doc, "age_limit")?,
        })
    }
}

/// Repository interface for the book catalogue.
pub trait BookRepository {
    fn create(&self, ctx: &Context, book: &Book) -> RepoResult<()>;
    fn get_by_id(&self, ctx: &Context, id: BookId) -> RepoResult<Book>;
    /// Finds the first book whose title equals `title` ignoring case.
    fn get_by_title(&self, ctx: &Context, title: &str) -> RepoResult<Book>;
    /// Lists books matching every set criterion of `params`.
    fn get_by_params(&self, ctx: &Context, params: &BookParams) -> RepoResult<Vec<Book>>;
    /// Overwrites every attribute of the stored book with the same id.
    fn update(&self, ctx: &Context, book: &Book) -> RepoResult<()>;
    fn delete(&self, ctx: &Context, id: BookId) -> RepoResult<()>;
}

/// Book repository over a document collection.
pub struct DocumentBookRepository<C: DocumentCollection> {
    books: C,
}

impl<C: DocumentCollection> DocumentBookRepository<C> {
    pub fn new(books: C) -> Self {
        Self { books }
    }
}

impl<C: DocumentCollection> BookRepository for DocumentBookRepository<C> {
    fn create(&self, ctx: &Context, book: &Book) -> RepoResult<()> {
        info!("event=book_create module=repo status=start id={}", book.id);
        let outcome = mapper::insert(&self.books, ctx, &BookDocument::from(book));
        log_outcome("book_create", &outcome);
        outcome
    }

    fn get_by_id(&self, ctx: &Context, id: BookId) -> RepoResult<Book> {
        info!("event=book_get module=repo status=start by=id id={id}");
        let outcome = mapper::find_one::<BookDocument, _>(
            &self.books,
            ctx,
            &id_filter(self.books.codec(), id),
            || format!("id={id}"),
        )
        .map(Book::from);
        log_outcome("book_get", &outcome);
        outcome
    }

    fn get_by_title(&self, ctx: &Context, title: &str) -> RepoResult<Book> {
        info!("event=book_get module=repo status=start by=title");
        let filter = Filter::new().eq_ignore_case("title", title);
        let outcome =
            mapper::find_one::<BookDocument, _>(&self.books, ctx, &filter, || {
                format!("title={title}")
            })
            .map(Book::from);
        log_outcome("book_get", &outcome);
        outcome
    }

    fn get_by_params(&self, ctx: &Context, params: &BookParams) -> RepoResult<Vec<Book>> {
        let filter = book_filter(params);
        info!(
            "event=book_search module=repo status=start criteria={} limit={} offset={}",
            filter.clauses().len(),
            params.limit,
            params.offset
        );
        let outcome = mapper::find_all::<BookDocument, _>(
            &self.books,
            ctx,
            &filter,
            find_options(params),
            || "params".to_string(),
        )
        .map(|docs| docs.into_iter().map(Book::from).collect::<Vec<_>>());
        log_outcome("book_search", &outcome);
        outcome
    }

    fn update(&self, ctx: &Context, book: &Book) -> RepoResult<()> {
        info!("event=book_update module=repo status=start id={}", book.id);
        let outcome = mapper::overwrite(&self.books, ctx, &BookDocument::from(book));
        log_outcome("book_update", &outcome);
        outcome
    }

    fn delete(&self, ctx: &Context, id: BookId) -> RepoResult<()> {
        info!("event=book_delete module=repo status=start id={id}");
        let outcome = mapper::delete_by_id(&self.books, ctx, EntityKind::Book, id);
        log_outcome("book_delete", &outcome);
        outcome
    }
}
