//! Book rating repository.

use super::mapper::{self, read_i32, read_string, read_uuid, PersistedDocument};
use super::{log_outcome, EntityKind, RepoResult};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::model::book::BookId;
use crate::model::rating::{Rating, RatingId};
use crate::model::reader::ReaderId;
use crate::store::{DocumentCollection, Filter, FindOptions};
use bson::{doc, Document};
use log::info;

pub const RATING_COLLECTION: &str = "rating";

/// Persisted shape of a [`Rating`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingDocument {
    pub id: RatingId,
    pub reader_id: ReaderId,
    pub book_id: BookId,
    pub review: String,
    pub rating: i32,
}

impl From<&Rating> for RatingDocument {
    fn from(rating: &Rating) -> Self {
        Self {
            id: rating.id,
            reader_id: rating.reader_id,
            book_id: rating.book_id,
            review: rating.review.clone(),
            rating: rating.rating,
        }
    }
}

impl From<RatingDocument> for Rating {
    fn from(doc: RatingDocument) -> Self {
        Self {
            id: doc.id,
            reader_id: doc.reader_id,
            book_id: doc.book_id,
            review: doc.review,
            rating: doc.rating,
        }
    }
}

impl PersistedDocument for RatingDocument {
    const ENTITY: EntityKind = EntityKind::Rating;

    fn id(&self) -> RatingId {
        self.id
    }

    fn to_document(&self, codec: &IdCodec) -> Document {
        doc! {
            "_id": codec.encode(self.id),
            "reader_id": codec.encode(self.reader_id),
            "book_id": codec.encode(self.book_id),
            "review": self.review.as_str(),
            "rating": self.rating,
        }
    }

    fn from_document(doc: &Document, codec: &IdCodec) -> RepoResult<Self> {
        Ok(Self {
            id: read_uuid(doc, "_id", codec)?,
            reader_id: read_uuid(doc, "reader_id", codec)?,
            book_id: read_uuid(doc, "book_id", codec)?,
            review: read_string(doc, "review")?,
            rating: read_i32(doc, "rating")?,
        })
    }
}

/// Repository interface for book ratings.
pub trait RatingRepository {
    fn create(&self, ctx: &Context, rating: &Rating) -> RepoResult<()>;
    fn get_by_reader_and_book(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        book_id: BookId,
    ) -> RepoResult<Rating>;
    fn get_by_book_id(&self, ctx: &Context, book_id: BookId) -> RepoResult<Vec<Rating>>;
}

/// Rating repository over a document collection.
pub struct DocumentRatingRepository<C: DocumentCollection> {
    ratings: C,
}

impl<C: DocumentCollection> DocumentRatingRepository<C> {
    pub fn new(ratings: C) -> Self {
        Self { ratings }
    }
}

impl<C: DocumentCollection> RatingRepository for DocumentRatingRepository<C> {
    fn create(&self, ctx: &Context, rating: &Rating) -> RepoResult<()> {
        info!(
            "event=rating_create module=repo status=start id={} book_id={}",
            rating.id, rating.book_id
        );
        let outcome = mapper::insert(&self.ratings, ctx, &RatingDocument::from(rating));
        log_outcome("rating_create", &outcome);
        outcome
    }

    fn get_by_reader_and_book(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        book_id: BookId,
    ) -> RepoResult<Rating> {
        info!(
            "event=rating_get module=repo status=start reader_id={reader_id} book_id={book_id}"
        );
        let codec = self.ratings.codec();
        let filter = Filter::new()
            .eq("reader_id", codec.encode(reader_id))
            .eq("book_id", codec.encode(book_id));
        let outcome = mapper::find_one::<RatingDocument, _>(&self.ratings, ctx, &filter, || {
            format!("reader_id={reader_id} book_id={book_id}")
        })
        .map(Rating::from);
        log_outcome("rating_get", &outcome);
        outcome
    }

    fn get_by_book_id(&self, ctx: &Context, book_id: BookId) -> RepoResult<Vec<Rating>> {
        info!("event=rating_list module=repo status=start book_id={book_id}");
        let filter = Filter::new().eq("book_id", self.ratings.codec().encode(book_id));
        let outcome = mapper::find_all::<RatingDocument, _>(
            &self.ratings,
            ctx,
            &filter,
            FindOptions::default(),
            || format!("book_id={book_id}"),
        )
        .map(|docs| docs.into_iter().map(Rating::from).collect::<Vec<_>>());
        log_outcome("rating_list", &outcome);
        outcome
    }
}
