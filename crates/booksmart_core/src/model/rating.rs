//! Reader review of a book.

use crate::model::book::BookId;
use crate::model::reader::ReaderId;
use uuid::Uuid;

pub type RatingId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub id: RatingId,
    pub reader_id: ReaderId,
    pub book_id: BookId,
    pub review: String,
    /// Numeric score; non-negative by convention.
    pub rating: i32,
}

impl Rating {
    pub fn new(reader_id: ReaderId, book_id: BookId, review: impl Into<String>, rating: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            reader_id,
            book_id,
            review: review.into(),
            rating,
        }
    }
}
