//! Book catalogue record and search parameters.

use uuid::Uuid;

pub type BookId = Uuid;

/// Catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publisher: String,
    /// Copies held by the library.
    pub copies_number: u32,
    /// Rarity class, matched exactly by search.
    pub rarity: String,
    pub genre: String,
    pub publishing_year: u32,
    pub language: String,
    /// Minimum reader age.
    pub age_limit: u32,
}

impl Book {
    /// Creates a book with a generated id and empty catalogue attributes.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            author: String::new(),
            publisher: String::new(),
            copies_number: 0,
            rarity: String::new(),
            genre: String::new(),
            publishing_year: 0,
            language: String::new(),
            age_limit: 0,
        }
    }
}

/// Parametric search over the catalogue.
///
/// Empty strings and zeros mean "no criterion" for the matching field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookParams {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub copies_number: u32,
    pub rarity: String,
    pub genre: String,
    pub publishing_year: u32,
    pub language: String,
    pub age_limit: u32,
    /// Page size; `0` returns every match.
    pub limit: u32,
    pub offset: u32,
}
