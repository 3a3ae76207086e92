//! Storage collaborators used by the repository façades.
//!
//! # Responsibility
//! - Define the per-collection document contract (`DocumentCollection`) and
//!   the session token contract (`TokenStore`).
//! - Ship the embedded SQLite implementations of both.
//!
//! # Invariants
//! - Every call takes a `Context` and fails fast once it is done.
//! - Cancellation/deadline failures are reported distinctly from storage
//!   failures.
//! - Single-document writes are atomic; bulk updates are atomic per document.

use crate::codec::IdCodec;
use crate::context::{Context, ContextError};
use crate::db::DbError;
use bson::{Bson, Document};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod filter;
pub mod sqlite;
pub mod token;

pub use filter::{Clause, Filter, Matcher, Operator, SetPatch};
pub use sqlite::{SqliteCollection, SqliteDocumentStore};
pub use token::{SqliteTokenStore, TokenStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by storage collaborators.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Document could not be encoded or decoded as BSON.
    Serialization(String),
    /// Filter could not be prepared for evaluation.
    InvalidFilter(String),
    /// A document with the same `_id` already exists in the collection.
    DuplicateKey { collection: String },
    /// Update patch tried to reassign `_id`.
    ImmutableId { collection: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    Cancelled,
    DeadlineExceeded,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(message) => write!(f, "document serialization failed: {message}"),
            Self::InvalidFilter(message) => write!(f, "invalid filter: {message}"),
            Self::DuplicateKey { collection } => {
                write!(f, "duplicate _id in collection `{collection}`")
            }
            Self::ImmutableId { collection } => {
                write!(f, "update cannot modify _id in collection `{collection}`")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "document store requires table `{table}`")
            }
            Self::Cancelled => write!(f, "{}", ContextError::Cancelled),
            Self::DeadlineExceeded => write!(f, "{}", ContextError::DeadlineExceeded),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ContextError> for StoreError {
    fn from(value: ContextError) -> Self {
        match value {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(value: bson::ser::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(value: bson::de::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<regex::Error> for StoreError {
    fn from(value: regex::Error) -> Self {
        Self::InvalidFilter(value.to_string())
    }
}

/// Cursor options for [`DocumentCollection::find`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Matching documents to skip before collecting results.
    pub skip: u64,
    /// Maximum documents to return; `None` returns all remaining matches.
    pub limit: Option<u64>,
}

/// Per-collection document store contract.
///
/// Results follow the store's default order (insertion order for the
/// embedded implementation).
pub trait DocumentCollection {
    fn name(&self) -> &str;

    /// Identifier codec registered with the owning store.
    fn codec(&self) -> &IdCodec;

    /// Inserts `doc`, generating an ObjectId `_id` when absent.
    ///
    /// Returns the stored `_id`.
    fn insert_one(&self, ctx: &Context, doc: Document) -> StoreResult<Bson>;

    fn find_one(&self, ctx: &Context, filter: &Filter) -> StoreResult<Option<Document>>;

    fn find(
        &self,
        ctx: &Context,
        filter: &Filter,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// Applies `patch` to the first match. Returns the matched count.
    fn update_one(&self, ctx: &Context, filter: &Filter, patch: &SetPatch) -> StoreResult<u64>;

    /// Applies `patch` to every match. Returns the matched count.
    fn update_many(&self, ctx: &Context, filter: &Filter, patch: &SetPatch) -> StoreResult<u64>;

    /// Deletes the first match. Returns the deleted count.
    fn delete_one(&self, ctx: &Context, filter: &Filter) -> StoreResult<u64>;

    fn count_documents(&self, ctx: &Context, filter: &Filter) -> StoreResult<u64>;
}
