//! Repository façades over the document store.
//!
//! # Responsibility
//! - Expose one use-case oriented contract per library entity.
//! - Compose mappers, the book query builder and the temporal reconcilers.
//! - Translate absence into `RepoError::NotFound` and pass every other
//!   failure through unchanged.
//!
//! # Invariants
//! - List reads never return an empty vector; no match is `NotFound`.
//! - `update`/`delete` that match nothing are `NotFound` and write nothing.
//! - Reconciler failures abort the triggering read.

use crate::codec::CodecError;
use crate::store::StoreError;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod book_repo;
pub mod lib_card_repo;
pub mod mapper;
pub mod query;
pub mod rating_repo;
pub mod reader_repo;
pub mod reconcile;
pub mod reservation_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity addressed by a repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Book,
    Reader,
    LibCard,
    Reservation,
    Rating,
    Favorite,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Reader => "reader",
            Self::LibCard => "lib_card",
            Self::Reservation => "reservation",
            Self::Rating => "rating",
            Self::Favorite => "favorite",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository error shared by every façade.
#[derive(Debug)]
pub enum RepoError {
    /// Record absent, list query empty, or update/delete matched nothing.
    NotFound { entity: EntityKind, key: String },
    /// Insert collided with an existing primary key.
    Duplicate { entity: EntityKind },
    /// Storage failure passed through unchanged.
    Store(StoreError),
    /// Identifier wire value could not be decoded.
    Codec(CodecError),
    /// Persisted data cannot be converted into a domain record.
    InvalidData(String),
    Cancelled,
    DeadlineExceeded,
}

impl RepoError {
    pub(crate) fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Maps an insert failure, turning key collisions into `Duplicate`.
    pub(crate) fn on_insert(entity: EntityKind, err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { .. } => Self::Duplicate { entity },
            other => other.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Duplicate { entity } => write!(f, "{entity} already exists"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Cancelled => Self::Cancelled,
            StoreError::DeadlineExceeded => Self::DeadlineExceeded,
            other => Self::Store(other),
        }
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Emits the terminal log event for one façade call.
pub(crate) fn log_outcome<T>(event: &str, outcome: &RepoResult<T>) {
    match outcome {
        Ok(_) => info!("event={event} module=repo status=ok"),
        Err(RepoError::NotFound { entity, key }) => {
            warn!("event={event} module=repo status=not_found entity={entity} key={key}")
        }
        Err(err @ (RepoError::Cancelled | RepoError::DeadlineExceeded)) => {
            warn!("event={event} module=repo status=aborted reason={err}")
        }
        Err(err) => error!("event={event} module=repo status=error error={err}"),
    }
}
