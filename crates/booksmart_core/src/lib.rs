//! Data-access layer for the BookSmart library service.
//! Repositories here are the only code that knows the persisted document shapes.

pub mod clock;
pub mod codec;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{CodecError, IdCodec, UUID_SUBTYPE};
pub use config::{ConfigError, CoreConfig};
pub use context::{CancelHandle, Context, ContextError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{Book, BookId, BookParams};
pub use model::lib_card::{LibCard, LibCardId, CARD_VALIDITY_DAYS};
pub use model::rating::{Rating, RatingId};
pub use model::reader::{Reader, ReaderId};
pub use model::reservation::{Reservation, ReservationId, ReservationState};
pub use repo::book_repo::{BookRepository, DocumentBookRepository, BOOK_COLLECTION};
pub use repo::lib_card_repo::{DocumentLibCardRepository, LibCardRepository, LIB_CARD_COLLECTION};
pub use repo::rating_repo::{DocumentRatingRepository, RatingRepository, RATING_COLLECTION};
pub use repo::reader_repo::{
    DocumentReaderRepository, ReaderRepository, FAVORITE_COLLECTION, READER_COLLECTION,
};
pub use repo::reconcile::{CardExpiryReconciler, Reconciler, ReservationExpiryReconciler};
pub use repo::reservation_repo::{
    DocumentReservationRepository, ReservationRepository, RESERVATION_COLLECTION,
};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use store::{
    DocumentCollection, Filter, FindOptions, SqliteCollection, SqliteDocumentStore,
    SqliteTokenStore, StoreError, StoreResult, TokenStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
