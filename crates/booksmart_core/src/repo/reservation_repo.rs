//! Reservation repository.
//!
//! # Responsibility
//! - CRUD and reader/book scoped queries over the `reservation` collection.
//!
//! # Invariants
//! - Every read first runs the reservation expiry reconciler, so an open
//!   reservation past its return date is never observed as open.
//! - The active set never contains `Expired` or `Closed` reservations.

use super::mapper::{self, datetime, id_filter, read_millis, read_string, read_uuid};
use super::mapper::PersistedDocument;
use super::reconcile::{Reconciler, ReservationExpiryReconciler};
use super::{log_outcome, EntityKind, RepoError, RepoResult};
use crate::clock::{Clock, SystemClock};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::model::book::BookId;
use crate::model::reader::ReaderId;
use crate::model::reservation::{Reservation, ReservationId, ReservationState};
use crate::store::{DocumentCollection, Filter, FindOptions};
use bson::{doc, Document};
use log::info;

pub const RESERVATION_COLLECTION: &str = "reservation";

/// Persisted shape of a [`Reservation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDocument {
    pub id: ReservationId,
    pub reader_id: ReaderId,
    pub book_id: BookId,
    pub issue_date: i64,
    pub return_date: i64,
    pub state: ReservationState,
}

impl From<&Reservation> for ReservationDocument {
    fn from(reservation: &Reservation) -> Self {
        Self {
            id: reservation.id,
            reader_id: reservation.reader_id,
            book_id: reservation.book_id,
            issue_date: reservation.issue_date,
            return_date: reservation.return_date,
            state: reservation.state,
        }
    }
}

impl From<ReservationDocument> for Reservation {
    fn from(doc: ReservationDocument) -> Self {
        Self {
            id: doc.id,
            reader_id: doc.reader_id,
            book_id: doc.book_id,
            issue_date: doc.issue_date,
            return_date: doc.return_date,
            state: doc.state,
        }
    }
}

impl PersistedDocument for ReservationDocument {
    const ENTITY: EntityKind = EntityKind::Reservation;

    fn id(&self) -> ReservationId {
        self.id
    }

    fn to_document(&self, codec: &IdCodec) -> Document {
        doc! {
            "_id": codec.encode(self.id),
            "reader_id": codec.encode(self.reader_id),
            "book_id": codec.encode(self.book_id),
            "issue_date": datetime(self.issue_date),
            "return_date": datetime(self.return_date),
            "state": self.state.as_str(),
        }
    }

    fn from_document(doc: &Document, codec: &IdCodec) -> RepoResult<Self> {
        let state = read_string(doc, "state")?
            .parse::<ReservationState>()
            .map_err(RepoError::InvalidData)?;
        Ok(Self {
            id: read_uuid(doc, "_id", codec)?,
            reader_id: read_uuid(doc, "reader_id", codec)?,
            book_id: read_uuid(doc, "book_id", codec)?,
            issue_date: read_millis(doc, "issue_date")?,
            return_date: read_millis(doc, "return_date")?,
            state,
        })
    }
}

/// Repository interface for reservations.
pub trait ReservationRepository {
    fn create(&self, ctx: &Context, reservation: &Reservation) -> RepoResult<()>;
    fn get_by_id(&self, ctx: &Context, id: ReservationId) -> RepoResult<Reservation>;
    fn get_by_reader_and_book(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        book_id: BookId,
    ) -> RepoResult<Reservation>;
    fn get_by_book_id(&self, ctx: &Context, book_id: BookId) -> RepoResult<Vec<Reservation>>;
    /// Lists the reader's reservations that are neither expired nor closed.
    fn get_active_by_reader_id(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
    ) -> RepoResult<Vec<Reservation>>;
    /// Lists the reader's reservations that are due or already expired.
    fn get_expired_by_reader_id(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
    ) -> RepoResult<Vec<Reservation>>;
    /// Overwrites every attribute of the stored reservation with the same id.
    fn update(&self, ctx: &Context, reservation: &Reservation) -> RepoResult<()>;
}

/// Reservation repository over a document collection.
pub struct DocumentReservationRepository<C: DocumentCollection, K: Clock = SystemClock> {
    reservations: C,
    reconciler: ReservationExpiryReconciler<K>,
}

impl<C: DocumentCollection> DocumentReservationRepository<C, SystemClock> {
    pub fn new(reservations: C) -> Self {
        Self::with_clock(reservations, SystemClock)
    }
}

impl<C: DocumentCollection, K: Clock> DocumentReservationRepository<C, K> {
    pub fn with_clock(reservations: C, clock: K) -> Self {
        Self {
            reservations,
            reconciler: ReservationExpiryReconciler::with_clock(clock),
        }
    }

    fn reader_filter(&self, reader_id: ReaderId) -> Filter {
        Filter::new().eq("reader_id", self.reservations.codec().encode(reader_id))
    }

    fn reconciled_find_one(
        &self,
        ctx: &Context,
        filter: &Filter,
        key: impl FnOnce() -> String,
    ) -> RepoResult<Reservation> {
        self.reconciler.reconcile(ctx, &self.reservations)?;
        mapper::find_one::<ReservationDocument, _>(&self.reservations, ctx, filter, key)
            .map(Reservation::from)
    }

    fn reconciled_find_all(
        &self,
        ctx: &Context,
        filter: &Filter,
        key: impl FnOnce() -> String,
    ) -> RepoResult<Vec<Reservation>> {
        self.reconciler.reconcile(ctx, &self.reservations)?;
        mapper::find_all::<ReservationDocument, _>(
            &self.reservations,
            ctx,
            filter,
            FindOptions::default(),
            key,
        )
        .map(|docs| docs.into_iter().map(Reservation::from).collect())
    }
}

impl<C: DocumentCollection, K: Clock> ReservationRepository for DocumentReservationRepository<C, K> {
    fn create(&self, ctx: &Context, reservation: &Reservation) -> RepoResult<()> {
        info!(
            "event=reservation_create module=repo status=start id={} reader_id={} book_id={}",
            reservation.id, reservation.reader_id, reservation.book_id
        );
        let outcome =
            mapper::insert(&self.reservations, ctx, &ReservationDocument::from(reservation));
        log_outcome("reservation_create", &outcome);
        outcome
    }

    fn get_by_id(&self, ctx: &Context, id: ReservationId) -> RepoResult<Reservation> {
        info!("event=reservation_get module=repo status=start by=id id={id}");
        let filter = id_filter(self.reservations.codec(), id);
        let outcome = self.reconciled_find_one(ctx, &filter, || format!("id={id}"));
        log_outcome("reservation_get", &outcome);
        outcome
    }

    fn get_by_reader_and_book(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
        book_id: BookId,
    ) -> RepoResult<Reservation> {
        info!(
            "event=reservation_get module=repo status=start by=reader_and_book reader_id={reader_id} book_id={book_id}"
        );
        let filter = self
            .reader_filter(reader_id)
            .eq("book_id", self.reservations.codec().encode(book_id));
        let outcome = self.reconciled_find_one(ctx, &filter, || {
            format!("reader_id={reader_id} book_id={book_id}")
        });
        log_outcome("reservation_get", &outcome);
        outcome
    }

    fn get_by_book_id(&self, ctx: &Context, book_id: BookId) -> RepoResult<Vec<Reservation>> {
        info!("event=reservation_list module=repo status=start by=book_id book_id={book_id}");
        let filter = Filter::new().eq("book_id", self.reservations.codec().encode(book_id));
        let outcome = self.reconciled_find_all(ctx, &filter, || format!("book_id={book_id}"));
        log_outcome("reservation_list", &outcome);
        outcome
    }

    fn get_active_by_reader_id(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
    ) -> RepoResult<Vec<Reservation>> {
        info!(
            "event=reservation_list module=repo status=start by=active reader_id={reader_id}"
        );
        let filter = self.reader_filter(reader_id).not_in(
            "state",
            ReservationState::FINISHED.iter().map(|state| state.as_str()),
        );
        let outcome =
            self.reconciled_find_all(ctx, &filter, || format!("active reader_id={reader_id}"));
        log_outcome("reservation_list", &outcome);
        outcome
    }

    fn get_expired_by_reader_id(
        &self,
        ctx: &Context,
        reader_id: ReaderId,
    ) -> RepoResult<Vec<Reservation>> {
        info!(
            "event=reservation_list module=repo status=start by=expired reader_id={reader_id}"
        );
        let now = datetime(self.reconciler.clock().now_millis());
        let filter = self.reader_filter(reader_id).any_of(vec![
            Filter::new().lte("return_date", now),
            Filter::new().eq("state", ReservationState::Expired.as_str()),
        ]);
        let outcome =
            self.reconciled_find_all(ctx, &filter, || format!("expired reader_id={reader_id}"));
        log_outcome("reservation_list", &outcome);
        outcome
    }

    fn update(&self, ctx: &Context, reservation: &Reservation) -> RepoResult<()> {
        info!(
            "event=reservation_update module=repo status=start id={} state={}",
            reservation.id, reservation.state
        );
        let outcome =
            mapper::overwrite(&self.reservations, ctx, &ReservationDocument::from(reservation));
        log_outcome("reservation_update", &outcome);
        outcome
    }
}
