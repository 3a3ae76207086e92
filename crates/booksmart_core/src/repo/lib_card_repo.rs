//! Library card repository.
//!
//! # Responsibility
//! - CRUD over the `lib_card` collection.
//!
//! # Invariants
//! - Every read first runs the card expiry reconciler, so a card past its
//!   validity window is never observed as active.

use super::mapper::{self, read_bool, read_i32, read_millis, read_string, read_uuid};
use super::mapper::{datetime, PersistedDocument};
use super::reconcile::{CardExpiryReconciler, Reconciler};
use super::{log_outcome, EntityKind, RepoResult};
use crate::clock::{Clock, SystemClock};
use crate::codec::IdCodec;
use crate::context::Context;
use crate::model::lib_card::{LibCard, LibCardId};
use crate::model::reader::ReaderId;
use crate::store::{DocumentCollection, Filter};
use bson::{doc, Document};
use log::info;

pub const LIB_CARD_COLLECTION: &str = "lib_card";

/// Persisted shape of a [`LibCard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibCardDocument {
    pub id: LibCardId,
    pub reader_id: ReaderId,
    pub lib_card_num: String,
    pub validity: i32,
    pub issue_date: i64,
    pub action_status: bool,
}

impl From<&LibCard> for LibCardDocument {
    fn from(card: &LibCard) -> Self {
        Self {
            id: card.id,
            reader_id: card.reader_id,
            lib_card_num: card.lib_card_num.clone(),
            validity: card.validity,
            issue_date: card.issue_date,
            action_status: card.action_status,
        }
    }
}

impl From<LibCardDocument> for LibCard {
    fn from(doc: LibCardDocument) -> Self {
        Self {
            id: doc.id,
            reader_id: doc.reader_id,
            lib_card_num: doc.lib_card_num,
            validity: doc.validity,
            issue_date: doc.issue_date,
            action_status: doc.action_status,
        }
    }
}

impl PersistedDocument for LibCardDocument {
    const ENTITY: EntityKind = EntityKind::LibCard;

    fn id(&self) -> LibCardId {
        self.id
    }

    fn to_document(&self, codec: &IdCodec) -> Document {
        doc! {
            "_id": codec.encode(self.id),
            "reader_id": codec.encode(self.reader_id),
            "lib_card_num": self.lib_card_num.as_str(),
            "validity": self.validity,
            "issue_date": datetime(self.issue_date),
            "action_status": self.action_status,
        }
    }

    fn from_document(doc: &Document, codec: &IdCodec) -> RepoResult<Self> {
        Ok(Self {
            id: read_uuid(doc, "_id", codec)?,
            reader_id: read_uuid(doc, "reader_id", codec)?,
            lib_card_num: read_string(doc, "lib_card_num")?,
            validity: read_i32(doc, "validity")?,
            issue_date: read_millis(doc, "issue_date")?,
            action_status: read_bool(doc, "action_status")?,
        })
    }
}

/// Repository interface for library cards.
pub trait LibCardRepository {
    fn create(&self, ctx: &Context, card: &LibCard) -> RepoResult<()>;
    fn get_by_reader_id(&self, ctx: &Context, reader_id: ReaderId) -> RepoResult<LibCard>;
    fn get_by_num(&self, ctx: &Context, lib_card_num: &str) -> RepoResult<LibCard>;
    /// Overwrites every attribute of the stored card with the same id.
    fn update(&self, ctx: &Context, card: &LibCard) -> RepoResult<()>;
}

/// Library card repository over a document collection.
pub struct DocumentLibCardRepository<C: DocumentCollection, K: Clock = SystemClock> {
    cards: C,
    reconciler: CardExpiryReconciler<K>,
}

impl<C: DocumentCollection> DocumentLibCardRepository<C, SystemClock> {
    pub fn new(cards: C) -> Self {
        Self::with_clock(cards, SystemClock)
    }
}

impl<C: DocumentCollection, K: Clock> DocumentLibCardRepository<C, K> {
    pub fn with_clock(cards: C, clock: K) -> Self {
        Self {
            cards,
            reconciler: CardExpiryReconciler::with_clock(clock),
        }
    }

    fn reconciled_find(
        &self,
        ctx: &Context,
        filter: &Filter,
        key: impl FnOnce() -> String,
    ) -> RepoResult<LibCard> {
        self.reconciler.reconcile(ctx, &self.cards)?;
        mapper::find_one::<LibCardDocument, _>(&self.cards, ctx, filter, key).map(LibCard::from)
    }
}

impl<C: DocumentCollection, K: Clock> LibCardRepository for DocumentLibCardRepository<C, K> {
    fn create(&self, ctx: &Context, card: &LibCard) -> RepoResult<()> {
        info!(
            "event=lib_card_create module=repo status=start id={} reader_id={}",
            card.id, card.reader_id
        );
        let outcome = mapper::insert(&self.cards, ctx, &LibCardDocument::from(card));
        log_outcome("lib_card_create", &outcome);
        outcome
    }

    fn get_by_reader_id(&self, ctx: &Context, reader_id: ReaderId) -> RepoResult<LibCard> {
        info!("event=lib_card_get module=repo status=start by=reader_id reader_id={reader_id}");
        let filter = Filter::new().eq("reader_id", self.cards.codec().encode(reader_id));
        let outcome = self.reconciled_find(ctx, &filter, || format!("reader_id={reader_id}"));
        log_outcome("lib_card_get", &outcome);
        outcome
    }

    fn get_by_num(&self, ctx: &Context, lib_card_num: &str) -> RepoResult<LibCard> {
        info!("event=lib_card_get module=repo status=start by=num");
        let filter = Filter::new().eq("lib_card_num", lib_card_num);
        let outcome = self.reconciled_find(ctx, &filter, || format!("num={lib_card_num}"));
        log_outcome("lib_card_get", &outcome);
        outcome
    }

    fn update(&self, ctx: &Context, card: &LibCard) -> RepoResult<()> {
        info!("event=lib_card_update module=repo status=start id={}", card.id);
        let outcome = mapper::overwrite(&self.cards, ctx, &LibCardDocument::from(card));
        log_outcome("lib_card_update", &outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::LibCardDocument;
    use crate::codec::IdCodec;
    use crate::model::lib_card::LibCard;
    use crate::repo::mapper::PersistedDocument;
    use bson::Bson;
    use uuid::Uuid;

    #[test]
    fn validity_is_int32_and_issue_date_is_a_datetime() {
        let card = LibCard::issue(Uuid::new_v4(), "0001", 1_700_000_000_000);
        let doc = LibCardDocument::from(&card).to_document(&IdCodec::default());

        assert_eq!(doc.get("validity"), Some(&Bson::Int32(365)));
        assert_eq!(
            doc.get_datetime("issue_date").unwrap().timestamp_millis(),
            1_700_000_000_000
        );
        assert_eq!(doc.get("action_status"), Some(&Bson::Boolean(true)));
    }
}
