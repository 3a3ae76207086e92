use booksmart_core::clock::MILLIS_PER_DAY;
use booksmart_core::db::open_db_in_memory;
use booksmart_core::{
    CardExpiryReconciler, Context, DocumentLibCardRepository, FixedClock, IdCodec, LibCard,
    LibCardRepository, Reconciler, SqliteDocumentStore, LIB_CARD_COLLECTION,
};
use std::sync::Arc;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000_000;

#[test]
fn fresh_card_is_returned_active_by_reader_and_number() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let clock = Arc::new(FixedClock::new(NOW));
    let repo = DocumentLibCardRepository::with_clock(store.collection(LIB_CARD_COLLECTION), clock);
    let ctx = Context::background();

    let card = LibCard::issue(Uuid::new_v4(), "0042", NOW - 30 * MILLIS_PER_DAY);
    repo.create(&ctx, &card).unwrap();

    assert_eq!(repo.get_by_reader_id(&ctx, card.reader_id).unwrap(), card);
    assert_eq!(repo.get_by_num(&ctx, "0042").unwrap(), card);
}

#[test]
fn card_past_validity_is_observed_inactive_and_persisted() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let clock = Arc::new(FixedClock::new(NOW));
    let repo = DocumentLibCardRepository::with_clock(
        store.collection(LIB_CARD_COLLECTION),
        clock.clone(),
    );
    let ctx = Context::background();

    let card = LibCard::issue(Uuid::new_v4(), "0043", NOW - 100 * MILLIS_PER_DAY);
    repo.create(&ctx, &card).unwrap();
    assert!(repo.get_by_num(&ctx, "0043").unwrap().action_status);

    clock.advance_days(300);
    let observed = repo.get_by_reader_id(&ctx, card.reader_id).unwrap();
    assert!(!observed.action_status);

    // Moving the clock back does not revive the card.
    clock.set(NOW);
    assert!(!repo.get_by_num(&ctx, "0043").unwrap().action_status);
}

#[test]
fn reconciler_reports_transitioned_cards_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let cards = store.collection(LIB_CARD_COLLECTION);
    let clock = Arc::new(FixedClock::new(NOW));
    let repo = DocumentLibCardRepository::with_clock(store.collection(LIB_CARD_COLLECTION), clock.clone());
    let reconciler = CardExpiryReconciler::with_clock(clock);
    let ctx = Context::background();

    repo.create(&ctx, &LibCard::issue(Uuid::new_v4(), "1", NOW - 400 * MILLIS_PER_DAY))
        .unwrap();
    repo.create(&ctx, &LibCard::issue(Uuid::new_v4(), "2", NOW - 366 * MILLIS_PER_DAY))
        .unwrap();
    repo.create(&ctx, &LibCard::issue(Uuid::new_v4(), "3", NOW))
        .unwrap();

    assert_eq!(reconciler.reconcile(&ctx, &cards).unwrap(), 2);
    assert_eq!(reconciler.reconcile(&ctx, &cards).unwrap(), 0);
}

#[test]
fn missing_card_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentLibCardRepository::new(store.collection(LIB_CARD_COLLECTION));
    let ctx = Context::background();

    assert!(repo
        .get_by_reader_id(&ctx, Uuid::new_v4())
        .unwrap_err()
        .is_not_found());
    assert!(repo.get_by_num(&ctx, "none").unwrap_err().is_not_found());
}

#[test]
fn update_overwrites_card_and_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let clock = Arc::new(FixedClock::new(NOW));
    let repo = DocumentLibCardRepository::with_clock(store.collection(LIB_CARD_COLLECTION), clock);
    let ctx = Context::background();

    let mut card = LibCard::issue(Uuid::new_v4(), "0044", NOW - 400 * MILLIS_PER_DAY);
    repo.create(&ctx, &card).unwrap();

    // Renewal: a new issue date brings the card back into its window.
    card.issue_date = NOW;
    card.action_status = true;
    repo.update(&ctx, &card).unwrap();
    assert_eq!(repo.get_by_num(&ctx, "0044").unwrap(), card);

    let unknown = LibCard::issue(Uuid::new_v4(), "0045", NOW);
    assert!(repo.update(&ctx, &unknown).unwrap_err().is_not_found());
}
