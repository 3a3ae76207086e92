use booksmart_core::db::open_db_in_memory;
use booksmart_core::{
    Book, BookParams, BookRepository, Context, DocumentBookRepository, DocumentCollection,
    EntityKind, IdCodec, RepoError, SqliteDocumentStore, BOOK_COLLECTION,
};
use bson::doc;
use uuid::Uuid;

fn book(title: &str, author: &str, rarity: &str, year: u32) -> Book {
    let mut book = Book::new(title);
    book.author = author.to_string();
    book.publisher = "Allen & Unwin".to_string();
    book.copies_number = 2;
    book.rarity = rarity.to_string();
    book.genre = "Fantasy".to_string();
    book.publishing_year = year;
    book.language = "English".to_string();
    book.age_limit = 12;
    book
}

#[test]
fn create_then_get_by_id_returns_same_book() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    let hobbit = book("The Hobbit", "Tolkien", "Common", 1937);
    repo.create(&ctx, &hobbit).unwrap();

    assert_eq!(repo.get_by_id(&ctx, hobbit.id).unwrap(), hobbit);
}

#[test]
fn create_with_existing_id_is_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    let hobbit = book("The Hobbit", "Tolkien", "Common", 1937);
    repo.create(&ctx, &hobbit).unwrap();

    let err = repo.create(&ctx, &hobbit).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Duplicate {
            entity: EntityKind::Book
        }
    ));
}

#[test]
fn get_by_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));

    let err = repo
        .get_by_id(&Context::background(), Uuid::new_v4())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn get_by_title_ignores_case_but_requires_whole_title() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    let dune = book("Dune", "Herbert", "Rare", 1965);
    repo.create(&ctx, &dune).unwrap();

    assert_eq!(repo.get_by_title(&ctx, "dune").unwrap().id, dune.id);
    assert!(repo.get_by_title(&ctx, "Dun").unwrap_err().is_not_found());
}

#[test]
fn get_by_params_filters_and_paginates() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    let hobbit = book("The Hobbit", "Tolkien", "Common", 1937);
    let dune = book("Dune", "Herbert", "Rare", 1965);
    let silmarillion = book("The Silmarillion", "Tolkien", "Very Rare", 1977);
    for record in [&hobbit, &dune, &silmarillion] {
        repo.create(&ctx, record).unwrap();
    }

    let by_title = repo
        .get_by_params(
            &ctx,
            &BookParams {
                title: "Hob".to_string(),
                ..BookParams::default()
            },
        )
        .unwrap();
    assert_eq!(by_title, vec![hobbit.clone()]);

    let by_rarity = repo
        .get_by_params(
            &ctx,
            &BookParams {
                rarity: "Rare".to_string(),
                ..BookParams::default()
            },
        )
        .unwrap();
    assert_eq!(by_rarity, vec![dune.clone()]);

    let tolkien_second_page = repo
        .get_by_params(
            &ctx,
            &BookParams {
                author: "tolkien".to_string(),
                limit: 1,
                offset: 1,
                ..BookParams::default()
            },
        )
        .unwrap();
    assert_eq!(tolkien_second_page, vec![silmarillion.clone()]);

    let everything = repo.get_by_params(&ctx, &BookParams::default()).unwrap();
    assert_eq!(everything.len(), 3);
}

#[test]
fn get_by_params_without_match_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    repo.create(&ctx, &book("Dune", "Herbert", "Rare", 1965))
        .unwrap();

    let err = repo
        .get_by_params(
            &ctx,
            &BookParams {
                publishing_year: 2001,
                ..BookParams::default()
            },
        )
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn update_overwrites_all_fields_and_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    let mut dune = book("Dune", "Herbert", "Rare", 1965);
    repo.create(&ctx, &dune).unwrap();

    dune.copies_number = 7;
    dune.genre = "Science Fiction".to_string();
    repo.update(&ctx, &dune).unwrap();
    assert_eq!(repo.get_by_id(&ctx, dune.id).unwrap(), dune);

    let ghost = book("Ghost", "Nobody", "Common", 2000);
    assert!(repo.update(&ctx, &ghost).unwrap_err().is_not_found());
    assert!(repo.get_by_id(&ctx, ghost.id).unwrap_err().is_not_found());
}

#[test]
fn delete_removes_book_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let repo = DocumentBookRepository::new(store.collection(BOOK_COLLECTION));
    let ctx = Context::background();

    let dune = book("Dune", "Herbert", "Rare", 1965);
    repo.create(&ctx, &dune).unwrap();

    repo.delete(&ctx, dune.id).unwrap();
    assert!(repo.get_by_id(&ctx, dune.id).unwrap_err().is_not_found());
    assert!(repo.delete(&ctx, dune.id).unwrap_err().is_not_found());
}

#[test]
fn sparse_document_decodes_absent_fields_as_zero_values() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let books = store.collection(BOOK_COLLECTION);
    let ctx = Context::background();
    let id = Uuid::new_v4();
    books
        .insert_one(&ctx, doc! { "_id": store.codec().encode(id) })
        .unwrap();

    let repo = DocumentBookRepository::new(books);
    let mut expected = Book::new("");
    expected.id = id;
    assert_eq!(repo.get_by_id(&ctx, id).unwrap(), expected);
}

#[test]
fn present_field_with_wrong_wire_type_is_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::try_new(&conn, IdCodec::default()).unwrap();
    let books = store.collection(BOOK_COLLECTION);
    let ctx = Context::background();
    let id = Uuid::new_v4();
    books
        .insert_one(
            &ctx,
            doc! { "_id": store.codec().encode(id), "title": "Dune", "age_limit": "twelve" },
        )
        .unwrap();
    let negative = Uuid::new_v4();
    books
        .insert_one(
            &ctx,
            doc! { "_id": store.codec().encode(negative), "copies_number": -1_i64 },
        )
        .unwrap();

    let repo = DocumentBookRepository::new(books);
    assert!(matches!(
        repo.get_by_id(&ctx, id).unwrap_err(),
        RepoError::InvalidData(_)
    ));
    assert!(matches!(
        repo.get_by_id(&ctx, negative).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}
