use rowbase_core::db::open_db_in_memory;
use rowbase_core::{
    EntityDescriptor, GenericRepository, RelationSpec, RepoError, Repository,
};
use rusqlite::types::Value;
use rusqlite::Connection;

fn blog_conn() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );
        CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            slug TEXT UNIQUE,
            status TEXT,
            author_id INTEGER REFERENCES authors(id),
            published_at TEXT,
            created_at TEXT NOT NULL DEFAULT '2024-01-01 12:00:00'
        );",
    )
    .unwrap();
    conn
}

fn posts_descriptor() -> EntityDescriptor {
    EntityDescriptor::new(
        "posts",
        [
            "id",
            "title",
            "slug",
            "status",
            "author_id",
            "published_at",
            "created_at",
        ],
    )
    .with_relation(RelationSpec::new("author", "authors", "author_id", "id"))
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

#[test]
fn create_returns_created_row_with_generated_id() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let created = repo
        .create(&[("title", text("First post")), ("slug", text("first-post"))])
        .unwrap();

    assert!(created.id().is_some());
    assert_eq!(created.get("title"), Some(&text("First post")));
    // Store defaults come back on the re-read.
    assert_eq!(created.get("created_at"), Some(&text("2024-01-01 12:00:00")));
}

#[test]
fn create_silently_drops_unknown_columns() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let created = repo
        .create(&[("title", text("Kept")), ("rogue_column", text("dropped"))])
        .unwrap();
    assert_eq!(created.get("title"), Some(&text("Kept")));
}

#[test]
fn create_with_no_recognized_columns_is_a_validation_error() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let err = repo.create(&[("rogue_column", text("x"))]).unwrap_err();
    assert!(matches!(err, RepoError::Validation { .. }));
}

#[test]
fn missing_required_field_surfaces_as_validation_error() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    // `title` is NOT NULL and absent from the payload.
    let err = repo.create(&[("status", text("draft"))]).unwrap_err();
    assert!(matches!(err, RepoError::Validation { .. }));
}

#[test]
fn uniqueness_and_foreign_key_violations_surface_as_constraint_errors() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    repo.create(&[("title", text("One")), ("slug", text("taken"))])
        .unwrap();
    let duplicate = repo
        .create(&[("title", text("Two")), ("slug", text("taken"))])
        .unwrap_err();
    assert!(matches!(duplicate, RepoError::Constraint { .. }));

    let orphan = repo
        .create(&[("title", text("Three")), ("author_id", Value::Integer(999))])
        .unwrap_err();
    assert!(matches!(orphan, RepoError::Constraint { .. }));
}

#[test]
fn insert_many_inserts_all_rows_in_one_statement() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let inserted = repo
        .insert_many(&[
            &[("title", text("a")), ("status", text("draft"))],
            &[("title", text("b"))],
            &[("title", text("c")), ("status", text("published"))],
        ])
        .unwrap();
    assert_eq!(inserted, 3);

    // The second row had no `status` pair; the shared column set fills NULL.
    let b = repo.get_by_column_value("title", &text("b")).unwrap().unwrap();
    assert_eq!(b.get("status"), Some(&Value::Null));
}

#[test]
fn insert_many_is_all_or_nothing_on_first_violation() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    repo.create(&[("title", text("existing")), ("slug", text("clash"))])
        .unwrap();

    let err = repo
        .insert_many(&[
            &[("title", text("ok")), ("slug", text("fresh"))],
            &[("title", text("dup")), ("slug", text("clash"))],
        ])
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint { .. }));

    // Nothing from the failed statement landed.
    assert!(repo
        .get_by_column_value("slug", &text("fresh"))
        .unwrap()
        .is_none());
}

#[test]
fn insert_many_with_no_rows_inserts_nothing() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();
    assert_eq!(repo.insert_many(&[]).unwrap(), 0);
}

#[test]
fn update_applies_partial_changes_and_returns_post_update_row() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let created = repo
        .create(&[("title", text("Draft")), ("status", text("draft"))])
        .unwrap();
    let id = created.id().unwrap();

    let updated = repo.update(id, &[("status", text("published"))]).unwrap();
    assert_eq!(updated.get("status"), Some(&text("published")));
    // Untouched columns survive the partial update.
    assert_eq!(updated.get("title"), Some(&text("Draft")));
}

#[test]
fn update_and_delete_on_missing_id_return_not_found() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let update_err = repo.update(404, &[("status", text("x"))]).unwrap_err();
    assert!(matches!(update_err, RepoError::NotFound { .. }));

    let delete_err = repo.delete(404).unwrap_err();
    assert!(matches!(delete_err, RepoError::NotFound { .. }));

    let get_err = repo.get_by_id(404).unwrap_err();
    assert!(matches!(get_err, RepoError::NotFound { .. }));
}

#[test]
fn delete_removes_the_row() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let id = repo.create(&[("title", text("gone soon"))]).unwrap().id().unwrap();
    repo.delete(id).unwrap();
    assert!(matches!(
        repo.get_by_id(id),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn get_by_column_value_returns_first_match_or_none() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    repo.create(&[("title", text("a")), ("status", text("draft"))])
        .unwrap();
    repo.create(&[("title", text("b")), ("status", text("draft"))])
        .unwrap();

    let first = repo
        .get_by_column_value("status", &text("draft"))
        .unwrap()
        .unwrap();
    assert_eq!(first.get("title"), Some(&text("a")));

    assert!(repo
        .get_by_column_value("status", &text("archived"))
        .unwrap()
        .is_none());

    let err = repo
        .get_by_column_value("rogue", &text("x"))
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownColumn { .. }));
}

#[test]
fn delete_many_by_column_value_uses_set_semantics() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    repo.create(&[("title", text("a")), ("status", text("draft"))])
        .unwrap();
    repo.create(&[("title", text("b")), ("status", text("review"))])
        .unwrap();
    repo.create(&[("title", text("c")), ("status", text("published"))])
        .unwrap();

    let deleted = repo
        .delete_many_by_column_value("status", &[text("draft"), text("review")])
        .unwrap();
    assert_eq!(deleted, 2);

    // Deleting zero rows is not an error, and an empty set is a no-op.
    assert_eq!(
        repo.delete_many_by_column_value("status", &[text("draft")])
            .unwrap(),
        0
    );
    assert_eq!(
        repo.delete_many_by_column_value("status", &[]).unwrap(),
        0
    );
}

#[test]
fn get_by_id_or_slug_classifies_numeric_and_text_keys() {
    let conn = blog_conn();
    let repo = GenericRepository::try_new(&conn, posts_descriptor()).unwrap();

    let created = repo
        .create(&[("title", text("My post")), ("slug", text("my-post"))])
        .unwrap();
    let id = created.id().unwrap();

    let by_id = repo.get_by_id_or_slug(&id.to_string()).unwrap();
    assert_eq!(by_id.id(), Some(id));

    let by_slug = repo.get_by_id_or_slug("my-post").unwrap();
    assert_eq!(by_slug.id(), Some(id));

    assert!(matches!(
        repo.get_by_id_or_slug("no-such-post"),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        repo.get_by_id_or_slug("404"),
        Err(RepoError::NotFound { .. })
    ));
}
