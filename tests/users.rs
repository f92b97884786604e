//! Store, transaction and HTTP tests against a real Postgres.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use accounts::{
    app::build_app,
    config::RootAccount,
    db::Transaction,
    error::StoreError,
    state::AppState,
    users::{bootstrap, repo, services, CreateUserRequest, User},
};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

fn new_user(name: &str, email: &str) -> User {
    User {
        name: name.into(),
        email: email.into(),
        institute: "LMU".into(),
        ..User::default()
    }
}

async fn call(db: &PgPool, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = build_app(AppState::from_parts(db.clone()));
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let req = Request::builder().method(method).uri(uri).body(body).unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn create_body(name: &str, email: &str, password: &str) -> Value {
    json!({
        "user": {"name": name, "email": email, "institute": "LMU", "admin": false},
        "password": password,
    })
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn insert_assigns_ids_and_find_round_trips(db: PgPool) {
    let mut conn = db.acquire().await.unwrap();
    let mut user = new_user("Ada", "ada@example.com");
    repo::insert_user(&mut conn, &mut user).await.unwrap();
    assert!(user.id > 0);

    let by_id = repo::find_user_by_id(&mut conn, user.id).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(&user));
    let by_email = repo::find_user_by_email(&mut conn, "ada@example.com").await.unwrap();
    assert_eq!(by_email, Some(user));
    assert!(repo::find_user_by_id(&mut conn, 9999).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn duplicate_email_is_rejected(db: PgPool) {
    let mut conn = db.acquire().await.unwrap();
    let mut first = new_user("Ada", "ada@example.com");
    repo::insert_user(&mut conn, &mut first).await.unwrap();

    let mut second = new_user("Bob", "ada@example.com");
    let err = repo::insert_user(&mut conn, &mut second).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail));

    let mut bob = new_user("Bob", "bob@example.com");
    repo::insert_user(&mut conn, &mut bob).await.unwrap();
    bob.email = "ada@example.com".into();
    let err = repo::update_user(&mut conn, &bob).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn failed_step_rolls_back_the_insert(db: PgPool) {
    let mut tx = Transaction::begin(&db).await;
    let out = tx
        .run(|conn| {
            Box::pin(async move {
                let mut user = new_user("Ada", "ada@example.com");
                repo::insert_user(conn, &mut user).await?;
                Err::<(), _>(StoreError::Password("simulated failure".into()))
            })
        })
        .await;
    assert!(out.is_none());
    assert!(tx.is_failed());

    // later steps are skipped
    let skipped = tx
        .run(|_conn| Box::pin(async move { Ok::<_, StoreError>(1) }))
        .await;
    assert!(skipped.is_none());

    let err = tx.finish().await.unwrap_err();
    assert!(matches!(err, StoreError::Password(_)));

    let mut conn = db.acquire().await.unwrap();
    assert!(repo::find_user_by_email(&mut conn, "ada@example.com")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn successful_transaction_commits(db: PgPool) {
    let mut tx = Transaction::begin(&db).await;
    let user = tx
        .run(|conn| {
            Box::pin(async move {
                let mut user = new_user("Ada", "ada@example.com");
                repo::insert_user(conn, &mut user).await?;
                Ok::<_, StoreError>(user)
            })
        })
        .await;
    let user = tx.finish_with(user).await.unwrap();

    let mut conn = db.acquire().await.unwrap();
    assert_eq!(repo::find_user_by_id(&mut conn, user.id).await.unwrap(), Some(user));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn empty_password_on_update_keeps_the_old_one(db: PgPool) {
    let created = services::create_user(
        &db,
        CreateUserRequest {
            user: new_user("Ada", "ada@example.com"),
            password: "first".into(),
        },
    )
    .await
    .unwrap();

    let mut renamed = created.clone();
    renamed.name = "Ada L.".into();
    services::update_user(
        &db,
        created.id,
        CreateUserRequest {
            user: renamed,
            password: String::new(),
        },
    )
    .await
    .unwrap();

    let mut conn = db.acquire().await.unwrap();
    assert!(repo::check_user_password(&mut conn, created.id, "first").await.unwrap());

    services::update_user(
        &db,
        created.id,
        CreateUserRequest {
            user: created.clone(),
            password: "second".into(),
        },
    )
    .await
    .unwrap();
    assert!(!repo::check_user_password(&mut conn, created.id, "first").await.unwrap());
    assert!(repo::check_user_password(&mut conn, created.id, "second").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn set_password_stores_an_argon2id_hash(db: PgPool) {
    let mut conn = db.acquire().await.unwrap();
    let mut user = new_user("Ada", "ada@example.com");
    repo::insert_user(&mut conn, &mut user).await.unwrap();
    assert!(!repo::check_user_password(&mut conn, user.id, "").await.unwrap());

    repo::set_user_password(&mut conn, &user, "s3cret").await.unwrap();
    let stored = sqlx::query_scalar::<_, Option<String>>(
        "SELECT password_hash FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
    .unwrap();
    assert!(stored.starts_with("$argon2id$"), "{stored}");
    assert!(repo::check_user_password(&mut conn, user.id, "s3cret").await.unwrap());
    assert!(!repo::check_user_password(&mut conn, user.id, "S3CRET").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn bootstrap_is_idempotent(db: PgPool) {
    let root = RootAccount {
        name: "root".into(),
        email: "Root@Example.com".into(),
        password: "toor".into(),
        institute: "ops".into(),
    };
    assert!(bootstrap::ensure_root(&db, &root).await.unwrap());
    assert!(!bootstrap::ensure_root(&db, &root).await.unwrap());

    let mut conn = db.acquire().await.unwrap();
    let users = repo::find_all_users(&mut conn).await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].admin);
    assert_eq!(users[0].email, "root@example.com");
    assert!(repo::check_user_password(&mut conn, users[0].id, "toor").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn http_create_then_get_round_trips(db: PgPool) {
    let (status, created) = call(
        &db,
        Method::POST,
        "/users",
        Some(create_body("Ada", "ada@example.com", "pw")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(created.get("password").is_none());
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = call(&db, Method::GET, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, list) = call(&db, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["users"], json!([created]));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn http_duplicate_email_is_a_client_error(db: PgPool) {
    let body = create_body("Ada", "ada@example.com", "pw");
    let (status, _) = call(&db, Method::POST, "/users", Some(body)).await;
    assert_eq!(status, StatusCode::OK);

    let body = create_body("Imposter", "ADA@example.com", "pw");
    let (status, json) = call(&db, Method::POST, "/users", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("email already in use"));

    let (_, list) = call(&db, Method::GET, "/users", None).await;
    assert_eq!(list["users"].as_array().unwrap().len(), 1);
    assert_eq!(list["users"][0]["name"], "Ada");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn http_update_uses_the_path_id(db: PgPool) {
    let (_, created) = call(
        &db,
        Method::POST,
        "/users",
        Some(create_body("Ada", "ada@example.com", "pw")),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let mut body = create_body("Ada Lovelace", "ada@example.com", "");
    body["user"]["id"] = json!(id + 100);
    body["user"]["admin"] = json!(true);
    let (status, updated) = call(&db, Method::PUT, &format!("/users/{id}"), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id);
    assert_eq!(updated["name"], "Ada Lovelace");
    assert_eq!(updated["admin"], true);
    assert!(updated.get("password").is_none());

    let body = create_body("Ghost", "ghost@example.com", "");
    let (status, _) = call(&db, Method::PUT, "/users/424242", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs DATABASE_URL"]
async fn http_delete_removes_the_user_for_good(db: PgPool) {
    let (_, created) = call(
        &db,
        Method::POST,
        "/users",
        Some(create_body("Ada", "ada@example.com", "pw")),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = call(&db, Method::DELETE, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&db, Method::GET, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&db, Method::DELETE, &format!("/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // ids are not handed out again
    let (_, recreated) = call(
        &db,
        Method::POST,
        "/users",
        Some(create_body("Ada", "ada@example.com", "pw")),
    )
    .await;
    assert!(recreated["id"].as_i64().unwrap() > id);
}
