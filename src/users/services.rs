use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{dto::CreateUserRequest, repo, repo_types::User};
use crate::{db::Transaction, error::StoreError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize the user in `req` in place and check it can be stored.
/// A password is only mandatory when creating.
pub fn validate(req: &mut CreateUserRequest, creating: bool) -> Result<(), &'static str> {
    req.user.name = req.user.name.trim().to_string();
    req.user.email = normalize_email(&req.user.email);

    if req.user.name.is_empty() {
        return Err("name must not be empty");
    }
    if !is_valid_email(&req.user.email) {
        return Err("invalid email");
    }
    if creating && req.password.is_empty() {
        return Err("password must not be empty");
    }
    Ok(())
}

pub async fn list_users(db: &PgPool) -> Result<Vec<User>, StoreError> {
    let mut conn = db.acquire().await?;
    repo::find_all_users(&mut conn).await
}

pub async fn get_user(db: &PgPool, id: i64) -> Result<Option<User>, StoreError> {
    let mut conn = db.acquire().await?;
    repo::find_user_by_id(&mut conn, id).await
}

/// Insert the user and set its password in one transaction.
pub async fn create_user(db: &PgPool, req: CreateUserRequest) -> Result<User, StoreError> {
    let CreateUserRequest { mut user, password } = req;
    user.id = 0;

    let mut tx = Transaction::begin(db).await;
    let created = tx
        .run(move |conn| {
            Box::pin(async move {
                repo::insert_user(conn, &mut user).await?;
                repo::set_user_password(conn, &user, &password).await?;
                Ok::<_, StoreError>(user)
            })
        })
        .await;
    let user = tx.finish_with(created).await?;

    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

/// Overwrite the user stored under `id`. An empty password keeps the
/// current one.
pub async fn update_user(
    db: &PgPool,
    id: i64,
    req: CreateUserRequest,
) -> Result<User, StoreError> {
    let CreateUserRequest { mut user, password } = req;
    user.id = id;

    let mut tx = Transaction::begin(db).await;
    let updated = tx
        .run(move |conn| {
            Box::pin(async move {
                repo::update_user(conn, &user).await?;
                if password.is_empty() {
                    debug!(user_id = user.id, "empty password, keeping current one");
                    return Ok(user);
                }
                repo::set_user_password(conn, &user, &password).await?;
                Ok::<_, StoreError>(user)
            })
        })
        .await;
    let user = tx.finish_with(updated).await?;

    info!(user_id = user.id, "user updated");
    Ok(user)
}

/// Remove the user. Users own no other rows in this schema, so removing
/// the record is the whole cleanup.
pub async fn delete_user(db: &PgPool, id: i64) -> Result<(), StoreError> {
    let mut tx = Transaction::begin(db).await;
    tx.run(move |conn| {
        Box::pin(async move {
            if repo::find_user_by_id(conn, id).await?.is_none() {
                return Err(StoreError::NotFound);
            }
            repo::delete_user_by_id(conn, id).await
        })
    })
    .await;
    tx.finish().await?;

    info!(user_id = id, "user deleted");
    Ok(())
}
