use sqlx::PgConnection;
use tracing::instrument;

use super::{
    password::{hash_password, verify_stored_password},
    repo_types::User,
};
use crate::error::StoreError;

// Every function takes a bare connection: pass `&mut *pool.acquire().await?`
// for a single statement or `&mut **tx` inside a transaction.

/// Find a user by id.
#[instrument(skip(conn))]
pub async fn find_user_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, institute, admin
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Find a user by email.
#[instrument(skip(conn))]
pub async fn find_user_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, institute, admin
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

#[instrument(skip(conn))]
pub async fn find_all_users(conn: &mut PgConnection) -> Result<Vec<User>, StoreError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, institute, admin
        FROM users
        ORDER BY id ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(users)
}

/// Insert a new user and write the assigned id back into `user`.
#[instrument(skip(conn, user), fields(email = %user.email))]
pub async fn insert_user(conn: &mut PgConnection, user: &mut User) -> Result<(), StoreError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (name, email, institute, admin)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.institute)
    .bind(user.admin)
    .fetch_one(conn)
    .await?;
    user.id = id;
    Ok(())
}

#[instrument(skip(conn, user), fields(id = user.id))]
pub async fn update_user(conn: &mut PgConnection, user: &User) -> Result<(), StoreError> {
    let res = sqlx::query(
        r#"
        UPDATE users
           SET name = $2, email = $3, institute = $4, admin = $5
         WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.institute)
    .bind(user.admin)
    .execute(conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

#[instrument(skip(conn))]
pub async fn delete_user_by_id(conn: &mut PgConnection, id: i64) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Hash `plain` and store it as the user's password.
#[instrument(skip(conn, user, plain), fields(id = user.id))]
pub async fn set_user_password(
    conn: &mut PgConnection,
    user: &User,
    plain: &str,
) -> Result<(), StoreError> {
    let hash = hash_password(plain)?;
    let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user.id)
        .bind(hash)
        .execute(conn)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Whether `plain` matches the stored password. Users without a password
/// never match.
#[instrument(skip(conn, plain))]
pub async fn check_user_password(
    conn: &mut PgConnection,
    id: i64,
    plain: &str,
) -> Result<bool, StoreError> {
    let hash = sqlx::query_scalar::<_, Option<String>>(
        "SELECT password_hash FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    verify_stored_password(plain, hash.flatten().as_deref())
}
