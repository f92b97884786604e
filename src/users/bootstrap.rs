use anyhow::Context;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use super::{repo, repo_types::User, services::normalize_email};
use crate::{config::RootAccount, db::Transaction, error::StoreError};

/// Make sure the configured root administrator exists. Returns `true` when
/// the account was created by this call.
#[instrument(skip(db, root), fields(email = %root.email))]
pub async fn ensure_root(db: &PgPool, root: &RootAccount) -> anyhow::Result<bool> {
    let mut user = User {
        id: 0,
        name: root.name.trim().to_string(),
        email: normalize_email(&root.email),
        institute: root.institute.clone(),
        admin: true,
    };

    let mut conn = db.acquire().await.context("acquire connection")?;
    let existing = repo::find_user_by_email(&mut conn, &user.email)
        .await
        .with_context(|| format!("cannot find root user {}", user.email))?;
    drop(conn);
    if let Some(existing) = existing {
        debug!(user_id = existing.id, "root account already exists");
        return Ok(false);
    }

    let password = root.password.clone();
    let email = user.email.clone();
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
    let user = tx
        .finish_with(created)
        .await
        .with_context(|| format!("cannot create root user {email}"))?;

    info!(user_id = user.id, "root account created");
    Ok(true)
}
