use anyhow::Context;
use futures::future::BoxFuture;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres};
use tracing::{debug, warn};

use crate::{config::AppConfig, error::StoreError};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

/// Groups store calls into one database transaction.
///
/// The first failure (including a failed `BEGIN`) is remembered; later
/// [`Transaction::run`] calls are skipped and [`Transaction::finish`] rolls
/// back and reports it. Without a failure, `finish` commits.
pub struct Transaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
    error: Option<StoreError>,
}

impl Transaction {
    pub async fn begin(db: &PgPool) -> Self {
        match db.begin().await {
            Ok(tx) => {
                debug!("transaction started");
                Self {
                    tx: Some(tx),
                    error: None,
                }
            }
            Err(e) => Self {
                tx: None,
                error: Some(e.into()),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Runs `f` on the transaction's connection. Returns `None` when `f`
    /// fails or when an earlier step already failed.
    pub async fn run<T, F>(&mut self, f: F) -> Option<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, StoreError>>,
    {
        if self.error.is_some() {
            return None;
        }
        let tx = self.tx.as_mut()?;
        match f(&mut **tx).await {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "transaction step failed");
                self.error = Some(e);
                None
            }
        }
    }

    pub async fn finish(mut self) -> Result<(), StoreError> {
        let tx = self.tx.take();
        match (self.error.take(), tx) {
            (Some(err), Some(tx)) => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "rollback failed");
                }
                debug!("transaction rolled back");
                Err(err)
            }
            (Some(err), None) => Err(err),
            (None, Some(tx)) => {
                tx.commit().await?;
                debug!("transaction committed");
                Ok(())
            }
            (None, None) => Err(StoreError::Aborted),
        }
    }

    /// Like [`Transaction::finish`], handing back the value a successful
    /// [`Transaction::run`] produced.
    pub async fn finish_with<T>(self, value: Option<T>) -> Result<T, StoreError> {
        self.finish().await?;
        value.ok_or(StoreError::Aborted)
    }
}
