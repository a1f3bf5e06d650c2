use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("{entity} with this {field} already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
    },

    /// Referenced ids that do not resolve to rows visible to the caller.
    #[error("unknown {field} ids: {ids:?}")]
    MissingReference { field: &'static str, ids: Vec<i64> },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate { entity, field } => {
                ApiError::field(field, format!("{entity} with this {field} already exists."))
            }
            StoreError::MissingReference { field, ids } => {
                let mut errors = crate::error::FieldErrors::new();
                for id in ids {
                    errors.add(field, format!("Invalid pk \"{id}\" - object does not exist."));
                }
                ApiError::Validation(errors)
            }
            StoreError::Database(e) => ApiError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Map a unique-constraint violation onto [`StoreError::Duplicate`].
pub(crate) fn unique_violation(
    entity: &'static str,
    field: &'static str,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate { entity, field };
            }
        }
        StoreError::Database(e)
    }
}

/// Postgres-backed implementation of the user and catalog repositories.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;

        Ok(Self { pool })
    }
}
