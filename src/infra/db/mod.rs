//! Postgres-backed content source.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use crate::application::repos::{ContentSource, SourceError};
use crate::infra::tables::ContentTable;

const SOURCE: &str = "infra::db";
const SOURCE_NAME: &str = "postgres";

/// Build a pool that connects on first use, so an unreachable database only
/// degrades the reads that need it.
pub fn connect_lazy(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy(url)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(Into::into)
}

pub struct PostgresSource<T> {
    pool: Option<PgPool>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PostgresSource<T> {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: ContentTable> ContentSource<T> for PostgresSource<T> {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Option<Vec<T>>, SourceError> {
        let Some(pool) = self.pool.as_ref() else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, T::Row>(T::SQL_SELECT)
            .fetch_all(pool)
            .await
            .map_err(|err| SourceError::unavailable(SOURCE_NAME, err))?;

        let records: Vec<T> = rows
            .into_iter()
            .map(|row| {
                let mut record = T::from_row(row);
                record.normalize();
                record
            })
            .collect();

        debug!(
            target = SOURCE,
            table = T::TABLE,
            count = records.len(),
            "rows loaded"
        );
        Ok(Some(records))
    }
}
