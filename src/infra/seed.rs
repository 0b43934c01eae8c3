//! Upload the compiled-in content into the hosted backend tables.

use thiserror::Error;
use tracing::info;

use crate::application::schema::SchemaError;
use crate::infra::backend::{BackendClient, BackendError};
use crate::infra::static_content::{StaticSource, blog_source, project_source};
use crate::infra::tables::ContentTable;

const SOURCE: &str = "infra::seed";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("failed to upsert `{table}`: {source}")]
    Upsert {
        table: &'static str,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub blogs: usize,
    pub projects: usize,
}

/// Upsert every static record. With `client == None` nothing is sent and the
/// summary reports what would have been written.
pub async fn seed_backend(client: Option<&BackendClient>) -> Result<SeedSummary, SeedError> {
    Ok(SeedSummary {
        blogs: seed_table(client, &blog_source()).await?,
        projects: seed_table(client, &project_source()).await?,
    })
}

async fn seed_table<T>(
    client: Option<&BackendClient>,
    source: &StaticSource<T>,
) -> Result<usize, SeedError>
where
    T: ContentTable + serde::de::DeserializeOwned,
{
    let rows: Vec<T::Row> = source
        .records()?
        .unwrap_or_default()
        .iter()
        .map(T::to_row)
        .collect();

    if let Some(client) = client {
        client
            .upsert(T::TABLE, &rows)
            .await
            .map_err(|source| SeedError::Upsert {
                table: T::TABLE,
                source,
            })?;
        info!(target = SOURCE, table = T::TABLE, rows = rows.len(), "table seeded");
    } else {
        info!(target = SOURCE, table = T::TABLE, rows = rows.len(), "dry run, nothing sent");
    }

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_counts_static_records() {
        let summary = seed_backend(None).await.expect("dry run");
        assert!(summary.blogs > 0);
        assert!(summary.projects > 0);
    }
}
