//! Hosted backend (PostgREST-style REST API) client and content source.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Url,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{ContentSource, SourceError};
use crate::cache::MemoCache;
use crate::infra::tables::ContentTable;

const SOURCE: &str = "infra::backend";
const SOURCE_NAME: &str = "backend";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse body: {0}")]
    Decode(String),
}

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base: Url,
    key: String,
}

impl BackendClient {
    pub fn new(base: &Url, key: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(concat!("vitrine/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            key: key.into(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(&format!("rest/v1/{table}"))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
    }

    /// `GET /rest/v1/{table}?select=..&order=..`
    pub async fn select<R: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        order: &str,
    ) -> Result<Vec<R>, BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair("select", select)
            .append_pair("order", order);

        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| BackendError::Decode(err.to_string()))
    }

    /// Insert rows, merging on the primary key when they already exist.
    pub async fn upsert<R: Serialize>(&self, table: &str, rows: &[R]) -> Result<(), BackendError> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", "slug");

        let body = serde_json::to_vec(rows).map_err(|err| BackendError::Decode(err.to_string()))?;
        let response = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Reads one table through the memo cache under the content kind's fixed key.
pub struct BackendSource<T> {
    client: Option<Arc<BackendClient>>,
    memo: Arc<MemoCache>,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BackendSource<T> {
    pub fn new(client: Option<Arc<BackendClient>>, memo: Arc<MemoCache>, ttl: Duration) -> Self {
        Self {
            client,
            memo,
            ttl,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: ContentTable> ContentSource<T> for BackendSource<T> {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<Option<Vec<T>>, SourceError> {
        let Some(client) = self.client.as_ref() else {
            return Ok(None);
        };

        let records = self
            .memo
            .get_or_fetch(T::KIND.cache_key(), self.ttl, || async move {
                let rows = client
                    .select::<T::Row>(T::TABLE, T::REST_SELECT, T::REST_ORDER)
                    .await?;
                debug!(target = SOURCE, table = T::TABLE, count = rows.len(), "rows fetched");
                Ok::<Vec<T>, BackendError>(
                    rows.into_iter()
                        .map(|row| {
                            let mut record = T::from_row(row);
                            record.normalize();
                            record
                        })
                        .collect(),
                )
            })
            .await
            .map_err(|err| SourceError::unavailable(SOURCE_NAME, err))?;

        Ok(Some(records))
    }
}
