//! Source adapter contract shared by static, Postgres and backend adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::schema::SchemaError;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Configured but failing: network, query or decode errors.
    #[error("source `{source_name}` unavailable: {message}")]
    Unavailable {
        source_name: &'static str,
        message: String,
    },
    /// Static content does not match its schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl SourceError {
    pub fn unavailable(source_name: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            source_name,
            message: err.to_string(),
        }
    }
}

/// One backend-specific fetch-and-normalize implementation for one content type.
///
/// `Ok(None)` signals that the source is not configured; the resolver moves
/// on without treating it as a failure.
#[async_trait]
pub trait ContentSource<T>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Option<Vec<T>>, SourceError>;
}
