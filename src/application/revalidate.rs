//! On-demand revalidation of cached content and generated documents.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::info;
use vitrine_api_types::{RevalidateKind, RevalidateRequest, RevalidateResponse};

use crate::cache::{MemoCache, ResponseCache};
use crate::domain::types::ContentKind;

const SOURCE: &str = "application::revalidate";

const FEED_PATH: &str = "/rss.xml";
const SITEMAP_PATH: &str = "/sitemap.xml";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevalidateError {
    #[error("missing or invalid revalidation secret")]
    Unauthorized,
    #[error("{0}")]
    InvalidPath(String),
}

#[derive(Clone)]
pub struct RevalidationService {
    memo: Arc<MemoCache>,
    responses: Arc<ResponseCache>,
    secret: Option<String>,
}

impl RevalidationService {
    pub fn new(
        memo: Arc<MemoCache>,
        responses: Arc<ResponseCache>,
        secret: Option<String>,
    ) -> Self {
        Self {
            memo,
            responses,
            secret,
        }
    }

    /// Check the caller's secret when one is configured.
    pub fn authorize(&self, provided: Option<&str>) -> Result<(), RevalidateError> {
        let Some(expected) = self.secret.as_deref() else {
            return Ok(());
        };
        match provided {
            Some(provided) if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
            _ => Err(RevalidateError::Unauthorized),
        }
    }

    pub fn revalidate(
        &self,
        request: RevalidateRequest,
    ) -> Result<RevalidateResponse, RevalidateError> {
        let path = normalize_path(&request.path)?;
        let kind = request.kind.unwrap_or_default();

        let kinds = affected_kinds(&path, kind);
        let mut memo_cleared = 0;
        for content in &kinds {
            memo_cleared += self
                .memo
                .invalidate_matching(&format!("{}:*", content.as_str()));
        }

        let mut responses_cleared = match kind {
            RevalidateKind::Page => usize::from(self.responses.invalidate_path(&path)),
            RevalidateKind::Layout => self.responses.invalidate_prefix(&path),
        };
        for derived in derived_documents(&kinds) {
            if derived != path {
                responses_cleared += usize::from(self.responses.invalidate_path(derived));
            }
        }

        info!(
            target = SOURCE,
            path = %path,
            kind = ?kind,
            memo_cleared,
            responses_cleared,
            "path revalidated"
        );

        Ok(RevalidateResponse {
            revalidated: true,
            path,
        })
    }
}

fn normalize_path(raw: &str) -> Result<String, RevalidateError> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(RevalidateError::InvalidPath("Path is required".to_string()));
    }
    if !path.starts_with('/') {
        return Err(RevalidateError::InvalidPath(
            "Path must start with '/'".to_string(),
        ));
    }
    if path.len() > 1 {
        return Ok(path.trim_end_matches('/').to_string());
    }
    Ok(path.to_string())
}

/// Content families whose memoized listings back `path`.
fn affected_kinds(path: &str, kind: RevalidateKind) -> Vec<ContentKind> {
    let mut segments = path.trim_start_matches('/').split('/');
    let mut first = segments.next().unwrap_or("");
    if first == "api" {
        first = segments.next().unwrap_or("");
    }

    match first {
        "" if kind == RevalidateKind::Layout => ContentKind::ALL.to_vec(),
        "blog" | "blogs" | "rss.xml" => vec![ContentKind::Blogs],
        "projects" => vec![ContentKind::Projects],
        "work" | "works" => vec![ContentKind::Works],
        "sitemap.xml" => vec![ContentKind::Blogs, ContentKind::Projects],
        _ => Vec::new(),
    }
}

/// Generated documents built from the given content families.
fn derived_documents(kinds: &[ContentKind]) -> Vec<&'static str> {
    let mut documents = Vec::new();
    if kinds.contains(&ContentKind::Blogs) {
        documents.push(FEED_PATH);
    }
    if kinds.contains(&ContentKind::Blogs) || kinds.contains(&ContentKind::Projects) {
        documents.push(SITEMAP_PATH);
    }
    documents
}
