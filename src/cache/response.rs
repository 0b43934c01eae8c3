//! Buffered response cache for generated documents (feed, sitemap, robots).
//!
//! Entries are keyed by request path and carry a SHA-256 `ETag`. An entry is
//! served only while younger than the cache TTL, the same window the memo
//! cache gives live content. Revalidation drops a single path or every path
//! beneath a prefix.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use lru::LruCache;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::response";

#[derive(Debug, Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    etag: String,
    captured: Instant,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let etag = format!("\"{}\"", hex::encode(Sha256::digest(&body)));
        let stored_headers = headers
            .iter()
            .filter(|(name, _)| *name != header::ETAG)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers: stored_headers,
            body,
            etag,
            captured: Instant::now(),
        }
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        if let Ok(etag) = HeaderValue::from_str(&self.etag) {
            headers.insert(header::ETAG, etag);
        }

        response
    }

    fn not_modified(&self) -> Response {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        if let Ok(etag) = HeaderValue::from_str(&self.etag) {
            response.headers_mut().insert(header::ETAG, etag);
        }
        response
    }
}

pub struct ResponseCache {
    entries: Mutex<LruCache<String, CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(limit: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(limit)),
            ttl,
        }
    }

    /// Fresh entry for `path`. Expired entries are dropped on the way out.
    pub fn get(&self, path: &str) -> Option<CachedResponse> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = entries.peek(path)?.captured.elapsed() >= self.ttl;
        if expired {
            entries.pop(path);
            debug!(target = SOURCE, path, "cached response expired");
            return None;
        }
        entries.get(path).cloned()
    }

    pub fn put(&self, path: impl Into<String>, response: CachedResponse) {
        mutex_lock(&self.entries, SOURCE, "put").put(path.into(), response);
    }

    /// Drop the entry for exactly `path`.
    pub fn invalidate_path(&self, path: &str) -> bool {
        mutex_lock(&self.entries, SOURCE, "invalidate_path")
            .pop(path)
            .is_some()
    }

    /// Drop `prefix` and every path nested beneath it.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = mutex_lock(&self.entries, SOURCE, "invalidate_prefix");
        let doomed: Vec<String> = entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| path_is_under(key, prefix))
            .cloned()
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn path_is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let mut rebuilt = Response::from_parts(parts, Body::from(bytes));
            if let Ok(etag) = HeaderValue::from_str(cached.etag()) {
                rebuilt.headers_mut().insert(header::ETAG, etag);
            }
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}

/// Serve GET requests from the cache, honouring `If-None-Match`, and store
/// successful misses.
pub async fn response_cache_layer(
    State(cache): State<Arc<ResponseCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let if_none_match = request
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if let Some(cached) = cache.get(&path) {
        debug!(target = SOURCE, path = %path, outcome = "hit", "serving cached response");
        if if_none_match.as_deref() == Some(cached.etag()) {
            return cached.not_modified();
        }
        return cached.into_response();
    }

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    match buffer_response(response).await {
        Ok((rebuilt, cached)) => {
            debug!(target = SOURCE, path = %path, outcome = "miss", "caching response");
            cache.put(path, cached);
            rebuilt
        }
        Err((rebuilt, error)) => {
            warn!(target = SOURCE, path = %path, error = %error, "response not cached");
            rebuilt
        }
    }
}
