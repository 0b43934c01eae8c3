//! Time-boxed get-or-fetch memoization keyed by string.
//!
//! Values are stored type-erased and cloned out on read. An entry is served
//! only while `now - captured < ttl`; anything older is refetched. Failed
//! fetches are never stored, so the next caller retries cold.
//!
//! Concurrent misses on the same key are funnelled through a per-key gate:
//! the first caller fetches, later callers wait and then read its result.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use metrics::counter;
use regex::Regex;
use tokio::time::Instant;
use tracing::debug;

use super::lock::{mutex_lock, rw_read, rw_write};

const SOURCE: &str = "cache::memo";

struct MemoEntry {
    value: Arc<dyn Any + Send + Sync>,
    captured: Instant,
}

#[derive(Default)]
pub struct MemoCache {
    entries: RwLock<HashMap<String, MemoEntry>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key` when it is younger than `ttl`.
    pub fn get<T>(&self, key: &str, ttl: Duration) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = rw_read(&self.entries, SOURCE, "get");
        let entry = entries.get(key)?;
        if entry.captured.elapsed() >= ttl {
            return None;
        }
        match entry.value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                debug!(
                    target = SOURCE,
                    key,
                    expected = std::any::type_name::<T>(),
                    "cached value has a different type, treating as miss"
                );
                None
            }
        }
    }

    /// Serve `key` from cache or run `fetcher` once and remember its result.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key, ttl) {
            counter!("vitrine_memo_hit_total").increment(1);
            return Ok(value);
        }

        let gate = self.gate(key);
        let guard = gate.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(value) = self.get::<T>(key, ttl) {
            counter!("vitrine_memo_hit_total").increment(1);
            drop(guard);
            self.release_gate(key, gate);
            return Ok(value);
        }

        counter!("vitrine_memo_miss_total").increment(1);
        let result = fetcher().await;
        if let Ok(value) = &result {
            self.insert(key, value.clone());
        }

        drop(guard);
        self.release_gate(key, gate);
        result
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert<T>(&self, key: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        rw_write(&self.entries, SOURCE, "insert").insert(
            key.to_string(),
            MemoEntry {
                value: Arc::new(value),
                captured: Instant::now(),
            },
        );
    }

    /// Remove one exact key. Returns whether an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        rw_write(&self.entries, SOURCE, "invalidate")
            .remove(key)
            .is_some()
    }

    /// Remove every key matching a glob pattern where `*` matches any run of
    /// characters. Returns the number of entries removed.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        let Some(matcher) = glob_to_regex(pattern) else {
            return 0;
        };
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_matching");
        let before = entries.len();
        entries.retain(|key, _| !matcher.is_match(key));
        before - entries.len()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        mutex_lock(&self.in_flight, SOURCE, "gate")
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn release_gate(&self, key: &str, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = mutex_lock(&self.in_flight, SOURCE, "release_gate");
        // The map holds one reference and `gate` another; anything beyond
        // that is a waiter that still needs the entry.
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(key);
        }
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).ok()
}
