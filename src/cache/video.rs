//! Preload registry for video assets.
//!
//! Each source URL moves through `unseen -> loading -> loaded`. A failed load
//! drops back to `unseen` so a later `preload` can retry. Once the loaded set
//! grows past capacity, the oldest half by insertion order is evicted; access
//! recency plays no part and in-use entries are evicted too.

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::video";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedVideo {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum VideoLoadError {
    #[error("video request failed: {0}")]
    Request(String),
    #[error("video origin answered with status {0}")]
    Status(u16),
    #[error("video exceeds the {limit} byte preload limit")]
    TooLarge { limit: u64 },
}

/// Fetches the bytes behind a video source URL.
#[async_trait]
pub trait VideoLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<LoadedVideo, VideoLoadError>;
}

#[derive(Default)]
struct VideoState {
    loading: HashSet<String>,
    loaded: HashMap<String, LoadedVideo>,
    order: VecDeque<String>,
}

pub struct VideoPreloadCache {
    loader: Arc<dyn VideoLoader>,
    capacity: NonZeroUsize,
    state: Mutex<VideoState>,
}

impl VideoPreloadCache {
    pub fn new(loader: Arc<dyn VideoLoader>, capacity: NonZeroUsize) -> Self {
        Self {
            loader,
            capacity,
            state: Mutex::new(VideoState::default()),
        }
    }

    /// Start loading `src` unless it is already loaded or in flight.
    ///
    /// Returns the spawned load task, or `None` when the call was a no-op.
    /// Must be called from within a tokio runtime.
    pub fn preload(self: &Arc<Self>, src: &str) -> Option<JoinHandle<()>> {
        self.start(src, false)
    }

    /// Like [`preload`](Self::preload), but only while loaded plus in-flight
    /// entries stay within capacity. Background warming never evicts.
    pub fn warm(self: &Arc<Self>, src: &str) -> Option<JoinHandle<()>> {
        self.start(src, true)
    }

    fn start(self: &Arc<Self>, src: &str, within_capacity: bool) -> Option<JoinHandle<()>> {
        {
            let mut state = mutex_lock(&self.state, SOURCE, "preload");
            if state.loaded.contains_key(src) || state.loading.contains(src) {
                return None;
            }
            if within_capacity && state.loaded.len() + state.loading.len() >= self.capacity.get() {
                return None;
            }
            state.loading.insert(src.to_string());
        }

        let cache = Arc::clone(self);
        let src = src.to_string();
        Some(tokio::spawn(async move {
            let result = cache.loader.load(&src).await;
            cache.finish(src, result);
        }))
    }

    pub fn is_loaded(&self, src: &str) -> bool {
        mutex_lock(&self.state, SOURCE, "is_loaded")
            .loaded
            .contains_key(src)
    }

    pub fn is_loading(&self, src: &str) -> bool {
        mutex_lock(&self.state, SOURCE, "is_loading")
            .loading
            .contains(src)
    }

    pub fn get_video(&self, src: &str) -> Option<LoadedVideo> {
        mutex_lock(&self.state, SOURCE, "get_video")
            .loaded
            .get(src)
            .cloned()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn finish(&self, src: String, result: Result<LoadedVideo, VideoLoadError>) {
        let mut state = mutex_lock(&self.state, SOURCE, "finish");
        state.loading.remove(&src);

        match result {
            Ok(video) => {
                debug!(target = SOURCE, src = %src, bytes = video.bytes.len(), "video preloaded");
                if state.loaded.insert(src.clone(), video).is_none() {
                    state.order.push_back(src);
                }
                self.evict_if_needed(&mut state);
            }
            Err(err) => {
                warn!(target = SOURCE, src = %src, error = %err, "video preload failed");
            }
        }
    }

    fn evict_if_needed(&self, state: &mut VideoState) {
        let capacity = self.capacity.get();
        if state.loaded.len() <= capacity {
            return;
        }

        // A capacity of one would otherwise evict nothing.
        let evict = (capacity / 2).max(1);
        for _ in 0..evict {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.loaded.remove(&oldest);
        }
        counter!("vitrine_video_evict_total").increment(evict as u64);
        debug!(
            target = SOURCE,
            evicted = evict,
            remaining = state.loaded.len(),
            "video cache over capacity"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;

    #[derive(Default)]
    struct StubLoader {
        calls: AtomicUsize,
        fail: bool,
        release: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl VideoLoader for StubLoader {
        async fn load(&self, src: &str) -> Result<LoadedVideo, VideoLoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            if self.fail {
                return Err(VideoLoadError::Status(503));
            }
            Ok(LoadedVideo {
                content_type: "video/mp4".to_string(),
                bytes: Bytes::from(src.to_string()),
            })
        }
    }

    fn cache_with(loader: Arc<StubLoader>, capacity: usize) -> Arc<VideoPreloadCache> {
        Arc::new(VideoPreloadCache::new(
            loader,
            NonZeroUsize::new(capacity).expect("non-zero capacity"),
        ))
    }

    #[tokio::test]
    async fn repeated_preload_issues_one_load() {
        let release = Arc::new(Notify::new());
        let loader = Arc::new(StubLoader {
            release: Some(release.clone()),
            ..Default::default()
        });
        let cache = cache_with(loader.clone(), 4);

        let first = cache.preload("a.mp4").expect("load started");
        assert!(cache.preload("a.mp4").is_none());
        assert!(cache.is_loading("a.mp4"));
        assert!(!cache.is_loaded("a.mp4"));

        release.notify_one();
        first.await.expect("load task");

        assert!(cache.is_loaded("a.mp4"));
        assert!(cache.preload("a.mp4").is_none());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.get_video("a.mp4").map(|video| video.bytes),
            Some(Bytes::from("a.mp4"))
        );
    }

    #[tokio::test]
    async fn failed_load_can_be_retried() {
        let loader = Arc::new(StubLoader {
            fail: true,
            ..Default::default()
        });
        let cache = cache_with(loader.clone(), 4);

        cache.preload("b.mp4").expect("started").await.expect("task");
        assert!(!cache.is_loaded("b.mp4"));
        assert!(!cache.is_loading("b.mp4"));

        cache.preload("b.mp4").expect("retry").await.expect("task");
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn warming_stops_at_capacity_instead_of_evicting() {
        let loader = Arc::new(StubLoader::default());
        let cache = cache_with(loader.clone(), 2);

        for _ in 0..3 {
            for src in ["a.mp4", "b.mp4", "c.mp4"] {
                if let Some(task) = cache.warm(src) {
                    task.await.expect("task");
                }
            }
        }

        assert!(cache.is_loaded("a.mp4"));
        assert!(cache.is_loaded("b.mp4"));
        assert!(!cache.is_loaded("c.mp4"));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);

        // An explicit request still gets its video, evicting the oldest.
        cache.preload("c.mp4").expect("started").await.expect("task");
        assert!(cache.is_loaded("c.mp4"));
        assert!(!cache.is_loaded("a.mp4"));
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_half_by_insertion_order() {
        let loader = Arc::new(StubLoader::default());
        let capacity = 6;
        let cache = cache_with(loader, capacity);

        for index in 0..=capacity {
            let src = format!("clip-{index}.mp4");
            cache.preload(&src).expect("started").await.expect("task");
            // Reading an entry does not protect it from eviction.
            assert!(cache.get_video("clip-0.mp4").is_some() || index == capacity);
        }

        let evicted = capacity / 2;
        for index in 0..=capacity {
            let src = format!("clip-{index}.mp4");
            assert_eq!(cache.is_loaded(&src), index >= evicted, "{src}");
        }
        assert_eq!(cache.len(), capacity + 1 - evicted);
    }
}
