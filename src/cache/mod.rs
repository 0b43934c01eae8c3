//! In-process caches.
//!
//! - **Memo cache**: time-boxed get-or-fetch memoization for live content.
//! - **Video preload cache**: bounded registry of downloaded video assets.
//! - **Response cache**: buffered feed/sitemap/robots bodies with ETags.
//!
//! All three are constructed once at start-up and shared through `Arc`.

mod lock;
mod memo;
pub mod response;
mod video;

pub use memo::MemoCache;
pub use response::{CachedResponse, ResponseCache, response_cache_layer};
pub use video::{LoadedVideo, VideoLoadError, VideoLoader, VideoPreloadCache};
