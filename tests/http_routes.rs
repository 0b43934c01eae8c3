use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use bytes::Bytes;
use serde_json::{Value, json};
use tower::ServiceExt;

use vitrine::application::content::ContentService;
use vitrine::application::repos::{ContentSource, SourceError};
use vitrine::application::resolver::ContentResolver;
use vitrine::application::revalidate::RevalidationService;
use vitrine::application::sitemap::SitemapService;
use vitrine::application::syndication::{SiteProfile, SyndicationService};
use vitrine::cache::{
    LoadedVideo, MemoCache, ResponseCache, VideoLoadError, VideoLoader, VideoPreloadCache,
};
use vitrine::domain::entities::{BlogRecord, ProjectRecord, WorkRecord};
use vitrine::infra::http::{HttpState, REQUEST_ID_HEADER, REVALIDATE_SECRET_HEADER, build_router};
use vitrine::infra::static_content::{blog_source, project_source};

const ATLAS_VIDEO: &str = "https://cdn.vitrine.example/videos/atlas-walkthrough.mp4";
const TTL: Duration = Duration::from_secs(300);

struct StubLoader;

#[async_trait]
impl VideoLoader for StubLoader {
    async fn load(&self, _src: &str) -> Result<LoadedVideo, VideoLoadError> {
        Ok(LoadedVideo {
            content_type: "video/mp4".to_string(),
            bytes: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
        })
    }
}
/// Live blog source that fails on its first fetch and answers afterwards.
struct RecoveringBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl ContentSource<BlogRecord> for RecoveringBackend {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn fetch(&self) -> Result<Option<Vec<BlogRecord>>, SourceError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SourceError::unavailable("backend", "connection refused"));
        }
        let live: BlogRecord = serde_json::from_value(json!({
            "slug": "live-from-backend",
            "title": "Live From Backend",
            "excerpt": "Published after the outage.",
            "coverImage": "/images/blog/live.jpg",
            "date": "2024-09-01"
        }))
        .expect("blog record");
        Ok(Some(vec![live]))
    }
}

struct TestApp {
    router: Router,
    videos: Arc<VideoPreloadCache>,
}

fn app(secret: Option<&str>) -> TestApp {
    let blogs: Arc<dyn ContentSource<BlogRecord>> = Arc::new(blog_source());
    app_with(secret, vec![blogs])
}

fn app_with(secret: Option<&str>, blogs: Vec<Arc<dyn ContentSource<BlogRecord>>>) -> TestApp {
    let projects: Arc<dyn ContentSource<ProjectRecord>> = Arc::new(project_source());
    let works: Vec<Arc<dyn ContentSource<WorkRecord>>> = Vec::new();

    let videos = Arc::new(VideoPreloadCache::new(
        Arc::new(StubLoader),
        NonZeroUsize::new(4).expect("non-zero"),
    ));
    let content = ContentService::new(
        ContentResolver::new(blogs),
        ContentResolver::new(vec![projects]),
        ContentResolver::new(works),
    );
    let site = SiteProfile {
        public_url: "https://studio.example".to_string(),
        title: "Studio Journal".to_string(),
        description: "Notes from the studio".to_string(),
    };
    let responses = Arc::new(ResponseCache::new(
        NonZeroUsize::new(16).expect("non-zero"),
        TTL,
    ));

    let state = HttpState {
        syndication: SyndicationService::new(content.clone(), site.clone()),
        sitemap: SitemapService::new(content.clone(), site),
        revalidation: RevalidationService::new(
            Arc::new(MemoCache::new()),
            Arc::clone(&responses),
            secret.map(str::to_string),
        ),
        content,
        videos: Arc::clone(&videos),
        responses,
    };

    TestApp {
        router: build_router(state),
        videos,
    }
}

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("router response")
}

async fn get(router: &Router, uri: &str) -> Response<Body> {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).expect("request"),
    )
    .await
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

fn revalidate_request(body: &str, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/revalidate")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header(REVALIDATE_SECRET_HEADER, secret);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn blogs_are_listed_newest_first() {
    let app = app(None);
    let response = get(&app.router, "/api/blogs").await;
    assert_eq!(response.status(), StatusCode::OK);

    let blogs = body_json(response).await;
    let slugs: Vec<&str> = blogs
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|blog| blog["slug"].as_str())
        .collect();
    assert_eq!(
        slugs,
        [
            "designing-for-motion",
            "design-systems-that-last",
            "kerning-matters",
            "print-is-not-dead"
        ]
    );
    assert_eq!(blogs[0]["coverImage"], "/images/blog/designing-for-motion.jpg");
}

#[tokio::test]
async fn tags_are_sorted_and_unique() {
    let app = app(None);
    let tags = body_json(get(&app.router, "/api/blogs/tags").await).await;
    assert_eq!(
        tags,
        json!([
            "Branding",
            "Design Systems",
            "Motion",
            "Print",
            "Typography",
            "UI/UX",
            "Web Development"
        ])
    );
}

#[tokio::test]
async fn blogs_filter_by_tag_slug() {
    let app = app(None);
    let blogs = body_json(get(&app.router, "/api/blogs?tag=branding").await).await;
    assert_eq!(blogs.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn detail_routes_answer_404_with_json_error() {
    let app = app(None);

    let found = get(&app.router, "/api/blogs/kerning-matters").await;
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(body_json(found).await["title"], "Kerning Matters More Than You Think");

    let missing = get(&app.router, "/api/projects/does-not-exist").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await, json!({"error": "project not found"}));
}

#[tokio::test]
async fn projects_filter_by_category() {
    let app = app(None);

    let branding = body_json(get(&app.router, "/api/projects?category=branding").await).await;
    let slugs: Vec<&str> = branding
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|project| project["slug"].as_str())
        .collect();
    assert_eq!(slugs, ["harbor-coffee-rebrand"]);

    let invalid = get(&app.router, "/api/projects?category=sculpture").await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn works_without_live_source_are_empty() {
    let app = app(None);
    let response = get(&app.router, "/api/works").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn robots_points_at_sitemap() {
    let app = app(None);
    let response = get(&app.router, "/robots.txt").await;
    assert_eq!(response.status(), StatusCode::OK);

    insta::assert_snapshot!(body_text(response).await, @r"
    User-agent: *
    Allow: /
    Sitemap: https://studio.example/sitemap.xml
    ");
}

#[tokio::test]
async fn sitemap_lists_routes_projects_blogs_and_tags() {
    let app = app(None);
    let response = get(&app.router, "/sitemap.xml").await;
    assert_eq!(response.status(), StatusCode::OK);

    let xml = body_text(response).await;
    assert!(xml.contains("<loc>https://studio.example</loc>"));
    assert!(xml.contains("<loc>https://studio.example/projects/atlas-analytics-dashboard</loc>"));
    assert!(xml.contains(
        "<loc>https://studio.example/blog/kerning-matters</loc><lastmod>2024-04-02T00:00:00Z</lastmod>"
    ));
    assert!(xml.contains("<loc>https://studio.example/blog/tag/design-systems</loc>"));
    assert_eq!(xml.matches("/blog/tag/branding").count(), 1);
}

#[tokio::test]
async fn rss_feed_is_cached_with_etag() {
    let app = app(None);

    let first = get(&app.router, "/rss.xml").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/rss+xml")
    );
    let etag = first
        .headers()
        .get(header::ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .expect("etag header");

    let xml = body_text(first).await;
    assert!(xml.contains("<rss version=\"2.0\">"));
    assert!(xml.contains("<guid>https://studio.example/blog/print-is-not-dead</guid>"));
    assert!(xml.contains("<pubDate>Tue, 02 Apr 2024 00:00:00 +0000</pubDate>"));

    let conditional = send(
        &app.router,
        Request::builder()
            .uri("/rss.xml")
            .header(header::IF_NONE_MATCH, &etag)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(conditional.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test(start_paused = true)]
async fn feed_refreshes_once_the_cached_copy_expires() {
    let live: Arc<dyn ContentSource<BlogRecord>> = Arc::new(RecoveringBackend {
        calls: AtomicUsize::new(0),
    });
    let fallback: Arc<dyn ContentSource<BlogRecord>> = Arc::new(blog_source());
    let app = app_with(None, vec![live, fallback]);

    let during_outage = body_text(get(&app.router, "/rss.xml").await).await;
    assert!(during_outage.contains("/blog/kerning-matters"));
    assert!(!during_outage.contains("live-from-backend"));

    // The backend has recovered; the JSON API sees it straight away.
    let blogs = body_json(get(&app.router, "/api/blogs").await).await;
    assert_eq!(blogs[0]["slug"], "live-from-backend");

    tokio::time::advance(TTL).await;
    let refreshed = body_text(get(&app.router, "/rss.xml").await).await;
    assert!(refreshed.contains("/blog/live-from-backend"));
    assert!(!refreshed.contains("/blog/kerning-matters"));
}

#[tokio::test]
async fn revalidate_accepts_valid_paths() {
    let app = app(None);
    let response = send(&app.router, revalidate_request(r#"{"path":"/blog","type":"layout"}"#, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"revalidated": true, "path": "/blog"})
    );
}

#[tokio::test]
async fn revalidate_rejects_bad_requests() {
    let app = app(None);

    let malformed = send(&app.router, revalidate_request("{not json", None)).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(malformed).await["error"].is_string());

    let relative = send(&app.router, revalidate_request(r#"{"path":"blog"}"#, None)).await;
    assert_eq!(relative.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(relative).await,
        json!({"error": "Path must start with '/'"})
    );
}

#[tokio::test]
async fn revalidate_requires_configured_secret() {
    let app = app(Some("s3cret"));

    let denied = send(&app.router, revalidate_request(r#"{"path":"/"}"#, None)).await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = send(
        &app.router,
        revalidate_request(r#"{"path":"/"}"#, Some("s3cret")),
    )
    .await;
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn revalidation_drops_cached_feed() {
    let app = app(None);
    let first = get(&app.router, "/rss.xml").await;
    let etag = first.headers().get(header::ETAG).cloned().expect("etag");

    let response = send(&app.router, revalidate_request(r#"{"path":"/rss.xml"}"#, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Rebuilt from the same content, so the tag is stable but served fresh.
    let again = get(&app.router, "/rss.xml").await;
    assert_eq!(again.headers().get(header::ETAG), Some(&etag));
}

#[tokio::test]
async fn health_is_no_content() {
    let app = app(None);
    assert_eq!(get(&app.router, "/_health").await.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn request_ids_are_echoed_or_generated() {
    let app = app(None);

    let echoed = send(
        &app.router,
        Request::builder()
            .uri("/_health")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(
        echoed.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()),
        Some("req-123")
    );

    let generated = get(&app.router, "/api/works").await;
    let id = generated
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .expect("request id");
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn video_route_redirects_then_serves_from_memory() {
    let app = app(None);

    let missing = get(&app.router, "/media/video").await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = get(&app.router, "/media/video?src=https%3A%2F%2Fevil.example%2Fx.mp4").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let uri = format!("/media/video?src={}", ATLAS_VIDEO.replace(':', "%3A").replace('/', "%2F"));
    let first = get(&app.router, &uri).await;
    assert_eq!(first.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        first.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some(ATLAS_VIDEO)
    );

    for _ in 0..50 {
        if app.videos.is_loaded(ATLAS_VIDEO) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(app.videos.is_loaded(ATLAS_VIDEO));

    let served = get(&app.router, &uri).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(
        served.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("video/mp4")
    );
}
