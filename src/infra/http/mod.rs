mod api;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{
    content::ContentService, revalidate::RevalidationService, sitemap::SitemapService,
    syndication::SyndicationService,
};
use crate::cache::{ResponseCache, VideoPreloadCache, response_cache_layer};

pub use api::REVALIDATE_SECRET_HEADER;
pub use middleware::REQUEST_ID_HEADER;

#[derive(Clone)]
pub struct HttpState {
    pub content: ContentService,
    pub syndication: SyndicationService,
    pub sitemap: SitemapService,
    pub revalidation: RevalidationService,
    pub videos: Arc<VideoPreloadCache>,
    pub responses: Arc<ResponseCache>,
}

pub fn build_router(state: HttpState) -> Router {
    // Generated documents are buffered with an ETag until revalidated.
    let documents = Router::new()
        .route("/rss.xml", get(public::rss_feed))
        .route("/sitemap.xml", get(public::sitemap))
        .route("/robots.txt", get(public::robots_txt))
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state.responses),
            response_cache_layer,
        ));

    let api = Router::new()
        .route("/api/blogs", get(api::list_blogs))
        .route("/api/blogs/tags", get(api::list_blog_tags))
        .route("/api/blogs/{slug}", get(api::blog_detail))
        .route("/api/projects", get(api::list_projects))
        .route("/api/projects/{slug}", get(api::project_detail))
        .route("/api/works", get(api::list_works))
        .route("/api/works/{slug}", get(api::work_detail))
        .route("/api/revalidate", post(api::revalidate));

    let misc = Router::new()
        .route("/media/video", get(public::media_video))
        .route("/_health", get(public::health));

    documents
        .merge(api)
        .merge(misc)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
