//! Generated documents, video delivery and health.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::application::error::HttpError;
use crate::cache::LoadedVideo;

use super::HttpState;

const VIDEO_SOURCE: &str = "infra::http::public::video";

pub(super) async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(super) async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => text_response(body, "application/xml"),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn rss_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.rss_feed().await {
        Ok(body) => text_response(body, "application/rss+xml"),
        Err(err) => err.into_response(),
    }
}

pub(super) async fn robots_txt(State(state): State<HttpState>) -> Response {
    text_response(state.sitemap.robots_txt(), "text/plain; charset=utf-8")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct VideoQuery {
    src: Option<String>,
}

/// Serve a preloaded video from memory, or redirect to the origin while a
/// preload is queued. Only videos referenced by content are accepted.
pub(super) async fn media_video(
    State(state): State<HttpState>,
    Query(query): Query<VideoQuery>,
) -> Response {
    let Some(src) = query.src.filter(|src| !src.trim().is_empty()) else {
        return HttpError::new(
            VIDEO_SOURCE,
            StatusCode::BAD_REQUEST,
            "Missing src",
            "`src` query parameter is required",
        )
        .into_response();
    };

    if !Url::parse(&src).is_ok_and(|url| matches!(url.scheme(), "http" | "https")) {
        return HttpError::new(
            VIDEO_SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid src",
            format!("`{src}` is not an absolute http(s) URL"),
        )
        .into_response();
    }

    if let Some(video) = state.videos.get_video(&src) {
        debug!(target = VIDEO_SOURCE, src = %src, "serving preloaded video");
        return video_response(video);
    }

    match state.content.video_sources().await {
        Ok(known) if known.iter().any(|candidate| candidate == &src) => {
            state.videos.preload(&src);
            Redirect::temporary(&src).into_response()
        }
        Ok(_) => HttpError::new(
            VIDEO_SOURCE,
            StatusCode::NOT_FOUND,
            "Unknown video",
            format!("`{src}` is not referenced by any project or work"),
        )
        .into_response(),
        Err(err) => err.into_response(),
    }
}

fn video_response(video: LoadedVideo) -> Response {
    let length = video.bytes.len();
    let mut response = Response::new(Body::from(video.bytes));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&video.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
    response
}

fn text_response(body: String, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
