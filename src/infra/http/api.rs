//! JSON content API and the revalidation endpoint.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use vitrine_api_types::RevalidateRequest;

use crate::application::error::{AppError, HttpError};
use crate::domain::types::ProjectCategory;

use super::HttpState;

/// Header carrying the shared revalidation secret.
pub const REVALIDATE_SECRET_HEADER: &str = "x-revalidate-secret";

const REVALIDATE_SOURCE: &str = "infra::http::api::revalidate";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct BlogQuery {
    tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ProjectQuery {
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SecretQuery {
    secret: Option<String>,
}

fn json_or_error<T: Serialize>(result: Result<T, AppError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => err.into_response(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(super) async fn list_blogs(
    State(state): State<HttpState>,
    Query(query): Query<BlogQuery>,
) -> Response {
    let result = match non_empty(query.tag) {
        Some(tag) => state.content.get_blogs_by_tag(&tag).await,
        None => state.content.get_blogs().await,
    };
    json_or_error(result)
}

pub(super) async fn list_blog_tags(State(state): State<HttpState>) -> Response {
    json_or_error(state.content.get_all_blog_tags().await)
}

pub(super) async fn blog_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Response {
    json_or_error(state.content.get_blog_by_slug(&slug).await)
}

pub(super) async fn list_projects(
    State(state): State<HttpState>,
    Query(query): Query<ProjectQuery>,
) -> Response {
    let category = match non_empty(query.category)
        .map(|value| value.parse::<ProjectCategory>())
        .transpose()
    {
        Ok(category) => category,
        Err(err) => return AppError::from(err).into_response(),
    };
    json_or_error(state.content.get_projects(category).await)
}

pub(super) async fn project_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Response {
    json_or_error(state.content.get_project_by_slug(&slug).await)
}

pub(super) async fn list_works(State(state): State<HttpState>) -> Response {
    json_or_error(state.content.get_works().await)
}

pub(super) async fn work_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Response {
    json_or_error(state.content.get_work_by_slug(&slug).await)
}

pub(super) async fn revalidate(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
    payload: Result<Json<RevalidateRequest>, JsonRejection>,
) -> Response {
    let provided = headers
        .get(REVALIDATE_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or(query.secret);
    if let Err(err) = state.revalidation.authorize(provided.as_deref()) {
        return HttpError::from(err).into_response();
    }

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return HttpError::new(
                REVALIDATE_SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid request body",
                rejection.body_text(),
            )
            .into_response();
        }
    };

    match state.revalidation.revalidate(request) {
        Ok(response) => Json(response).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
