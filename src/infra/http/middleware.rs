use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const TARGET: &str = "vitrine::http::response";

/// Tag the request with an id, echo it back in `x-request-id` and run the
/// rest of the stack inside a span carrying it.
pub async fn set_request_context(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = info_span!("request", request_id = %request_id);

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Log every 4xx/5xx with the diagnostic report the handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let report = response.extensions_mut().remove::<ErrorReport>();
        log_failure(&method, &uri, status, started, report);
    }
    response
}

fn log_failure(
    method: &Method,
    uri: &Uri,
    status: StatusCode,
    started: Instant,
    report: Option<ErrorReport>,
) {
    let elapsed_ms = started.elapsed().as_millis();
    let (source, messages) = report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("router", Vec::new()));
    let detail = messages.first().map(String::as_str).unwrap_or("no report");

    if status.is_server_error() {
        error!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = uri.path(),
            elapsed_ms,
            source,
            detail,
            chain = ?messages,
            "request failed"
        );
    } else {
        warn!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            path = uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source,
            detail,
            "request rejected"
        );
    }
}
