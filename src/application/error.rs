use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use vitrine_api_types::ErrorBody;

use crate::{
    application::{revalidate::RevalidateError, schema::SchemaError},
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Diagnostic detail attached to a response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// JSON error response pairing a public message with a private report.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message: public_message.into(),
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message: public_message.into(),
            report: ErrorReport::from_error(source, status, error),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorBody::new(self.public_message))).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<RevalidateError> for HttpError {
    fn from(error: RevalidateError) -> Self {
        match error {
            RevalidateError::Unauthorized => HttpError::new(
                "application::error::revalidate_error_to_http_error",
                StatusCode::UNAUTHORIZED,
                "Invalid token",
                "Revalidation secret missing or mismatched",
            ),
            RevalidateError::InvalidPath(message) => HttpError::new(
                "application::error::revalidate_error_to_http_error",
                StatusCode::BAD_REQUEST,
                message.clone(),
                message,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Infra(InfraError::Database { .. })
            | AppError::Infra(InfraError::Backend { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Infra(_) | AppError::Schema(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn presentation_message(&self) -> String {
        match self {
            AppError::Domain(DomainError::NotFound { entity }) => format!("{entity} not found"),
            AppError::Domain(DomainError::Validation { message }) => message.clone(),
            AppError::Validation(message) => message.clone(),
            AppError::Infra(InfraError::Database { .. })
            | AppError::Infra(InfraError::Backend { .. }) => {
                "Service temporarily unavailable".to_string()
            }
            AppError::Infra(InfraError::Configuration { .. }) => {
                "Service misconfigured".to_string()
            }
            AppError::Schema(_) => "Content failed validation".to_string(),
            AppError::Infra(_) | AppError::Unexpected(_) => {
                "Unexpected error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        HttpError::from_error(
            "application::error::AppError",
            status,
            self.presentation_message(),
            &self,
        )
        .into_response()
    }
}
