//! Error types for the todo service.
//!
//! # Design
//! Repositories return `StoreError`, which keeps "no such todo" apart from
//! "the store could not be reached". `ApiError` is the only type that knows
//! about HTTP status codes; handlers convert into it with `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Input that does not satisfy the todo schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    MissingTitle,
    #[error("title must not be blank")]
    BlankTitle,
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// Outcomes a repository reports besides success.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The id does not exist, or is not a valid id for this store.
    #[error("todo not found")]
    NotFound,

    /// The store is unreachable or failed to execute the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Startup configuration that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{alias} is set; configure the store with {canonical} instead")]
    StoreUrlAlias {
        alias: &'static str,
        canonical: &'static str,
    },
    #[error("unsupported store URL scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("store URL is empty")]
    EmptyStoreUrl,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Todo not found")]
    NotFound,

    #[error("store unavailable")]
    StoreUnavailable(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Unavailable(reason) => ApiError::StoreUnavailable(reason),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::StoreUnavailable(reason) => tracing::error!(%reason, "store request failed"),
            ApiError::Validation(err) => tracing::debug!(%err, "rejected request"),
            ApiError::NotFound => {}
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
