//! Error types for the todo API client.
//!
//! # Design
//! `NotFound` and `BadRequest` get dedicated variants because callers act on
//! them (drop a stale row, show a validation banner). Every other non-2xx
//! response lands in `HttpError` with the raw status and body.

use thiserror::Error;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404: the todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the payload (400). `detail` is the server's message.
    #[error("bad request: {detail}")]
    BadRequest { detail: String },

    /// The server returned a non-2xx status other than 400 or 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}
