//! API client for the todo service, as used by the web UI.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network. The embedding application executes the round-trip,
//! which keeps this crate free of any HTTP stack.
//!
//! # Design
//! - `TodoClient` is stateless; it holds only the base URL.
//! - Each operation is split into `build_*` and `parse_*`.
//! - DTOs are defined independently from the server crate; the integration
//!   test catches schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::TodoClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{CreateTodo, Health, Todo, UpdateTodo};
