//! REST service for todos.
//!
//! # Overview
//! `routes` validates requests and maps results to HTTP, `repository` owns the
//! store connection, and `todo` defines the entity and its request schemas.
//! The binary wires them together; tests build the same router over an
//! in-memory repository.

pub mod config;
pub mod error;
pub mod repository;
pub mod routes;
pub mod todo;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::{ApiError, StoreError, ValidationError};
pub use repository::{InMemoryTodoRepository, MongoTodoRepository, TodoRepository};
pub use routes::SharedRepository;
pub use todo::{TodoId, TodoItem, TodoState};

/// The full application: routes plus request tracing and permissive CORS for
/// the browser UI.
pub fn app(repo: SharedRepository) -> Router {
    routes::router(repo)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves, drain in-flight requests, then close the
/// store. The store is closed whether or not serving failed.
pub async fn run<F>(listener: TcpListener, repo: SharedRepository, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, app(Arc::clone(&repo)))
        .with_graceful_shutdown(shutdown)
        .await;
    repo.close().await;
    served
}
