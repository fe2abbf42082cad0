//! HTTP handlers for `/` and `/todos`.
//!
//! Every body is validated into a `NewTodo` or `TodoPatch` before the
//! repository is called. JSON that does not parse, or has fields of the wrong
//! type, is a validation error (400) rather than axum's default 422.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ValidationError};
use crate::repository::TodoRepository;
use crate::todo::{CreateTodoRequest, TodoId, TodoItem, UpdateTodoRequest};

pub type SharedRepository = Arc<dyn TodoRepository>;

pub fn router(repo: SharedRepository) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .with_state(repo)
}

fn malformed(rejection: JsonRejection) -> ValidationError {
    ValidationError::MalformedBody(rejection.body_text())
}

#[derive(Serialize)]
struct Health {
    message: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        message: "ToDo API is running!",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_todos(State(repo): State<SharedRepository>) -> Result<Json<Vec<TodoItem>>, ApiError> {
    Ok(Json(repo.find_all().await?))
}

async fn create_todo(
    State(repo): State<SharedRepository>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoItem>), ApiError> {
    let Json(input) = payload.map_err(malformed)?;
    let todo = repo.insert(input.validate()?).await?;
    tracing::info!(id = %todo.id, "created todo");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(repo): State<SharedRepository>,
    Path(id): Path<String>,
) -> Result<Json<TodoItem>, ApiError> {
    let todo = repo.find_by_id(&TodoId::from(id)).await?;
    Ok(Json(todo))
}

async fn update_todo(
    State(repo): State<SharedRepository>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoItem>, ApiError> {
    let Json(input) = payload.map_err(malformed)?;
    let patch = input.validate()?;
    let todo = repo.update_partial(&TodoId::from(id), patch).await?;
    tracing::info!(id = %todo.id, state = %todo.state(), "updated todo");
    Ok(Json(todo))
}

async fn delete_todo(
    State(repo): State<SharedRepository>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = TodoId::from(id);
    repo.delete_by_id(&id).await?;
    tracing::info!(%id, "deleted todo");
    Ok(StatusCode::NO_CONTENT)
}
