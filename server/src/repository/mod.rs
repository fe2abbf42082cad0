//! Persistence for todos.
//!
//! `TodoRepository` is the seam between the HTTP layer and the store. Each
//! operation touches exactly one document, so no multi-document transaction
//! is needed. Malformed ids are reported as `StoreError::NotFound`, never as
//! a generic failure.

mod memory;
mod mongo;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::todo::{NewTodo, TodoId, TodoItem, TodoPatch};

pub use memory::InMemoryTodoRepository;
pub use mongo::MongoTodoRepository;

#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Store a new todo and return it with its generated id and timestamp.
    async fn insert(&self, todo: NewTodo) -> StoreResult<TodoItem>;

    async fn find_by_id(&self, id: &TodoId) -> StoreResult<TodoItem>;

    /// Every todo, oldest first.
    async fn find_all(&self) -> StoreResult<Vec<TodoItem>>;

    /// Apply `patch` to the todo and return the result. An empty patch
    /// returns the stored todo unchanged.
    async fn update_partial(&self, id: &TodoId, patch: TodoPatch) -> StoreResult<TodoItem>;

    async fn delete_by_id(&self, id: &TodoId) -> StoreResult<()>;

    /// Release the connection. Called once at shutdown.
    async fn close(&self) {}
}
