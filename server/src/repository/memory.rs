use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::TodoRepository;
use crate::error::{StoreError, StoreResult};
use crate::todo::{NewTodo, TodoId, TodoItem, TodoPatch};

/// Process-local store keyed by UUID v4. Selected with a `memory://` URL.
#[derive(Default)]
pub struct InMemoryTodoRepository {
    inner: RwLock<Collection>,
}

#[derive(Default)]
struct Collection {
    next_seq: u64,
    docs: HashMap<Uuid, Stored>,
}

struct Stored {
    seq: u64,
    item: TodoItem,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_id(id: &TodoId) -> StoreResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| StoreError::NotFound)
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn insert(&self, todo: NewTodo) -> StoreResult<TodoItem> {
        let uuid = Uuid::new_v4();
        let item = todo.into_item(TodoId::from(uuid.to_string()), Utc::now());
        let mut collection = self.inner.write().await;
        let seq = collection.next_seq;
        collection.next_seq += 1;
        collection.docs.insert(
            uuid,
            Stored {
                seq,
                item: item.clone(),
            },
        );
        Ok(item)
    }

    async fn find_by_id(&self, id: &TodoId) -> StoreResult<TodoItem> {
        let uuid = parse_id(id)?;
        let collection = self.inner.read().await;
        collection
            .docs
            .get(&uuid)
            .map(|stored| stored.item.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn find_all(&self) -> StoreResult<Vec<TodoItem>> {
        let collection = self.inner.read().await;
        let mut stored: Vec<&Stored> = collection.docs.values().collect();
        stored.sort_by_key(|s| s.seq);
        Ok(stored.into_iter().map(|s| s.item.clone()).collect())
    }

    async fn update_partial(&self, id: &TodoId, patch: TodoPatch) -> StoreResult<TodoItem> {
        let uuid = parse_id(id)?;
        let mut collection = self.inner.write().await;
        let stored = collection.docs.get_mut(&uuid).ok_or(StoreError::NotFound)?;
        patch.apply(&mut stored.item);
        Ok(stored.item.clone())
    }

    async fn delete_by_id(&self, id: &TodoId) -> StoreResult<()> {
        let uuid = parse_id(id)?;
        let mut collection = self.inner.write().await;
        collection
            .docs
            .remove(&uuid)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
