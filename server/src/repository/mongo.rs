use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::{ClientOptions, ReturnDocument},
    Client, Collection,
};
use serde::{Deserialize, Serialize};

use super::TodoRepository;
use crate::error::{StoreError, StoreResult};
use crate::todo::{NewTodo, TodoId, TodoItem, TodoPatch};

const COLLECTION: &str = "todos";

/// Todos kept in a MongoDB collection, one document per todo.
///
/// Ids are ObjectIds rendered as 24 hex characters.
pub struct MongoTodoRepository {
    client: Client,
    todos: Collection<TodoDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TodoDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: bool,
    created_at: BsonDateTime,
}

impl TodoDocument {
    fn from_item(id: ObjectId, item: &TodoItem) -> Self {
        Self {
            id,
            title: item.title.clone(),
            description: Some(item.description.clone()),
            completed: item.completed,
            created_at: BsonDateTime::from_millis(item.created_at.timestamp_millis()),
        }
    }

    fn into_item(self) -> TodoItem {
        TodoItem {
            id: TodoId::from(self.id.to_hex()),
            title: self.title,
            description: self.description.unwrap_or_default(),
            completed: self.completed,
            created_at: DateTime::<Utc>::from(self.created_at.to_system_time()),
        }
    }
}

fn parse_id(id: &TodoId) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id.as_str()).map_err(|_| StoreError::NotFound)
}

fn unavailable(err: mongodb::error::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// The `$set` document for the fields present in `patch`.
fn set_document(patch: &TodoPatch) -> Document {
    let mut set = Document::new();
    if let Some(title) = patch.title.as_set() {
        set.insert("title", title.as_str());
    }
    if let Some(description) = patch.description.as_set() {
        set.insert("description", description.as_str());
    }
    if let Some(completed) = patch.completed.as_set() {
        set.insert("completed", *completed);
    }
    set
}

impl MongoTodoRepository {
    /// Open a client and ping the deployment.
    ///
    /// Server selection and connect attempts give up after `timeout`, so an
    /// unreachable store fails startup instead of hanging it.
    pub async fn connect(url: &str, database: &str, timeout: Duration) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(url).await.map_err(unavailable)?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(unavailable)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await.map_err(unavailable)?;
        tracing::info!(database, collection = COLLECTION, "connected to document store");

        Ok(Self {
            todos: db.collection(COLLECTION),
            client,
        })
    }
}

#[async_trait]
impl TodoRepository for MongoTodoRepository {
    async fn insert(&self, todo: NewTodo) -> StoreResult<TodoItem> {
        let oid = ObjectId::new();
        let item = todo.into_item(TodoId::from(oid.to_hex()), Utc::now());
        self.todos
            .insert_one(TodoDocument::from_item(oid, &item))
            .await
            .map_err(unavailable)?;
        Ok(item)
    }

    async fn find_by_id(&self, id: &TodoId) -> StoreResult<TodoItem> {
        let oid = parse_id(id)?;
        self.todos
            .find_one(doc! { "_id": oid })
            .await
            .map_err(unavailable)?
            .map(TodoDocument::into_item)
            .ok_or(StoreError::NotFound)
    }

    async fn find_all(&self) -> StoreResult<Vec<TodoItem>> {
        let cursor = self
            .todos
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await
            .map_err(unavailable)?;
        let docs: Vec<TodoDocument> = cursor.try_collect().await.map_err(unavailable)?;
        Ok(docs.into_iter().map(TodoDocument::into_item).collect())
    }

    async fn update_partial(&self, id: &TodoId, patch: TodoPatch) -> StoreResult<TodoItem> {
        let oid = parse_id(id)?;
        if patch.is_empty() {
            return self.find_by_id(id).await;
        }
        self.todos
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set_document(&patch) })
            .return_document(ReturnDocument::After)
            .await
            .map_err(unavailable)?
            .map(TodoDocument::into_item)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_id(&self, id: &TodoId) -> StoreResult<()> {
        let oid = parse_id(id)?;
        let result = self
            .todos
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(unavailable)?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        tracing::info!("document store connection closed");
    }
}
