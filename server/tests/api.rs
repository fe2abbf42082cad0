use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use axum::{
    http::{self, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use async_trait::async_trait;
use todo_server::error::StoreResult;
use todo_server::todo::{NewTodo, TodoPatch};
use todo_server::{app, InMemoryTodoRepository, StoreError, TodoId, TodoItem, TodoRepository};
use tower::ServiceExt;

fn test_app() -> Router {
    app(Arc::new(InMemoryTodoRepository::new()))
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn create(app: &Router, body: &str) -> TodoItem {
    let resp = send(app, json_request("POST", "/todos", body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- health ---

#[tokio::test]
async fn root_reports_running() {
    let resp = send(&test_app(), empty_request("GET", "/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["message"], "ToDo API is running!");
}

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let resp = send(&test_app(), empty_request("GET", "/todos")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<TodoItem> = body_json(resp).await;
    assert!(todos.is_empty());
}

#[tokio::test]
async fn list_todos_in_creation_order() {
    let app = test_app();
    let first = create(&app, r#"{"title":"first"}"#).await;
    let second = create(&app, r#"{"title":"second"}"#).await;

    let todos: Vec<TodoItem> = body_json(send(&app, empty_request("GET", "/todos")).await).await;
    assert_eq!(todos, vec![first, second]);
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201_with_defaults() {
    let resp = send(&test_app(), json_request("POST", "/todos", r#"{"title":"Buy milk"}"#)).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let todo: TodoItem = body_json(resp).await;
    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.description, "");
    assert!(!todo.completed);
    assert!(!todo.id.as_str().is_empty());
}

#[tokio::test]
async fn create_todo_trims_title() {
    let todo = create(&test_app(), r#"{"title":"  Buy milk  ","description":" 2 litres "}"#).await;
    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.description, " 2 litres ");
}

#[tokio::test]
async fn create_todo_blank_title_returns_400() {
    let resp = send(
        &test_app(),
        json_request("POST", "/todos", r#"{"title":"","description":"x"}"#),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "title must not be blank");
}

#[tokio::test]
async fn create_todo_missing_title_returns_400() {
    let resp = send(&test_app(), json_request("POST", "/todos", r#"{"description":"x"}"#)).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "title is required");
}

#[tokio::test]
async fn create_todo_malformed_json_returns_400() {
    let app = test_app();
    let resp = send(&app, json_request("POST", "/todos", r#"{"title":"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&app, json_request("POST", "/todos", r#"{"title":"x","completed":"yes"}"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // nothing was stored
    let todos: Vec<TodoItem> = body_json(send(&app, empty_request("GET", "/todos")).await).await;
    assert!(todos.is_empty());
}

// --- get ---

#[tokio::test]
async fn get_todo_round_trips_created_item() {
    let app = test_app();
    let created = create(&app, r#"{"title":"Write docs","description":"core spec"}"#).await;

    let resp = send(&app, empty_request("GET", &format!("/todos/{}", created.id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: TodoItem = body_json(resp).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_todo_not_found() {
    let resp = send(
        &test_app(),
        empty_request("GET", "/todos/00000000-0000-0000-0000-000000000000"),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["detail"], "Todo not found");
}

#[tokio::test]
async fn get_todo_malformed_id_returns_404() {
    let resp = send(&test_app(), empty_request("GET", "/todos/not-a-valid-id")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- update ---

#[tokio::test]
async fn update_todo_not_found() {
    let resp = send(
        &test_app(),
        json_request(
            "PUT",
            "/todos/00000000-0000-0000-0000-000000000000",
            r#"{"title":"Nope"}"#,
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_todo_blank_title_returns_400_and_keeps_item() {
    let app = test_app();
    let created = create(&app, r#"{"title":"Keep me"}"#).await;

    let resp = send(
        &app,
        json_request("PUT", &format!("/todos/{}", created.id), r#"{"title":"   "}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let fetched: TodoItem =
        body_json(send(&app, empty_request("GET", &format!("/todos/{}", created.id))).await).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn update_todo_only_touches_present_fields() {
    let app = test_app();
    let created = create(&app, r#"{"title":"Write docs","description":"core spec"}"#).await;

    let resp = send(
        &app,
        json_request(
            "PUT",
            &format!("/todos/{}", created.id),
            r#"{"description":"full spec","unknown":42}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: TodoItem = body_json(resp).await;
    assert_eq!(updated.description, "full spec");
    assert_eq!(updated.title, created.title);
    assert_eq!(updated.completed, created.completed);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.id, created.id);
}

#[tokio::test]
async fn update_todo_empty_body_is_noop() {
    let app = test_app();
    let created = create(&app, r#"{"title":"Stay the same"}"#).await;

    let resp = send(&app, json_request("PUT", &format!("/todos/{}", created.id), "{}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: TodoItem = body_json(resp).await;
    assert_eq!(updated, created);
}

#[tokio::test]
async fn toggle_completed_is_symmetric() {
    let app = test_app();
    let created = create(&app, r#"{"title":"Walk dog","description":"park"}"#).await;
    let uri = format!("/todos/{}", created.id);

    let done: TodoItem =
        body_json(send(&app, json_request("PUT", &uri, r#"{"completed":true}"#)).await).await;
    assert!(done.completed);
    assert_eq!(done.title, "Walk dog");
    assert_eq!(done.description, "park");

    let undone: TodoItem =
        body_json(send(&app, json_request("PUT", &uri, r#"{"completed":false}"#)).await).await;
    assert_eq!(undone, created);
}

// --- delete ---

#[tokio::test]
async fn delete_todo_not_found() {
    let app = test_app();
    for uri in ["/todos/00000000-0000-0000-0000-000000000000", "/todos/garbage"] {
        let resp = send(&app, empty_request("DELETE", uri)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

// --- store unavailable ---

/// A repository whose store can never be reached.
struct UnreachableStore;

fn store_down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl TodoRepository for UnreachableStore {
    async fn insert(&self, _todo: NewTodo) -> StoreResult<TodoItem> {
        store_down()
    }

    async fn find_by_id(&self, _id: &TodoId) -> StoreResult<TodoItem> {
        store_down()
    }

    async fn find_all(&self) -> StoreResult<Vec<TodoItem>> {
        store_down()
    }

    async fn update_partial(&self, _id: &TodoId, _patch: TodoPatch) -> StoreResult<TodoItem> {
        store_down()
    }

    async fn delete_by_id(&self, _id: &TodoId) -> StoreResult<()> {
        store_down()
    }
}

#[tokio::test]
async fn unreachable_store_returns_503() {
    let app = app(Arc::new(UnreachableStore));
    let uri = "/todos/00000000-0000-0000-0000-000000000000";
    let requests = [
        empty_request("GET", "/todos"),
        json_request("POST", "/todos", r#"{"title":"Buy milk"}"#),
        empty_request("GET", uri),
        json_request("PUT", uri, r#"{"completed":true}"#),
        empty_request("DELETE", uri),
    ];

    for request in requests {
        let label = format!("{} {}", request.method(), request.uri());
        let resp = send(&app, request).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE, "{label}");
        let body: serde_json::Value = body_json(resp).await;
        assert_eq!(body, serde_json::json!({"detail": "store unavailable"}), "{label}");
    }
}

#[tokio::test]
async fn unreachable_store_still_validates_first() {
    let app = app(Arc::new(UnreachableStore));
    let resp = send(&app, json_request("POST", "/todos", r#"{"title":" "}"#)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- shutdown ---

/// Records whether the store was closed.
#[derive(Default)]
struct ClosableStore {
    closed: AtomicBool,
}

#[async_trait]
impl TodoRepository for ClosableStore {
    async fn insert(&self, _todo: NewTodo) -> StoreResult<TodoItem> {
        store_down()
    }

    async fn find_by_id(&self, _id: &TodoId) -> StoreResult<TodoItem> {
        store_down()
    }

    async fn find_all(&self) -> StoreResult<Vec<TodoItem>> {
        Ok(Vec::new())
    }

    async fn update_partial(&self, _id: &TodoId, _patch: TodoPatch) -> StoreResult<TodoItem> {
        store_down()
    }

    async fn delete_by_id(&self, _id: &TodoId) -> StoreResult<()> {
        store_down()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn run_closes_store_after_shutdown() {
    let store = Arc::new(ClosableStore::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    todo_server::run(listener, store.clone(), async {}).await.unwrap();

    assert!(store.closed.load(Ordering::SeqCst));
}

// --- concurrency ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_yield_distinct_ids() {
    const N: usize = 50;
    let app = test_app();

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let body = format!(r#"{{"title":"todo {i}"}}"#);
                let resp = app.oneshot(json_request("POST", "/todos", &body)).await.unwrap();
                assert_eq!(resp.status(), StatusCode::CREATED);
                body_json::<TodoItem>(resp).await
            })
        })
        .collect();

    let mut created = HashSet::new();
    for handle in handles {
        created.insert(handle.await.unwrap().id);
    }
    assert_eq!(created.len(), N);

    let todos: Vec<TodoItem> = body_json(send(&app, empty_request("GET", "/todos")).await).await;
    let listed: HashSet<_> = todos.into_iter().map(|t| t.id).collect();
    assert_eq!(listed, created);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = test_app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/todos",
            r#"{"title":"Write docs","description":"core spec"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: TodoItem = body_json(resp).await;
    assert_eq!(created.title, "Write docs");
    assert!(!created.completed);
    let id = created.id.clone();

    // list: should contain the one todo
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/todos"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<TodoItem> = body_json(resp).await;
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].id, id);

    // update: partial: only completed
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/todos/{id}"),
            r#"{"completed":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: TodoItem = body_json(resp).await;
    assert!(updated.completed);
    assert_eq!(updated.title, "Write docs"); // unchanged
    assert_eq!(updated.description, "core spec"); // unchanged

    // update: partial: only title
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/todos/{id}"),
            r#"{"title":"Write more docs"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: TodoItem = body_json(resp).await;
    assert_eq!(updated.title, "Write more docs");
    assert!(updated.completed); // unchanged from previous update

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = body_bytes(resp).await;
    assert!(body.is_empty());

    // get after delete: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // delete again: still 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete: empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/todos"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<TodoItem> = body_json(resp).await;
    assert!(todos.is_empty());
}
