//! Stateless request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url`. Each operation is a `build_*` method
//! producing an `HttpRequest` and a `parse_*` method consuming the
//! `HttpResponse`. The UI calls `list` on load and again after every
//! mutation, so the client never patches a local copy.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateTodo, Health, Todo, UpdateTodo};

#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn todos_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn todo_url(&self, id: &str) -> String {
        format!("{}/todos/{id}", self.base_url)
    }

    pub fn build_health(&self) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, format!("{}/", self.base_url))
    }

    pub fn build_list_todos(&self) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.todos_url())
    }

    pub fn build_get_todo(&self, id: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.todo_url(id))
    }

    pub fn build_create_todo(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest::json(HttpMethod::Post, self.todos_url(), body))
    }

    pub fn build_update_todo(&self, id: &str, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest::json(HttpMethod::Put, self.todo_url(id), body))
    }

    pub fn build_delete_todo(&self, id: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Delete, self.todo_url(id))
    }

    pub fn parse_health(&self, response: HttpResponse) -> Result<Health, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 201)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response, 200)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse, expected: u16) -> Result<T, ApiError> {
    check_status(&response, expected)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        status if status == expected => Ok(()),
        404 => Err(ApiError::NotFound),
        400 => {
            let detail = serde_json::from_str::<ErrorBody>(&response.body)
                .map(|body| body.detail)
                .unwrap_or_else(|_| response.body.clone());
            Err(ApiError::BadRequest { detail })
        }
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}
