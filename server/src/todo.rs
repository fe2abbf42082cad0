//! The todo entity and the request schemas that produce it.
//!
//! # Design
//! Request bodies are deserialized into raw types (`CreateTodoRequest`,
//! `UpdateTodoRequest`) that accept anything shaped roughly right, then
//! validated into `NewTodo` / `TodoPatch`. Only validated values reach a
//! repository, so a blank title can never be persisted.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Opaque identifier assigned by the store on insert.
///
/// The request layer only carries it around; each repository backend decides
/// how to parse and render it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TodoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored todo, as returned by every read and write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TodoItem {
    pub fn state(&self) -> TodoState {
        TodoState::from(self.completed)
    }
}

/// Completion state. Either state can move to the other through an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TodoState {
    Pending,
    Completed,
}

impl From<bool> for TodoState {
    fn from(completed: bool) -> Self {
        if completed {
            TodoState::Completed
        } else {
            TodoState::Pending
        }
    }
}

impl fmt::Display for TodoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoState::Pending => f.write_str("pending"),
            TodoState::Completed => f.write_str("completed"),
        }
    }
}

/// A title that is non-empty once surrounding whitespace is removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Title(String);

impl Title {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Per-field carrier for merge-patch updates.
///
/// A field missing from the JSON body, or sent as `null`, is `Absent`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Absent => None,
            Patch::Set(value) => Some(value),
        }
    }

    fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Patch<U>, E> {
        match self {
            Patch::Absent => Ok(Patch::Absent),
            Patch::Set(value) => f(value).map(Patch::Set),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Patch::Absent, Patch::Set))
    }
}

/// Body of `POST /todos` before validation.
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl CreateTodoRequest {
    pub fn validate(self) -> Result<NewTodo, ValidationError> {
        let title = self.title.ok_or(ValidationError::MissingTitle)?;
        Ok(NewTodo {
            title: Title::parse(&title)?,
            description: self.description.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
        })
    }
}

/// A validated create payload, ready to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTodo {
    pub title: Title,
    pub description: String,
    pub completed: bool,
}

impl NewTodo {
    #[cfg(test)]
    pub(crate) fn new(title: Title) -> Self {
        Self {
            title,
            description: String::new(),
            completed: false,
        }
    }

    /// Materialize the stored item once the backend has picked an id.
    ///
    /// `created_at` is truncated to milliseconds, the precision the document
    /// store keeps.
    pub fn into_item(self, id: TodoId, created_at: DateTime<Utc>) -> TodoItem {
        TodoItem {
            id,
            title: self.title.into_inner(),
            description: self.description,
            completed: self.completed,
            created_at: created_at.trunc_subsecs(3),
        }
    }
}

/// Body of `PUT /todos/{id}` before validation. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub completed: Patch<bool>,
}

impl UpdateTodoRequest {
    pub fn validate(self) -> Result<TodoPatch, ValidationError> {
        Ok(TodoPatch {
            title: self.title.try_map(|title| Title::parse(&title))?,
            description: self.description,
            completed: self.completed,
        })
    }
}

/// A validated partial update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Patch<Title>,
    pub description: Patch<String>,
    pub completed: Patch<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_absent() && self.description.is_absent() && self.completed.is_absent()
    }

    /// Overwrite every present field of `item`; absent fields are left alone.
    pub fn apply(self, item: &mut TodoItem) {
        if let Patch::Set(title) = self.title {
            item.title = title.into_inner();
        }
        if let Patch::Set(description) = self.description {
            item.description = description;
        }
        if let Patch::Set(completed) = self.completed {
            item.completed = completed;
        }
    }
}
