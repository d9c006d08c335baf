//! JSON messages of the `oniongo.v1.TodoService` surface.
use serde::{Deserialize, Serialize};

use oniontodo_core::{Todo, TodoId, TodoStatus};

use crate::problem::RpcError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// Request shared by every method that only addresses a todo by id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoIdRequest {
    pub id: String,
}

impl TodoIdRequest {
    pub fn todo_id(&self) -> Result<TodoId, RpcError> {
        parse_todo_id(&self.id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TodoResponse {
    pub todo: TodoMessage,
}

#[derive(Debug, Serialize)]
pub struct TodosResponse {
    pub todos: Vec<TodoMessage>,
}

#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoMessage {
    pub id: String,
    pub title: String,
    pub body: String,
    pub status: &'static str,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl From<&Todo> for TodoMessage {
    fn from(todo: &Todo) -> Self {
        Self {
            id: todo.id().to_string(),
            title: todo.title().to_string(),
            body: todo.body().to_string(),
            status: status_name(todo.status()),
            created_at: todo.created_at().timestamp(),
            updated_at: todo.updated_at().timestamp(),
            completed_at: todo.completed_at().map(|at| at.timestamp()),
        }
    }
}

pub fn status_name(status: TodoStatus) -> &'static str {
    match status {
        TodoStatus::NotStarted => "TODO_STATUS_NOT_STARTED",
        TodoStatus::InProgress => "TODO_STATUS_IN_PROGRESS",
        TodoStatus::Completed => "TODO_STATUS_COMPLETED",
    }
}

pub fn parse_todo_id(raw: &str) -> Result<TodoId, RpcError> {
    raw.parse::<TodoId>()
        .map_err(|err| RpcError::invalid_argument(err.to_string()))
}
