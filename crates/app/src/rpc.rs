//! Handlers for the `oniongo.v1.TodoService` procedures.
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use oniontodo_core::usecase;

use crate::problem::RpcError;
use crate::router::AppState;
use crate::wire::{
    parse_todo_id, CreateTodoRequest, EmptyResponse, TodoIdRequest, TodoMessage, TodoResponse,
    TodosResponse, UpdateTodoRequest,
};

pub const CREATE_TODO: &str = "/oniongo.v1.TodoService/CreateTodo";
pub const GET_TODO: &str = "/oniongo.v1.TodoService/GetTodo";
pub const GET_TODOS: &str = "/oniongo.v1.TodoService/GetTodos";
pub const UPDATE_TODO: &str = "/oniongo.v1.TodoService/UpdateTodo";
pub const START_TODO: &str = "/oniongo.v1.TodoService/StartTodo";
pub const COMPLETE_TODO: &str = "/oniongo.v1.TodoService/CompleteTodo";
pub const DELETE_TODO: &str = "/oniongo.v1.TodoService/DeleteTodo";

fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RpcError> {
    payload
        .map(|Json(message)| message)
        .map_err(|rejection| RpcError::invalid_argument(rejection.body_text()))
}

pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoResponse>, RpcError> {
    let request = decode(payload)?;
    let todo = state
        .todos()
        .create
        .execute(usecase::CreateTodoRequest {
            title: request.title,
            body: request.body.unwrap_or_default(),
        })
        .await?;

    Ok(Json(TodoResponse {
        todo: TodoMessage::from(&todo),
    }))
}

pub async fn get_todo(
    State(state): State<AppState>,
    payload: Result<Json<TodoIdRequest>, JsonRejection>,
) -> Result<Json<TodoResponse>, RpcError> {
    let id = decode(payload)?.todo_id()?;
    let todo = state.todos().get.execute(id).await?;

    Ok(Json(TodoResponse {
        todo: TodoMessage::from(&todo),
    }))
}

// GetTodos carries no fields, so the body is not inspected.
pub async fn get_todos(State(state): State<AppState>) -> Result<Json<TodosResponse>, RpcError> {
    let todos = state.todos().get_all.execute().await?;

    Ok(Json(TodosResponse {
        todos: todos.iter().map(TodoMessage::from).collect(),
    }))
}

pub async fn update_todo(
    State(state): State<AppState>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<EmptyResponse>, RpcError> {
    let request = decode(payload)?;
    let id = parse_todo_id(&request.id)?;
    state
        .todos()
        .update
        .execute(usecase::UpdateTodoRequest {
            id,
            title: request.title,
            body: request.body.unwrap_or_default(),
        })
        .await?;

    Ok(Json(EmptyResponse::default()))
}

pub async fn start_todo(
    State(state): State<AppState>,
    payload: Result<Json<TodoIdRequest>, JsonRejection>,
) -> Result<Json<EmptyResponse>, RpcError> {
    let id = decode(payload)?.todo_id()?;
    state.todos().start.execute(id).await?;
    Ok(Json(EmptyResponse::default()))
}

pub async fn complete_todo(
    State(state): State<AppState>,
    payload: Result<Json<TodoIdRequest>, JsonRejection>,
) -> Result<Json<EmptyResponse>, RpcError> {
    let id = decode(payload)?.todo_id()?;
    state.todos().complete.execute(id).await?;
    Ok(Json(EmptyResponse::default()))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    payload: Result<Json<TodoIdRequest>, JsonRejection>,
) -> Result<Json<EmptyResponse>, RpcError> {
    let id = decode(payload)?.todo_id()?;
    state.todos().delete.execute(id).await?;
    Ok(Json(EmptyResponse::default()))
}
