use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;

use oniontodo_core::usecase::{Clock, TodoUseCases};
use oniontodo_storage::{Database, SqliteTodoRepository, SqliteTransactionRunner};

use crate::{interceptor, rpc, telemetry};

pub type TodoService = TodoUseCases<SqliteTodoRepository, SqliteTransactionRunner>;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    todos: Arc<TodoService>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: &Database, clock: Clock) -> Self {
        let todos = TodoUseCases::new(storage.todos(), storage.transactions(), clock);
        Self {
            metrics,
            todos: Arc::new(todos),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn todos(&self) -> &TodoService {
        &self.todos
    }
}

pub fn app_router(state: AppState) -> Router {
    let rpc_routes = Router::new()
        .route(rpc::CREATE_TODO, post(rpc::create_todo))
        .route(rpc::GET_TODO, post(rpc::get_todo))
        .route(rpc::GET_TODOS, post(rpc::get_todos))
        .route(rpc::UPDATE_TODO, post(rpc::update_todo))
        .route(rpc::START_TODO, post(rpc::start_todo))
        .route(rpc::COMPLETE_TODO, post(rpc::complete_todo))
        .route(rpc::DELETE_TODO, post(rpc::delete_todo))
        .route_layer(middleware::from_fn(interceptor::log_rpc));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(rpc_routes)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use oniontodo_core::usecase::system_clock;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn setup_app() -> Router {
        let metrics = telemetry::init_metrics().expect("metrics init");

        let database = Database::connect("sqlite::memory:")
            .await
            .expect("connect");
        database.run_migrations().await.expect("migrations");

        app_router(AppState::new(metrics, &database, system_clock()))
    }

    async fn call(app: &Router, procedure: &str, body: Value) -> (StatusCode, Value) {
        call_raw(app, procedure, body.to_string()).await
    }

    async fn call_raw(app: &Router, procedure: &str, body: String) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(procedure)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        let status = response.status();
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let value = serde_json::from_slice(&collected.to_bytes()).expect("json body");
        (status, value)
    }

    async fn create(app: &Router, title: &str, body: &str) -> String {
        let (status, value) =
            call(app, rpc::CREATE_TODO, json!({ "title": title, "body": body })).await;
        assert_eq!(status, StatusCode::OK, "create failed: {value}");
        value["todo"]["id"].as_str().expect("id").to_string()
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = setup_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = setup_app().await;
        call(&app, rpc::GET_TODOS, json!({})).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
        assert!(body.contains("rpc_requests_total"));
    }

    #[tokio::test]
    async fn buy_milk_goes_through_full_lifecycle() {
        let app = setup_app().await;
        let id = create(&app, "Buy milk", "2%").await;

        let (status, _) = call(&app, rpc::START_TODO, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, rpc::COMPLETE_TODO, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, value) = call(&app, rpc::GET_TODO, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::OK);
        let todo = &value["todo"];
        assert_eq!(todo["title"], "Buy milk");
        assert_eq!(todo["body"], "2%");
        assert_eq!(todo["status"], "TODO_STATUS_COMPLETED");
        assert!(todo["completedAt"].as_i64().is_some());
        assert!(todo["updatedAt"].as_i64() >= todo["createdAt"].as_i64());
    }

    #[tokio::test]
    async fn empty_title_is_invalid_argument_and_not_stored() {
        let app = setup_app().await;

        let (status, value) =
            call(&app, rpc::CREATE_TODO, json!({ "title": "", "body": "x" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "invalid_argument");
        assert_eq!(value["message"], "title: title is required");

        let (status, value) = call(&app, rpc::GET_TODOS, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["todos"], json!([]));
    }

    #[tokio::test]
    async fn get_todos_lists_in_creation_order() {
        let app = setup_app().await;
        let first = create(&app, "first", "").await;
        let second = create(&app, "second", "").await;

        let (_, value) = call(&app, rpc::GET_TODOS, json!({})).await;
        let ids: Vec<&str> = value["todos"]
            .as_array()
            .expect("todos array")
            .iter()
            .map(|todo| todo["id"].as_str().expect("id"))
            .collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = setup_app().await;
        let unknown = "0190a0f4-4b7c-7c3e-8000-000000000000";

        for procedure in [rpc::GET_TODO, rpc::START_TODO, rpc::COMPLETE_TODO, rpc::DELETE_TODO] {
            let (status, value) = call(&app, procedure, json!({ "id": unknown })).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{procedure}");
            assert_eq!(value["code"], "not_found");
        }
    }

    #[tokio::test]
    async fn malformed_id_is_invalid_argument() {
        let app = setup_app().await;

        let (status, value) = call(&app, rpc::GET_TODO, json!({ "id": "invalid-uuid" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "invalid_argument");
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_argument() {
        let app = setup_app().await;

        let (status, value) = call_raw(&app, rpc::CREATE_TODO, "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "invalid_argument");
    }

    #[tokio::test]
    async fn completed_todo_rejects_further_transitions() {
        let app = setup_app().await;
        let id = create(&app, "Finish me", "").await;
        let (status, _) = call(&app, rpc::COMPLETE_TODO, json!({ "id": id })).await;
        assert_eq!(status, StatusCode::OK);

        for procedure in [rpc::COMPLETE_TODO, rpc::START_TODO] {
            let (status, value) = call(&app, procedure, json!({ "id": id })).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{procedure}");
            assert_eq!(value["code"], "failed_precondition");
        }

        let (_, value) = call(&app, rpc::GET_TODO, json!({ "id": id })).await;
        assert_eq!(value["todo"]["status"], "TODO_STATUS_COMPLETED");
    }

    #[tokio::test]
    async fn update_replaces_fields_and_rejects_empty_title() {
        let app = setup_app().await;
        let id = create(&app, "Draft", "first body").await;

        let (status, _) = call(
            &app,
            rpc::UPDATE_TODO,
            json!({ "id": id, "title": "Final", "body": "second body" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, value) = call(
            &app,
            rpc::UPDATE_TODO,
            json!({ "id": id, "title": "", "body": "lost body" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], "invalid_argument");

        let (_, value) = call(&app, rpc::GET_TODO, json!({ "id": id })).await;
        assert_eq!(value["todo"]["title"], "Final");
        assert_eq!(value["todo"]["body"], "second body");
    }

    #[tokio::test]
    async fn deleted_todo_disappears() {
        let app = setup_app().await;
        let keep = create(&app, "keep", "").await;
        let gone = create(&app, "gone", "").await;

        let (status, _) = call(&app, rpc::DELETE_TODO, json!({ "id": gone })).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, rpc::GET_TODO, json!({ "id": gone })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, value) = call(&app, rpc::GET_TODOS, json!({})).await;
        let todos = value["todos"].as_array().expect("todos array");
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0]["id"], keep.as_str());
    }
}
