use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::{info, warn};

use super::types::{
    ConfigResponse, RegistryCredentials, SyncAccepted, SyncRequest, TaskServer, Worker,
    WorkerError,
};
use crate::lib::{config::Settings, tasks::types::SyncProgress};

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkerError::EnvironmentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            WorkerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WorkerError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl TaskServer {
    pub fn new(worker: Arc<Worker>, address: &str, port: u16) -> Self {
        Self {
            worker,
            address: address.to_string(),
            port,
        }
    }

    async fn root() -> Json<Value> {
        Json(json!({
            "name": "Docker Image Sync API",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    async fn health() -> Json<Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn get_config(AxumState(worker): AxumState<Arc<Worker>>) -> Json<ConfigResponse> {
        Json(worker.environment().await)
    }

    async fn set_harbor_config(
        AxumState(worker): AxumState<Arc<Worker>>,
        Json(credentials): Json<RegistryCredentials>,
    ) -> Json<Value> {
        let message = worker.configure_credentials(credentials).await;
        Json(json!({ "status": "ok", "message": message }))
    }

    async fn start_sync(
        AxumState(worker): AxumState<Arc<Worker>>,
        Json(request): Json<SyncRequest>,
    ) -> Result<Json<SyncAccepted>, WorkerError> {
        worker.submit(request).await.map(Json)
    }

    async fn get_sync_progress(
        AxumState(worker): AxumState<Arc<Worker>>,
        Path(task_id): Path<String>,
    ) -> Result<Json<SyncProgress>, WorkerError> {
        worker.progress(&task_id).await.map(Json)
    }

    async fn list_tasks(AxumState(worker): AxumState<Arc<Worker>>) -> Json<Value> {
        Json(json!({ "tasks": worker.list().await }))
    }

    /// Browser access for the configured frontend and local dev servers.
    /// Credentials are allowed, so methods and headers mirror the preflight
    /// request instead of using a wildcard.
    fn cors_layer(settings: &Settings) -> CorsLayer {
        let mut origins = Vec::new();
        for origin in settings.allowed_origins() {
            match origin.parse::<HeaderValue>() {
                Ok(value) if value != "*" => origins.push(value),
                _ => warn!(origin = %origin, "ignoring invalid CORS origin"),
            }
        }

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }

    pub fn router(worker: Arc<Worker>) -> Router {
        let cors = TaskServer::cors_layer(&worker.settings);
        let api = Router::new()
            .route("/health", get(TaskServer::health))
            .route("/config", get(TaskServer::get_config))
            .route("/config/harbor", post(TaskServer::set_harbor_config))
            .route("/sync", post(TaskServer::start_sync))
            .route("/sync/{task_id}", get(TaskServer::get_sync_progress))
            .route("/tasks", get(TaskServer::list_tasks));

        Router::new()
            .route("/", get(TaskServer::root))
            .nest("/api", api)
            .layer(cors)
            .with_state(worker)
    }

    pub async fn start_server(self) -> std::io::Result<()> {
        let address = format!("{}:{}", self.address, self.port);
        let app = TaskServer::router(self.worker);

        let listener = TcpListener::bind(&address).await?;
        info!(address = %address, "listening");
        axum::serve(listener, app).await
    }
}
