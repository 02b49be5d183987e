use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::lib::{
    config::Settings,
    sync::types::{Credentials, SyncEngine, SyncMethod},
    tasks::{
        store::TaskStore,
        types::{Platform, SyncStatus},
    },
};

/// Accepts sync requests, runs them in the background and answers queries.
pub struct Worker {
    pub store: TaskStore,
    pub engine: Arc<SyncEngine>,
    pub settings: Settings,
    /// Credentials set at runtime; they win over the configured defaults.
    pub credentials: RwLock<Option<RegistryCredentials>>,
}

pub struct TaskServer {
    pub worker: Arc<Worker>,
    pub address: String,
    pub port: u16,
}

fn default_project() -> String {
    "library".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    /// e.g. `nginx:latest`
    pub source_image: String,
    /// e.g. `harbor.company.com`
    pub target_registry: String,
    #[serde(default = "default_project")]
    pub target_project: String,
    /// Defaults to the source name without `library/`.
    #[serde(default)]
    pub target_image_name: Option<String>,
    /// Defaults to the source tag.
    #[serde(default)]
    pub target_tag: Option<String>,
    #[serde(default = "Platform::defaults")]
    pub platforms: Vec<Platform>,
    /// Forces a strategy; otherwise the copy tool is used when present.
    #[serde(default)]
    pub method: Option<SyncMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAccepted {
    pub task_id: String,
    pub status: SyncStatus,
    pub message: String,
}

#[derive(Clone, Deserialize)]
pub struct RegistryCredentials {
    pub registry: String,
    pub username: String,
    pub password: String,
}

impl RegistryCredentials {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Environment capability report. The password is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub harbor_configured: bool,
    pub docker_available: bool,
    pub skopeo_available: bool,
    pub buildx_available: bool,
    pub default_registry: Option<String>,
    pub default_username: Option<String>,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("environment unavailable: {0}")]
    EnvironmentUnavailable(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("task {0} not found")]
    NotFound(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
