use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{
    ConfigResponse, RegistryCredentials, SyncAccepted, SyncRequest, Worker, WorkerError,
    WorkerResult,
};
use crate::lib::{
    command::probe::{check_tools, docker_available, skopeo_available},
    config::Settings,
    image::reference::ImageReference,
    sync::types::{Credentials, SyncEngine, SyncJob, SyncMethod, select_method},
    tasks::{
        store::TaskStore,
        types::{SyncProgress, SyncStatus, Task, TaskSummary},
    },
};

impl Worker {
    pub fn new(settings: Settings) -> Self {
        Worker {
            store: TaskStore::new(),
            engine: Arc::new(SyncEngine::new(settings.tools())),
            settings,
            credentials: RwLock::new(None),
        }
    }

    /// Creates a pending task, schedules its run and returns at once.
    pub async fn submit(&self, request: SyncRequest) -> WorkerResult<SyncAccepted> {
        validate(&request)?;

        let timeout = self.settings.probe_timeout();
        let tools = &self.engine.tools;
        if !docker_available(&tools.docker, timeout).await {
            return Err(WorkerError::EnvironmentUnavailable(
                "docker is not installed or not running".to_string(),
            ));
        }

        let skopeo = match request.method {
            Some(SyncMethod::Docker) => false,
            _ => skopeo_available(&tools.skopeo, timeout).await,
        };
        let method = select_method(request.method, skopeo).ok_or_else(|| {
            WorkerError::EnvironmentUnavailable("skopeo is not installed".to_string())
        })?;

        let source = ImageReference::parse(&request.source_image);
        let target_image = target_image(&request, &source);
        let job = SyncJob {
            method,
            credentials: self.resolve_credentials().await,
        };

        let task = Task::new(&request.source_image, &target_image, &request.platforms);
        let writer = self.store.insert(task).await;
        let task_id = writer.task_id().to_string();
        info!(
            task_id = %task_id,
            source = %request.source_image,
            target = %target_image,
            method = ?method,
            "sync task accepted"
        );

        let engine = self.engine.clone();
        tokio::spawn(async move {
            engine.execute(writer, job).await;
        });

        Ok(SyncAccepted {
            task_id,
            status: SyncStatus::Pending,
            message: format!("sync task created, target: {}", target_image),
        })
    }

    pub async fn progress(&self, task_id: &str) -> WorkerResult<SyncProgress> {
        self.store
            .progress(task_id)
            .await
            .ok_or_else(|| WorkerError::NotFound(task_id.to_string()))
    }

    pub async fn list(&self) -> Vec<TaskSummary> {
        self.store.list().await
    }

    pub async fn environment(&self) -> ConfigResponse {
        let tools = check_tools(
            &self.engine.tools.docker,
            &self.engine.tools.skopeo,
            self.settings.probe_timeout(),
        )
        .await;

        let runtime = self.credentials.read().await;
        let (harbor_configured, default_registry, default_username) = match runtime.as_ref() {
            Some(creds) => (true, Some(creds.registry.clone()), Some(creds.username.clone())),
            None => (
                self.settings.harbor_registry.is_some() && self.settings.harbor_username.is_some(),
                self.settings.harbor_registry.clone(),
                self.settings.harbor_username.clone(),
            ),
        };

        ConfigResponse {
            harbor_configured,
            docker_available: tools.docker,
            skopeo_available: tools.skopeo,
            buildx_available: tools.buildx,
            default_registry,
            default_username,
        }
    }

    /// Replaces runtime credentials for the rest of the process lifetime.
    pub async fn configure_credentials(&self, credentials: RegistryCredentials) -> String {
        let message = format!(
            "registry credentials saved for user {}",
            credentials.username
        );
        info!(
            registry = %credentials.registry,
            username = %credentials.username,
            "registry credentials updated"
        );
        *self.credentials.write().await = Some(credentials);
        message
    }

    async fn resolve_credentials(&self) -> Option<Credentials> {
        if let Some(runtime) = self.credentials.read().await.as_ref() {
            return Some(runtime.credentials());
        }
        let defaults = self.settings.default_credentials();
        if defaults.is_none() {
            warn!("no registry credentials configured, pushing anonymously");
        }
        defaults
    }
}

fn validate(request: &SyncRequest) -> WorkerResult<()> {
    if request.source_image.trim().is_empty() {
        return Err(invalid("source_image is empty"));
    }
    if request.target_registry.trim().is_empty() {
        return Err(invalid("target_registry is empty"));
    }
    if request.platforms.is_empty() {
        return Err(invalid("platforms is empty"));
    }
    Ok(())
}

fn invalid(reason: &str) -> WorkerError {
    WorkerError::InvalidRequest(reason.to_string())
}

/// `registry/project/name:tag` for the private registry.
pub fn target_image(request: &SyncRequest, source: &ImageReference) -> String {
    let name = request
        .target_image_name
        .as_deref()
        .unwrap_or_else(|| source.short_name());
    let tag = request.target_tag.as_deref().unwrap_or(&source.tag);
    format!(
        "{}/{}/{}:{}",
        request.target_registry, request.target_project, name, tag
    )
}
