use std::{any::Any, panic::AssertUnwindSafe};

use futures_util::FutureExt;
use tracing::{error, info, warn};

use super::{
    docker::sync_with_docker,
    skopeo::sync_with_skopeo,
    types::{SyncEngine, SyncError, SyncJob, SyncMethod, SyncTools},
};
use crate::lib::tasks::{store::TaskWriter, types::SyncStatus};

const GENERIC_FAILURE: &str = "an error occurred during sync";

impl SyncEngine {
    pub fn new(tools: SyncTools) -> Self {
        SyncEngine { tools }
    }

    /// Runs one task to completion and returns its terminal status. Nothing
    /// escapes: strategy errors and panics end up in `task.error`.
    pub async fn execute(&self, task: TaskWriter, job: SyncJob) -> SyncStatus {
        info!(task_id = %task.task_id(), method = ?job.method, "sync started");

        let outcome = AssertUnwindSafe(self.drive(&task, &job))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(true)) => {
                task.step("sync complete", 100).await;
                task.log("image sync succeeded").await;
                self.finish(&task, SyncStatus::Success).await
            }
            Ok(Ok(false)) => {
                task.set_error(GENERIC_FAILURE).await;
                task.step("sync failed", 0).await;
                let cause = task.error().await.unwrap_or_default();
                task.log(format!("sync failed: {}", cause)).await;
                self.finish(&task, SyncStatus::Failed).await
            }
            Ok(Err(err)) => self.fault(&task, err.to_string()).await,
            Err(panic) => self.fault(&task, panic_message(panic.as_ref())).await,
        }
    }

    async fn drive(&self, task: &TaskWriter, job: &SyncJob) -> Result<bool, SyncError> {
        task.transition(SyncStatus::Pulling).await?;

        let spec = task.snapshot().await;
        let platforms: Vec<&str> = spec.platforms.iter().map(|p| p.as_str()).collect();
        task.log_lines([
            format!("starting sync task: {}", spec.task_id),
            format!("source image: {}", spec.source_image),
            format!("target image: {}", spec.target_image),
            format!("platforms: {}", platforms.join(", ")),
        ])
        .await;

        match job.method {
            SyncMethod::Docker => {
                sync_with_docker(&self.tools.docker, task, job.credentials.as_ref()).await
            }
            SyncMethod::Skopeo => {
                sync_with_skopeo(&self.tools.skopeo, task, job.credentials.as_ref()).await
            }
        }
    }

    /// Records a fault on a running task. A task that already reached a
    /// terminal status keeps its recorded outcome untouched.
    async fn fault(&self, task: &TaskWriter, cause: String) -> SyncStatus {
        let status = task.handle().status().await;
        if status.is_terminal() {
            warn!(
                task_id = %task.task_id(),
                status = ?status,
                error = %cause,
                "fault on finished task ignored"
            );
            return status;
        }

        error!(task_id = %task.task_id(), error = %cause, "sync aborted by fault");
        task.set_error(cause.clone()).await;
        task.step("fault", 0).await;
        task.log(format!("sync aborted: {}", cause)).await;
        self.finish(task, SyncStatus::Failed).await
    }

    async fn finish(&self, task: &TaskWriter, status: SyncStatus) -> SyncStatus {
        if let Err(err) = task.transition(status).await {
            warn!(task_id = %task.task_id(), error = %err, "could not record final status");
        }
        let status = task.handle().status().await;
        info!(task_id = %task.task_id(), status = ?status, "sync finished");
        status
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic: unknown cause".to_string()
    }
}
