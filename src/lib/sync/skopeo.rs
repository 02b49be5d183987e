use tracing::info;

use super::types::{Credentials, SyncError};
use crate::lib::{
    command::{runner::run_command, types::ToolCommand},
    image::reference::ImageReference,
    tasks::store::TaskWriter,
};

/// One registry-to-registry `copy --all`; nothing is staged locally.
pub async fn sync_with_skopeo(
    skopeo: &ToolCommand,
    task: &TaskWriter,
    credentials: Option<&Credentials>,
) -> Result<bool, SyncError> {
    let spec = task.snapshot().await;
    let source_ref = ImageReference::parse(&spec.source_image).copy_locator();
    let target_ref = format!("docker://{}", spec.target_image);

    task.step("copying image with skopeo", 10).await;

    let mut args = vec!["copy".to_string(), "--all".to_string()];
    if let Some(credentials) = credentials {
        args.push("--dest-creds".to_string());
        args.push(credentials.combined());
    }
    args.push(source_ref.clone());
    args.push(target_ref.clone());

    task.log(format!("copying {} to {}", source_ref, target_ref)).await;
    task.log("copying every platform of the image").await;

    let result = run_command(&skopeo.argv(args), task, None).await;
    task.set_progress(100).await;

    info!(task_id = %task.task_id(), success = result.success, "skopeo copy finished");
    Ok(result.success)
}
