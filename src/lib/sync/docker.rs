use tracing::{info, warn};

use super::types::{Credentials, SyncError};
use crate::lib::{
    command::{
        runner::{run_command, run_command_silent},
        types::ToolCommand,
    },
    image::reference::{ImageReference, registry_host},
    tasks::store::TaskWriter,
};

pub const NO_PLATFORM_SUCCEEDED: &str = "no platform succeeded";

/// Per-platform pull, tag and push through the local engine, then a
/// manifest list tying the per-arch tags together.
///
/// Returns `Ok(true)` when at least one platform was pulled and tagged,
/// regardless of later push or manifest problems.
pub async fn sync_with_docker(
    docker: &ToolCommand,
    task: &TaskWriter,
    credentials: Option<&Credentials>,
) -> Result<bool, SyncError> {
    let spec = task.snapshot().await;
    let source = ImageReference::parse(&spec.source_image);
    let full_source = source.engine_reference();
    let target_image = spec.target_image.as_str();

    if let Some(credentials) = credentials {
        let host = registry_host(target_image);
        task.step("logging in to target registry", 5).await;
        task.log(format!("logging in to {}", host)).await;
        task.log(format!("username: {}", credentials.username)).await;

        // Password travels over stdin only.
        let login = docker.argv([
            "login",
            "-u",
            credentials.username.as_str(),
            "--password-stdin",
            host,
        ]);
        let result = run_command(&login, task, Some(credentials.password.as_str())).await;
        if !result.success {
            let cause = format!("registry login failed: {}", result.output.trim());
            task.set_error(cause).await;
            return Ok(false);
        }
        task.log("registry login succeeded").await;
    }

    let mut tagged: Vec<(&'static str, String)> = Vec::new();

    for (index, platform) in spec.platforms.iter().enumerate() {
        let arch = platform.arch();
        let progress = (10 + 30 * index).min(65) as u8;
        task.step(format!("pulling {} image", arch), progress).await;
        task.log(format!("pulling {} ({})", full_source, platform)).await;

        let pull = docker.argv([
            "pull",
            "--platform",
            platform.as_str(),
            full_source.as_str(),
        ]);
        if !run_command(&pull, task, None).await.success {
            warn!(
                task_id = %task.task_id(),
                platform = %platform,
                "platform pull failed, skipping"
            );
            task.log(format!("warning: pull for {} failed, skipping", platform)).await;
            continue;
        }

        let per_arch = format!("{}-{}", target_image, arch);
        task.log(format!("tagging {} image as {}", arch, per_arch)).await;
        let tag = docker.argv(["tag", full_source.as_str(), per_arch.as_str()]);
        if run_command(&tag, task, None).await.success {
            tagged.push((arch, per_arch));
        }
    }

    if tagged.is_empty() {
        task.set_error(NO_PLATFORM_SUCCEEDED).await;
        cleanup(docker, &[], &full_source).await;
        return Ok(false);
    }

    task.step("pushing images to target registry", 70).await;
    let mut pushed: Vec<&str> = Vec::with_capacity(tagged.len());
    for (arch, per_arch) in &tagged {
        task.log(format!("pushing {} image", arch)).await;
        let push = docker.argv(["push", per_arch.as_str()]);
        if run_command(&push, task, None).await.success {
            pushed.push(per_arch);
        } else {
            warn!(task_id = %task.task_id(), arch = %arch, "per-arch push failed");
            task.log(format!("warning: push for {} failed", arch)).await;
        }
    }

    task.step("creating multi-platform manifest", 85).await;
    if pushed.len() > 1 {
        assemble_manifest(docker, task, target_image, &pushed).await;
    } else {
        task.log("single platform image, skipping manifest list").await;
    }

    task.step("cleaning up local images", 95).await;
    task.log("removing local images").await;
    let per_arch_tags: Vec<&str> = tagged.iter().map(|(_, tag)| tag.as_str()).collect();
    cleanup(docker, &per_arch_tags, &full_source).await;
    task.log("local images removed").await;

    task.set_progress(100).await;
    info!(task_id = %task.task_id(), platforms = tagged.len(), "engine sync finished");
    Ok(true)
}

/// Replaces any previous manifest list for `target_image`. Failures here are
/// warnings only: the per-arch images are already live.
async fn assemble_manifest(
    docker: &ToolCommand,
    task: &TaskWriter,
    target_image: &str,
    images: &[&str],
) {
    task.log("creating multi-platform manifest").await;

    // May not exist yet.
    task.log("removing stale manifest if present").await;
    run_command_silent(&docker.argv(["manifest", "rm", target_image])).await;

    let mut create = docker.argv(["manifest", "create", target_image]);
    create.extend(images.iter().map(|image| image.to_string()));
    if !run_command(&create, task, None).await.success {
        warn!(task_id = %task.task_id(), target = %target_image, "manifest create failed");
        task.log("warning: manifest create failed, keeping per-arch images").await;
        return;
    }

    task.log("pushing multi-platform manifest").await;
    let push = docker.argv(["manifest", "push", target_image]);
    if !run_command(&push, task, None).await.success {
        warn!(task_id = %task.task_id(), target = %target_image, "manifest push failed");
        task.log("warning: manifest push failed, keeping per-arch images").await;
    }
}

async fn cleanup(docker: &ToolCommand, per_arch_tags: &[&str], full_source: &str) {
    for tag in per_arch_tags {
        run_command_silent(&docker.argv(["rmi", *tag])).await;
    }
    run_command_silent(&docker.argv(["rmi", full_source])).await;
}
