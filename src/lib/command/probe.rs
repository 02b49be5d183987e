use std::{process::Stdio, time::Duration};

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::types::ToolCommand;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// True only if the tool starts and exits 0 within `timeout`. Missing
/// executables and timeouts both count as unavailable.
pub async fn probe(tool: &ToolCommand, args: &[&str], timeout: Duration) -> bool {
    let argv = tool.argv(args.iter().copied());
    let Some((program, rest)) = argv.split_first() else {
        return false;
    };

    let mut child = match Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            debug!(tool = %tool, error = %err, "tool probe could not start");
            return false;
        }
    };

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(err)) => {
            debug!(tool = %tool, error = %err, "tool probe failed");
            false
        }
        Err(_) => {
            warn!(tool = %tool, timeout_ms = timeout.as_millis() as u64, "tool probe timed out");
            let _ = child.kill().await;
            false
        }
    }
}

pub async fn docker_available(docker: &ToolCommand, timeout: Duration) -> bool {
    probe(docker, &["--version"], timeout).await
}

pub async fn buildx_available(docker: &ToolCommand, timeout: Duration) -> bool {
    probe(docker, &["buildx", "version"], timeout).await
}

pub async fn skopeo_available(skopeo: &ToolCommand, timeout: Duration) -> bool {
    probe(skopeo, &["--version"], timeout).await
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolAvailability {
    pub docker: bool,
    pub buildx: bool,
    pub skopeo: bool,
}

/// Probes the engine, its multi-platform build extension and the copy tool
/// concurrently.
pub async fn check_tools(
    docker: &ToolCommand,
    skopeo: &ToolCommand,
    timeout: Duration,
) -> ToolAvailability {
    let (docker, buildx, skopeo) = tokio::join!(
        docker_available(docker, timeout),
        buildx_available(docker, timeout),
        skopeo_available(skopeo, timeout),
    );
    ToolAvailability {
        docker,
        buildx,
        skopeo,
    }
}
