use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::{command::types::ToolCommand, tasks::types::TaskError};

/// Which transfer strategy runs a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    /// Per-platform pull, tag, push and manifest assembly through the engine.
    Docker,
    /// Single registry-to-registry `copy --all`.
    Skopeo,
}

/// Prefers the copy tool when nothing is forced. `None` means the forced
/// method cannot run here.
pub fn select_method(requested: Option<SyncMethod>, skopeo_available: bool) -> Option<SyncMethod> {
    match requested {
        Some(SyncMethod::Skopeo) if !skopeo_available => None,
        Some(method) => Some(method),
        None if skopeo_available => Some(SyncMethod::Skopeo),
        None => Some(SyncMethod::Docker),
    }
}

/// Target-registry login, resolved when the task is accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// `user:password`, the copy tool's combined credential form.
    pub fn combined(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncTools {
    pub docker: ToolCommand,
    pub skopeo: ToolCommand,
}

impl Default for SyncTools {
    fn default() -> Self {
        SyncTools {
            docker: ToolCommand::new("docker"),
            skopeo: ToolCommand::new("skopeo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncEngine {
    pub tools: SyncTools,
}

/// Everything a background run needs besides the task itself.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub method: SyncMethod,
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Task(#[from] TaskError),
}
