use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Pulling,
    Pushing,
    Success,
    Failed,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Success | SyncStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "linux/amd64")]
    LinuxAmd64,
    #[serde(rename = "linux/arm64")]
    LinuxArm64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinuxAmd64 => "linux/amd64",
            Platform::LinuxArm64 => "linux/arm64",
        }
    }

    /// Architecture component, used as the per-arch tag suffix.
    pub fn arch(&self) -> &'static str {
        match self {
            Platform::LinuxAmd64 => "amd64",
            Platform::LinuxArm64 => "arm64",
        }
    }

    pub fn defaults() -> Vec<Platform> {
        vec![Platform::LinuxAmd64, Platform::LinuxArm64]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live state of one sync. Only the owning [`TaskWriter`] mutates it.
///
/// [`TaskWriter`]: super::store::TaskWriter
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub task_id: String,
    pub source_image: String,
    pub target_image: String,
    pub platforms: Vec<Platform>,
    pub status: SyncStatus,
    pub current_step: String,
    pub progress: u8,
    pub logs: Vec<String>,
    pub error: Option<String>,
    pub created_at: SystemTime,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
}

impl Task {
    pub fn new(source_image: &str, target_image: &str, platforms: &[Platform]) -> Self {
        let mut unique: Vec<Platform> = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if !unique.contains(platform) {
                unique.push(*platform);
            }
        }

        Task {
            task_id: new_task_id(),
            source_image: source_image.to_string(),
            target_image: target_image.to_string(),
            platforms: unique,
            status: SyncStatus::Pending,
            current_step: String::new(),
            progress: 0,
            logs: Vec::new(),
            error: None,
            created_at: SystemTime::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn progress(&self) -> SyncProgress {
        SyncProgress {
            task_id: self.task_id.clone(),
            status: self.status,
            current_step: self.current_step.clone(),
            progress: self.progress,
            logs: self.logs.clone(),
            error: self.error.clone(),
        }
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.task_id.clone(),
            source_image: self.source_image.clone(),
            target_image: self.target_image.clone(),
            status: self.status,
            progress: self.progress,
        }
    }
}

fn new_task_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Immutable view handed to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub task_id: String,
    pub status: SyncStatus,
    pub current_step: String,
    pub progress: u8,
    pub logs: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub source_image: String,
    pub target_image: String,
    pub status: SyncStatus,
    pub progress: u8,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: SyncStatus, to: SyncStatus },
}
