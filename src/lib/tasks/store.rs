use std::{collections::HashMap, sync::Arc, time::SystemTime};

use tokio::sync::RwLock;
use tracing::debug;

use super::{
    state::valid_state_transition,
    types::{SyncProgress, SyncStatus, Task, TaskError, TaskSummary},
};

type SharedTask = Arc<RwLock<Task>>;

#[derive(Debug, Default)]
struct TaskTable {
    by_id: HashMap<String, SharedTask>,
    // Registration order, one entry per live id.
    order: Vec<SharedTask>,
}

/// In-memory task table. Entries are never removed for the life of the
/// process.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Arc<RwLock<TaskTable>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the task and hands back its only writer.
    pub async fn insert(&self, task: Task) -> TaskWriter {
        let task_id = task.task_id.clone();
        let shared = Arc::new(RwLock::new(task));

        let mut table = self.tasks.write().await;
        if let Some(replaced) = table.by_id.insert(task_id.clone(), shared.clone()) {
            table.order.retain(|entry| !Arc::ptr_eq(entry, &replaced));
        }
        table.order.push(shared.clone());
        drop(table);
        debug!(task_id = %task_id, "task registered");

        TaskWriter {
            task_id,
            inner: shared,
        }
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskHandle> {
        self.tasks
            .read()
            .await
            .by_id
            .get(task_id)
            .map(|inner| TaskHandle {
                inner: inner.clone(),
            })
    }

    pub async fn progress(&self, task_id: &str) -> Option<SyncProgress> {
        let handle = self.get(task_id).await?;
        Some(handle.progress().await)
    }

    /// Summaries of every known task in registration order.
    pub async fn list(&self) -> Vec<TaskSummary> {
        let shared = self.tasks.read().await.order.clone();

        let mut summaries = Vec::with_capacity(shared.len());
        for task in shared {
            summaries.push(task.read().await.summary());
        }
        summaries
    }
}

/// Read-only view of a live task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    inner: SharedTask,
}

impl TaskHandle {
    pub async fn progress(&self) -> SyncProgress {
        self.inner.read().await.progress()
    }

    pub async fn status(&self) -> SyncStatus {
        self.inner.read().await.status
    }
}

/// Exclusive mutator for one task. Not `Clone`: the background unit that
/// owns it is the task's single writer.
#[derive(Debug)]
pub struct TaskWriter {
    task_id: String,
    inner: SharedTask,
}

impl TaskWriter {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            inner: self.inner.clone(),
        }
    }

    pub async fn snapshot(&self) -> Task {
        self.inner.read().await.clone()
    }

    pub async fn transition(&self, to: SyncStatus) -> Result<(), TaskError> {
        let mut task = self.inner.write().await;
        if !valid_state_transition(&task.status, &to) {
            return Err(TaskError::InvalidTransition {
                from: task.status,
                to,
            });
        }

        task.status = to;
        let now = SystemTime::now();
        if to == SyncStatus::Pulling && task.started_at.is_none() {
            task.started_at = Some(now);
        }
        if to.is_terminal() {
            task.finished_at = Some(now);
        }
        Ok(())
    }

    /// Sets the step label and raises progress; progress never goes down.
    pub async fn step(&self, step: impl Into<String>, progress: u8) {
        let mut task = self.inner.write().await;
        task.current_step = step.into();
        task.progress = task.progress.max(progress.min(100));
    }

    pub async fn set_progress(&self, progress: u8) {
        let mut task = self.inner.write().await;
        task.progress = task.progress.max(progress.min(100));
    }

    pub async fn log(&self, line: impl Into<String>) {
        self.inner.write().await.logs.push(line.into());
    }

    pub async fn log_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut task = self.inner.write().await;
        task.logs.extend(lines.into_iter().map(Into::into));
    }

    /// Records the failure cause. Only the first call wins.
    pub async fn set_error(&self, error: impl Into<String>) -> bool {
        let mut task = self.inner.write().await;
        if task.error.is_some() {
            return false;
        }
        task.error = Some(error.into());
        true
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.read().await.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::tasks::types::Platform;

    fn sample_task() -> Task {
        Task::new(
            "nginx:1.25",
            "harbor.local/library/nginx:1.25",
            &Platform::defaults(),
        )
    }

    #[tokio::test]
    async fn readers_observe_writer_mutations() {
        let store = TaskStore::new();
        let writer = store.insert(sample_task()).await;
        let reader = store.get(writer.task_id()).await.unwrap();

        writer.transition(SyncStatus::Pulling).await.unwrap();
        writer.step("pulling amd64", 10).await;
        writer.log("pulling").await;

        let progress = reader.progress().await;
        assert_eq!(progress.status, SyncStatus::Pulling);
        assert_eq!(progress.current_step, "pulling amd64");
        assert_eq!(progress.progress, 10);
        assert_eq!(progress.logs, vec!["pulling".to_string()]);
    }

    #[tokio::test]
    async fn progress_snapshot_is_detached() {
        let store = TaskStore::new();
        let writer = store.insert(sample_task()).await;
        writer.log("first").await;

        let snapshot = store.progress(writer.task_id()).await.unwrap();
        writer.log("second").await;

        assert_eq!(snapshot.logs.len(), 1);
        let current = store.progress(writer.task_id()).await.unwrap();
        assert_eq!(current.logs.len(), 2);
    }

    #[tokio::test]
    async fn progress_never_decreases() {
        let store = TaskStore::new();
        let writer = store.insert(sample_task()).await;

        writer.step("a", 70).await;
        writer.step("b", 40).await;
        writer.set_progress(250).await;

        let task = writer.snapshot().await;
        assert_eq!(task.current_step, "b");
        assert_eq!(task.progress, 100);
    }

    #[tokio::test]
    async fn error_is_set_once() {
        let store = TaskStore::new();
        let writer = store.insert(sample_task()).await;

        assert!(writer.set_error("login failed").await);
        assert!(!writer.set_error("something else").await);
        assert_eq!(writer.error().await.as_deref(), Some("login failed"));
    }

    #[tokio::test]
    async fn invalid_transition_leaves_task_untouched() {
        let store = TaskStore::new();
        let writer = store.insert(sample_task()).await;

        let err = writer.transition(SyncStatus::Success).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
        assert_eq!(writer.handle().status().await, SyncStatus::Pending);

        writer.transition(SyncStatus::Pulling).await.unwrap();
        writer.transition(SyncStatus::Failed).await.unwrap();
        assert!(writer.transition(SyncStatus::Pulling).await.is_err());

        let task = writer.snapshot().await;
        assert!(task.started_at.is_some());
        assert!(task.finished_at.is_some());
    }

    #[tokio::test]
    async fn unknown_task_is_none() {
        let store = TaskStore::new();
        assert!(store.get("missing").await.is_none());
        assert!(store.progress("missing").await.is_none());
    }

    #[tokio::test]
    async fn list_follows_registration_order() {
        let store = TaskStore::new();
        let mut registered = Vec::new();
        for _ in 0..32 {
            let mut task = sample_task();
            // Same timestamp for all, so only registration order can decide.
            task.created_at = SystemTime::UNIX_EPOCH;
            registered.push(store.insert(task).await.task_id().to_string());
        }

        let listed: Vec<String> = store
            .list()
            .await
            .into_iter()
            .map(|summary| summary.task_id)
            .collect();
        assert_eq!(listed, registered);
    }

    #[tokio::test]
    async fn reused_id_replaces_the_listed_entry() {
        let store = TaskStore::new();
        let first = store.insert(sample_task()).await;
        let other = store.insert(sample_task()).await;

        let mut again = sample_task();
        again.task_id = first.task_id().to_string();
        again.source_image = "redis:7".to_string();
        store.insert(again).await;

        let listed = store.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].task_id, other.task_id());
        assert_eq!(listed[1].task_id, first.task_id());
        assert_eq!(listed[1].source_image, "redis:7");
        assert_eq!(listed[1].status, SyncStatus::Pending);
    }
}
