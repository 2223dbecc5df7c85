use crate::types::{TaskInfo, TaskStatus, TaskTrigger};
use crate::workflow::WorkflowReport;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_MAX_FINISHED: usize = 100;

#[derive(Default)]
struct TaskTable {
    tasks: HashMap<String, TaskInfo>,
    /// Completed or failed task ids, in finishing order
    finished: VecDeque<String>,
}

impl TaskTable {
    fn mark_finished(&mut self, task_id: &str, max_finished: usize) {
        if !self.tasks.contains_key(task_id) || self.finished.iter().any(|id| id == task_id) {
            return;
        }
        self.finished.push_back(task_id.to_string());

        let mut evicted = 0;
        while self.finished.len() > max_finished {
            if let Some(oldest) = self.finished.pop_front() {
                self.tasks.remove(&oldest);
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("Evicted {} finished task(s)", evicted);
        }
    }
}

/// Tracks workflow runs submitted from the web surface
pub struct JobManager {
    table: Arc<RwLock<TaskTable>>,
    max_finished: usize,
}

impl Default for JobManager {
    fn default() -> Self {
        Self::with_retention(DEFAULT_MAX_FINISHED)
    }
}

impl JobManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_finished` completed or failed tasks, evicting the oldest.
    /// Running tasks are never evicted.
    pub fn with_retention(max_finished: usize) -> Self {
        Self {
            table: Arc::new(RwLock::new(TaskTable::default())),
            max_finished,
        }
    }

    pub async fn create_task(&self, trigger: TaskTrigger) -> String {
        let task_id = Uuid::new_v4().to_string();
        let task_info = TaskInfo {
            task_id: task_id.clone(),
            trigger,
            status: TaskStatus::Running,
            progress: 0,
            message: "Starting...".to_string(),
            started_at: Utc::now(),
            finished_at: None,
            report: None,
        };

        self.table.write().await.tasks.insert(task_id.clone(), task_info);
        task_id
    }

    pub async fn update_progress(&self, task_id: &str, progress: u8, message: String) {
        if let Some(task) = self.table.write().await.tasks.get_mut(task_id) {
            task.progress = progress.min(100);
            task.message = message;
        }
    }

    pub async fn complete_task(&self, task_id: &str, report: WorkflowReport) {
        let mut table = self.table.write().await;
        if let Some(task) = table.tasks.get_mut(task_id) {
            task.status = TaskStatus::Completed;
            task.progress = 100;
            task.message = "Completed".to_string();
            task.finished_at = Some(Utc::now());
            task.report = Some(report);
        }
        table.mark_finished(task_id, self.max_finished);
    }

    pub async fn fail_task(&self, task_id: &str, error: String) {
        let mut table = self.table.write().await;
        if let Some(task) = table.tasks.get_mut(task_id) {
            task.status = TaskStatus::Failed;
            task.message = error;
            task.finished_at = Some(Utc::now());
        }
        table.mark_finished(task_id, self.max_finished);
    }

    pub async fn get_task(&self, task_id: &str) -> Option<TaskInfo> {
        self.table.read().await.tasks.get(task_id).cloned()
    }

    /// All retained tasks, oldest first
    pub async fn get_tasks(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self.table.read().await.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.started_at);
        tasks
    }
}
