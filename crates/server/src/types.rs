use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowReport;

/// Task status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

/// What submitted a workflow run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskTrigger {
    /// Page render
    Render,
    /// Run button / POST /run
    Button,
}

/// Workflow run information
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    /// Task ID
    pub task_id: String,

    pub trigger: TaskTrigger,

    /// Status
    pub status: TaskStatus,

    /// Progress percentage (0-100)
    pub progress: u8,

    /// Current message
    pub message: String,

    /// Started at
    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Set once the run completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<WorkflowReport>,
}

/// Response of POST /run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    /// Task ID
    pub task_id: String,

    /// Where to poll for the outcome
    pub progress_url: String,

    /// Message
    pub message: String,
}

/// Response of GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub embedding_backend: String,
    pub embedding_model: String,
    pub vector_backend: String,
    pub index_name: String,
}
