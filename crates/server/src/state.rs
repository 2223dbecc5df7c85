use pinecall_common::{AppConfig, Result};
use pinecall_embedding::build_embedder;
use pinecall_vector::build_index_client;
use std::sync::Arc;
use tracing::{error, info};

use crate::job_manager::JobManager;
use crate::types::TaskTrigger;
use crate::workflow::{PineconeWorkflow, WorkflowSettings};

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Job manager
    pub job_manager: Arc<JobManager>,

    /// Workflow wired to the configured clients
    pub workflow: Arc<PineconeWorkflow>,
}

impl AppState {
    /// Create new application state, constructing both external clients
    pub fn new(config: AppConfig) -> Result<Self> {
        let embedder = build_embedder(&config)?;
        let index_client = build_index_client(&config)?;
        let settings = WorkflowSettings::from_config(&config)?;
        let workflow = PineconeWorkflow::new(embedder, index_client, settings);

        Ok(Self::with_workflow(config, workflow))
    }

    pub fn with_workflow(config: AppConfig, workflow: PineconeWorkflow) -> Self {
        let job_manager = JobManager::with_retention(config.max_finished_tasks);
        Self {
            config,
            job_manager: Arc::new(job_manager),
            workflow: Arc::new(workflow),
        }
    }

    /// Register a run and execute it in the background; returns the task id
    pub async fn submit_workflow(self: &Arc<Self>, trigger: TaskTrigger) -> String {
        let task_id = self.job_manager.create_task(trigger).await;
        info!("Workflow run {} submitted ({:?})", task_id, trigger);

        let state = Arc::clone(self);
        let task_id_clone = task_id.clone();
        tokio::spawn(async move {
            match state.workflow.execute(&state.job_manager, &task_id_clone).await {
                Ok(report) => {
                    state.job_manager.complete_task(&task_id_clone, report).await;
                }
                Err(e) => {
                    error!("Workflow run {} failed: {}", task_id_clone, e);
                    state.job_manager.fail_task(&task_id_clone, e.to_string()).await;
                }
            }
        });

        task_id
    }
}
