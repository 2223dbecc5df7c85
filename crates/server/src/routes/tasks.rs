use actix_web::{get, post, web, HttpResponse};
use std::sync::Arc;

use crate::state::AppState;
use crate::types::{RunResponse, TaskTrigger};

/// POST /run - submit a workflow run
#[post("/run")]
pub async fn run_workflow(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let task_id = state.submit_workflow(TaskTrigger::Button).await;

    Ok(HttpResponse::Accepted().json(RunResponse {
        progress_url: format!("/progress/{}", task_id),
        task_id,
        message: "Workflow run started".to_string(),
    }))
}

#[get("/tasks")]
pub async fn get_tasks(state: web::Data<Arc<AppState>>) -> actix_web::Result<HttpResponse> {
    let tasks = state.job_manager.get_tasks().await;
    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/progress/{task_id}")]
pub async fn get_task_progress(
    task_id: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> actix_web::Result<HttpResponse> {
    match state.job_manager.get_task(task_id.as_str()).await {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "Task not found"
        }))),
    }
}
