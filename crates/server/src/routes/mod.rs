pub mod page;
pub mod system;
pub mod tasks;

use actix_web::web;

/// Register every route of the server
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(page::home)
        .service(tasks::run_workflow)
        .service(tasks::get_tasks)
        .service(tasks::get_task_progress)
        .service(system::health);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::types::{RunResponse, TaskStatus};
    use crate::workflow::{PineconeWorkflow, WorkflowSettings};
    use actix_web::{http::StatusCode, test, App};
    use pinecall_common::{AppConfig, EmbeddingBackend, VectorBackend};
    use pinecall_embedding::HashingEmbedder;
    use pinecall_vector::MemoryIndexClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn offline_state(run_on_render: bool) -> Arc<AppState> {
        offline_state_with(AppConfig {
            run_on_render,
            ..AppConfig::default()
        })
    }

    fn offline_state_with(config: AppConfig) -> Arc<AppState> {
        let config = AppConfig {
            embedding_backend: EmbeddingBackend::Hashing,
            vector_backend: VectorBackend::Memory,
            ..config
        };
        let settings = WorkflowSettings::from_config(&config).unwrap();
        let workflow = PineconeWorkflow::new(
            Arc::new(HashingEmbedder::new(config.dimension)),
            Arc::new(MemoryIndexClient::new()),
            settings,
        );
        Arc::new(AppState::with_workflow(config, workflow))
    }

    async fn wait_for_finish(state: &AppState, task_id: &str) -> crate::types::TaskInfo {
        for _ in 0..200 {
            let task = state.job_manager.get_task(task_id).await.unwrap();
            if task.status != TaskStatus::Running {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish", task_id);
    }

    #[actix_web::test]
    async fn test_render_submits_run() {
        let state = offline_state(true);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Press me to run"));

        let tasks = state.job_manager.get_tasks().await;
        assert_eq!(tasks.len(), 1);

        let task = wait_for_finish(&state, &tasks[0].task_id).await;
        assert_eq!(task.status, TaskStatus::Completed);
        let report = task.report.unwrap();
        assert_eq!(report.result.matches[0].id, "pc-2");
    }

    #[actix_web::test]
    async fn test_repeated_renders_keep_task_table_bounded() {
        let state = offline_state_with(AppConfig {
            max_finished_tasks: 3,
            ..AppConfig::default()
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        for _ in 0..20 {
            let req = test::TestRequest::get().uri("/").to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let mut tasks = state.job_manager.get_tasks().await;
        for _ in 0..500 {
            if tasks.iter().all(|t| t.status != TaskStatus::Running) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            tasks = state.job_manager.get_tasks().await;
        }

        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
    }

    #[actix_web::test]
    async fn test_render_without_run() {
        let state = offline_state(false);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.job_manager.get_tasks().await.is_empty());
    }

    #[actix_web::test]
    async fn test_run_and_progress() {
        let state = offline_state(false);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post().uri("/run").to_request();
        let resp: RunResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.progress_url, format!("/progress/{}", resp.task_id));

        wait_for_finish(&state, &resp.task_id).await;

        let req = test::TestRequest::get().uri(&resp.progress_url).to_request();
        let task: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(task["status"], "Completed");
        assert_eq!(task["report"]["stored_ids"], serde_json::json!(["pc-1", "pc-2"]));

        let req = test::TestRequest::get().uri("/tasks").to_request();
        let tasks: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tasks.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_unknown_progress() {
        let state = offline_state(false);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/progress/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_health() {
        let state = offline_state(false);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let health: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["vector_backend"], "memory");
        assert_eq!(health["embedding_backend"], "hashing");
    }
}
