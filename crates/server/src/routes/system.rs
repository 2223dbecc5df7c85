use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::state::AppState;
use crate::types::HealthResponse;

/// Liveness plus the wiring the server was started with
#[get("/health")]
pub async fn health(state: web::Data<Arc<AppState>>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        embedding_backend: state.config.embedding_backend.to_string(),
        embedding_model: state.config.embedding_model.clone(),
        vector_backend: state.config.vector_backend.to_string(),
        index_name: state.config.index_name.clone(),
    })
}
