//! Pinecall HTTP server
//!
//! Actix-web page and task endpoints around the embedding/query workflow

pub mod dataset;
pub mod job_manager;
pub mod routes;
pub mod state;
pub mod types;
pub mod workflow;

use actix_web::{web, App, HttpServer};
use pinecall_common::{AppConfig, Result};
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub use dataset::{demo_dataset, EmbeddingRecord};
pub use state::AppState;
pub use workflow::{
    format_matches_table, IndexAction, IndexOutcome, PineconeWorkflow, WorkflowReport,
    WorkflowSettings,
};

/// Build the state from `config` and serve until shutdown
pub async fn start_server(config: AppConfig) -> Result<()> {
    config.validate()?;
    let bind_addr = config.server_bind_address();
    let state = Arc::new(AppState::new(config)?);

    info!(
        "Serving on http://{} (embedding={}, vector={}, index={})",
        bind_addr,
        state.config.embedding_backend,
        state.config.vector_backend,
        state.config.index_name
    );

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
