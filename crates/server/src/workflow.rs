use futures::future::try_join_all;
use pinecall_common::{AppConfig, PinecallError, Result};
use pinecall_embedding::EmbeddingProvider;
use pinecall_vector::{IndexDescriptor, Metric, QueryRequest, QueryResult, StoredVector, VectorIndexClient};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dataset::{demo_dataset, EmbeddingRecord};
use crate::job_manager::JobManager;

/// What `manage_index` should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    Create,
    Delete,
}

/// What `manage_index` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    Created,
    AlreadyExists,
    Deleted,
    NotFound,
}

impl fmt::Display for IndexOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Deleted => write!(f, "deleted"),
            Self::NotFound => write!(f, "does not exist"),
        }
    }
}

/// Fixed parameters of a workflow run
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub index: IndexDescriptor,
    pub namespace: String,
    pub embedding_id_prefix: String,
    pub query: String,
    pub top_k: usize,
    pub include_values: bool,
    pub include_metadata: bool,
}

impl WorkflowSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let metric: Metric = config
            .metric
            .parse()
            .map_err(|_| PinecallError::config(format!("Unsupported metric '{}'", config.metric)))?;

        Ok(Self {
            index: IndexDescriptor::serverless(
                &config.index_name,
                config.dimension,
                metric,
                &config.cloud,
                &config.region,
            ),
            namespace: config.namespace.clone(),
            embedding_id_prefix: config.embedding_id_prefix.clone(),
            query: config.query.clone(),
            top_k: config.top_k,
            include_values: config.include_values,
            include_metadata: config.include_metadata,
        })
    }

    /// Id of the record at 0-based `index`
    pub fn vector_id(&self, index: usize) -> String {
        format!("{}-{}", self.embedding_id_prefix, index + 1)
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub index_outcome: IndexOutcome,
    pub stored_ids: Vec<String>,
    pub query: String,
    pub result: QueryResult,
}

/// Ensure index -> store embeddings -> query, against injected clients
pub struct PineconeWorkflow {
    embedder: Arc<dyn EmbeddingProvider>,
    index_client: Arc<dyn VectorIndexClient>,
    settings: WorkflowSettings,
    dataset: Vec<EmbeddingRecord>,
}

impl PineconeWorkflow {
    /// Create new workflow over the demo dataset
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index_client: Arc<dyn VectorIndexClient>,
        settings: WorkflowSettings,
    ) -> Self {
        if embedder.dimensions() != settings.index.dimension {
            warn!(
                "Embedding model {} produces {} dimensions but index '{}' is configured for {}",
                embedder.model(),
                embedder.dimensions(),
                settings.index.name,
                settings.index.dimension
            );
        }

        Self {
            embedder,
            index_client,
            settings,
            dataset: demo_dataset(),
        }
    }

    /// Replace the records stored by `store_embeddings`
    pub fn with_dataset(mut self, dataset: Vec<EmbeddingRecord>) -> Self {
        self.dataset = dataset;
        self
    }

    /// Create or delete the configured index, checking existence first
    pub async fn manage_index(&self, action: IndexAction) -> Result<IndexOutcome> {
        let name = &self.settings.index.name;
        let exists = self.index_client.index_exists(name).await?;

        let outcome = match (action, exists) {
            (IndexAction::Create, true) => IndexOutcome::AlreadyExists,
            (IndexAction::Create, false) => {
                self.index_client.create_index(&self.settings.index).await?;
                IndexOutcome::Created
            }
            (IndexAction::Delete, true) => {
                self.index_client.delete_index(name).await?;
                IndexOutcome::Deleted
            }
            (IndexAction::Delete, false) => IndexOutcome::NotFound,
        };

        info!("Index '{}' {}.", name, outcome);
        Ok(outcome)
    }

    /// Embed and upsert every record concurrently; fails on the first error
    pub async fn store_embeddings(&self) -> Result<Vec<String>> {
        let branches = self
            .dataset
            .iter()
            .enumerate()
            .map(|(index, record)| self.store_record(index, record));

        try_join_all(branches).await
    }

    async fn store_record(&self, index: usize, record: &EmbeddingRecord) -> Result<String> {
        let values = self.embedder.embed(&record.text_to_embed).await?;
        let id = self.settings.vector_id(index);
        let vector = StoredVector::new(id.clone(), values, Some(record.to_metadata()?));

        self.index_client
            .upsert(&self.settings.index.name, &self.settings.namespace, vec![vector])
            .await?;

        info!("Embedding {} stored in {}.", id, self.index_client.backend());
        Ok(id)
    }

    /// Embed `text` and return its nearest neighbors in the namespace
    pub async fn query_embeddings(&self, text: &str) -> Result<QueryResult> {
        let vector = self.embedder.embed(text).await?;
        let request = QueryRequest {
            vector,
            top_k: self.settings.top_k,
            include_values: self.settings.include_values,
            include_metadata: self.settings.include_metadata,
        };

        let result = self
            .index_client
            .query(&self.settings.index.name, &self.settings.namespace, request)
            .await?;

        info!("Query: \"{}\"", text);
        info!("Result:\n{}", format_matches_table(&result));
        Ok(result)
    }

    /// Run the whole workflow once
    pub async fn run(&self) -> Result<WorkflowReport> {
        self.run_steps(None).await
    }

    /// Run the whole workflow, reporting progress on `task_id`
    pub async fn execute(&self, job_manager: &JobManager, task_id: &str) -> Result<WorkflowReport> {
        self.run_steps(Some((job_manager, task_id))).await
    }

    async fn run_steps(&self, progress: Option<(&JobManager, &str)>) -> Result<WorkflowReport> {
        info!("start");

        report_progress(progress, 10, "Ensuring index exists...").await;
        let index_outcome = self.manage_index(IndexAction::Create).await?;

        report_progress(progress, 40, "Storing embeddings...").await;
        let stored_ids = self.store_embeddings().await?;

        report_progress(progress, 70, "Querying embeddings...").await;
        let query = self.settings.query.clone();
        let result = self.query_embeddings(&query).await?;

        info!("end");
        Ok(WorkflowReport {
            index_outcome,
            stored_ids,
            query,
            result,
        })
    }
}

async fn report_progress(progress: Option<(&JobManager, &str)>, percent: u8, message: &str) {
    if let Some((job_manager, task_id)) = progress {
        job_manager
            .update_progress(task_id, percent, message.to_string())
            .await;
    }
}

/// Render matches as a plain-text table, one row per match
pub fn format_matches_table(result: &QueryResult) -> String {
    const HEADERS: [&str; 6] = ["(index)", "id", "score", "textToEmbed", "favouriteActivities", "born"];

    let rows: Vec<[String; 6]> = result
        .matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let record = m.metadata.as_ref().and_then(EmbeddingRecord::from_metadata);
            [
                i.to_string(),
                m.id.clone(),
                format!("{:.6}", m.score),
                record.as_ref().map(|r| r.text_to_embed.clone()).unwrap_or_default(),
                record
                    .as_ref()
                    .map(|r| r.favourite_activities.join(", "))
                    .unwrap_or_default(),
                record.as_ref().map(|r| r.born.clone()).unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        format!("| {} |", padded.join(" | "))
    };
    let separator = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut out = vec![separator.clone(), line(&HEADERS.map(String::from)[..]), separator.clone()];
    out.extend(rows.iter().map(|row| line(&row[..])));
    out.push(separator);
    out.join("\n")
}
