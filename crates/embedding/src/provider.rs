use async_trait::async_trait;
use pinecall_common::{AppConfig, EmbeddingBackend, Result};
use std::sync::Arc;

use crate::hashing::HashingEmbedder;
use crate::openai::OpenAiEmbedder;

/// Common trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single non-empty text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector returned by `embed`
    fn dimensions(&self) -> usize;

    /// Model identifier, for logs
    fn model(&self) -> &str;
}

/// Construct the provider selected by `config.embedding_backend`
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding_backend {
        EmbeddingBackend::OpenAi => {
            let api_key = config.require_openai_api_key()?;
            let client = OpenAiEmbedder::new(
                api_key,
                &config.embedding_model,
                &config.openai_base_url,
                config.request_timeout_secs,
            )?;
            Ok(Arc::new(client))
        }
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
    }
}
