use async_trait::async_trait;
use pinecall_common::{AppConfig, Result, VectorBackend};
use std::sync::Arc;
use std::time::Duration;

use crate::memory::MemoryIndexClient;
use crate::pinecone::PineconeClient;
use crate::types::{IndexDescription, IndexDescriptor, QueryRequest, QueryResult, StoredVector};

/// Index lifecycle plus data plane operations of a vector store
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// All indexes visible to the caller (single call, no pagination)
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>>;

    /// Membership check over `list_indexes`
    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_indexes().await?.iter().any(|i| i.name == name))
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription>;

    /// Create an index. An index that already exists is logged, not an error.
    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<()>;

    /// Delete an index. A missing index is logged, not an error.
    async fn delete_index(&self, name: &str) -> Result<()>;

    /// Insert or overwrite by id; returns the number of vectors written
    async fn upsert(&self, index_name: &str, namespace: &str, vectors: Vec<StoredVector>) -> Result<usize>;

    async fn query(&self, index_name: &str, namespace: &str, request: QueryRequest) -> Result<QueryResult>;

    /// Backend name, for logs
    fn backend(&self) -> &'static str;
}

/// Construct the client selected by `config.vector_backend`
pub fn build_index_client(config: &AppConfig) -> Result<Arc<dyn VectorIndexClient>> {
    match config.vector_backend {
        VectorBackend::Pinecone => {
            let api_key = config.require_pinecone_api_key()?;
            let mut client = PineconeClient::new(
                api_key,
                &config.pinecone_controller_url,
                &config.pinecone_api_version,
                config.request_timeout_secs,
            )?;
            if config.wait_until_ready {
                client = client.wait_until_ready(Duration::from_secs(config.ready_timeout_secs));
            }
            Ok(Arc::new(client))
        }
        VectorBackend::Memory => Ok(Arc::new(MemoryIndexClient::new())),
    }
}
