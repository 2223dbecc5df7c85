use async_trait::async_trait;
use pinecall_common::{PinecallError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::VectorIndexClient;
use crate::types::{
    IndexDescription, IndexDescriptor, IndexStatus, QueryRequest, QueryResult, ScoredMatch,
    StoredVector,
};

struct MemoryIndex {
    descriptor: IndexDescriptor,
    /// namespace -> id -> vector
    namespaces: HashMap<String, HashMap<String, StoredVector>>,
}

impl MemoryIndex {
    fn description(&self) -> IndexDescription {
        IndexDescription {
            name: self.descriptor.name.clone(),
            dimension: Some(self.descriptor.dimension),
            metric: Some(self.descriptor.metric),
            host: format!("memory://{}", self.descriptor.name),
            status: IndexStatus {
                ready: true,
                state: "Ready".to_string(),
            },
        }
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.descriptor.dimension {
            return Err(PinecallError::invalid_input(format!(
                "Vector dimension {} does not match the dimension of index '{}' ({})",
                len, self.descriptor.name, self.descriptor.dimension
            )));
        }
        Ok(())
    }
}

/// Process-local vector store with exact scoring
///
/// Cloning shares the underlying indexes.
#[derive(Clone, Default)]
pub struct MemoryIndexClient {
    indexes: Arc<RwLock<HashMap<String, MemoryIndex>>>,
}

impl MemoryIndexClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vectors stored in a namespace
    pub async fn vector_count(&self, index_name: &str, namespace: &str) -> usize {
        let indexes = self.indexes.read().await;
        indexes
            .get(index_name)
            .and_then(|index| index.namespaces.get(namespace))
            .map(|ns| ns.len())
            .unwrap_or(0)
    }
}

fn index_not_found(name: &str) -> PinecallError {
    PinecallError::not_found(format!("Index '{}' does not exist", name))
}

#[async_trait]
impl VectorIndexClient for MemoryIndexClient {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let indexes = self.indexes.read().await;
        let mut list: Vec<IndexDescription> = indexes.values().map(MemoryIndex::description).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let indexes = self.indexes.read().await;
        indexes
            .get(name)
            .map(MemoryIndex::description)
            .ok_or_else(|| index_not_found(name))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<()> {
        if descriptor.dimension == 0 {
            return Err(PinecallError::invalid_input("Index dimension must be positive"));
        }

        let mut indexes = self.indexes.write().await;
        if indexes.contains_key(&descriptor.name) {
            warn!("Index '{}' already exists, keeping it", descriptor.name);
            return Ok(());
        }

        indexes.insert(
            descriptor.name.clone(),
            MemoryIndex {
                descriptor: descriptor.clone(),
                namespaces: HashMap::new(),
            },
        );
        info!(
            "Created in-memory index '{}' (dimension={}, metric={})",
            descriptor.name, descriptor.dimension, descriptor.metric
        );
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        if self.indexes.write().await.remove(name).is_none() {
            warn!("Index '{}' not found, nothing to delete", name);
        }
        Ok(())
    }

    async fn upsert(&self, index_name: &str, namespace: &str, vectors: Vec<StoredVector>) -> Result<usize> {
        let mut indexes = self.indexes.write().await;
        let index = indexes.get_mut(index_name).ok_or_else(|| index_not_found(index_name))?;

        for vector in &vectors {
            index.check_dimension(vector.values.len())?;
        }

        let count = vectors.len();
        let ns = index.namespaces.entry(namespace.to_string()).or_default();
        for vector in vectors {
            ns.insert(vector.id.clone(), vector);
        }

        debug!("Upserted {} vectors into {}/{}", count, index_name, namespace);
        Ok(count)
    }

    async fn query(&self, index_name: &str, namespace: &str, request: QueryRequest) -> Result<QueryResult> {
        let indexes = self.indexes.read().await;
        let index = indexes.get(index_name).ok_or_else(|| index_not_found(index_name))?;
        index.check_dimension(request.vector.len())?;

        let metric = index.descriptor.metric;
        let mut matches: Vec<ScoredMatch> = index
            .namespaces
            .get(namespace)
            .map(|ns| {
                ns.values()
                    .map(|stored| ScoredMatch {
                        id: stored.id.clone(),
                        score: metric.score(&request.vector, &stored.values),
                        values: if request.include_values {
                            stored.values.clone()
                        } else {
                            Vec::new()
                        },
                        metadata: if request.include_metadata {
                            stored.metadata.clone()
                        } else {
                            None
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        // Closest first; ties broken by id so results are stable
        matches.sort_by(|a, b| {
            let ordering = if metric.higher_is_closer() {
                b.score.total_cmp(&a.score)
            } else {
                a.score.total_cmp(&b.score)
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(request.top_k);

        Ok(QueryResult {
            matches,
            namespace: namespace.to_string(),
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
