//! Pinecall vector store clients
//!
//! Pinecone REST client and a process-local store behind one trait

mod client;
mod memory;
mod pinecone;
mod similarity;
mod types;

pub use client::{build_index_client, VectorIndexClient};
pub use memory::MemoryIndexClient;
pub use pinecone::PineconeClient;
pub use similarity::{cosine_similarity, dot_product, squared_euclidean};
pub use types::{
    IndexDescription, IndexDescriptor, IndexSpec, IndexStatus, Metadata, Metric, QueryRequest,
    QueryResult, ScoredMatch, ServerlessSpec, StoredVector,
};
