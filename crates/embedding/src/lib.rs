//! Pinecall embedding providers
//!
//! OpenAI embeddings API client plus an offline hashing embedder

mod hashing;
mod openai;
mod provider;
mod types;

pub use hashing::HashingEmbedder;
pub use openai::{model_dimensions, OpenAiEmbedder};
pub use provider::{build_embedder, EmbeddingProvider};
pub use types::{EmbedRequest, EmbedResponse, EmbeddingData};
