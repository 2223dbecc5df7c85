use serde::{Deserialize, Serialize};

/// OpenAI embeddings request
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Model name (e.g., "text-embedding-3-small")
    pub model: String,

    /// Text to embed
    pub input: String,
}

/// OpenAI embeddings response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// One entry per input
    pub data: Vec<EmbeddingData>,

    /// Model that produced the vectors
    #[serde(default)]
    pub model: Option<String>,

    /// Token accounting
    #[serde(default)]
    pub usage: Option<EmbedUsage>,
}

/// Single embedding entry
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,

    #[serde(default)]
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

/// Error envelope returned by the OpenAI API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub code: Option<String>,
}
