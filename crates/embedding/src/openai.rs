use async_trait::async_trait;
use pinecall_common::{PinecallError, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::provider::EmbeddingProvider;
use crate::types::{ApiErrorResponse, EmbedRequest, EmbedResponse};

/// Output size of the known OpenAI embedding models
pub fn model_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => 1536,
    }
}

/// OpenAI embeddings API client
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: Client,
}

impl OpenAiEmbedder {
    /// Create new OpenAI embedder
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PinecallError::config("OpenAI API key is empty"));
        }

        let model = model.into();
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("OpenAI embedder initialized: {} ({})", base_url, model);
        Ok(Self {
            dimensions: model_dimensions(&model),
            base_url,
            api_key,
            model,
            client,
        })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    /// Turn a non-success response into the matching error variant
    async fn error_from_response(response: reqwest::Response) -> PinecallError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        if status == StatusCode::TOO_MANY_REQUESTS {
            PinecallError::quota(format!("OpenAI API ({}): {}", status, message))
        } else {
            PinecallError::embedding(format!("OpenAI API error ({}): {}", status, message))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(PinecallError::invalid_input("Cannot embed empty text"));
        }

        let request = EmbedRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        debug!("Generating embedding - Model: {}, Text length: {}", self.model, text.len());

        let response = self
            .client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PinecallError::network(format!("Failed to send embedding request: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| PinecallError::embedding(format!("Failed to parse embedding response: {}", e)))?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| PinecallError::embedding("Empty embedding from OpenAI"))?;

        debug!("Received embedding - Dimension: {}", embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
