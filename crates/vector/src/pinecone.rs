use async_trait::async_trait;
use pinecall_common::{PinecallError, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::VectorIndexClient;
use crate::types::{IndexDescription, IndexDescriptor, QueryRequest, QueryResult, StoredVector};

const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct ListIndexesResponse {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    vectors: &'a [StoredVector],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Pinecone REST client (control plane + data plane)
#[derive(Clone)]
pub struct PineconeClient {
    controller_url: String,
    api_key: String,
    api_version: String,
    client: Client,
    ready_timeout: Option<Duration>,
    /// index name -> data plane host
    hosts: Arc<RwLock<HashMap<String, String>>>,
}

impl PineconeClient {
    /// Create new Pinecone client
    pub fn new(
        api_key: impl Into<String>,
        controller_url: impl Into<String>,
        api_version: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PinecallError::config("Pinecone API key is empty"));
        }

        let controller_url: String = controller_url.into();
        let controller_url = controller_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Pinecone client initialized: {}", controller_url);
        Ok(Self {
            controller_url,
            api_key,
            api_version: api_version.into(),
            client,
            ready_timeout: None,
            hosts: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Block `create_index` until the new index reports ready, up to `timeout`
    pub fn wait_until_ready(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    fn indexes_url(&self) -> String {
        format!("{}/indexes", self.controller_url)
    }

    fn index_url(&self, name: &str) -> String {
        format!("{}/indexes/{}", self.controller_url, name)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        builder
            .send()
            .await
            .map_err(|e| PinecallError::network(format!("Pinecone request failed: {}", e)))
    }

    async fn error_from_response(response: reqwest::Response) -> PinecallError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) if !envelope.error.code.is_empty() => {
                format!("{}: {}", envelope.error.code, envelope.error.message)
            }
            Ok(envelope) => envelope.error.message,
            Err(_) => body,
        };

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                PinecallError::quota(format!("Pinecone ({}): {}", status, message))
            }
            StatusCode::NOT_FOUND => PinecallError::not_found(format!("Pinecone: {}", message)),
            _ => PinecallError::vector_store(format!("Pinecone API error ({}): {}", status, message)),
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PinecallError::vector_store(format!("Failed to parse Pinecone response: {}", e)))
    }

    /// Data plane base URL for an index, resolved through `describe_index` once
    async fn data_plane_url(&self, index_name: &str) -> Result<String> {
        if let Some(host) = self.hosts.read().await.get(index_name) {
            return Ok(host_url(host));
        }

        let description = self.describe_index(index_name).await?;
        if description.host.is_empty() {
            return Err(PinecallError::vector_store(format!(
                "Index '{}' has no host yet (state: {})",
                index_name, description.status.state
            )));
        }

        debug!("Resolved host for index '{}': {}", index_name, description.host);
        self.hosts
            .write()
            .await
            .insert(index_name.to_string(), description.host.clone());
        Ok(host_url(&description.host))
    }

    async fn await_ready(&self, name: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let description = self.describe_index(name).await?;
            if description.status.ready {
                info!("Index '{}' is ready", name);
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PinecallError::vector_store(format!(
                    "Index '{}' not ready after {:?} (state: {})",
                    name, timeout, description.status.state
                )));
            }
            debug!("Waiting for index '{}' (state: {})", name, description.status.state);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

fn host_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl VectorIndexClient for PineconeClient {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let response = self.send(self.request(Method::GET, &self.indexes_url())).await?;
        let list: ListIndexesResponse = Self::parse(response).await?;
        Ok(list.indexes)
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let response = self.send(self.request(Method::GET, &self.index_url(name))).await?;
        Self::parse(response).await
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<()> {
        let response = self
            .send(self.request(Method::POST, &self.indexes_url()).json(descriptor))
            .await?;

        match response.status() {
            StatusCode::CONFLICT => {
                warn!("Index '{}' already exists (reported by Pinecone)", descriptor.name);
                return Ok(());
            }
            status if status.is_success() => {
                info!(
                    "Pinecone accepted index '{}' (dimension={}, metric={})",
                    descriptor.name, descriptor.dimension, descriptor.metric
                );
            }
            _ => return Err(Self::error_from_response(response).await),
        }

        if let Some(timeout) = self.ready_timeout {
            self.await_ready(&descriptor.name, timeout).await?;
        }
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let response = self.send(self.request(Method::DELETE, &self.index_url(name))).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!("Index '{}' not found, nothing to delete", name);
            }
            status if status.is_success() => {
                info!("Pinecone deleted index '{}'", name);
            }
            _ => return Err(Self::error_from_response(response).await),
        }

        self.hosts.write().await.remove(name);
        Ok(())
    }

    async fn upsert(&self, index_name: &str, namespace: &str, vectors: Vec<StoredVector>) -> Result<usize> {
        let url = format!("{}/vectors/upsert", self.data_plane_url(index_name).await?);
        let body = UpsertBody {
            vectors: &vectors,
            namespace,
        };

        let response = self.send(self.request(Method::POST, &url).json(&body)).await?;
        let result: UpsertResponse = Self::parse(response).await?;
        debug!("Upserted {} vectors into {}/{}", result.upserted_count, index_name, namespace);
        Ok(result.upserted_count)
    }

    async fn query(&self, index_name: &str, namespace: &str, request: QueryRequest) -> Result<QueryResult> {
        let url = format!("{}/query", self.data_plane_url(index_name).await?);
        let body = QueryBody {
            namespace,
            vector: &request.vector,
            top_k: request.top_k,
            include_values: request.include_values,
            include_metadata: request.include_metadata,
        };

        let response = self.send(self.request(Method::POST, &url).json(&body)).await?;
        let mut result: QueryResult = Self::parse(response).await?;
        if result.namespace.is_empty() {
            result.namespace = namespace.to_string();
        }
        Ok(result)
    }

    fn backend(&self) -> &'static str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metadata, Metric};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn client() -> PineconeClient {
        PineconeClient::new("pc-test", "https://api.pinecone.io/", "2024-07", 5).unwrap()
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(PineconeClient::new("", "https://api.pinecone.io", "2024-07", 5).is_err());
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(client.indexes_url(), "https://api.pinecone.io/indexes");
        assert_eq!(client.index_url("pinecone-test3"), "https://api.pinecone.io/indexes/pinecone-test3");
        assert_eq!(host_url("idx-abc.svc.pinecone.io"), "https://idx-abc.svc.pinecone.io");
        assert_eq!(host_url("http://localhost:5081/"), "http://localhost:5081");
    }

    #[test]
    fn test_upsert_body_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("textToEmbed".to_string(), serde_json::json!("My dog's name is Steve."));
        let vectors = vec![StoredVector::new("pc-1", vec![0.5, 0.25], Some(metadata))];
        let body = UpsertBody {
            vectors: &vectors,
            namespace: "nms-1",
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "vectors": [{
                    "id": "pc-1",
                    "values": [0.5, 0.25],
                    "metadata": {"textToEmbed": "My dog's name is Steve."}
                }],
                "namespace": "nms-1"
            })
        );
    }

    #[test]
    fn test_query_body_shape() {
        let vector = [0.5f32];
        let body = QueryBody {
            namespace: "nms-1",
            vector: &vector,
            top_k: 1,
            include_values: false,
            include_metadata: true,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "namespace": "nms-1",
                "vector": [0.5],
                "topK": 1,
                "includeValues": false,
                "includeMetadata": true
            })
        );
    }

    #[test]
    fn test_parse_list_and_upsert_responses() {
        let list: ListIndexesResponse = serde_json::from_str(
            r#"{"indexes": [{"name": "pinecone-test3", "dimension": 1536, "metric": "cosine", "host": "h", "status": {"ready": false, "state": "Initializing"}}]}"#,
        )
        .unwrap();
        assert_eq!(list.indexes.len(), 1);
        assert!(!list.indexes[0].status.ready);

        let empty: ListIndexesResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.indexes.is_empty());

        let upsert: UpsertResponse = serde_json::from_str(r#"{"upsertedCount": 2}"#).unwrap();
        assert_eq!(upsert.upserted_count, 2);
    }

    #[test]
    fn test_parse_error_envelope() {
        let envelope: ErrorEnvelope = serde_json::from_str(
            r#"{"error": {"code": "ALREADY_EXISTS", "message": "Resource already exists"}, "status": 409}"#,
        )
        .unwrap();
        assert_eq!(envelope.error.code, "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let client = PineconeClient::new("pc-test", "http://127.0.0.1:9", "2024-07", 2).unwrap();
        let err = client.list_indexes().await.unwrap_err();
        assert!(matches!(err, PinecallError::Network(_)));
    }

    #[tokio::test]
    async fn test_cached_host_skips_describe() {
        let client = client();
        client
            .hosts
            .write()
            .await
            .insert("idx".to_string(), "idx-abc.svc.pinecone.io".to_string());
        assert_eq!(client.data_plane_url("idx").await.unwrap(), "https://idx-abc.svc.pinecone.io");
    }

    async fn bind_local() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        (listener, base_url)
    }

    async fn canned_server(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
        let (listener, base_url) = bind_local().await;
        (base_url, serve_canned(listener, responses))
    }

    /// Answers each accepted connection with the next canned `(status, body)` and
    /// hands back the request heads it read, lowercased
    fn serve_canned(listener: TcpListener, responses: Vec<(u16, String)>) -> JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut heads = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                heads.push(read_request_head(&mut stream).await);
                let reply = format!(
                    "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
            heads
        })
    }

    async fn read_request_head(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return head;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_lowercase()
    }

    fn local_client(base_url: &str) -> PineconeClient {
        PineconeClient::new("pc-test", base_url, "2024-07", 5).unwrap()
    }

    fn descriptor() -> IndexDescriptor {
        IndexDescriptor::serverless("pinecone-test3", 2, Metric::Cosine, "aws", "us-east-1")
    }

    #[tokio::test]
    async fn test_create_conflict_is_success() {
        let body = r#"{"error": {"code": "ALREADY_EXISTS", "message": "Resource already exists"}}"#;
        let (base_url, server) = canned_server(vec![(409, body.to_string())]).await;

        local_client(&base_url).create_index(&descriptor()).await.unwrap();

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("post /indexes http/1.1"));
        assert!(heads[0].contains("api-key: pc-test"));
        assert!(heads[0].contains("x-pinecone-api-version: 2024-07"));
    }

    #[tokio::test]
    async fn test_create_failure_is_vector_store_error() {
        let body = r#"{"error": {"code": "INVALID_ARGUMENT", "message": "bad dimension"}}"#;
        let (base_url, _server) = canned_server(vec![(400, body.to_string())]).await;

        let err = local_client(&base_url).create_index(&descriptor()).await.unwrap_err();
        assert!(matches!(err, PinecallError::VectorStore(_)));
        assert!(err.to_string().contains("INVALID_ARGUMENT: bad dimension"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_quota_error() {
        let body = r#"{"error": {"code": "RESOURCE_EXHAUSTED", "message": "Too many requests"}}"#;
        let (base_url, _server) = canned_server(vec![(429, body.to_string())]).await;

        let err = local_client(&base_url).list_indexes().await.unwrap_err();
        assert!(matches!(err, PinecallError::Quota(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_index_forgets_host() {
        let (base_url, server) = canned_server(vec![(404, String::new())]).await;
        let client = local_client(&base_url);
        client
            .hosts
            .write()
            .await
            .insert("pinecone-test3".to_string(), "idx-abc.svc.pinecone.io".to_string());

        client.delete_index("pinecone-test3").await.unwrap();

        assert!(client.hosts.read().await.get("pinecone-test3").is_none());
        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("delete /indexes/pinecone-test3 http/1.1"));
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_host() {
        let (base_url, _server) = canned_server(vec![(500, "upstream error".to_string())]).await;
        let client = local_client(&base_url);
        client
            .hosts
            .write()
            .await
            .insert("pinecone-test3".to_string(), "idx-abc.svc.pinecone.io".to_string());

        let err = client.delete_index("pinecone-test3").await.unwrap_err();

        assert!(matches!(err, PinecallError::VectorStore(_)));
        assert!(client.hosts.read().await.get("pinecone-test3").is_some());
    }

    fn describe_body(host: &str, ready: bool) -> String {
        format!(
            r#"{{"name": "pinecone-test3", "dimension": 2, "metric": "cosine", "host": "{}", "status": {{"ready": {}, "state": "{}"}}}}"#,
            host,
            ready,
            if ready { "Ready" } else { "Initializing" }
        )
    }

    #[tokio::test]
    async fn test_upsert_and_query_through_described_host() {
        // The described data plane host is the same local server
        let (listener, base_url) = bind_local().await;
        let query_body = r#"{"matches": [{"id": "pc-2", "score": 0.8, "metadata": {"textToEmbed": "My cat's name is Sandy."}}], "namespace": "nms-1"}"#;
        let server = serve_canned(
            listener,
            vec![
                (200, describe_body(&base_url, true)),
                (200, r#"{"upsertedCount": 1}"#.to_string()),
                (200, query_body.to_string()),
            ],
        );
        let client = local_client(&base_url);

        let upserted = client
            .upsert("pinecone-test3", "nms-1", vec![StoredVector::new("pc-2", vec![0.6, 0.8], None)])
            .await
            .unwrap();
        assert_eq!(upserted, 1);

        let result = client
            .query(
                "pinecone-test3",
                "nms-1",
                QueryRequest {
                    vector: vec![0.6, 0.8],
                    top_k: 1,
                    include_values: false,
                    include_metadata: true,
                },
            )
            .await
            .unwrap();
        let top = result.top_match().unwrap();
        assert_eq!(top.id, "pc-2");
        assert!((top.score - 0.8).abs() < 1e-6);
        assert_eq!(top.metadata.as_ref().unwrap()["textToEmbed"], "My cat's name is Sandy.");

        // Host resolved once, then reused for the query
        let heads = server.await.unwrap();
        assert_eq!(heads.len(), 3);
        assert!(heads[0].starts_with("get /indexes/pinecone-test3 http/1.1"));
        assert!(heads[1].starts_with("post /vectors/upsert http/1.1"));
        assert!(heads[2].starts_with("post /query http/1.1"));
    }

    #[tokio::test]
    async fn test_create_waits_until_ready() {
        let (listener, base_url) = bind_local().await;
        let server = serve_canned(
            listener,
            vec![
                (201, describe_body("idx-abc.svc.pinecone.io", false)),
                (200, describe_body("idx-abc.svc.pinecone.io", false)),
                (200, describe_body("idx-abc.svc.pinecone.io", true)),
            ],
        );

        local_client(&base_url)
            .wait_until_ready(Duration::from_secs(30))
            .create_index(&descriptor())
            .await
            .unwrap();

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("post /indexes http/1.1"));
        assert!(heads[1].starts_with("get /indexes/pinecone-test3 http/1.1"));
        assert!(heads[2].starts_with("get /indexes/pinecone-test3 http/1.1"));
    }

    #[tokio::test]
    async fn test_ready_wait_times_out() {
        let (listener, base_url) = bind_local().await;
        let _server = serve_canned(
            listener,
            vec![
                (201, describe_body("idx-abc.svc.pinecone.io", false)),
                (200, describe_body("idx-abc.svc.pinecone.io", false)),
            ],
        );

        let err = local_client(&base_url)
            .wait_until_ready(Duration::ZERO)
            .create_index(&descriptor())
            .await
            .unwrap_err();
        assert!(matches!(err, PinecallError::VectorStore(_)));
        assert!(err.to_string().contains("not ready"));
    }
}
