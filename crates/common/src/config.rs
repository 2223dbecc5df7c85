use crate::error::PinecallError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which embedding provider to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI embeddings API
    OpenAi,
    /// Deterministic local feature hashing, no network
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = PinecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "hashing" | "local" => Ok(Self::Hashing),
            other => Err(PinecallError::config(format!(
                "Unknown embedding backend '{}' (expected openai or hashing)",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Hashing => write!(f, "hashing"),
        }
    }
}

/// Which vector store client to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Managed Pinecone service
    Pinecone,
    /// Process-local store
    Memory,
}

impl FromStr for VectorBackend {
    type Err = PinecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(PinecallError::config(format!(
                "Unknown vector backend '{}' (expected pinecone or memory)",
                other
            ))),
        }
    }
}

impl fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinecone => write!(f, "pinecone"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

const SUPPORTED_METRICS: [&str; 3] = ["cosine", "euclidean", "dotproduct"];

/// Pinecall application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenAI API key
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Pinecone API key
    #[serde(skip_serializing)]
    pub pinecone_api_key: Option<String>,

    /// Embedding provider selection
    pub embedding_backend: EmbeddingBackend,

    /// Vector store selection
    pub vector_backend: VectorBackend,

    /// OpenAI API base URL
    pub openai_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Pinecone control plane URL
    pub pinecone_controller_url: String,

    /// Value of the X-Pinecone-API-Version header
    pub pinecone_api_version: String,

    /// Index name
    pub index_name: String,

    /// Namespace inside the index
    pub namespace: String,

    /// Prefix of stored vector ids ("<prefix>-<n>")
    pub embedding_id_prefix: String,

    /// Embedding dimension
    pub dimension: usize,

    /// Similarity metric (cosine, euclidean, dotproduct)
    pub metric: String,

    /// Serverless cloud provider
    pub cloud: String,

    /// Serverless region
    pub region: String,

    /// Query text used by the workflow
    pub query: String,

    /// Number of matches returned by the workflow query
    pub top_k: usize,

    /// Return stored vector values with matches
    pub include_values: bool,

    /// Return stored metadata with matches
    pub include_metadata: bool,

    /// Poll until a freshly created index reports ready
    pub wait_until_ready: bool,

    /// Upper bound for the readiness poll
    pub ready_timeout_secs: u64,

    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: u64,

    /// Submit a workflow run whenever the page is rendered
    pub run_on_render: bool,

    /// Finished tasks kept for `/tasks` and `/progress`
    pub max_finished_tasks: usize,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            pinecone_api_key: None,
            embedding_backend: EmbeddingBackend::OpenAi,
            vector_backend: VectorBackend::Pinecone,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            pinecone_controller_url: "https://api.pinecone.io".to_string(),
            pinecone_api_version: "2024-07".to_string(),
            index_name: "pinecone-test3".to_string(),
            namespace: "nms-1".to_string(),
            embedding_id_prefix: "pc".to_string(),
            dimension: 1536,
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            query: "What is my cat's name?".to_string(),
            top_k: 1,
            include_values: false,
            include_metadata: true,
            wait_until_ready: false,
            ready_timeout_secs: 120,
            request_timeout_secs: 600,
            run_on_render: true,
            max_finished_tasks: 100,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            log_dir: PathBuf::from("./log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, PinecallError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.ensure_directories()?;

        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PinecallError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| -> String {
            lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or(default)
        };

        let config = Self {
            openai_api_key: lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()),
            pinecone_api_key: lookup("PINECONE_API_KEY").filter(|v| !v.trim().is_empty()),
            embedding_backend: match lookup("EMBEDDING_BACKEND").filter(|v| !v.trim().is_empty()) {
                Some(v) => v.parse()?,
                None => defaults.embedding_backend,
            },
            vector_backend: match lookup("VECTOR_BACKEND").filter(|v| !v.trim().is_empty()) {
                Some(v) => v.parse()?,
                None => defaults.vector_backend,
            },
            openai_base_url: string("OPENAI_BASE_URL", defaults.openai_base_url),
            embedding_model: string("EMBEDDING_MODEL", defaults.embedding_model),
            pinecone_controller_url: string(
                "PINECONE_CONTROLLER_URL",
                defaults.pinecone_controller_url,
            ),
            pinecone_api_version: string("PINECONE_API_VERSION", defaults.pinecone_api_version),
            index_name: string("PINECONE_INDEX", defaults.index_name),
            namespace: string("PINECONE_NAMESPACE", defaults.namespace),
            embedding_id_prefix: string("EMBEDDING_ID_PREFIX", defaults.embedding_id_prefix),
            dimension: parse_or(&lookup, "EMBEDDING_DIMENSION", defaults.dimension)?,
            metric: string("INDEX_METRIC", defaults.metric).to_lowercase(),
            cloud: string("INDEX_CLOUD", defaults.cloud),
            region: string("INDEX_REGION", defaults.region),
            query: string("QUERY_TEXT", defaults.query),
            top_k: parse_or(&lookup, "QUERY_TOP_K", defaults.top_k)?,
            include_values: parse_bool_or(&lookup, "QUERY_INCLUDE_VALUES", defaults.include_values)?,
            include_metadata: parse_bool_or(
                &lookup,
                "QUERY_INCLUDE_METADATA",
                defaults.include_metadata,
            )?,
            wait_until_ready: parse_bool_or(&lookup, "WAIT_UNTIL_READY", defaults.wait_until_ready)?,
            ready_timeout_secs: parse_or(&lookup, "READY_TIMEOUT_SECS", defaults.ready_timeout_secs)?,
            request_timeout_secs: parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            run_on_render: parse_bool_or(&lookup, "RUN_ON_RENDER", defaults.run_on_render)?,
            max_finished_tasks: parse_or(&lookup, "MAX_FINISHED_TASKS", defaults.max_finished_tasks)?,
            server_host: string("SERVER_HOST", defaults.server_host),
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port)?,
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
            log_level: string("LOG_LEVEL", defaults.log_level),
        };

        Ok(config)
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), PinecallError> {
        if !self.log_dir.exists() {
            std::fs::create_dir_all(&self.log_dir).map_err(|e| {
                PinecallError::config(format!(
                    "Failed to create directory {}: {}",
                    self.log_dir.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// OpenAI key, or a configuration error naming the missing variable
    pub fn require_openai_api_key(&self) -> Result<&str, PinecallError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| PinecallError::config("OPENAI_API_KEY is not set"))
    }

    /// Pinecone key, or a configuration error naming the missing variable
    pub fn require_pinecone_api_key(&self) -> Result<&str, PinecallError> {
        self.pinecone_api_key
            .as_deref()
            .ok_or_else(|| PinecallError::config("PINECONE_API_KEY is not set"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), PinecallError> {
        if self.index_name.trim().is_empty() {
            return Err(PinecallError::config("Index name cannot be empty"));
        }

        if self.namespace.trim().is_empty() {
            return Err(PinecallError::config("Namespace cannot be empty"));
        }

        if self.query.trim().is_empty() {
            return Err(PinecallError::config("Query text cannot be empty"));
        }

        if self.dimension == 0 {
            return Err(PinecallError::config("Embedding dimension must be positive"));
        }

        if self.top_k == 0 {
            return Err(PinecallError::config("top_k must be at least 1"));
        }

        if !SUPPORTED_METRICS.contains(&self.metric.as_str()) {
            return Err(PinecallError::config(format!(
                "Unsupported metric '{}' (expected one of {})",
                self.metric,
                SUPPORTED_METRICS.join(", ")
            )));
        }

        for (name, url) in [
            ("OpenAI base URL", &self.openai_base_url),
            ("Pinecone controller URL", &self.pinecone_controller_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PinecallError::config(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if self.server_port == 0 {
            return Err(PinecallError::config("Server port cannot be 0"));
        }

        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, PinecallError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            PinecallError::config(format!("Invalid value for {}: '{}'", key, raw))
        }),
        _ => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, PinecallError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(PinecallError::config(format!(
                "Invalid boolean for {}: '{}'",
                key, raw
            ))),
        },
        None => Ok(default),
    }
}
