use pinecall_common::PinecallError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metadata attached to a stored vector
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Similarity metric of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    #[serde(rename = "dotproduct")]
    DotProduct,
}

impl FromStr for Metric {
    type Err = PinecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" => Ok(Self::DotProduct),
            other => Err(PinecallError::invalid_input(format!("Unknown metric: {}", other))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Euclidean => write!(f, "euclidean"),
            Self::DotProduct => write!(f, "dotproduct"),
        }
    }
}

/// Serverless placement of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerlessSpec {
    pub cloud: String,
    pub region: String,
}

/// Deployment spec wrapper as the control plane expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub serverless: ServerlessSpec,
}

/// What to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub spec: IndexSpec,
}

impl IndexDescriptor {
    pub fn serverless(
        name: impl Into<String>,
        dimension: usize,
        metric: Metric,
        cloud: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: cloud.into(),
                    region: region.into(),
                },
            },
        }
    }
}

/// Readiness reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,

    #[serde(default)]
    pub state: String,
}

/// What exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,

    #[serde(default)]
    pub dimension: Option<usize>,

    #[serde(default)]
    pub metric: Option<Metric>,

    /// Data plane host, without scheme
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub status: IndexStatus,
}

/// A vector as written to a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: String,

    pub values: Vec<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl StoredVector {
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Option<Metadata>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata,
        }
    }
}

/// Similarity query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_values: bool,
    pub include_metadata: bool,
}

/// Single query match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,

    pub score: f32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Matches ordered by descending score, at most `top_k` of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueryResult {
    #[serde(default)]
    pub matches: Vec<ScoredMatch>,

    #[serde(default)]
    pub namespace: String,
}

impl QueryResult {
    pub fn top_match(&self) -> Option<&ScoredMatch> {
        self.matches.first()
    }
}
