use pinecall_common::{PinecallError, Result};
use pinecall_vector::Metadata;
use serde::{Deserialize, Serialize};

/// A demo record; stored verbatim as the vector's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRecord {
    /// Text sent to the embedding model
    pub text_to_embed: String,

    pub favourite_activities: Vec<String>,

    pub born: String,
}

impl EmbeddingRecord {
    pub fn new(text_to_embed: &str, favourite_activities: &[&str], born: &str) -> Self {
        Self {
            text_to_embed: text_to_embed.to_string(),
            favourite_activities: favourite_activities.iter().map(|s| s.to_string()).collect(),
            born: born.to_string(),
        }
    }

    /// Metadata map with the camelCase keys used on the wire
    pub fn to_metadata(&self) -> Result<Metadata> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(PinecallError::internal(format!(
                "Record serialized to a non-object: {}",
                other
            ))),
        }
    }

    /// Inverse of `to_metadata`; `None` when the metadata has another shape
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(metadata.clone())).ok()
    }
}

/// The two records every workflow run stores
pub fn demo_dataset() -> Vec<EmbeddingRecord> {
    vec![
        EmbeddingRecord::new(
            "My dog's name is Steve.",
            &["playing fetch", "running in the park"],
            "July 19, 2023",
        ),
        EmbeddingRecord::new(
            "My cat's name is Sandy.",
            &["napping", "chasing laser pointers"],
            "August 7, 2019",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_dataset() {
        let records = demo_dataset();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text_to_embed, "My cat's name is Sandy.");
    }

    #[test]
    fn test_metadata_keys() {
        let metadata = demo_dataset()[0].to_metadata().unwrap();
        assert_eq!(metadata["textToEmbed"], "My dog's name is Steve.");
        assert_eq!(
            metadata["favouriteActivities"],
            serde_json::json!(["playing fetch", "running in the park"])
        );
        assert_eq!(metadata["born"], "July 19, 2023");
    }

    #[test]
    fn test_from_metadata() {
        let record = demo_dataset().remove(1);
        let metadata = record.to_metadata().unwrap();
        assert_eq!(EmbeddingRecord::from_metadata(&metadata), Some(record));
        assert_eq!(EmbeddingRecord::from_metadata(&Metadata::new()), None);
    }
}
