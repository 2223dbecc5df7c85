pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingBackend, VectorBackend};
pub use error::PinecallError;
pub type Result<T> = std::result::Result<T, PinecallError>;
