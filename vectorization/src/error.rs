//! Error types for dream vectorization.

use dreamweaver_embeddings::EmbeddingError;
use dreamweaver_vector_store::VectorStoreError;
use thiserror::Error;

/// Result type alias for vectorization operations.
pub type Result<T> = std::result::Result<T, VectorizationError>;

/// Errors that can occur while keeping dreams and vectors in sync.
#[derive(Error, Debug)]
pub enum VectorizationError {
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector store error.
    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),

    /// Caller passed something unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Relational store error.
    #[error("repository error: {0}")]
    Repository(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Dreams file could not be parsed.
    #[error("invalid dreams file: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VectorizationError {
    /// Whether this is a setup problem that retrying will not fix.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Embedding(e) => e.is_configuration(),
            Self::Store(e) => e.is_configuration(),
            Self::Config(_) | Self::ConfigParse(_) => true,
            _ => false,
        }
    }

    /// Whether a later retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Embedding(e) => e.is_transient(),
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}
