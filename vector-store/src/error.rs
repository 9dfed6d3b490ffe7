//! Error types for vector store clients.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Errors that can occur while talking to a vector index.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// Credential, host or index name missing.
    #[error("vector store not configured: {0}")]
    NotConfigured(String),

    /// The index rejected our credentials.
    #[error("vector store rejected credentials ({status})")]
    Unauthorized { status: u16 },

    /// Non-success status other than auth failures.
    #[error("vector store returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Record cannot be written as given.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Vector length differs from the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// HTTP error, including connect failures and timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl VectorStoreError {
    /// Whether this error comes from missing or rejected configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured(_) | Self::Unauthorized { .. })
    }

    /// Whether the call may succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
