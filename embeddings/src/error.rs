//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while generating embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider credential or endpoint missing.
    #[error("embedding provider not configured: {0}")]
    NotConfigured(String),

    /// Nothing to embed.
    #[error("cannot embed empty text")]
    EmptyInput,

    /// Provider answered with a non-success status.
    #[error("embedding API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Provider answered with an unexpected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Two vectors of different lengths were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// HTTP error, including connect failures and timeouts.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether this error comes from missing configuration.
    ///
    /// Configuration errors are never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }

    /// Whether the call may succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotConfigured(_)
            | Self::EmptyInput
            | Self::InvalidResponse(_)
            | Self::DimensionMismatch { .. } => false,
        }
    }
}
