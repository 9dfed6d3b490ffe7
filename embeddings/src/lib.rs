//! # Embeddings
//!
//! Turns dream text into dense vectors for semantic similarity search.
//!
//! ## Features
//!
//! - **Remote Providers**: OpenAI-compatible and multimodal (Doubao Ark) embedding APIs
//! - **Local Hashing Provider**: Deterministic offline embeddings for development
//! - **Caching**: Optional in-memory cache in front of any provider
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  text ──► EmbeddingProvider ──► Embedding                       │
//! │                 │                                               │
//! │                 ▼                                               │
//! │  HttpEmbeddingProvider / HashingProvider / CachedProvider       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Providers never retry. Callers decide what a failure means for them.

pub mod cache;
pub mod error;
pub mod provider;
pub mod similarity;

pub use cache::{CacheStats, CachedProvider, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use provider::{
    EmbeddingApi, EmbeddingProvider, HashingProvider, HttpEmbeddingProvider, extract_embedding,
};
pub use similarity::{cosine_similarity, normalize};

/// A dense vector embedding.
///
/// The dimension is a property of the provider and model, discovered at
/// integration time.
pub type Embedding = Vec<f32>;
