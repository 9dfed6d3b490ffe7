//! # Dream Vectorization
//!
//! Keeps every dream's embedding in the vector index and answers "dreams
//! like this one" queries.
//!
//! - **Service**: embeds dreams and writes them to `user_<ownerId>`, mirroring
//!   public dreams into `public`
//! - **Sync**: turns relational writes into background index work
//! - **Hydration**: resolves matches back to dreams and spots divergence
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Dream Vectorization                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  CRUD write ──► DreamEvent ──► VectorSync (spawned)             │
//! │                                     │                           │
//! │                                     ▼                           │
//! │                      DreamVectorizationService                  │
//! │                        │                  │                     │
//! │                        ▼                  ▼                     │
//! │              EmbeddingProvider      VectorStore                 │
//! │                                  user_<owner> / public          │
//! │                                                                 │
//! │  similar_dreams ──► rank_matches ──► hydrate(DreamRepository)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dreamweaver_vectorization::{DreamweaverConfig, SimilarityRequest};
//!
//! let service = DreamweaverConfig::from_env().build_service().await?;
//! service.vectorize(&dream).await?;
//!
//! let request = SimilarityRequest::new(&dream.content, &dream.owner_id)
//!     .including_public()
//!     .excluding(&dream.id);
//! let matches = service.similar_dreams(&request).await?;
//! ```

pub mod config;
pub mod document;
pub mod dream;
pub mod error;
pub mod repository;
pub mod service;
pub mod similar;
pub mod sync;

pub use config::DreamweaverConfig;
pub use document::{embedding_text, metadata};
pub use dream::{Clarity, Dream, DreamAnalysis, DreamSymbol, InvalidClarity, Mood, SymbolKind};
pub use error::{Result, VectorizationError};
pub use repository::{DreamRepository, Hydrated, InMemoryDreamRepository, ScoredDream, hydrate};
pub use service::DreamVectorizationService;
pub use similar::{SimilarityRequest, rank_matches};
pub use sync::{DreamEvent, RepairSummary, ResyncSummary, SyncReport, VectorSync};

// Re-export from dependencies for convenience
pub use dreamweaver_embeddings::{EmbeddingProvider, HashingProvider};
pub use dreamweaver_vector_store::{InMemoryVectorStore, Namespace, VectorMatch, VectorStore};
