//! # Vector Store
//!
//! Clients for the vector index that backs dream similarity search.
//!
//! Every operation is scoped by an explicit [`Namespace`]: one private
//! namespace per user (`user_<ownerId>`) plus a shared `public` namespace.
//! Namespaces are independent keyspaces that happen to share dream ids by
//! convention; nothing links a record in one to a record in another.
//!
//! - [`PineconeStore`]: Pinecone REST data-plane client
//! - [`InMemoryVectorStore`]: process-local cosine index with the same semantics

pub mod error;
pub mod memory;
pub mod namespace;
pub mod pinecone;
pub mod store;
pub mod types;

pub use error::{Result, VectorStoreError};
pub use memory::InMemoryVectorStore;
pub use namespace::Namespace;
pub use pinecone::{CONTROL_PLANE_URL, PineconeConfig, PineconeStore, resolve_index_host};
pub use store::VectorStore;
pub use types::{IndexStats, Metadata, MetadataFilter, VectorMatch, VectorRecord};
