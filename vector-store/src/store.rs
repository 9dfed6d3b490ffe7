//! The vector store interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::namespace::Namespace;
use crate::types::{IndexStats, MetadataFilter, VectorMatch, VectorRecord};

/// A namespace-scoped vector index.
///
/// Implementations hold no state the caller has to coordinate: `upsert` and
/// `delete` are idempotent, and an empty or unknown namespace is never an
/// error.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this store.
    fn name(&self) -> &str;

    /// Insert or overwrite the record keyed by `record.id`.
    async fn upsert(&self, namespace: &Namespace, record: VectorRecord) -> Result<()>;

    /// Remove the record if present. Absent ids are a no-op.
    async fn delete(&self, namespace: &Namespace, id: &str) -> Result<()>;

    /// Return up to `top_k` nearest neighbours, most similar first,
    /// optionally restricted to records matching `filter`.
    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>>;

    /// Report record counts per namespace.
    async fn describe(&self) -> Result<IndexStats>;
}

pub(crate) fn validate_record(record: &VectorRecord) -> Result<()> {
    use crate::error::VectorStoreError;

    if record.id.is_empty() {
        return Err(VectorStoreError::InvalidRecord("empty id".to_string()));
    }
    if record.values.is_empty() {
        return Err(VectorStoreError::InvalidRecord(format!(
            "record {} has no values",
            record.id
        )));
    }
    Ok(())
}
