//! In-memory vector store.
//!
//! Brute-force cosine search over per-namespace maps. Mirrors the remote
//! store's semantics (idempotent writes, empty namespaces return nothing),
//! so the vectorization service can run against it in tests and offline
//! development.

use std::collections::HashMap;

use async_trait::async_trait;
use dreamweaver_embeddings::cosine_similarity;
use ordered_float::OrderedFloat;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, VectorStoreError};
use crate::namespace::Namespace;
use crate::store::{VectorStore, validate_record};
use crate::types::{IndexStats, MetadataFilter, VectorMatch, VectorRecord};

#[derive(Default)]
struct State {
    /// Records by namespace name, then by id.
    namespaces: HashMap<String, HashMap<String, VectorRecord>>,

    /// Fixed by the first record written.
    dimension: Option<usize>,
}

/// A process-local [`VectorStore`].
#[derive(Default)]
pub struct InMemoryVectorStore {
    state: RwLock<State>,
}

impl InMemoryVectorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `id` exists in `namespace`.
    pub async fn contains(&self, namespace: &Namespace, id: &str) -> bool {
        self.get(namespace, id).await.is_some()
    }

    /// Get a stored record.
    pub async fn get(&self, namespace: &Namespace, id: &str) -> Option<VectorRecord> {
        self.state
            .read()
            .await
            .namespaces
            .get(&namespace.name())
            .and_then(|records| records.get(id))
            .cloned()
    }

    /// Number of records in `namespace`.
    pub async fn len(&self, namespace: &Namespace) -> usize {
        self.state
            .read()
            .await
            .namespaces
            .get(&namespace.name())
            .map_or(0, HashMap::len)
    }

    fn check_dimension(expected: Option<usize>, actual: usize) -> Result<()> {
        match expected {
            Some(expected) if expected != actual => {
                Err(VectorStoreError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, namespace: &Namespace, record: VectorRecord) -> Result<()> {
        validate_record(&record)?;

        let mut state = self.state.write().await;
        Self::check_dimension(state.dimension, record.values.len())?;
        state.dimension = Some(record.values.len());

        debug!("Upserting {} into {namespace}", record.id);
        state
            .namespaces
            .entry(namespace.name())
            .or_default()
            .insert(record.id.clone(), record);

        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let name = namespace.name();

        if let Some(records) = state.namespaces.get_mut(&name) {
            records.remove(id);
            if records.is_empty() {
                state.namespaces.remove(&name);
            }
        }

        Ok(())
    }

    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>> {
        let state = self.state.read().await;

        let Some(records) = state.namespaces.get(&namespace.name()) else {
            return Ok(Vec::new());
        };
        Self::check_dimension(state.dimension, vector.len())?;

        let mut scored: Vec<(OrderedFloat<f32>, &VectorRecord)> = Vec::with_capacity(records.len());
        for record in records.values() {
            if filter.is_some_and(|f| !f.matches(&record.metadata)) {
                continue;
            }
            let score = cosine_similarity(vector, &record.values).map_err(|_| {
                VectorStoreError::DimensionMismatch {
                    expected: record.values.len(),
                    actual: vector.len(),
                }
            })?;
            scored.push((OrderedFloat(score), record));
        }

        // Sort by score descending
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| VectorMatch {
                id: record.id.clone(),
                score: score.0,
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    async fn describe(&self) -> Result<IndexStats> {
        let state = self.state.read().await;
        let namespaces: std::collections::BTreeMap<String, u64> = state
            .namespaces
            .iter()
            .map(|(name, records)| (name.clone(), records.len() as u64))
            .collect();

        Ok(IndexStats {
            dimension: state.dimension,
            total_records: namespaces.values().sum(),
            namespaces,
        })
    }
}
