#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dreamweaver_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, HashingProvider};
use dreamweaver_vector_store::{
    InMemoryVectorStore, IndexStats, MetadataFilter, Namespace, VectorMatch, VectorRecord,
    VectorStore, VectorStoreError,
};
use dreamweaver_vectorization::{DreamVectorizationService, VectorSync};

/// Hashing embedder that counts calls.
pub struct CountingEmbedder {
    inner: HashingProvider,
    calls: AtomicUsize,
}

impl Default for CountingEmbedder {
    fn default() -> Self {
        Self {
            inner: HashingProvider::new(2048),
            calls: AtomicUsize::new(0),
        }
    }
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn name(&self) -> &str {
        "counting"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn embed(&self, text: &str) -> dreamweaver_embeddings::Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Hashing embedder that sleeps before every call.
pub struct SlowEmbedder {
    inner: HashingProvider,
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: HashingProvider::new(2048),
            delay,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    fn name(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn embed(&self, text: &str) -> dreamweaver_embeddings::Result<Embedding> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Embedder whose key was never configured.
pub struct UnconfiguredEmbedder;

#[async_trait]
impl EmbeddingProvider for UnconfiguredEmbedder {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn embed(&self, _text: &str) -> dreamweaver_embeddings::Result<Embedding> {
        Err(EmbeddingError::NotConfigured("API key missing".to_string()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// One recorded `query` call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCall {
    pub namespace: Namespace,
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
}

/// Store answering queries from fixed per-namespace match lists.
#[derive(Default)]
pub struct ScriptedStore {
    matches: HashMap<Namespace, Vec<VectorMatch>>,
    queries: Mutex<Vec<QueryCall>>,
}

impl ScriptedStore {
    pub fn with_matches(mut self, namespace: Namespace, matches: Vec<VectorMatch>) -> Self {
        self.matches.insert(namespace, matches);
        self
    }

    pub fn queries(&self) -> Vec<QueryCall> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn upsert(
        &self,
        _namespace: &Namespace,
        _record: VectorRecord,
    ) -> dreamweaver_vector_store::Result<()> {
        Ok(())
    }

    async fn delete(&self, _namespace: &Namespace, _id: &str) -> dreamweaver_vector_store::Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        namespace: &Namespace,
        _vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> dreamweaver_vector_store::Result<Vec<VectorMatch>> {
        self.queries.lock().unwrap().push(QueryCall {
            namespace: namespace.clone(),
            top_k,
            filter: filter.cloned(),
        });
        Ok(self
            .matches
            .get(namespace)
            .map(|m| m.iter().take(top_k).cloned().collect())
            .unwrap_or_default())
    }

    async fn describe(&self) -> dreamweaver_vector_store::Result<IndexStats> {
        Ok(IndexStats::default())
    }
}

/// In-memory store that fails writes touching chosen ids or a chosen
/// namespace.
pub struct FlakyStore {
    pub inner: InMemoryVectorStore,
    failing_ids: HashSet<String>,
    failing_namespace: Option<Namespace>,
}

impl FlakyStore {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            failing_ids: ids.iter().map(|id| id.to_string()).collect(),
            failing_namespace: None,
        }
    }

    pub fn failing_in(namespace: Namespace) -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            failing_ids: HashSet::new(),
            failing_namespace: Some(namespace),
        }
    }

    fn check(&self, namespace: &Namespace, id: &str) -> dreamweaver_vector_store::Result<()> {
        if self.failing_ids.contains(id) || self.failing_namespace.as_ref() == Some(namespace) {
            return Err(VectorStoreError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn upsert(
        &self,
        namespace: &Namespace,
        record: VectorRecord,
    ) -> dreamweaver_vector_store::Result<()> {
        self.check(namespace, &record.id)?;
        self.inner.upsert(namespace, record).await
    }

    async fn delete(&self, namespace: &Namespace, id: &str) -> dreamweaver_vector_store::Result<()> {
        self.check(namespace, id)?;
        self.inner.delete(namespace, id).await
    }

    async fn query(
        &self,
        namespace: &Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> dreamweaver_vector_store::Result<Vec<VectorMatch>> {
        self.inner.query(namespace, vector, top_k, filter).await
    }

    async fn describe(&self) -> dreamweaver_vector_store::Result<IndexStats> {
        self.inner.describe().await
    }
}

/// Service over a counting hashing embedder and an in-memory store.
pub struct Harness {
    pub embedder: Arc<CountingEmbedder>,
    pub store: Arc<InMemoryVectorStore>,
    pub service: Arc<DreamVectorizationService>,
}

impl Harness {
    pub fn new() -> Self {
        let embedder = Arc::new(CountingEmbedder::default());
        let store = Arc::new(InMemoryVectorStore::new());
        let service = Arc::new(DreamVectorizationService::new(
            embedder.clone(),
            store.clone(),
        ));
        Self {
            embedder,
            store,
            service,
        }
    }

    pub fn sync(&self) -> VectorSync {
        VectorSync::new(self.service.clone())
    }

    pub async fn in_user(&self, owner: &str, id: &str) -> bool {
        self.store.contains(&Namespace::user(owner), id).await
    }

    pub async fn in_public(&self, id: &str) -> bool {
        self.store.contains(&Namespace::Public, id).await
    }
}
