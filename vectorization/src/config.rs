//! Configuration for dream vectorization.
//!
//! Read once at startup from a TOML file, then overridden from the
//! environment. API keys come only from the environment.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dreamweaver_embeddings::{
    CachedProvider, EmbeddingApi, EmbeddingCache, EmbeddingError, EmbeddingProvider,
    HashingProvider, HttpEmbeddingProvider,
};
use dreamweaver_vector_store::{
    CONTROL_PLANE_URL, InMemoryVectorStore, PineconeConfig, PineconeStore, VectorStore,
    VectorStoreError, resolve_index_host,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VectorizationError};
use crate::service::{DEFAULT_MAX_LIMIT, DreamVectorizationService};
use crate::similar::DEFAULT_LIMIT;

/// Embedding API key, checked before the provider-specific fallbacks.
pub const EMBEDDING_API_KEY_ENV: &str = "EMBEDDING_API_KEY";
const EMBEDDING_API_KEY_FALLBACKS: [&str; 2] = ["DOUBAO_API_KEY", "OPENAI_API_KEY"];
pub const EMBEDDING_BASE_URL_ENV: &str = "EMBEDDING_BASE_URL";
pub const EMBEDDING_MODEL_ENV: &str = "EMBEDDING_MODEL";
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
pub const PINECONE_INDEX_HOST_ENV: &str = "PINECONE_INDEX_HOST";
pub const PINECONE_INDEX_NAME_ENV: &str = "PINECONE_INDEX_NAME";

/// Default bound on outbound requests, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for dream vectorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DreamweaverConfig {
    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Vector store configuration.
    pub store: StoreConfig,

    /// Similarity search configuration.
    pub search: SearchConfig,
}

impl DreamweaverConfig {
    /// Load a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        debug!("Loaded config from {}", path.display());
        Ok(Self::from_toml(&raw)?.with_env(|key| std::env::var(key).ok()))
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Parse TOML without looking at the environment.
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = std::iter::once(EMBEDDING_API_KEY_ENV)
            .chain(EMBEDDING_API_KEY_FALLBACKS)
            .find_map(&get)
        {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = get(EMBEDDING_BASE_URL_ENV) {
            self.embedding.base_url = Some(url);
        }
        if let Some(model) = get(EMBEDDING_MODEL_ENV) {
            self.embedding.model = Some(model);
        }
        if let Some(key) = get(PINECONE_API_KEY_ENV) {
            self.store.api_key = Some(key);
        }
        if let Some(host) = get(PINECONE_INDEX_HOST_ENV) {
            self.store.index_host = Some(host);
        }
        if let Some(name) = get(PINECONE_INDEX_NAME_ENV) {
            self.store.index_name = Some(name);
        }
        self
    }

    /// Construct the configured embedding provider.
    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let config = &self.embedding;
        let cache = EmbeddingCache::new(config.cache_max_entries);

        let api = match config.provider {
            EmbeddingProviderType::Hashing => {
                if config.hashing_dimension == 0 {
                    return Err(VectorizationError::Config(
                        "hashing_dimension must be positive".to_string(),
                    ));
                }
                info!(
                    "Using local hashing embeddings ({} dimensions)",
                    config.hashing_dimension
                );
                let provider = HashingProvider::new(config.hashing_dimension);
                return Ok(wrap_cache(provider, cache));
            }
            EmbeddingProviderType::OpenAiCompatible => EmbeddingApi::OpenAiCompatible,
            EmbeddingProviderType::Multimodal => EmbeddingApi::Multimodal,
        };

        let api_key = config.api_key.as_deref().ok_or_else(|| {
            EmbeddingError::NotConfigured(format!(
                "set {EMBEDDING_API_KEY_ENV} to use the {api:?} embedding API"
            ))
        })?;

        let mut provider = HttpEmbeddingProvider::new(api)?
            .with_api_key(api_key)
            .with_timeout(Duration::from_secs(config.timeout_secs))?;
        if let Some(url) = &config.base_url {
            provider = provider.with_base_url(url);
        }
        if let Some(model) = &config.model {
            provider = provider.with_model(model);
        }

        info!(
            "Using {} embeddings (model: {})",
            provider.name(),
            provider.model()
        );
        Ok(wrap_cache(provider, cache))
    }

    /// Construct the configured vector store. Resolves the index host through
    /// the control plane when only an index name is given.
    pub async fn build_store(&self) -> Result<Arc<dyn VectorStore>> {
        let config = &self.store;
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-memory vector store");
                Ok(Arc::new(InMemoryVectorStore::new()))
            }
            StoreBackend::Pinecone => {
                let api_key = config.api_key.as_deref().ok_or_else(|| {
                    VectorStoreError::NotConfigured(format!(
                        "set {PINECONE_API_KEY_ENV} to use Pinecone"
                    ))
                })?;
                let timeout = Duration::from_secs(config.timeout_secs);

                let host = match (&config.index_host, &config.index_name) {
                    (Some(host), _) => host.clone(),
                    (None, Some(name)) => {
                        resolve_index_host(api_key, name, &config.control_plane_url, timeout)
                            .await?
                    }
                    (None, None) => {
                        return Err(VectorStoreError::NotConfigured(format!(
                            "set {PINECONE_INDEX_HOST_ENV} or {PINECONE_INDEX_NAME_ENV}"
                        ))
                        .into());
                    }
                };

                info!("Using Pinecone index at {host}");
                let store =
                    PineconeStore::new(PineconeConfig::new(api_key, host).with_timeout(timeout))?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Construct the service with the configured clients and limits.
    pub async fn build_service(&self) -> Result<DreamVectorizationService> {
        let embedder = self.build_embedder()?;
        let store = self.build_store().await?;
        Ok(DreamVectorizationService::new(embedder, store).with_max_limit(self.search.max_limit))
    }
}

fn wrap_cache<P>(provider: P, cache: EmbeddingCache) -> Arc<dyn EmbeddingProvider>
where
    P: EmbeddingProvider + 'static,
{
    Arc::new(CachedProvider::new(provider, cache))
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Override the provider's default endpoint.
    pub base_url: Option<String>,

    /// Override the provider's default model.
    pub model: Option<String>,

    /// API key, from the environment only.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Vector size of the hashing provider.
    pub hashing_dimension: usize,

    /// Maximum cache size. Zero disables caching.
    pub cache_max_entries: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Multimodal,
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            hashing_dimension: HashingProvider::DEFAULT_DIMENSION,
            cache_max_entries: 1000,
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible `/embeddings` API.
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    /// Multimodal `/embeddings/multimodal` API.
    Multimodal,
    /// Local hashing embeddings, no network.
    Hashing,
}

/// Configuration for the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which store to use.
    pub backend: StoreBackend,

    /// Data-plane host of the index.
    pub index_host: Option<String>,

    /// Index name, used to look up the host when none is given.
    pub index_name: Option<String>,

    /// Control plane used for host lookup.
    pub control_plane_url: String,

    /// API key, from the environment only.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Pinecone,
            index_host: None,
            index_name: None,
            control_plane_url: CONTROL_PLANE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Pinecone serverless index.
    Pinecone,
    /// Process-local store; contents are lost on exit.
    Memory,
}

/// Configuration for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Matches returned when the caller gives no limit.
    pub default_limit: usize,

    /// Cap on any requested limit.
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DreamweaverConfig::default();
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Multimodal);
        assert_eq!(config.embedding.timeout_secs, 30);
        assert_eq!(config.store.backend, StoreBackend::Pinecone);
        assert_eq!(config.search.default_limit, 5);
        assert_eq!(config.search.max_limit, 50);
    }

    #[test]
    fn test_from_toml() {
        let config = DreamweaverConfig::from_toml(
            r#"
            [embedding]
            provider = "openai_compatible"
            model = "text-embedding-3-large"
            cache_max_entries = 0

            [store]
            backend = "memory"

            [search]
            max_limit = 20
            "#,
        )
        .unwrap();

        assert_eq!(
            config.embedding.provider,
            EmbeddingProviderType::OpenAiCompatible
        );
        assert_eq!(
            config.embedding.model.as_deref(),
            Some("text-embedding-3-large")
        );
        assert_eq!(config.embedding.cache_max_entries, 0);
        assert_eq!(config.embedding.timeout_secs, 30);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.search.max_limit, 20);
        assert_eq!(config.search.default_limit, 5);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = DreamweaverConfig::from_toml("[embedding]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_secrets_not_read_from_file_or_written_back() {
        let config = DreamweaverConfig::from_toml("[store]\napi_key = \"leaked\"\n").unwrap();
        assert_eq!(config.store.api_key, None);

        let config = config.with_env(env(&[(PINECONE_API_KEY_ENV, "pc-secret")]));
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("pc-secret"));
    }

    #[test]
    fn test_env_overrides() {
        let config = DreamweaverConfig::default().with_env(env(&[
            ("DOUBAO_API_KEY", "doubao"),
            ("OPENAI_API_KEY", "openai"),
            (EMBEDDING_MODEL_ENV, "custom-model"),
            (PINECONE_API_KEY_ENV, "pc"),
            (PINECONE_INDEX_HOST_ENV, "idx.svc.pinecone.io"),
            (PINECONE_INDEX_NAME_ENV, "   "),
        ]));

        assert_eq!(config.embedding.api_key.as_deref(), Some("doubao"));
        assert_eq!(config.embedding.model.as_deref(), Some("custom-model"));
        assert_eq!(config.store.api_key.as_deref(), Some("pc"));
        assert_eq!(
            config.store.index_host.as_deref(),
            Some("idx.svc.pinecone.io")
        );
        assert_eq!(config.store.index_name, None);
    }

    #[test]
    fn test_generic_key_wins() {
        let config = DreamweaverConfig::default().with_env(env(&[
            (EMBEDDING_API_KEY_ENV, "generic"),
            ("DOUBAO_API_KEY", "doubao"),
        ]));
        assert_eq!(config.embedding.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dreamweaver.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"hashing\"\nhashing_dimension = 64\n")
            .unwrap();

        let config = DreamweaverConfig::load(&path).unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Hashing);
        assert_eq!(config.embedding.hashing_dimension, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DreamweaverConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, VectorizationError::Io(_)));
    }

    #[test]
    fn test_missing_embedding_key_rejected() {
        let err = DreamweaverConfig::default().build_embedder().err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_hashing_embedder_needs_no_key() {
        let mut config = DreamweaverConfig::default();
        config.embedding.provider = EmbeddingProviderType::Hashing;
        let embedder = config.build_embedder().unwrap();
        assert_eq!(embedder.name(), "hashing");
    }

    #[tokio::test]
    async fn test_missing_store_credentials_rejected() {
        let err = DreamweaverConfig::default().build_store().await.err().unwrap();
        assert!(err.is_configuration());

        let config = DreamweaverConfig::default().with_env(env(&[(PINECONE_API_KEY_ENV, "pc")]));
        let err = config.build_store().await.err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_memory_store_needs_no_credentials() {
        let mut config = DreamweaverConfig::default();
        config.store.backend = StoreBackend::Memory;
        assert_eq!(config.build_store().await.unwrap().name(), "memory");
    }

    #[tokio::test]
    async fn test_pinecone_store_from_host() {
        let config = DreamweaverConfig::default().with_env(env(&[
            (PINECONE_API_KEY_ENV, "pc"),
            (PINECONE_INDEX_HOST_ENV, "idx.svc.pinecone.io"),
        ]));
        assert_eq!(config.build_store().await.unwrap().name(), "pinecone");
    }
}
