//! Embedding providers.
//!
//! Supports OpenAI-compatible and multimodal (Doubao Ark) HTTP APIs, plus a
//! deterministic local provider for offline use.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Default bound on a single embedding round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model used for embeddings.
    fn model(&self) -> &str;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// Wire flavour spoken by an HTTP embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingApi {
    /// `POST {base}/embeddings` with `{"input": text, "model": model}`.
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    /// `POST {base}/embeddings/multimodal` with a list of typed inputs.
    Multimodal,
}

impl EmbeddingApi {
    fn path(self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "/embeddings",
            Self::Multimodal => "/embeddings/multimodal",
        }
    }

    fn request_body(self, text: &str, model: &str) -> Value {
        match self {
            Self::OpenAiCompatible => serde_json::json!({
                "input": text,
                "model": model,
            }),
            Self::Multimodal => serde_json::json!({
                "model": model,
                "input": [{ "type": "text", "text": text }],
            }),
        }
    }

    /// Base URL used when none is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "https://api.openai.com/v1",
            Self::Multimodal => "https://ark.cn-beijing.volces.com/api/v3",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "text-embedding-3-small",
            Self::Multimodal => "doubao-embedding-vision-250615",
        }
    }
}

/// Embedding provider backed by a remote HTTP API.
pub struct HttpEmbeddingProvider {
    /// Wire flavour.
    api: EmbeddingApi,

    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// Model.
    model: String,

    /// HTTP client.
    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    /// Create a provider for the given API with its default endpoint and model.
    pub fn new(api: EmbeddingApi) -> Result<Self> {
        Ok(Self {
            api,
            api_key: None,
            base_url: api.default_base_url().to_string(),
            model: api.default_model().to_string(),
            client: http_client(DEFAULT_TIMEOUT)?,
        })
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(timeout)?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.api.path())
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        match self.api {
            EmbeddingApi::OpenAiCompatible => "openai-compatible",
            EmbeddingApi::Multimodal => "multimodal",
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EmbeddingError::NotConfigured(format!("{} API key missing", self.name()))
        })?;

        debug!(
            "Requesting embedding from {} (model: {}, {} chars)",
            self.name(),
            self.model,
            text.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.api.request_body(text, &self.model))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let body: Value = serde_json::from_str(&raw).map_err(|e| {
            EmbeddingError::InvalidResponse(format!("body is not JSON ({e}): {}", preview(&raw)))
        })?;

        let embedding = extract_embedding(&body)?;
        debug!("Generated embedding with {} dimensions", embedding.len());

        Ok(embedding)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Pull the embedding out of a provider response.
///
/// Accepted shapes:
/// - `{"data": {"embedding": [...]}}` (multimodal API)
/// - `{"data": [{"embedding": [...]}]}` (OpenAI-compatible APIs)
/// - `{"embedding": [...]}`
/// - `[{"embedding": [...]}]`
///
/// Anything else is an [`EmbeddingError::InvalidResponse`]; a response is
/// never defaulted to a zero vector.
pub fn extract_embedding(body: &Value) -> Result<Embedding> {
    let data = body.get("data");
    let candidate = data
        .and_then(|d| d.get("embedding"))
        .or_else(|| data.and_then(|d| d.get(0)).and_then(|d| d.get("embedding")))
        .or_else(|| body.get("embedding"))
        .or_else(|| body.get(0).and_then(|d| d.get("embedding")))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            EmbeddingError::InvalidResponse(format!(
                "unexpected embedding response format: {}",
                preview(&body.to_string())
            ))
        })?;

    if candidate.is_empty() {
        return Err(EmbeddingError::InvalidResponse(
            "embedding is empty".to_string(),
        ));
    }

    candidate
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!("non-numeric embedding value: {v}"))
            })
        })
        .collect()
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Local provider that embeds text by feature hashing its words.
///
/// Vectors are deterministic and unit length, so shared vocabulary yields a
/// positive cosine score. Good enough for offline development and tests; it
/// has no notion of meaning beyond word overlap.
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Default output dimension.
    pub const DEFAULT_DIMENSION: usize = 256;

    /// Create a hashing provider with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Output dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "fnv1a-bag-of-words"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(EmbeddingError::EmptyInput);
        }

        normalize(&mut embedding);
        Ok(embedding)
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn fnv1a(token: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    token.bytes().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}
