//! Pinecone data-plane client.
//!
//! Talks to a single serverless index over its REST API. Pinecone creates a
//! namespace on first upsert and answers queries against an unknown
//! namespace with either an empty match list or a 404; both are treated as
//! "no records".

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{Result, VectorStoreError};
use crate::namespace::Namespace;
use crate::store::{VectorStore, validate_record};
use crate::types::{IndexStats, Metadata, MetadataFilter, VectorMatch, VectorRecord};

/// API version pinned in every request.
const API_VERSION: &str = "2024-07";

/// Control plane used to look up an index host by name.
pub const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Connection settings for one Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// API key sent as `Api-Key`.
    pub api_key: String,

    /// Index host, e.g. `https://dreamweaver-abc123.svc.pinecone.io`.
    pub index_host: String,

    /// Bound on every request.
    pub timeout: Duration,
}

impl PineconeConfig {
    /// Create a config with the default 30 second timeout.
    pub fn new(api_key: impl Into<String>, index_host: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            index_host: index_host.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`VectorStore`] backed by a Pinecone index.
pub struct PineconeStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeStore {
    /// Build a client. Fails with [`VectorStoreError::NotConfigured`] when the
    /// key or host is blank.
    pub fn new(config: PineconeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(VectorStoreError::NotConfigured(
                "Pinecone API key missing".to_string(),
            ));
        }
        if config.index_host.trim().is_empty() {
            return Err(VectorStoreError::NotConfigured(
                "Pinecone index host missing".to_string(),
            ));
        }

        let host = config.index_host.trim().trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url,
            api_key: config.api_key,
            client,
        })
    }

    /// POST a JSON body. `Ok(None)` means the index answered 404.
    async fn post(&self, path: &str, body: &Value) -> Result<Option<Value>> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(VectorStoreError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VectorStoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        if raw.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| VectorStoreError::InvalidResponse(format!("{path}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
}

/// Look up the data-plane host of `index_name` through the control plane at
/// `control_plane_url`.
pub async fn resolve_index_host(
    api_key: &str,
    index_name: &str,
    control_plane_url: &str,
    timeout: Duration,
) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(VectorStoreError::NotConfigured(
            "Pinecone API key missing".to_string(),
        ));
    }
    if index_name.trim().is_empty() {
        return Err(VectorStoreError::NotConfigured(
            "Pinecone index name missing".to_string(),
        ));
    }

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let url = format!(
        "{}/indexes/{}",
        control_plane_url.trim_end_matches('/'),
        index_name.trim()
    );
    let response = client
        .get(url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(VectorStoreError::NotConfigured(format!(
            "Pinecone index {index_name} does not exist"
        )));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(VectorStoreError::Unauthorized {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VectorStoreError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let description: IndexDescription = response
        .json()
        .await
        .map_err(|e| VectorStoreError::InvalidResponse(format!("/indexes/{index_name}: {e}")))?;

    debug!("Resolved index {index_name} to {}", description.host);
    Ok(description.host)
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeResponse {
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSummary>,
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default, alias = "recordCount")]
    vector_count: u64,
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, namespace: &Namespace, record: VectorRecord) -> Result<()> {
        validate_record(&record)?;

        let body = json!({
            "namespace": namespace.name(),
            "vectors": [{
                "id": record.id,
                "values": record.values,
                "metadata": record.metadata,
            }],
        });

        if self.post("/vectors/upsert", &body).await?.is_none() {
            return Err(VectorStoreError::Api {
                status: 404,
                body: "index not found".to_string(),
            });
        }

        info!("Upserted {} into {namespace}", record.id);
        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, id: &str) -> Result<()> {
        let body = json!({
            "namespace": namespace.name(),
            "ids": [id],
        });

        match self.post("/vectors/delete", &body).await? {
            Some(_) => info!("Deleted {id} from {namespace}"),
            None => debug!("Namespace {namespace} not found while deleting {id}"),
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
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut body = json!({
            "namespace": namespace.name(),
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = filter.to_pinecone();
        }

        let Some(raw) = self.post("/query", &body).await? else {
            debug!("Namespace {namespace} not found; no matches");
            return Ok(Vec::new());
        };

        let response: QueryResponse = serde_json::from_value(raw)
            .map_err(|e| VectorStoreError::InvalidResponse(format!("/query: {e}")))?;

        if response.matches.len() > top_k {
            warn!(
                "Pinecone returned {} matches for topK {top_k}",
                response.matches.len()
            );
        }

        let matches: Vec<VectorMatch> = response
            .matches
            .into_iter()
            .take(top_k)
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect();

        debug!("Query on {namespace} returned {} matches", matches.len());
        Ok(matches)
    }

    async fn describe(&self) -> Result<IndexStats> {
        let raw = self
            .post("/describe_index_stats", &json!({}))
            .await?
            .ok_or_else(|| VectorStoreError::Api {
                status: 404,
                body: "index not found".to_string(),
            })?;

        let response: DescribeResponse = serde_json::from_value(raw).map_err(|e| {
            VectorStoreError::InvalidResponse(format!("/describe_index_stats: {e}"))
        })?;

        Ok(IndexStats {
            dimension: response.dimension,
            total_records: response.total_vector_count,
            namespaces: response
                .namespaces
                .into_iter()
                .map(|(name, summary)| (name, summary.vector_count))
                .collect(),
        })
    }
}
