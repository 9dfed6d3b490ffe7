//! Records, matches and filters exchanged with a vector index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::namespace::Namespace;

/// Flat metadata payload attached to a vector record.
pub type Metadata = serde_json::Map<String, Value>;

/// A vector keyed by id, ready to be written into a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record key. Dream ids are used verbatim.
    pub id: String,

    /// Embedding values.
    pub values: Vec<f32>,

    /// Payload returned alongside query matches.
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    /// Create a record without metadata.
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata: Metadata::new(),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Id of the matched record.
    pub id: String,

    /// Similarity score; higher is more similar.
    pub score: f32,

    /// Stored payload (empty when the index returned none).
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorMatch {
    /// Create a match without metadata.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: Metadata::new(),
        }
    }
}

/// Conjunction of equality predicates over record metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, Value)>,
}

impl MetadataFilter {
    /// Filter matching records whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_eq(field, value)
    }

    /// Add another equality predicate.
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Whether there are no predicates.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate against a metadata payload. An empty filter matches everything.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| metadata.get(field) == Some(expected))
    }

    /// Render as a Pinecone filter expression (`{"field": {"$eq": value}}`).
    pub fn to_pinecone(&self) -> Value {
        let mut clauses: Vec<Value> = self
            .conditions
            .iter()
            .map(|(field, value)| serde_json::json!({ field: { "$eq": value } }))
            .collect();

        match clauses.len() {
            0 => Value::Object(Metadata::new()),
            1 => clauses.remove(0),
            _ => serde_json::json!({ "$and": clauses }),
        }
    }
}

/// Record counts reported by an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Vector dimension, when the index knows it.
    pub dimension: Option<usize>,

    /// Records across all namespaces.
    pub total_records: u64,

    /// Records per namespace name.
    pub namespaces: BTreeMap<String, u64>,
}

impl IndexStats {
    /// Records stored in `namespace`; zero for unknown namespaces.
    pub fn record_count(&self, namespace: &Namespace) -> u64 {
        self.namespaces
            .get(&namespace.name())
            .copied()
            .unwrap_or_default()
    }
}
