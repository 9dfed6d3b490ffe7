//! The relational dream store, seen from the vector side.
//!
//! Vector matches carry only ids and a metadata snapshot. The relational row
//! is the truth, so results are hydrated against it, and anything the two
//! disagree about is reported rather than shown.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use dreamweaver_vector_store::VectorMatch;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::dream::Dream;
use crate::error::Result;

/// Read access to persisted dreams.
#[async_trait]
pub trait DreamRepository: Send + Sync {
    /// Dreams with the given ids. Unknown ids are skipped.
    async fn dreams_by_ids(&self, ids: &[String]) -> Result<Vec<Dream>>;

    /// Every dream currently marked public.
    async fn public_dreams(&self) -> Result<Vec<Dream>>;
}

/// Process-local repository, keyed by dream id.
#[derive(Default)]
pub struct InMemoryDreamRepository {
    dreams: RwLock<BTreeMap<String, Dream>>,
}

impl InMemoryDreamRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding `dreams`.
    pub fn from_dreams(dreams: impl IntoIterator<Item = Dream>) -> Self {
        Self {
            dreams: RwLock::new(dreams.into_iter().map(|d| (d.id.clone(), d)).collect()),
        }
    }

    /// Load a JSON array of dreams.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let dreams: Vec<Dream> = serde_json::from_str(&raw)?;
        debug!("Loaded {} dreams from {}", dreams.len(), path.display());
        Ok(Self::from_dreams(dreams))
    }

    /// Insert or replace a dream.
    pub async fn insert(&self, dream: Dream) {
        self.dreams.write().await.insert(dream.id.clone(), dream);
    }

    /// Remove a dream, returning it.
    pub async fn remove(&self, id: &str) -> Option<Dream> {
        self.dreams.write().await.remove(id)
    }

    /// Get a dream by id.
    pub async fn get(&self, id: &str) -> Option<Dream> {
        self.dreams.read().await.get(id).cloned()
    }

    /// All dreams, ordered by id.
    pub async fn all(&self) -> Vec<Dream> {
        self.dreams.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl DreamRepository for InMemoryDreamRepository {
    async fn dreams_by_ids(&self, ids: &[String]) -> Result<Vec<Dream>> {
        let dreams = self.dreams.read().await;
        Ok(ids.iter().filter_map(|id| dreams.get(id).cloned()).collect())
    }

    async fn public_dreams(&self) -> Result<Vec<Dream>> {
        Ok(self
            .dreams
            .read()
            .await
            .values()
            .filter(|d| d.is_public)
            .cloned()
            .collect())
    }
}

/// A dream together with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredDream {
    #[serde(flatten)]
    pub dream: Dream,

    pub similarity_score: f32,
}

/// Matches resolved against the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hydrated {
    /// Viewable dreams, most similar first.
    pub dreams: Vec<ScoredDream>,

    /// Vector ids with no dream behind them.
    pub orphans: Vec<String>,

    /// Other users' dreams still mirrored publicly although they are now
    /// private. Never shown; returned so the mirror can be repaired.
    pub stale_public: Vec<String>,
}

/// Resolve `matches` into dreams `viewer_id` is allowed to see.
///
/// Duplicate ids keep their best score. A dream owned by someone else is only
/// shown while it is public.
pub async fn hydrate(
    repo: &dyn DreamRepository,
    viewer_id: &str,
    matches: &[VectorMatch],
) -> Result<Hydrated> {
    let mut scores: HashMap<&str, f32> = HashMap::new();
    let mut ids: Vec<String> = Vec::new();
    for m in matches {
        match scores.get_mut(m.id.as_str()) {
            Some(score) => *score = score.max(m.score),
            None => {
                scores.insert(m.id.as_str(), m.score);
                ids.push(m.id.clone());
            }
        }
    }

    let found: HashMap<String, Dream> = repo
        .dreams_by_ids(&ids)
        .await?
        .into_iter()
        .map(|d| (d.id.clone(), d))
        .collect();

    let mut hydrated = Hydrated::default();
    for id in ids {
        let score = scores.get(id.as_str()).copied().unwrap_or_default();
        match found.get(&id) {
            None => hydrated.orphans.push(id),
            Some(dream) if dream.owner_id != viewer_id && !dream.is_public => {
                hydrated.stale_public.push(id);
            }
            Some(dream) => hydrated.dreams.push(ScoredDream {
                dream: dream.clone(),
                similarity_score: score,
            }),
        }
    }

    hydrated
        .dreams
        .sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

    if !hydrated.orphans.is_empty() {
        warn!("Vector index holds orphaned ids {:?}", hydrated.orphans);
    }
    if !hydrated.stale_public.is_empty() {
        warn!(
            "Public namespace still mirrors private dreams {:?}",
            hydrated.stale_public
        );
    }

    Ok(hydrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dream::Mood;
    use pretty_assertions::assert_eq;

    fn repo() -> InMemoryDreamRepository {
        InMemoryDreamRepository::from_dreams([
            Dream::new("mine", "u1", "Flying", Mood::Euphoric),
            Dream::new("theirs-public", "u2", "Soaring", Mood::Peaceful).public(),
            Dream::new("theirs-private", "u2", "Falling", Mood::Anxious),
        ])
    }

    #[tokio::test]
    async fn test_hydrate_orders_and_reports_divergence() {
        let matches = vec![
            VectorMatch::new("mine", 0.7),
            VectorMatch::new("gone", 0.99),
            VectorMatch::new("theirs-public", 0.8),
            VectorMatch::new("theirs-private", 0.9),
            VectorMatch::new("mine", 0.75),
        ];

        let hydrated = hydrate(&repo(), "u1", &matches).await.unwrap();

        let ids: Vec<&str> = hydrated.dreams.iter().map(|d| d.dream.id.as_str()).collect();
        assert_eq!(ids, vec!["theirs-public", "mine"]);
        assert_eq!(hydrated.dreams[1].similarity_score, 0.75);
        assert_eq!(hydrated.orphans, vec!["gone".to_string()]);
        assert_eq!(hydrated.stale_public, vec!["theirs-private".to_string()]);
    }

    #[tokio::test]
    async fn test_owner_sees_own_private_dreams() {
        let hydrated = hydrate(&repo(), "u2", &[VectorMatch::new("theirs-private", 0.5)])
            .await
            .unwrap();
        assert_eq!(hydrated.dreams.len(), 1);
        assert!(hydrated.stale_public.is_empty());
    }

    #[tokio::test]
    async fn test_public_dreams() {
        let public = repo().public_dreams().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, "theirs-public");
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dreams.json");
        std::fs::write(
            &path,
            r#"[{"id": "d1", "ownerId": "u1", "content": "A red door", "mood": "Surreal", "clarity": 2}]"#,
        )
        .unwrap();

        let repo = InMemoryDreamRepository::load(&path).await.unwrap();
        let dream = repo.get("d1").await.unwrap();
        assert_eq!(dream.mood, Mood::Surreal);
        assert_eq!(dream.clarity.get(), 2);
    }

    #[tokio::test]
    async fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dreams.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(InMemoryDreamRepository::load(&path).await.is_err());
    }
}
