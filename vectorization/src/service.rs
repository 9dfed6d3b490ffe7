//! Dream vectorization service.

use std::sync::Arc;

use dreamweaver_embeddings::{Embedding, EmbeddingProvider};
use dreamweaver_vector_store::{MetadataFilter, Namespace, VectorMatch, VectorRecord, VectorStore};
use tracing::{debug, info};

use crate::document::{embedding_text, metadata};
use crate::dream::Dream;
use crate::error::{Result, VectorizationError};
use crate::similar::{SimilarityRequest, rank_matches};

/// Upper bound on any similarity limit unless configured otherwise.
pub const DEFAULT_MAX_LIMIT: usize = 50;

/// Keeps dream vectors in the index and answers similarity queries.
///
/// Holds one embedder and one store, injected at construction. Every write
/// is an idempotent upsert or delete keyed by dream id, so any operation may
/// be retried or replayed.
pub struct DreamVectorizationService {
    /// Embedding provider.
    embedder: Arc<dyn EmbeddingProvider>,

    /// Vector index.
    store: Arc<dyn VectorStore>,

    /// Cap applied to every requested limit.
    max_limit: usize,
}

impl DreamVectorizationService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    /// Cap requested limits at `max_limit`.
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Embed `dream` and write it into its owner's namespace, and into the
    /// public namespace as well when the dream is public.
    ///
    /// Returns the namespaces written.
    pub async fn vectorize(&self, dream: &Dream) -> Result<Vec<Namespace>> {
        validate_dream(dream)?;
        let embedding = self.embed_dream(dream).await?;

        let user = Namespace::user(&dream.owner_id);
        let public = dream.is_public.then(|| {
            VectorRecord::new(&dream.id, embedding.clone()).with_metadata(metadata(dream, true))
        });
        let record = VectorRecord::new(&dream.id, embedding).with_metadata(metadata(dream, false));

        self.store.upsert(&user, record).await?;
        let mut written = vec![user];
        if let Some(public) = public {
            self.store.upsert(&Namespace::Public, public).await?;
            written.push(Namespace::Public);
        }

        let names: Vec<String> = written.iter().map(Namespace::name).collect();
        info!("Vectorized dream {} into {}", dream.id, names.join(", "));
        Ok(written)
    }

    /// Bring the public mirror of `dream` in line with `is_public`.
    ///
    /// Publishing re-embeds from the dream's current content; unpublishing
    /// deletes the public record. The private record is never touched.
    pub async fn set_public_visibility(&self, dream: &Dream, is_public: bool) -> Result<()> {
        validate_dream(dream)?;

        if is_public {
            let embedding = self.embed_dream(dream).await?;
            let record =
                VectorRecord::new(&dream.id, embedding).with_metadata(metadata(dream, true));
            self.store.upsert(&Namespace::Public, record).await?;
            info!("Published dream {}", dream.id);
        } else {
            self.remove_public(&dream.id).await?;
        }
        Ok(())
    }

    /// Delete a dream from its owner's namespace. The public namespace is
    /// left alone; see [`Self::remove_public`].
    pub async fn remove(&self, dream_id: &str, owner_id: &str) -> Result<()> {
        require("dream id", dream_id)?;
        require("owner id", owner_id)?;

        let namespace = Namespace::user(owner_id);
        self.store.delete(&namespace, dream_id).await?;
        info!("Removed dream {dream_id} from {namespace}");
        Ok(())
    }

    /// Delete a dream from the public namespace.
    pub async fn remove_public(&self, dream_id: &str) -> Result<()> {
        require("dream id", dream_id)?;

        self.store.delete(&Namespace::Public, dream_id).await?;
        info!("Unpublished dream {dream_id}");
        Ok(())
    }

    /// Nearest dreams to `query_text`.
    ///
    /// Searches the owner's namespace first. With `include_public`, tops up
    /// from the public namespace when the owner has fewer than `limit`
    /// matches. The result is the user matches followed by the public ones,
    /// each list in index order; the two are not merged. Use
    /// [`Self::similar_dreams`] for a ranked, de-duplicated list.
    pub async fn find_similar(
        &self,
        query_text: &str,
        owner_id: &str,
        limit: usize,
        include_public: bool,
    ) -> Result<Vec<VectorMatch>> {
        validate_query(query_text, owner_id)?;

        self.search(query_text, owner_id, limit.min(self.max_limit), include_public)
            .await
    }

    /// Ranked similar dreams for a request.
    ///
    /// Asks for one extra match when a dream is excluded so that excluding it
    /// still leaves `limit` results.
    pub async fn similar_dreams(&self, request: &SimilarityRequest) -> Result<Vec<VectorMatch>> {
        validate_query(&request.text, &request.owner_id)?;

        let limit = request.limit.min(self.max_limit);
        let fetch = match request.exclude_id {
            Some(_) if limit > 0 => limit + 1,
            _ => limit,
        };

        let raw = self
            .search(
                &request.text,
                &request.owner_id,
                fetch,
                request.include_public,
            )
            .await?;

        Ok(rank_matches(raw, request.exclude_id.as_deref(), limit))
    }

    async fn search(
        &self,
        query_text: &str,
        owner_id: &str,
        limit: usize,
        include_public: bool,
    ) -> Result<Vec<VectorMatch>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query_text).await?;

        let mut matches = self
            .store
            .query(&Namespace::user(owner_id), &embedding, limit, None)
            .await?;
        let user_count = matches.len();

        if include_public && user_count < limit {
            let filter = MetadataFilter::eq("isPublic", true);
            let public = self
                .store
                .query(
                    &Namespace::Public,
                    &embedding,
                    limit - user_count,
                    Some(&filter),
                )
                .await?;
            matches.extend(public);
        }

        debug!(
            "Similarity query for {owner_id}: {user_count} private, {} public",
            matches.len() - user_count
        );
        Ok(matches)
    }

    async fn embed_dream(&self, dream: &Dream) -> Result<Embedding> {
        let text = embedding_text(dream);
        debug!(
            "Embedding dream {} with {} ({} chars)",
            dream.id,
            self.embedder.name(),
            text.chars().count()
        );
        Ok(self.embedder.embed(&text).await?)
    }
}

fn validate_dream(dream: &Dream) -> Result<()> {
    require("dream id", &dream.id)?;
    require("owner id", &dream.owner_id)?;
    require("dream content", &dream.content)
}

fn validate_query(query_text: &str, owner_id: &str) -> Result<()> {
    require("query text", query_text)?;
    require("owner id", owner_id)
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VectorizationError::InvalidRequest(format!("{what} is empty")));
    }
    Ok(())
}
