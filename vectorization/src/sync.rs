//! Propagation of dream writes into the vector index.
//!
//! The relational write is the source of truth and finishes first. Each
//! change is then described as a [`DreamEvent`] and handed to [`VectorSync`],
//! which performs the matching index work in the background. Failures are
//! logged and reported, never surfaced to the writer; [`VectorSync::resync_public`]
//! repairs whatever was missed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dream::Dream;
use crate::error::{Result, VectorizationError};
use crate::repository::{DreamRepository, Hydrated};
use crate::service::DreamVectorizationService;

/// A completed change to a dream record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DreamEvent {
    /// A dream was recorded.
    Created(Dream),

    /// A dream was edited. `dream` is the state after the edit.
    Updated {
        dream: Dream,
        content_changed: bool,
        visibility_changed: bool,
    },

    /// Only the public flag was toggled.
    VisibilityChanged(Dream),

    /// A dream was deleted.
    Deleted {
        dream_id: String,
        owner_id: String,
        was_public: bool,
    },
}

impl DreamEvent {
    /// Short name for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated { .. } => "updated",
            Self::VisibilityChanged(_) => "visibility_changed",
            Self::Deleted { .. } => "deleted",
        }
    }

    /// Id of the affected dream.
    pub fn dream_id(&self) -> &str {
        match self {
            Self::Created(dream) | Self::Updated { dream, .. } | Self::VisibilityChanged(dream) => {
                &dream.id
            }
            Self::Deleted { dream_id, .. } => dream_id,
        }
    }
}

/// Outcome of handling one event.
#[derive(Debug)]
pub struct SyncReport {
    /// Event kind, see [`DreamEvent::kind`].
    pub event: &'static str,

    pub dream_id: String,

    pub outcome: Result<()>,
}

impl SyncReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Result of a full public re-mirror.
#[derive(Debug, Default)]
pub struct ResyncSummary {
    /// Dreams written to the public namespace.
    pub synced: usize,

    /// Dreams that could not be written, with the reason.
    pub failed: Vec<(String, VectorizationError)>,
}

/// Result of repairing divergence found during hydration.
#[derive(Debug, Default)]
pub struct RepairSummary {
    /// Ids whose vectors were removed.
    pub repaired: Vec<String>,

    /// Ids that could not be repaired, with the reason.
    pub failed: Vec<(String, VectorizationError)>,
}

/// Background propagation of [`DreamEvent`]s.
#[derive(Clone)]
pub struct VectorSync {
    service: Arc<DreamVectorizationService>,
}

impl VectorSync {
    pub fn new(service: Arc<DreamVectorizationService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<DreamVectorizationService> {
        &self.service
    }

    /// Perform the index work for `event` and report how it went.
    ///
    /// Never fails: errors are logged and carried in the report.
    pub async fn handle(&self, event: DreamEvent) -> SyncReport {
        let kind = event.kind();
        let dream_id = event.dream_id().to_string();
        debug!("Handling {kind} event for dream {dream_id}");

        let outcome = self.apply(event).await;
        if let Err(e) = &outcome {
            warn!("Vector sync for {kind} event on dream {dream_id} failed: {e}");
        }

        SyncReport {
            event: kind,
            dream_id,
            outcome,
        }
    }

    /// Handle `event` on the runtime without waiting for it.
    ///
    /// Dropping the returned handle detaches the work.
    pub fn dispatch(&self, event: DreamEvent) -> JoinHandle<SyncReport> {
        let sync = self.clone();
        tokio::spawn(async move { sync.handle(event).await })
    }

    /// Handle every event received on `rx`, in arrival order, until the
    /// channel closes.
    ///
    /// Each event finishes before the next one starts, so a publish followed
    /// by an unpublish of the same dream cannot land in the reverse order.
    pub fn listen(&self, mut rx: mpsc::Receiver<DreamEvent>) -> JoinHandle<()> {
        let sync = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sync.handle(event).await;
            }
            debug!("Dream event channel closed");
        })
    }

    async fn apply(&self, event: DreamEvent) -> Result<()> {
        match event {
            DreamEvent::Created(dream) => {
                self.service.vectorize(&dream).await?;
            }
            DreamEvent::Updated {
                dream,
                content_changed: true,
                visibility_changed,
            } => {
                self.service.vectorize(&dream).await?;
                if visibility_changed && !dream.is_public {
                    self.service.remove_public(&dream.id).await?;
                }
            }
            DreamEvent::Updated {
                dream,
                content_changed: false,
                visibility_changed: true,
            }
            | DreamEvent::VisibilityChanged(dream) => {
                self.service
                    .set_public_visibility(&dream, dream.is_public)
                    .await?;
            }
            DreamEvent::Updated { dream, .. } => {
                debug!("Dream {} changed nothing the index stores", dream.id);
            }
            DreamEvent::Deleted {
                dream_id,
                owner_id,
                was_public,
            } => {
                // Try both namespaces even if the first delete fails.
                let public = if was_public {
                    self.service.remove_public(&dream_id).await
                } else {
                    Ok(())
                };
                let private = self.service.remove(&dream_id, &owner_id).await;
                public.and(private)?;
            }
        }
        Ok(())
    }

    /// Write every public dream into the public namespace again.
    ///
    /// Repairs mirrors lost to failed background writes. One dream failing
    /// does not stop the pass.
    pub async fn resync_public(&self, repo: &dyn DreamRepository) -> Result<ResyncSummary> {
        let dreams = repo.public_dreams().await?;
        info!("Re-mirroring {} public dreams", dreams.len());

        let mut summary = ResyncSummary::default();
        for dream in dreams {
            match self.service.set_public_visibility(&dream, true).await {
                Ok(()) => summary.synced += 1,
                Err(e) => {
                    warn!("Failed to re-mirror dream {}: {e}", dream.id);
                    summary.failed.push((dream.id, e));
                }
            }
        }

        info!(
            "Public re-mirror finished: {} synced, {} failed",
            summary.synced,
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Delete vectors whose dream no longer exists from `owner_id`'s
    /// namespace and from the public namespace.
    pub async fn purge_orphans(&self, owner_id: &str, orphans: &[String]) -> RepairSummary {
        let mut summary = RepairSummary::default();
        for id in orphans {
            let public = self.service.remove_public(id).await;
            let private = self.service.remove(id, owner_id).await;
            match public.and(private) {
                Ok(()) => summary.repaired.push(id.clone()),
                Err(e) => {
                    warn!("Failed to purge orphaned vector {id}: {e}");
                    summary.failed.push((id.clone(), e));
                }
            }
        }
        summary
    }

    /// Fix what [`crate::hydrate`] found: purge orphans and take private
    /// dreams out of the public namespace.
    pub async fn repair(&self, viewer_id: &str, hydrated: &Hydrated) -> RepairSummary {
        let mut summary = self.purge_orphans(viewer_id, &hydrated.orphans).await;
        for id in &hydrated.stale_public {
            match self.service.remove_public(id).await {
                Ok(()) => summary.repaired.push(id.clone()),
                Err(e) => {
                    warn!("Failed to unpublish stale vector {id}: {e}");
                    summary.failed.push((id.clone(), e));
                }
            }
        }
        summary
    }
}
