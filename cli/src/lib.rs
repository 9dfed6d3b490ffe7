//! `dreamweaver-vectors`: inspect and repair the dream vector index.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use dreamweaver_vectorization::{
    Dream, DreamEvent, DreamRepository, DreamVectorizationService, DreamweaverConfig,
    InMemoryDreamRepository, SimilarityRequest, VectorSync, hydrate,
};
use serde_json::{Value, json};
use tracing::info;

/// Maintain the dream vector index.
#[derive(Debug, Parser)]
#[command(name = "dreamweaver-vectors", version)]
pub struct Cli {
    /// TOML config file. Falls back to the default location, then to
    /// built-in defaults; the environment is applied either way.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find dreams similar to a text.
    Similar(SimilarArgs),

    /// Embed dreams and write them to the index.
    Vectorize {
        /// JSON array of dreams.
        #[arg(long, value_name = "FILE")]
        dreams: PathBuf,

        /// Only this dream.
        #[arg(long)]
        id: Option<String>,
    },

    /// Mirror a dream into the public namespace.
    Publish(DreamRef),

    /// Remove a dream from the public namespace.
    Unpublish(DreamRef),

    /// Delete a dream's vectors.
    Remove {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        id: String,

        /// Also delete the public copy.
        #[arg(long)]
        was_public: bool,
    },

    /// Re-mirror every public dream.
    ResyncPublic {
        /// JSON array of dreams.
        #[arg(long, value_name = "FILE")]
        dreams: PathBuf,
    },

    /// Record counts per namespace.
    Stats,
}

#[derive(Debug, Args)]
pub struct SimilarArgs {
    /// Text to compare against.
    pub text: String,

    /// Whose dreams to search.
    #[arg(long)]
    pub owner: String,

    /// Maximum matches. Defaults to the configured limit.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Also search other users' public dreams.
    #[arg(long)]
    pub include_public: bool,

    /// Dream id to leave out of the results.
    #[arg(long)]
    pub exclude: Option<String>,

    /// Resolve matches against this JSON array of dreams.
    #[arg(long, value_name = "FILE")]
    pub dreams: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DreamRef {
    /// JSON array of dreams.
    #[arg(long, value_name = "FILE")]
    pub dreams: PathBuf,

    #[arg(long)]
    pub id: String,
}

/// Execute `cli` and print its JSON result.
pub async fn run(cli: Cli) -> Result<()> {
    let path = cli
        .config
        .clone()
        .or_else(|| default_config_path().filter(|p| p.exists()));
    let config = match &path {
        Some(path) => DreamweaverConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DreamweaverConfig::from_env(),
    };
    let service = Arc::new(
        config
            .build_service()
            .await
            .context("failed to set up vectorization")?,
    );

    let output = execute(&config, service, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `<config dir>/dreamweaver/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dreamweaver").join("config.toml"))
}

/// Run one command against `service`.
pub async fn execute(
    config: &DreamweaverConfig,
    service: Arc<DreamVectorizationService>,
    command: Command,
) -> Result<Value> {
    match command {
        Command::Similar(args) => similar(config, &service, args).await,
        Command::Vectorize { dreams, id } => {
            let repo = load_dreams(&dreams).await?;
            let selected: Vec<Dream> = match id {
                Some(id) => vec![find_dream(&repo, &id).await?],
                None => repo.all().await,
            };

            let mut written = serde_json::Map::new();
            for dream in selected {
                let namespaces = service
                    .vectorize(&dream)
                    .await
                    .with_context(|| format!("failed to vectorize dream {}", dream.id))?;
                written.insert(dream.id, json!(namespaces));
            }
            info!("Vectorized {} dreams", written.len());
            Ok(Value::Object(written))
        }
        Command::Publish(target) => set_visibility(&service, target, true).await,
        Command::Unpublish(target) => set_visibility(&service, target, false).await,
        Command::Remove {
            owner,
            id,
            was_public,
        } => {
            let report = VectorSync::new(service)
                .handle(DreamEvent::Deleted {
                    dream_id: id.clone(),
                    owner_id: owner,
                    was_public,
                })
                .await;
            report
                .outcome
                .with_context(|| format!("failed to remove dream {id}"))?;
            Ok(json!({ "removed": id }))
        }
        Command::ResyncPublic { dreams } => {
            let repo = load_dreams(&dreams).await?;
            let summary = VectorSync::new(service).resync_public(&repo).await?;
            let failed: Vec<Value> = summary
                .failed
                .iter()
                .map(|(id, e)| json!({ "id": id, "error": e.to_string() }))
                .collect();
            Ok(json!({ "synced": summary.synced, "failed": failed }))
        }
        Command::Stats => {
            let stats = service.store().describe().await?;
            Ok(json!({
                "store": service.store().name(),
                "indexName": config.store.index_name,
                "stats": stats,
            }))
        }
    }
}

async fn similar(
    config: &DreamweaverConfig,
    service: &DreamVectorizationService,
    args: SimilarArgs,
) -> Result<Value> {
    let mut request = SimilarityRequest::new(args.text, &args.owner)
        .with_limit(args.limit.unwrap_or(config.search.default_limit));
    if args.include_public {
        request = request.including_public();
    }
    if let Some(exclude) = args.exclude {
        request = request.excluding(exclude);
    }

    let matches = service.similar_dreams(&request).await?;

    match args.dreams {
        Some(path) => {
            let repo = load_dreams(&path).await?;
            let hydrated = hydrate(&repo, &args.owner, &matches).await?;
            Ok(serde_json::to_value(hydrated)?)
        }
        None => Ok(serde_json::to_value(matches)?),
    }
}

async fn set_visibility(
    service: &DreamVectorizationService,
    target: DreamRef,
    is_public: bool,
) -> Result<Value> {
    let repo = load_dreams(&target.dreams).await?;
    let dream = find_dream(&repo, &target.id).await?;
    service.set_public_visibility(&dream, is_public).await?;
    Ok(json!({ "id": dream.id, "isPublic": is_public }))
}

async fn load_dreams(path: &Path) -> Result<InMemoryDreamRepository> {
    InMemoryDreamRepository::load(path)
        .await
        .with_context(|| format!("failed to load dreams from {}", path.display()))
}

async fn find_dream(repo: &dyn DreamRepository, id: &str) -> Result<Dream> {
    repo.dreams_by_ids(&[id.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("dream {id} not found"))
}
