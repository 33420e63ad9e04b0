//! Shared configuration and service wiring for the one-shot CLI binaries
//! (`ingest`, `vector-load`, `projector`, `shipped-projector`).
//!
//! Every binary loads a [`Config`] from the environment, builds the
//! [`prlens_orchestration::Services`] record once, and tears it down
//! explicitly before exit — no global statics, matching the REDESIGN FLAG
//! in spec.md §9.

use std::sync::Arc;

use anyhow::{Context, Result};
use prlens_forge::ForgeClient;
use prlens_llm::{LlmGateway, OpenAiGateway};
use prlens_orchestration::Services;
use prlens_storage::{PostgresMart, QdrantVectorStore, RelationalMart, VectorStore};

pub mod persisted;

/// Process-wide configuration, loaded once from the environment
/// (`.env` via `dotenvy`, then real env vars). Missing required
/// credentials fail fast before any work starts (spec.md §7).
#[derive(Debug, Clone)]
pub struct Config {
    pub github_api_base: String,
    pub github_token: Option<String>,
    pub llm_api_base: String,
    pub llm_api_key: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub database_url: String,
    pub embed_dim: usize,
    pub enrich_workers: usize,
    pub max_prs: usize,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn required_env(key: &str) -> Result<String> {
    env_var(key).with_context(|| format!("missing required environment variable {key}"))
}

impl Config {
    /// Loads `.env` (if present) then reads the environment. Call once at
    /// the top of `main`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            github_api_base: env_var("GITHUB_API_BASE").unwrap_or_else(|| "https://api.github.com".to_string()),
            github_token: env_var("GITHUB_TOKEN"),
            llm_api_base: env_var("LLM_API_BASE").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            llm_api_key: required_env("LLM_API_KEY")?,
            qdrant_url: env_var("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".to_string()),
            qdrant_api_key: env_var("QDRANT_API_KEY"),
            database_url: required_env("DATABASE_URL")?,
            embed_dim: env_var("EMBED_DIM").and_then(|v| v.parse().ok()).unwrap_or(1536),
            enrich_workers: env_var("ENRICH_WORKERS").and_then(|v| v.parse().ok()).unwrap_or(4),
            max_prs: env_var("MAX_PRS").and_then(|v| v.parse().ok()).unwrap_or(500),
        })
    }

    pub fn forge_client(&self) -> ForgeClient {
        ForgeClient::new(self.github_api_base.clone(), self.github_token.clone())
    }

    pub fn llm_gateway(&self) -> Arc<dyn LlmGateway> {
        Arc::new(OpenAiGateway::new(self.llm_api_base.clone(), self.llm_api_key.clone()))
    }

    pub fn vector_store(&self) -> Result<Arc<dyn VectorStore>> {
        let store = QdrantVectorStore::new(&self.qdrant_url, self.qdrant_api_key.clone())
            .context("failed to build Qdrant client")?;
        Ok(Arc::new(store))
    }

    pub async fn relational_mart(&self) -> Result<Arc<dyn RelationalMart>> {
        let mart = PostgresMart::connect(&self.database_url).await.context("failed to connect to Postgres")?;
        Ok(Arc::new(mart))
    }

    /// Builds the full `Services` record (forge, LLM, vector store, mart).
    /// Used by commands that touch every store; `ingest` only needs
    /// forge+LLM and builds those directly instead.
    pub async fn services(&self) -> Result<Arc<Services>> {
        let forge = Arc::new(self.forge_client());
        let llm = self.llm_gateway();
        let vector_store = self.vector_store()?;
        let mart = self.relational_mart().await?;
        Ok(Arc::new(Services::new(forge, llm, vector_store, mart)))
    }
}

pub fn init_logging() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
}

/// Splits `"owner/repo"` into its parts.
pub fn split_repo_slug(slug: &str) -> Result<(&str, &str)> {
    slug.split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .with_context(|| format!("repo must be \"owner/repo\", got {slug:?}"))
}
