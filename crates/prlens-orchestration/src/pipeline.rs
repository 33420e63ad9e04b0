//! Shared service clients and per-pipeline configuration/metrics.
//!
//! Replaces the teacher's generic `StageHandler`/`StageInput`/`StageOutput`
//! byte-blob plumbing: the five stages here (`Crawl`, `Enrich`,
//! `Materialize`, `Project`, `MartUpsert`) each produce a genuinely
//! different concrete type (`Vec<u64>`, `Vec<PrRecord>`, a write count, a
//! `ProjectedMart`), so forcing them through one `Vec<u8>`-typed trait
//! would just reintroduce the bincode serialization the checkpoint format
//! dropped. The orchestrator drives them directly instead.

use std::sync::Arc;

use prlens_forge::ForgeClient;
use prlens_llm::LlmGateway;
use prlens_storage::{RelationalMart, VectorStore};

/// Clients created once at process startup and shared by `Arc` into every
/// job the orchestrator runs (REDESIGN FLAG: no global mutable state /
/// import-time side effects — `prlens-cli::main` owns construction and
/// teardown).
pub struct Services {
    pub forge: Arc<ForgeClient>,
    pub llm: Arc<dyn LlmGateway>,
    pub vector_store: Arc<dyn VectorStore>,
    pub mart: Arc<dyn RelationalMart>,
}

impl Services {
    pub fn new(
        forge: Arc<ForgeClient>,
        llm: Arc<dyn LlmGateway>,
        vector_store: Arc<dyn VectorStore>,
        mart: Arc<dyn RelationalMart>,
    ) -> Self {
        Self { forge, llm, vector_store, mart }
    }
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Forwarded to `ListPullRequests` — `"all"`, `"open"`, or `"closed"`.
    pub pr_state: String,
    pub max_prs: usize,
    /// Bounded concurrency across PRs during `Enrich` (separate from the
    /// per-PR per-file semaphore inside `PrEnricher`).
    pub enrich_workers: usize,
    pub embed_dim: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { pr_state: "all".to_string(), max_prs: 500, enrich_workers: 4, embed_dim: 1536 }
    }
}

/// Aggregated metrics from one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestMetrics {
    pub prs_crawled: usize,
    pub prs_enriched: usize,
    pub prs_materialized: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

/// Projection pipeline configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Upper bound on PRs pulled from VS-PR per repo for one projection run.
    pub fetch_limit: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { fetch_limit: 100_000 }
    }
}

/// Aggregated metrics from one projection run.
#[derive(Debug, Clone, Default)]
pub struct ProjectMetrics {
    pub prs_projected: usize,
    pub mart_rows_upserted: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_config_default() {
        let config = IngestConfig::default();
        assert_eq!(config.pr_state, "all");
        assert!(config.enrich_workers > 0);
    }

    #[test]
    fn test_project_config_default() {
        let config = ProjectConfig::default();
        assert!(config.fetch_limit > 0);
    }
}
