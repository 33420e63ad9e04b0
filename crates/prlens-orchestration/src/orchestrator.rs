use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use prlens_core::PrRecord;
use prlens_enrich::{EnrichConfig, PrEnricher};
use prlens_storage::domain::ScalarExpr;

use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::dag::{CacheKeyManager, PipelineDAG};
use crate::error::{ErrorCategory, OrchestratorError, Result};
use crate::job::{Job, JobState, JobStateMachine, StageId};
use crate::pipeline::{IngestConfig, IngestMetrics, ProjectConfig, ProjectMetrics, Services};

/// Orchestrates both the ingestion DAG (`Crawl -> Enrich -> Materialize`)
/// and the projection pipeline (`Project -> MartUpsert`) for one
/// repository at a time, checkpointing after every stage.
pub struct PipelineOrchestrator {
    checkpoint_mgr: Arc<CheckpointManager>,
    services: Arc<Services>,
    worker_id: String,
}

impl PipelineOrchestrator {
    pub fn new(checkpoint_mgr: Arc<CheckpointManager>, services: Arc<Services>) -> Self {
        Self { checkpoint_mgr, services, worker_id: format!("worker-{}", Uuid::new_v4()) }
    }

    /// Run the ingestion pipeline for `job`. Resumes from
    /// `job.resume_from_pr` if set; on success the `Materialize` checkpoint
    /// records the highest PR number actually materialized, which the next
    /// `Job::new_resumed` for this repo should pass back in.
    pub async fn run_ingest(&self, mut job: Job, config: &IngestConfig) -> Result<(Job, IngestMetrics)> {
        let job_id = job.id;
        let repo_id = job.repo_id.clone();
        let (owner, repo) = split_repo_slug(&repo_id)?;
        let start_time = Instant::now();

        let dag = PipelineDAG::ingestion_pipeline()?;
        info!(job_id = %job_id, repo = %repo_id, "execution plan:\n{}", dag.execution_plan());

        let mut sm = JobStateMachine::new(job);
        sm.start(self.worker_id.clone(), StageId::Crawl)?;
        job = sm.into_job();

        let cache_keys = CacheKeyManager::new(repo_id.clone());
        let resume_from_pr = job.resume_from_pr;

        if let Some(cursor) = resume_from_pr {
            info!(job_id = %job_id, repo = %repo_id, resume_from_pr = cursor, "resuming ingest from checkpoint");
        } else {
            info!(job_id = %job_id, repo = %repo_id, "starting full ingest");
        }

        let result = self.run_ingest_stages(job_id, owner, repo, &repo_id, resume_from_pr, &cache_keys, config).await;

        Ok(self.finalize(job, result, start_time, |m: &IngestMetrics| m.prs_materialized))
    }

    async fn run_ingest_stages(
        &self,
        job_id: Uuid,
        owner: &str,
        repo: &str,
        repo_id: &str,
        resume_from_pr: Option<u64>,
        cache_keys: &CacheKeyManager,
        config: &IngestConfig,
    ) -> Result<IngestMetrics> {
        // ── Crawl ───────────────────────────────────────────────────
        let mut numbers: Vec<u64> =
            self.services.forge.list_pull_requests(owner, repo, &config.pr_state, config.max_prs).await?
                .into_iter()
                .map(|p| p.number)
                .collect();
        numbers.sort_unstable();
        if let Some(cursor) = resume_from_pr {
            numbers.retain(|n| *n > cursor);
        }
        let prs_crawled = numbers.len();
        info!(job_id = %job_id, repo = %repo_id, count = prs_crawled, "crawl complete");

        self.checkpoint_mgr
            .save_checkpoint(Checkpoint::new(
                job_id,
                StageId::Crawl,
                cache_keys.crawl_key(),
                numbers.last().copied().unwrap_or(resume_from_pr.unwrap_or(0)),
            ))
            .await?;

        if numbers.is_empty() {
            return Ok(IngestMetrics { prs_crawled: 0, prs_enriched: 0, prs_materialized: 0, ..Default::default() });
        }

        // ── Enrich ──────────────────────────────────────────────────
        let enricher = PrEnricher::new(
            self.services.forge.clone(),
            self.services.llm.clone(),
            owner.to_string(),
            repo.to_string(),
            repo_id.to_string(),
            EnrichConfig { workers: config.enrich_workers, embed_dim: config.embed_dim },
        );

        let sem = Arc::new(Semaphore::new(config.enrich_workers));
        let enrich_futures = numbers.iter().map(|&number| {
            let sem = sem.clone();
            let enricher = &enricher;
            async move {
                let _permit = sem.acquire().await.expect("semaphore not closed");
                enricher.enrich_pr(number).await
            }
        });
        let enriched: Vec<PrRecord> = futures::future::join_all(enrich_futures).await.into_iter().flatten().collect();
        let prs_enriched = enriched.len();
        let skipped = prs_crawled - prs_enriched;
        if skipped > 0 {
            warn!(job_id = %job_id, repo = %repo_id, skipped, "some PRs failed enrichment and were skipped");
        }
        info!(job_id = %job_id, repo = %repo_id, count = prs_enriched, "enrich complete");

        let max_enriched = enriched.iter().map(|pr| pr.pr_number).max();
        self.checkpoint_mgr
            .save_checkpoint(Checkpoint::new(
                job_id,
                StageId::Enrich,
                cache_keys.enrich_key(),
                max_enriched.or(resume_from_pr).unwrap_or(0),
            ))
            .await?;

        if enriched.is_empty() {
            return Ok(IngestMetrics { prs_crawled, prs_enriched: 0, prs_materialized: 0, ..Default::default() });
        }

        // ── Materialize ─────────────────────────────────────────────
        self.services.vector_store.ensure_collections(config.embed_dim).await?;
        self.services.vector_store.upsert_prs(&enriched).await?;

        let all_files: Vec<_> = enriched.iter().flat_map(|pr| pr.files.clone()).collect();
        if !all_files.is_empty() {
            self.services.vector_store.upsert_files(&all_files).await?;
        }

        let prs_materialized = enriched.len();
        info!(job_id = %job_id, repo = %repo_id, count = prs_materialized, "materialize complete");

        self.checkpoint_mgr
            .save_checkpoint(Checkpoint::new(
                job_id,
                StageId::Materialize,
                cache_keys.materialize_key(),
                max_enriched.or(resume_from_pr).unwrap_or(0),
            ))
            .await?;

        Ok(IngestMetrics { prs_crawled, prs_enriched, prs_materialized, duration_ms: 0, errors: vec![] })
    }

    /// Run the projection pipeline: re-derive the mart rows from VS-PR and
    /// upsert them into the relational mart.
    pub async fn run_project(
        &self,
        mut job: Job,
        config: &ProjectConfig,
        daily_start: NaiveDate,
        daily_end: NaiveDate,
        today: i64,
    ) -> Result<(Job, ProjectMetrics)> {
        let job_id = job.id;
        let repo_id = job.repo_id.clone();
        let start_time = Instant::now();

        let dag = PipelineDAG::projection_pipeline()?;
        info!(job_id = %job_id, repo = %repo_id, "execution plan:\n{}", dag.execution_plan());

        let mut sm = JobStateMachine::new(job);
        sm.start(self.worker_id.clone(), StageId::Project)?;
        job = sm.into_job();

        let cache_keys = CacheKeyManager::new(repo_id.clone());

        let result = self.run_project_stages(job_id, &repo_id, &cache_keys, config, daily_start, daily_end, today).await;

        Ok(self.finalize(job, result, start_time, |m: &ProjectMetrics| m.prs_projected))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_project_stages(
        &self,
        job_id: Uuid,
        repo_name: &str,
        cache_keys: &CacheKeyManager,
        config: &ProjectConfig,
        daily_start: NaiveDate,
        daily_end: NaiveDate,
        today: i64,
    ) -> Result<ProjectMetrics> {
        // ── Project ─────────────────────────────────────────────────
        let expr = ScalarExpr::eq("repo_name", repo_name);
        let prs = self.services.vector_store.query_prs(&expr, config.fetch_limit).await?;
        let prs_projected = prs.len();
        info!(job_id = %job_id, repo = %repo_name, count = prs_projected, "project complete");

        let max_pr = prs.iter().map(|pr| pr.pr_number).max().unwrap_or(0);
        self.checkpoint_mgr
            .save_checkpoint(Checkpoint::new(job_id, StageId::Project, cache_keys.project_key(), max_pr))
            .await?;

        let mart = prlens_analytics::project(repo_name, prs, today, daily_start, daily_end);

        // ── MartUpsert ──────────────────────────────────────────────
        let mart_rows_upserted = mart.authors.len()
            + mart.daily.len()
            + mart.windows.len()
            + mart.ownership.len()
            + mart.prs_window.len()
            + mart.repo_prs.len();

        self.services.mart.upsert_authors(&mart.authors).await?;
        self.services.mart.upsert_daily_metrics(&mart.daily).await?;
        self.services.mart.upsert_window_metrics(&mart.windows).await?;
        self.services.mart.upsert_file_ownership(&mart.ownership).await?;
        self.services.mart.upsert_prs_window(&mart.prs_window).await?;
        self.services.mart.upsert_repo_prs(&mart.repo_prs).await?;

        info!(job_id = %job_id, repo = %repo_name, rows = mart_rows_upserted, "mart upsert complete");

        self.checkpoint_mgr
            .save_checkpoint(Checkpoint::new(job_id, StageId::MartUpsert, cache_keys.mart_upsert_key(), max_pr))
            .await?;

        Ok(ProjectMetrics { prs_projected, mart_rows_upserted, duration_ms: 0, errors: vec![] })
    }

    /// Shared success/failure bookkeeping for both pipelines: transitions
    /// the job state machine, classifies the error on failure, and cleans
    /// up checkpoints on success (a fresh ingest of the same repo starts
    /// its own checkpoint trail).
    fn finalize<M: Default>(
        &self,
        job: Job,
        result: Result<M>,
        start_time: Instant,
        count_fn: impl FnOnce(&M) -> usize,
    ) -> (Job, M) {
        let elapsed = start_time.elapsed();
        let job_id = job.id;

        match result {
            Ok(metrics) => {
                let count = count_fn(&metrics);
                info!(job_id = %job_id, duration_ms = elapsed.as_millis() as u64, count, "job completed successfully");

                let mut sm = JobStateMachine::new(job);
                let _ = sm.complete(count);
                let completed_job = sm.into_job();

                (completed_job, metrics)
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "job failed");

                let anyhow_err: anyhow::Error = e.into();
                let error_category = classify_error(&anyhow_err);
                let failed_stage = current_stage_from_job(&job);

                let mut sm = JobStateMachine::new(job);
                let retry_count = match &sm.job().state {
                    JobState::Failed { retry_count, .. } => *retry_count + 1,
                    _ => 0,
                };
                let _ = sm.fail(anyhow_err.to_string(), error_category, failed_stage, retry_count);
                let failed_job = sm.into_job();

                (failed_job, M::default())
            }
        }
    }
}

/// Splits `"owner/repo"` into its parts; `OrchestratorError::Config` on
/// malformed input.
fn split_repo_slug(slug: &str) -> Result<(&str, &str)> {
    slug.split_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .ok_or_else(|| OrchestratorError::config(format!("repo slug must be \"owner/repo\": {slug}")))
}

fn current_stage_from_job(job: &Job) -> StageId {
    match &job.state {
        JobState::Running { current_stage, .. } => *current_stage,
        JobState::Failed { failed_stage, .. } => *failed_stage,
        _ => StageId::Crawl,
    }
}

fn classify_error(error: &anyhow::Error) -> ErrorCategory {
    let error_str = error.to_string();

    if error_str.contains("timeout") || error_str.contains("rate limit") || error_str.contains("connection") {
        ErrorCategory::Transient
    } else if error_str.contains("OOM") || error_str.contains("out of memory") || error_str.contains("database") {
        ErrorCategory::Infrastructure
    } else if error_str.contains("parse error") || error_str.contains("invalid") {
        ErrorCategory::Permanent
    } else {
        ErrorCategory::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_repo_slug() {
        assert_eq!(split_repo_slug("acme/widgets").unwrap(), ("acme", "widgets"));
        assert!(split_repo_slug("acme").is_err());
        assert!(split_repo_slug("/widgets").is_err());
        assert!(split_repo_slug("acme/").is_err());
    }

    #[test]
    fn test_error_classification() {
        let timeout_err = anyhow::anyhow!("request timeout occurred");
        assert_eq!(classify_error(&timeout_err), ErrorCategory::Transient);

        let oom_err = anyhow::anyhow!("OOM: out of memory");
        assert_eq!(classify_error(&oom_err), ErrorCategory::Infrastructure);

        let parse_err = anyhow::anyhow!("parse error: invalid syntax");
        assert_eq!(classify_error(&parse_err), ErrorCategory::Permanent);
    }

    #[test]
    fn test_current_stage_from_running_job() {
        let job = Job::new_queued("acme/widgets".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::Enrich).unwrap();
        assert_eq!(current_stage_from_job(sm.job()), StageId::Enrich);
    }
}
