//! `shipped-projector`: re-derive just the `repo_prs` ("what shipped")
//! table for one repository (spec.md §6). Narrower and cheaper than the
//! full `projector` when only the shipped-PR feed needs refreshing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;

use prlens_cli::Config;
use prlens_orchestration::pipeline::ProjectConfig;
use prlens_storage::domain::ScalarExpr;

#[derive(Parser)]
#[command(name = "shipped-projector", about = "Re-derive the shipped-PR (repo_prs) mart table")]
struct Args {
    #[arg(long)]
    repo: String,

    /// Only project PRs merged since the last recorded run for this repo.
    #[arg(long)]
    incremental: bool,
}

/// Where the last-run marker for `--incremental` lives. A file, not the
/// in-memory `CheckpointManager` (that manager lives inside one
/// orchestrator process; this binary exits between runs).
fn marker_path(repo: &str) -> PathBuf {
    let sanitized = repo.replace('/', "__");
    std::env::temp_dir().join(format!("prlens-shipped-projector-{sanitized}.marker"))
}

fn read_marker(repo: &str) -> Option<i64> {
    std::fs::read_to_string(marker_path(repo)).ok()?.trim().parse().ok()
}

fn write_marker(repo: &str, epoch: i64) -> Result<()> {
    std::fs::write(marker_path(repo), epoch.to_string()).context("failed to write incremental marker")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    prlens_cli::init_logging();
    let args = Args::parse();
    let config = Config::load()?;
    let now = Utc::now().timestamp();

    let vector_store = config.vector_store()?;
    let mart = config.relational_mart().await?;

    let expr = match (args.incremental, read_marker(&args.repo)) {
        (true, Some(since)) => {
            info!(repo = %args.repo, since, "incremental shipped projection");
            ScalarExpr::and(vec![ScalarExpr::eq("repo_name", args.repo.clone()), ScalarExpr::gte("merged_at", since)])
        }
        (true, None) => {
            info!(repo = %args.repo, "no prior marker found, running full shipped projection");
            ScalarExpr::eq("repo_name", args.repo.clone())
        }
        (false, _) => ScalarExpr::eq("repo_name", args.repo.clone()),
    };

    let fetch_limit = ProjectConfig::default().fetch_limit;
    let prs = vector_store.query_prs(&expr, fetch_limit).await.context("failed to query PRs")?;
    info!(repo = %args.repo, prs = prs.len(), "projecting shipped PRs");

    let repo_prs = prlens_analytics::shipped::compute_repo_prs(&args.repo, &prlens_analytics::dedup::dedupe_by_pr_id(prs));

    // No truncate-before-upsert here: `upsert_repo_prs` is `ON CONFLICT DO
    // UPDATE`, and `truncate_aggregates` only clears the four author-metrics
    // tables `projector` owns, not `repo_prs`.
    mart.upsert_repo_prs(&repo_prs).await.context("failed to upsert repo_prs")?;

    if args.incremental {
        write_marker(&args.repo, now)?;
    }

    info!(repo = %args.repo, rows_upserted = repo_prs.len(), "shipped projector complete");
    Ok(())
}
