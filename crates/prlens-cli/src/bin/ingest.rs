//! `ingest`: crawl a repository's pull requests and enrich each one
//! (summary, per-file/per-PR risk, feature classification), writing the
//! result to a JSON file for `vector-load` to pick up (spec.md §6
//! "Persisted JSON format").

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use prlens_core::PrRecord;
use prlens_enrich::{EnrichConfig, PrEnricher};
use prlens_cli::persisted::{IngestSummary, PersistedIngest};
use prlens_cli::{split_repo_slug, Config};

#[derive(Parser)]
#[command(name = "ingest", about = "Crawl and enrich one repository's pull requests")]
struct Args {
    /// Repository in "owner/repo" form.
    repo: String,

    /// Which PRs to pull.
    #[arg(long, value_parser = ["open", "closed", "all"], default_value = "all")]
    state: String,

    /// Where to write the persisted JSON.
    #[arg(long)]
    output: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    prlens_cli::init_logging();
    let args = Args::parse();
    let config = Config::load()?;
    let (owner, repo) = split_repo_slug(&args.repo)?;

    let forge = Arc::new(config.forge_client());
    let llm = config.llm_gateway();

    info!(repo = %args.repo, state = %args.state, "crawling pull requests");
    let mut numbers: Vec<u64> = forge
        .list_pull_requests(owner, repo, &args.state, config.max_prs)
        .await
        .context("failed to list pull requests")?
        .into_iter()
        .map(|p| p.number)
        .collect();
    numbers.sort_unstable();
    let prs_crawled = numbers.len();
    info!(prs_crawled, "crawl complete");

    let repo_info = forge.get_repo(owner, repo).await.context("failed to resolve repository")?;
    let enricher = PrEnricher::new(
        forge.clone(),
        llm.clone(),
        owner.to_string(),
        repo.to_string(),
        repo_info.id.to_string(),
        EnrichConfig { workers: config.enrich_workers, embed_dim: config.embed_dim },
    );

    let sem = Arc::new(Semaphore::new(config.enrich_workers));
    let futures = numbers.iter().map(|&number| {
        let sem = sem.clone();
        let enricher = &enricher;
        async move {
            let _permit = sem.acquire().await.expect("semaphore not closed");
            enricher.enrich_pr(number).await
        }
    });
    let enriched: Vec<PrRecord> = futures::future::join_all(futures).await.into_iter().flatten().collect();
    let prs_enriched = enriched.len();

    if prs_enriched < prs_crawled {
        warn!(skipped = prs_crawled - prs_enriched, "some PRs failed enrichment and were skipped");
    }
    info!(prs_enriched, "enrich complete");

    let persisted = PersistedIngest {
        summary: IngestSummary { repo: args.repo.clone(), state: args.state.clone(), prs_crawled, prs_enriched },
        pull_requests: enriched,
    };

    let json = serde_json::to_string_pretty(&persisted).context("failed to serialize ingest output")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(output = %args.output.display(), "wrote ingest JSON");
    Ok(())
}
