//! `vector-load`: read a persisted ingest JSON file and materialize its PRs
//! (and their files) into the vector store, batched (spec.md §6).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use prlens_cli::persisted::PersistedIngest;
use prlens_cli::Config;

#[derive(Parser)]
#[command(name = "vector-load", about = "Load a persisted ingest JSON file into the vector store")]
struct Args {
    /// Path to the JSON file written by `ingest`.
    path: PathBuf,

    /// PRs (and their files) per upsert batch.
    #[arg(long, default_value_t = 50)]
    batch_size: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    prlens_cli::init_logging();
    let args = Args::parse();
    let config = Config::load()?;

    let contents = std::fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let persisted: PersistedIngest = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", args.path.display()))?;

    info!(
        repo = %persisted.summary.repo,
        prs = persisted.pull_requests.len(),
        "loading persisted PRs into vector store"
    );

    let vector_store = config.vector_store()?;
    vector_store.ensure_collections(config.embed_dim).await.context("failed to ensure collections")?;

    let mut prs_loaded = 0;
    let mut files_loaded = 0;

    for batch in persisted.pull_requests.chunks(args.batch_size) {
        vector_store.upsert_prs(batch).await.context("failed to upsert PR batch")?;
        prs_loaded += batch.len();

        let files: Vec<_> = batch.iter().flat_map(|pr| pr.files.clone()).collect();
        if !files.is_empty() {
            vector_store.upsert_files(&files).await.context("failed to upsert file batch")?;
            files_loaded += files.len();
        }

        info!(prs_loaded, files_loaded, "batch loaded");
    }

    info!(prs_loaded, files_loaded, "vector load complete");
    Ok(())
}
