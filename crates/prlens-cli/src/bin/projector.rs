//! `projector`: re-derive the relational mart's author/daily/window/
//! ownership tables for one repository from the vector store (spec.md
//! §6). The vector store is always the canonical source post-ingest
//! (`DESIGN.md` Open Question 2).

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use tracing::{info, warn};

use prlens_cli::Config;
use prlens_orchestration::pipeline::ProjectConfig;
use prlens_storage::domain::ScalarExpr;

#[derive(Parser)]
#[command(name = "projector", about = "Re-derive relational mart tables for one repository")]
struct Args {
    #[arg(long)]
    repo: String,

    /// Restrict `author_metrics_window` output to this window, in days
    /// (999 = all-time). Omit to upsert every precomputed window.
    #[arg(long)]
    window_days: Option<u32>,

    /// How far back to pull daily metrics from, in days.
    #[arg(long, default_value_t = 90)]
    data_window_days: i64,

    /// Truncate the repo's aggregate tables before re-projecting.
    #[arg(long)]
    force_refresh: bool,

    #[arg(
        long,
        value_parser = [
            "authors",
            "author_metrics_daily",
            "author_metrics_window",
            "author_prs_window",
            "author_file_ownership",
            "all",
        ],
        default_value = "all"
    )]
    update_table: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    prlens_cli::init_logging();
    let args = Args::parse();
    let config = Config::load()?;

    let today_date = Utc::now().date_naive();
    let today = Utc::now().timestamp();
    let daily_start = today_date - Duration::days(args.data_window_days - 1);

    let vector_store = config.vector_store()?;
    let mart = config.relational_mart().await?;

    let expr = ScalarExpr::eq("repo_name", args.repo.clone());
    let fetch_limit = ProjectConfig::default().fetch_limit;
    let prs = vector_store.query_prs(&expr, fetch_limit).await.context("failed to query PRs")?;
    info!(repo = %args.repo, prs = prs.len(), "projecting mart tables");

    let projected = prlens_analytics::project(&args.repo, prs, today, daily_start, today_date);

    if args.force_refresh {
        info!(repo = %args.repo, "truncating aggregate tables before re-projection");
        mart.truncate_aggregates(&args.repo).await.context("failed to truncate aggregates")?;
    }

    let windows = match args.window_days {
        Some(wd) => {
            let filtered: Vec<_> = projected.windows.iter().filter(|w| w.window_days == wd).cloned().collect();
            if filtered.is_empty() {
                warn!(window_days = wd, "no precomputed window rows matched this --window-days value");
            }
            filtered
        }
        None => projected.windows.clone(),
    };

    let mut rows_upserted = 0usize;

    macro_rules! upsert {
        ($table:expr, $rows:expr, $upsert_fn:ident) => {
            mart.$upsert_fn($rows).await.with_context(|| format!("failed to upsert {}", $table))?;
            rows_upserted += $rows.len();
        };
    }

    match args.update_table.as_str() {
        "authors" => upsert!("authors", &projected.authors, upsert_authors),
        "author_metrics_daily" => upsert!("author_metrics_daily", &projected.daily, upsert_daily_metrics),
        "author_metrics_window" => upsert!("author_metrics_window", &windows, upsert_window_metrics),
        "author_prs_window" => upsert!("author_prs_window", &projected.prs_window, upsert_prs_window),
        "author_file_ownership" => upsert!("author_file_ownership", &projected.ownership, upsert_file_ownership),
        "all" => {
            upsert!("authors", &projected.authors, upsert_authors);
            upsert!("author_metrics_daily", &projected.daily, upsert_daily_metrics);
            upsert!("author_metrics_window", &windows, upsert_window_metrics);
            upsert!("author_prs_window", &projected.prs_window, upsert_prs_window);
            upsert!("author_file_ownership", &projected.ownership, upsert_file_ownership);
        }
        other => unreachable!("clap restricted --update-table to a known set, got {other}"),
    }

    info!(repo = %args.repo, rows_upserted, "projector complete");
    Ok(())
}
