//! Analytics projector (spec §4.6): pure functions turning a batch of
//! enriched `PrRecord`s into the relational mart's row types. No I/O lives
//! here — callers read from [`prlens_storage::VectorStore`] and write via
//! [`prlens_storage::RelationalMart`].

pub mod authors;
pub mod daily;
pub mod dedup;
pub mod ownership;
pub mod prs_window;
pub mod shipped;
pub mod window;

use prlens_core::PrRecord;
use prlens_storage::domain::mart::{
    AuthorFileOwnership, AuthorMetricsDaily, AuthorMetricsWindow, AuthorPrsWindow, AuthorRow, RepoPr,
};

/// All six mart tables projected from one repo's PR batch.
#[derive(Debug, Default)]
pub struct ProjectedMart {
    pub authors: Vec<AuthorRow>,
    pub daily: Vec<AuthorMetricsDaily>,
    pub windows: Vec<AuthorMetricsWindow>,
    pub ownership: Vec<AuthorFileOwnership>,
    pub prs_window: Vec<AuthorPrsWindow>,
    pub repo_prs: Vec<RepoPr>,
}

/// Projects one repo's PR batch into every mart table, in the fixed
/// order dedup → daily → window → ownership → prs_window → repo_prs
/// (spec §4.6: "duplicates are an observed hazard of upstream
/// re-emission" — dedup runs first so every downstream aggregate sees
/// each PR exactly once). `repo_prs` is projected from the deduped but
/// otherwise unfiltered batch, since it carries open and closed PRs too.
pub fn project(
    repo_name: &str,
    prs: Vec<PrRecord>,
    today: i64,
    daily_start: chrono::NaiveDate,
    daily_end: chrono::NaiveDate,
) -> ProjectedMart {
    let prs = dedup::dedupe_by_pr_id(prs);

    let daily = daily::compute_daily_metrics(repo_name, &prs, daily_start, daily_end);
    let windows = window::compute_window_metrics(repo_name, &daily, today);
    let ownership = ownership::compute_file_ownership(repo_name, &prs, today);
    let prs_window = prs_window::compute_author_prs_window(repo_name, &prs, today);
    let repo_prs = shipped::compute_repo_prs(repo_name, &prs);
    let authors = authors::compute_authors(&prs);

    ProjectedMart { authors, daily, windows, ownership, prs_window, repo_prs }
}
