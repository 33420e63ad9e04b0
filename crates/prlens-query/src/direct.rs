//! Direct-route handlers (spec §4.9): scalar-only queries against the
//! vector store's structured fields, no ANN involved.

use std::collections::HashMap;

use prlens_core::{FileRecord, PrRecord, RiskBand};
use prlens_storage::domain::{ScalarExpr, VectorStore};
use prlens_storage::Result;

use crate::dedup::dedupe_prs;

const QUERY_FETCH_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Recency,
    Largest,
    Riskiest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrSummaryTotals {
    pub prs_merged: u32,
    pub features_shipped: u32,
    pub high_risk_prs: u32,
}

fn summarize(rows: &[PrRecord]) -> PrSummaryTotals {
    let mut totals = PrSummaryTotals::default();
    for pr in rows {
        if pr.is_merged {
            totals.prs_merged += 1;
        }
        if !pr.feature.is_empty() {
            totals.features_shipped += 1;
        }
        if pr.high_risk {
            totals.high_risk_prs += 1;
        }
    }
    totals
}

fn time_repo_filter(repo: &str, start: i64, end: i64) -> Vec<ScalarExpr> {
    vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
        ScalarExpr::eq("is_merged", true),
    ]
}

fn sort_prs(rows: &mut [PrRecord], sort_by: SortBy) {
    match sort_by {
        SortBy::Riskiest => rows.sort_by(|a, b| {
            b.risk_score.partial_cmp(&a.risk_score).unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortBy::Largest => rows.sort_by(|a, b| {
            let sa = a.additions + a.deletions + a.changed_files;
            let sb = b.additions + b.deletions + b.changed_files;
            sb.cmp(&sa)
        }),
        SortBy::Recency => rows.sort_by(|a, b| b.merged_at.cmp(&a.merged_at)),
    }
}

/// `ListPRs(repo, start, end, author?, pr_number?, limit, sortBy)`.
pub async fn list_prs(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
    author: Option<&str>,
    pr_number: Option<u64>,
    limit: usize,
    sort_by: SortBy,
) -> Result<(Vec<PrRecord>, PrSummaryTotals)> {
    let mut clauses = time_repo_filter(repo, start, end);
    if let Some(author) = author {
        clauses.push(ScalarExpr::eq("author_name", author));
    }
    if let Some(n) = pr_number {
        clauses.push(ScalarExpr::eq("pr_number", n as i64));
    }
    let expr = ScalarExpr::and(clauses);

    let rows = store.query_prs(&expr, QUERY_FETCH_LIMIT).await?;
    let mut rows = dedupe_prs(rows);
    let totals = summarize(&rows);
    sort_prs(&mut rows, sort_by);
    rows.truncate(limit);
    Ok((rows, totals))
}

/// `ListFeatures(repo, start, end, author?, limit)` — `ListPRs` plus
/// `feature != ""`.
pub async fn list_features(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
    author: Option<&str>,
    limit: usize,
) -> Result<(Vec<PrRecord>, PrSummaryTotals)> {
    let mut clauses = time_repo_filter(repo, start, end);
    if let Some(author) = author {
        clauses.push(ScalarExpr::eq("author_name", author));
    }
    let expr = ScalarExpr::and(clauses);

    let rows = store.query_prs(&expr, QUERY_FETCH_LIMIT).await?;
    let mut rows: Vec<PrRecord> = dedupe_prs(rows).into_iter().filter(|pr| !pr.feature.is_empty()).collect();
    let totals = summarize(&rows);
    sort_prs(&mut rows, SortBy::Recency);
    rows.truncate(limit);
    Ok((rows, totals))
}

/// `TopFileByLines(repo, start, end)` — argmax over non-binary files grouped
/// by `file_id`, summing `lines_changed`.
pub async fn top_file_by_lines(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
) -> Result<Option<(String, u64)>> {
    let expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
        ScalarExpr::eq("is_binary", false),
    ]);
    let files = store.query_files(&expr, QUERY_FETCH_LIMIT).await?;

    let mut totals: HashMap<String, u64> = HashMap::new();
    for f in &files {
        *totals.entry(f.file_id.clone()).or_insert(0) += f.lines_changed() as u64;
    }
    Ok(totals.into_iter().max_by_key(|(_, lines)| *lines))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrCount {
    pub total: u32,
    pub merged: u32,
    pub high_risk: u32,
}

/// `PRCount(repo, start, end, author?)`.
pub async fn pr_count(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
    author: Option<&str>,
) -> Result<PrCount> {
    let mut clauses = vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
    ];
    if let Some(author) = author {
        clauses.push(ScalarExpr::eq("author_name", author));
    }
    let expr = ScalarExpr::and(clauses);
    let rows = dedupe_prs(store.query_prs(&expr, QUERY_FETCH_LIMIT).await?);

    let mut count = PrCount::default();
    count.total = rows.len() as u32;
    for pr in &rows {
        if pr.is_merged {
            count.merged += 1;
        }
        if pr.high_risk {
            count.high_risk += 1;
        }
    }
    Ok(count)
}

/// `TopPRsByRisk(repo, start, end, limit)`.
pub async fn top_prs_by_risk(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
    limit: usize,
) -> Result<Vec<PrRecord>> {
    let expr = ScalarExpr::and(time_repo_filter(repo, start, end));
    let rows = store.query_prs(&expr, QUERY_FETCH_LIMIT).await?;
    let mut rows = dedupe_prs(rows);
    sort_prs(&mut rows, SortBy::Riskiest);
    rows.truncate(limit);
    Ok(rows)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileChangesSummary {
    pub total_files: u32,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub language_histogram: HashMap<String, u32>,
    pub risk_histogram: HashMap<String, u32>,
}

/// `FileChangesSummary(repo, start, end)`.
pub async fn file_changes_summary(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
) -> Result<FileChangesSummary> {
    let expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
    ]);
    let files: Vec<FileRecord> = store.query_files(&expr, QUERY_FETCH_LIMIT).await?;

    let mut summary = FileChangesSummary::default();
    summary.total_files = files.len() as u32;
    for f in &files {
        summary.total_additions += f.additions as u64;
        summary.total_deletions += f.deletions as u64;
        *summary.language_histogram.entry(f.language.clone()).or_insert(0) += 1;
        let band = RiskBand::for_score(f.risk_score_file);
        *summary.risk_histogram.entry(band.as_str().to_string()).or_insert(0) += 1;
    }
    Ok(summary)
}
