//! Hybrid-route handlers (spec §4.9): scalar-filtered ANN search.

use std::collections::HashSet;

use prlens_core::PrRecord;
use prlens_llm::LlmGateway;
use prlens_storage::domain::{ScalarExpr, VectorStore};
use prlens_storage::Result;

use crate::dedup::dedupe_prs;

const EMBED_DIM: usize = 1536;
const FETCH_LIMIT: usize = 1000;

/// `Features(repo, start, end, terms, k)`.
pub async fn features(
    store: &dyn VectorStore,
    llm: &dyn LlmGateway,
    repo: &str,
    start: i64,
    end: i64,
    terms: &str,
    k: usize,
) -> Result<Vec<PrRecord>> {
    let expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
        ScalarExpr::eq("is_merged", true),
    ]);

    let vector = llm.embed(terms, EMBED_DIM).await;
    let hits = store.search_prs(&vector, &expr, k).await?;
    // The store's scalar vocabulary (==, >=, <=, and, like) has no "not
    // empty" operator, so the feature filter is applied client-side.
    let mut rows: Vec<PrRecord> = hits.into_iter().map(|h| h.record).filter(|pr| !pr.feature.is_empty()).collect();
    rows = dedupe_prs(rows);
    rows.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
    rows.truncate(k);
    Ok(rows)
}

/// `RiskyFiles(repo, start, end, terms, k)` — ANN over non-binary files,
/// collect unique PR numbers, re-query `VS-PR` restricted to those PRs.
pub async fn risky_files(
    store: &dyn VectorStore,
    llm: &dyn LlmGateway,
    repo: &str,
    start: i64,
    end: i64,
    terms: &str,
    k: usize,
) -> Result<Vec<PrRecord>> {
    let file_expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
        ScalarExpr::eq("is_binary", false),
    ]);

    let vector = llm.embed(terms, EMBED_DIM).await;
    let hits = store.search_files(&vector, &file_expr, k).await?;

    let mut pr_numbers: Vec<i64> = Vec::new();
    let mut seen = HashSet::new();
    for hit in &hits {
        if seen.insert(hit.record.pr_number) {
            pr_numbers.push(hit.record.pr_number as i64);
        }
    }
    if pr_numbers.is_empty() {
        return Ok(Vec::new());
    }

    let pr_expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::eq("is_merged", true),
        ScalarExpr::gte("pr_number", *pr_numbers.iter().min().unwrap()),
        ScalarExpr::lte("pr_number", *pr_numbers.iter().max().unwrap()),
    ]);
    let candidates = store.query_prs(&pr_expr, FETCH_LIMIT).await?;
    let wanted: HashSet<i64> = pr_numbers.into_iter().collect();
    let mut rows: Vec<PrRecord> =
        candidates.into_iter().filter(|pr| wanted.contains(&(pr.pr_number as i64))).collect();
    rows = dedupe_prs(rows);
    rows.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
    rows.truncate(k);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prlens_core::RiskBand;
    use prlens_storage::domain::{FileHit, PrHit};

    struct FakeStore {
        prs: Vec<PrRecord>,
    }

    #[async_trait]
    impl VectorStore for FakeStore {
        async fn ensure_collections(&self, _dim: usize) -> Result<()> {
            Ok(())
        }
        async fn upsert_prs(&self, _rows: &[PrRecord]) -> Result<()> {
            Ok(())
        }
        async fn upsert_files(&self, _rows: &[prlens_core::FileRecord]) -> Result<()> {
            Ok(())
        }
        async fn query_prs(&self, _expr: &ScalarExpr, _limit: usize) -> Result<Vec<PrRecord>> {
            Ok(self.prs.clone())
        }
        async fn search_prs(&self, _vector: &[f32], _expr: &ScalarExpr, k: usize) -> Result<Vec<PrHit>> {
            Ok(self.prs.iter().take(k).cloned().map(|record| PrHit { record, distance: 0.1 }).collect())
        }
        async fn query_files(&self, _expr: &ScalarExpr, _limit: usize) -> Result<Vec<prlens_core::FileRecord>> {
            Ok(Vec::new())
        }
        async fn search_files(&self, _vector: &[f32], _expr: &ScalarExpr, _k: usize) -> Result<Vec<FileHit>> {
            Ok(Vec::new())
        }
    }

    struct FakeLlm;

    #[async_trait]
    impl LlmGateway for FakeLlm {
        async fn embed(&self, _text: &str, dim: usize) -> Vec<f32> {
            vec![0.0; dim]
        }
        async fn chat(&self, _system: &str, _user: &str, _max_tokens: u32, _temperature: f32) -> prlens_llm::Result<String> {
            Ok(String::new())
        }
    }

    fn pr(pr_id: &str, pr_number: u64, feature: &str) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: pr_id.into(),
            pr_number,
            author_id: "u1".into(),
            author_name: "alice".into(),
            created_at: 0,
            merged_at: 100,
            is_merged: true,
            is_closed: false,
            status: "merged".into(),
            title: String::new(),
            body: String::new(),
            pr_summary: String::new(),
            feature: feature.to_string(),
            labels_full: vec![],
            additions: 0,
            deletions: 0,
            changed_files: 0,
            risk_score: 0.0,
            risk_band: RiskBand::Low,
            high_risk: false,
            risk_reasons: vec![],
            vector: vec![],
            files: vec![],
        }
    }

    #[tokio::test]
    async fn features_filters_non_feature_prs() {
        let store = FakeStore { prs: vec![pr("a", 1, "Add widget"), pr("b", 2, "")] };
        let llm = FakeLlm;
        let rows = features(&store, &llm, "acme/widgets", 0, 200, "widget", 5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pr_id, "a");
    }
}

/// `FileSearch(repo, start, end, filename, k)` — scalar `file_id like
/// "%filename%"`, collect PR numbers, fetch PRs.
pub async fn file_search(
    store: &dyn VectorStore,
    repo: &str,
    start: i64,
    end: i64,
    filename: &str,
    k: usize,
) -> Result<Vec<PrRecord>> {
    let pattern = format!("%{filename}%");
    let file_expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
        ScalarExpr::like("file_id", pattern),
    ]);
    let files = store.query_files(&file_expr, FETCH_LIMIT).await?;

    let wanted: HashSet<i64> = files.iter().map(|f| f.pr_number as i64).collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let pr_expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::eq("is_merged", true),
    ]);
    let candidates = store.query_prs(&pr_expr, FETCH_LIMIT).await?;
    let mut rows: Vec<PrRecord> =
        candidates.into_iter().filter(|pr| wanted.contains(&(pr.pr_number as i64))).collect();
    rows = dedupe_prs(rows);
    rows.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
    rows.truncate(k);
    Ok(rows)
}
