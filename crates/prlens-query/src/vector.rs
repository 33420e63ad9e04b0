//! Vector-route handler (spec §4.9): pure ANN over PRs, time/repo-scoped
//! only, with an optional LLM-composed natural-language summary.

use prlens_core::PrRecord;
use prlens_llm::LlmGateway;
use prlens_storage::domain::{ScalarExpr, VectorStore};
use prlens_storage::Result;

use crate::dedup::dedupe_prs;

const EMBED_DIM: usize = 1536;
const SUMMARY_CONTEXT_HITS: usize = 10;

pub struct Explanation {
    pub hits: Vec<PrRecord>,
    pub summary: Option<String>,
}

/// `Explanation(repo, start, end, query, k)` — scalar filter on time/repo
/// only, ANN, sorted by distance; optionally asks the LLM to summarize the
/// top 10 hits.
pub async fn explanation(
    store: &dyn VectorStore,
    llm: &dyn LlmGateway,
    repo: &str,
    start: i64,
    end: i64,
    query: &str,
    k: usize,
    compose_summary: bool,
) -> Result<Explanation> {
    let expr = ScalarExpr::and(vec![
        ScalarExpr::eq("repo_name", repo),
        ScalarExpr::gte("merged_at", start),
        ScalarExpr::lte("merged_at", end),
    ]);

    let vector = llm.embed(query, EMBED_DIM).await;
    let mut hits = store.search_prs(&vector, &expr, k).await?;
    hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));

    let rows = dedupe_prs(hits.into_iter().map(|h| h.record).collect());

    let summary = if compose_summary {
        compose_explanation(llm, query, &rows).await
    } else {
        None
    };

    Ok(Explanation { hits: rows, summary })
}

async fn compose_explanation(llm: &dyn LlmGateway, query: &str, rows: &[PrRecord]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let context: String = rows
        .iter()
        .take(SUMMARY_CONTEXT_HITS)
        .map(|pr| {
            format!(
                "PR #{}: {}\nSummary: {}\nRisk reasons: {}\n",
                pr.pr_number,
                pr.title,
                pr.pr_summary,
                pr.risk_reasons.join("; ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let system = "You summarize pull-request search results for an engineering audience in 2-3 sentences.";
    let user = format!("Query: {query}\n\nTop results:\n{context}");
    llm.chat(system, &user, 300, 0.3).await.ok()
}
