//! `authors` projection: one row per distinct author seen in `prs`.
//!
//! The ingest pipeline only carries `author_id`/`author_name` through
//! `PrRecord` (spec §3 VS-PR); richer profile fields aren't part of the
//! vector-store schema, so `display_name` mirrors `username` and
//! `avatar_url` is left blank here rather than invented.

use prlens_core::PrRecord;
use prlens_storage::domain::mart::AuthorRow;

pub fn compute_authors(prs: &[PrRecord]) -> Vec<AuthorRow> {
    let mut seen = std::collections::HashSet::new();
    let mut rows = Vec::new();
    for pr in prs {
        if seen.insert(pr.author_name.clone()) {
            rows.push(AuthorRow {
                username: pr.author_name.clone(),
                display_name: pr.author_name.clone(),
                avatar_url: String::new(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlens_core::RiskBand;

    fn pr(author: &str) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: format!("{author}-1"),
            pr_number: 1,
            author_id: author.into(),
            author_name: author.into(),
            created_at: 0,
            merged_at: 0,
            is_merged: false,
            is_closed: false,
            status: "open".into(),
            title: String::new(),
            body: String::new(),
            pr_summary: String::new(),
            feature: String::new(),
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

    #[test]
    fn dedupes_by_username() {
        let prs = vec![pr("alice"), pr("bob"), pr("alice")];
        let rows = compute_authors(&prs);
        assert_eq!(rows.len(), 2);
    }
}
