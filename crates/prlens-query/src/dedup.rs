//! Deduplication shared by every retrieval handler (spec §4.9: "All result
//! constructors dedupe by `pr_id` first, `pr_number` second"; spec §8
//! invariant 7).

use prlens_core::PrRecord;
use std::collections::HashSet;

pub fn dedupe_prs(rows: Vec<PrRecord>) -> Vec<PrRecord> {
    let mut seen_ids = HashSet::new();
    let mut seen_numbers = HashSet::new();
    rows.into_iter()
        .filter(|pr| seen_ids.insert(pr.pr_id.clone()) && seen_numbers.insert(pr.pr_number))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlens_core::RiskBand;

    fn pr(pr_id: &str, pr_number: u64) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: pr_id.into(),
            pr_number,
            author_id: "u1".into(),
            author_name: "alice".into(),
            created_at: 0,
            merged_at: 0,
            is_merged: true,
            is_closed: false,
            status: "merged".into(),
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
    fn drops_duplicate_pr_id() {
        let rows = vec![pr("a", 1), pr("a", 2)];
        assert_eq!(dedupe_prs(rows).len(), 1);
    }

    #[test]
    fn drops_duplicate_pr_number() {
        let rows = vec![pr("a", 1), pr("b", 1)];
        assert_eq!(dedupe_prs(rows).len(), 1);
    }
}
