//! Deduplication by `pr_id` before aggregation (spec §4.6: "duplicates are
//! an observed hazard of upstream re-emission").

use std::collections::HashSet;

use prlens_core::PrRecord;

pub fn dedupe_by_pr_id(prs: Vec<PrRecord>) -> Vec<PrRecord> {
    let mut seen = HashSet::new();
    prs.into_iter().filter(|pr| seen.insert(pr.pr_id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(pr_id: &str) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: pr_id.into(),
            pr_number: 1,
            author_id: "u1".into(),
            author_name: "alice".into(),
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
            risk_band: prlens_core::RiskBand::Low,
            high_risk: false,
            risk_reasons: vec![],
            vector: vec![],
            files: vec![],
        }
    }

    #[test]
    fn keeps_first_occurrence_only() {
        let prs = vec![pr("a"), pr("b"), pr("a")];
        let deduped = dedupe_by_pr_id(prs);
        assert_eq!(deduped.len(), 2);
    }
}
