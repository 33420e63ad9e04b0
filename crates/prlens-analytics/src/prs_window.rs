//! Per-author, per-window PR listings (spec §3 `author_prs_window`).

use prlens_core::PrRecord;
use prlens_storage::domain::mart::{AuthorPrsWindow, ALL_TIME_WINDOW_DAYS, METRIC_WINDOWS};

/// Feature classification in this codebase is a deterministic label rule
/// (spec §4.3), not a scored model, so every classified PR carries the same
/// rule name and full confidence; unclassified PRs carry neither.
const FEATURE_RULE_LABEL_BASED: &str = "label_based";

pub fn compute_author_prs_window(
    repo_name: &str,
    prs: &[PrRecord],
    today: i64,
) -> Vec<AuthorPrsWindow> {
    const SECONDS_PER_DAY: i64 = 86_400;

    let merged: Vec<&PrRecord> = prs.iter().filter(|p| p.is_merged).collect();
    let all_time_start = merged.iter().map(|p| p.merged_at).min().unwrap_or(today);

    let mut rows = Vec::new();

    for &window_days in METRIC_WINDOWS {
        let (start_date, end_date) = if window_days == ALL_TIME_WINDOW_DAYS {
            (all_time_start, today)
        } else {
            (today - (window_days as i64 - 1) * SECONDS_PER_DAY, today)
        };

        for pr in merged.iter().filter(|p| p.merged_at >= start_date && p.merged_at <= end_date) {
            let (feature_rule, feature_confidence) = if pr.feature.is_empty() {
                (String::new(), 0.0)
            } else {
                (FEATURE_RULE_LABEL_BASED.to_string(), 1.0)
            };

            rows.push(AuthorPrsWindow {
                username: pr.author_name.clone(),
                repo_name: repo_name.to_string(),
                window_days,
                start_date,
                end_date,
                pr_number: pr.pr_number,
                title: pr.title.clone(),
                pr_summary: pr.pr_summary.clone(),
                merged_at: pr.merged_at,
                risk_score: pr.risk_score,
                high_risk: pr.high_risk,
                feature_rule,
                feature_confidence,
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlens_core::RiskBand;

    fn pr(author: &str, merged_at: i64, feature: &str) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: format!("{author}-{merged_at}"),
            pr_number: 42,
            author_id: author.into(),
            author_name: author.into(),
            created_at: merged_at,
            merged_at,
            is_merged: true,
            is_closed: false,
            status: "merged".into(),
            title: "Add widget".into(),
            body: String::new(),
            pr_summary: "Adds a widget".into(),
            feature: feature.to_string(),
            labels_full: vec![],
            additions: 10,
            deletions: 0,
            changed_files: 1,
            risk_score: 2.0,
            risk_band: RiskBand::Low,
            high_risk: false,
            risk_reasons: vec![],
            vector: vec![],
            files: vec![],
        }
    }

    #[test]
    fn feature_rule_populated_only_when_classified() {
        const DAY: i64 = 86_400;
        let today = 5 * DAY;
        let prs = vec![pr("alice", today, "Add widget"), pr("bob", today, "")];
        let rows = compute_author_prs_window("acme/widgets", &prs, today);
        let alice = rows.iter().find(|r| r.username == "alice" && r.window_days == 7).unwrap();
        let bob = rows.iter().find(|r| r.username == "bob" && r.window_days == 7).unwrap();
        assert_eq!(alice.feature_rule, "label_based");
        assert_eq!(alice.feature_confidence, 1.0);
        assert_eq!(bob.feature_rule, "");
        assert_eq!(bob.feature_confidence, 0.0);
    }

    #[test]
    fn excludes_unmerged_prs() {
        const DAY: i64 = 86_400;
        let mut p = pr("alice", 5 * DAY, "");
        p.is_merged = false;
        let rows = compute_author_prs_window("acme/widgets", &[p], 5 * DAY);
        assert!(rows.is_empty());
    }
}
