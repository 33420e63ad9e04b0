//! `repo_prs` projection (spec §3): one row per PR regardless of merge
//! status, carrying the full PR-level summary plus its top risky files.

use prlens_core::{LabelInfo, PrRecord};
use prlens_storage::domain::mart::RepoPr;

const FEATURE_RULE_LABEL_BASED: &str = "label_based";

fn labels_to_json(labels: &[LabelInfo]) -> serde_json::Value {
    serde_json::to_value(labels).unwrap_or(serde_json::Value::Array(vec![]))
}

fn top_risky_files_json(pr: &PrRecord) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = pr
        .top_risky_files()
        .into_iter()
        .map(|f| {
            serde_json::json!({
                "file_id": f.file_id,
                "risk_score_file": f.risk_score_file,
                "lines_changed": f.lines_changed(),
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}

pub fn compute_repo_prs(repo_name: &str, prs: &[PrRecord]) -> Vec<RepoPr> {
    prs.iter()
        .map(|pr| {
            let (feature_rule, feature_confidence) = if pr.feature.is_empty() {
                (String::new(), 0.0)
            } else {
                (FEATURE_RULE_LABEL_BASED.to_string(), 1.0)
            };

            RepoPr {
                repo_name: repo_name.to_string(),
                pr_number: pr.pr_number,
                title: pr.title.clone(),
                pr_summary: pr.pr_summary.clone(),
                author: pr.author_name.clone(),
                created_at: pr.created_at,
                merged_at: pr.merged_at,
                is_merged: pr.is_merged,
                additions: pr.additions,
                deletions: pr.deletions,
                changed_files: pr.changed_files,
                labels_full: labels_to_json(&pr.labels_full),
                feature_rule,
                feature_confidence,
                risk_score: pr.risk_score,
                high_risk: pr.high_risk,
                risk_reasons: pr.risk_reasons.clone(),
                top_risky_files: top_risky_files_json(pr),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlens_core::{FileRecord, FileStatus, RiskBand};

    fn file(file_id: &str, score: f32, additions: u32) -> FileRecord {
        FileRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: "pr-1".into(),
            pr_number: 1,
            file_id: file_id.into(),
            author_id: "u1".into(),
            author_name: "alice".into(),
            merged_at: 0,
            file_status: FileStatus::Modified,
            language: "Rust".into(),
            is_binary: false,
            is_config_file: false,
            is_documentation: false,
            is_test_file: false,
            is_source_code: true,
            additions,
            deletions: 0,
            patch: String::new(),
            ai_summary: String::new(),
            risk_score_file: score,
            high_risk_flag: false,
            file_risk_reasons: vec![],
            vector: vec![],
            content_error: None,
        }
    }

    fn base_pr() -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: "pr-1".into(),
            pr_number: 1,
            author_id: "u1".into(),
            author_name: "alice".into(),
            created_at: 0,
            merged_at: 0,
            is_merged: false,
            is_closed: false,
            status: "open".into(),
            title: "Add widget".into(),
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
    fn includes_unmerged_prs() {
        let prs = vec![base_pr()];
        let rows = compute_repo_prs("acme/widgets", &prs);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_merged);
    }

    #[test]
    fn top_risky_files_serialized_sorted() {
        let mut pr = base_pr();
        pr.files.push(file("a.rs", 9.0, 100));
        pr.files.push(file("b.rs", 3.0, 10));
        let rows = compute_repo_prs("acme/widgets", &[pr]);
        let arr = rows[0].top_risky_files.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["file_id"], "a.rs");
    }

    #[test]
    fn labels_round_trip_as_json() {
        let mut pr = base_pr();
        pr.labels_full.push(LabelInfo { name: "bug".into(), color: "ff0000".into() });
        let rows = compute_repo_prs("acme/widgets", &[pr]);
        assert_eq!(rows[0].labels_full[0]["name"], "bug");
    }
}
