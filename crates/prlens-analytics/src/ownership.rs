//! Per-file author ownership, rolled up per window (spec §4.6): for merged
//! PRs whose `merged_at` falls inside the window, accumulate lines changed
//! per `(author, file)` and express each author's share of that file's
//! total churn in the window.

use std::collections::BTreeMap;

use prlens_core::PrRecord;
use prlens_storage::domain::mart::{AuthorFileOwnership, ALL_TIME_WINDOW_DAYS, METRIC_WINDOWS};

pub fn compute_file_ownership(
    repo_name: &str,
    prs: &[PrRecord],
    today: i64,
) -> Vec<AuthorFileOwnership> {
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

        let in_window: Vec<&&PrRecord> = merged
            .iter()
            .filter(|p| p.merged_at >= start_date && p.merged_at <= end_date)
            .collect();

        // (file_id, author_name) -> (lines, last_touched)
        let mut by_author: BTreeMap<(String, String), (u64, i64)> = BTreeMap::new();
        // file_id -> total lines
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();

        for pr in &in_window {
            for file in &pr.files {
                let lines = file.lines_changed() as u64;
                *totals.entry(file.file_id.clone()).or_insert(0) += lines;
                let entry = by_author
                    .entry((file.file_id.clone(), pr.author_name.clone()))
                    .or_insert((0, pr.merged_at));
                entry.0 += lines;
                entry.1 = entry.1.max(pr.merged_at);
            }
        }

        for ((file_id, username), (author_lines, last_touched)) in by_author {
            let total_lines = totals.get(&file_id).copied().unwrap_or(0);
            let ownership_pct = if total_lines == 0 {
                0.0
            } else {
                100.0 * author_lines as f64 / total_lines as f64
            };

            rows.push(AuthorFileOwnership {
                username,
                repo_name: repo_name.to_string(),
                window_days,
                start_date,
                end_date,
                file_id: file_id.clone(),
                file_path: file_id,
                ownership_pct,
                author_lines,
                total_lines,
                last_touched,
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlens_core::{FileRecord, FileStatus, RiskBand};

    fn file(file_id: &str, additions: u32) -> FileRecord {
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
            risk_score_file: 0.0,
            high_risk_flag: false,
            file_risk_reasons: vec![],
            vector: vec![],
            content_error: None,
        }
    }

    fn pr(author: &str, merged_at: i64, files: Vec<FileRecord>) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: format!("{author}-{merged_at}"),
            pr_number: 1,
            author_id: author.into(),
            author_name: author.into(),
            created_at: merged_at,
            merged_at,
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
            changed_files: files.len() as u32,
            risk_score: 0.0,
            risk_band: RiskBand::Low,
            high_risk: false,
            risk_reasons: vec![],
            vector: vec![],
            files,
        }
    }

    #[test]
    fn splits_ownership_proportionally() {
        const DAY: i64 = 86_400;
        let today = 10 * DAY;
        let prs = vec![
            pr("alice", today, vec![file("a.rs", 90)]),
            pr("bob", today, vec![file("a.rs", 10)]),
        ];
        let rows = compute_file_ownership("acme/widgets", &prs, today);
        let w7: Vec<&AuthorFileOwnership> = rows.iter().filter(|r| r.window_days == 7).collect();
        let alice = w7.iter().find(|r| r.username == "alice").unwrap();
        let bob = w7.iter().find(|r| r.username == "bob").unwrap();
        assert_eq!(alice.ownership_pct, 90.0);
        assert_eq!(bob.ownership_pct, 10.0);
        assert_eq!(alice.total_lines, 100);
    }

    #[test]
    fn excludes_prs_outside_window() {
        const DAY: i64 = 86_400;
        let today = 100 * DAY;
        let prs = vec![pr("alice", today - 50 * DAY, vec![file("a.rs", 10)])];
        let rows = compute_file_ownership("acme/widgets", &prs, today);
        assert!(rows.iter().filter(|r| r.window_days == 7).count() == 0);
        assert!(rows.iter().any(|r| r.window_days == ALL_TIME_WINDOW_DAYS));
    }
}
