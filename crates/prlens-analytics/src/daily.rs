//! Daily per-author metrics (spec §4.6).

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use prlens_core::PrRecord;
use prlens_storage::domain::AuthorMetricsDaily;

fn epoch_to_date(epoch: i64) -> NaiveDate {
    chrono::DateTime::from_timestamp(epoch, 0).map(|dt| dt.date_naive()).unwrap_or_default()
}

fn date_to_epoch(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or(0)
}

/// Computes one row per `(author, day)` across `[start_date, end_date]`,
/// pre-populated with zero rows so the UI can plot a continuous series.
pub fn compute_daily_metrics(
    repo_name: &str,
    prs: &[PrRecord],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<AuthorMetricsDaily> {
    let authors: Vec<String> = {
        let mut set: Vec<String> = prs.iter().map(|p| p.author_name.clone()).collect();
        set.sort();
        set.dedup();
        set
    };

    let mut table: BTreeMap<(String, NaiveDate), AuthorMetricsDaily> = BTreeMap::new();

    let mut day = start_date;
    while day <= end_date {
        for author in &authors {
            table.insert(
                (author.clone(), day),
                AuthorMetricsDaily {
                    username: author.clone(),
                    repo_name: repo_name.to_string(),
                    day: date_to_epoch(day),
                    prs_submitted: 0,
                    prs_merged: 0,
                    lines_changed: 0,
                    high_risk_prs: 0,
                    features_merged: 0,
                },
            );
        }
        day = day.checked_add_days(Days::new(1)).unwrap_or(end_date.succ_opt().unwrap_or(day));
        if day == start_date {
            break;
        }
    }

    for pr in prs {
        let submitted_day = epoch_to_date(pr.created_at);
        if submitted_day >= start_date && submitted_day <= end_date {
            if let Some(row) = table.get_mut(&(pr.author_name.clone(), submitted_day)) {
                row.prs_submitted += 1;
                row.lines_changed += (pr.additions + pr.deletions) as u64;
                if pr.high_risk {
                    row.high_risk_prs += 1;
                }
            }
        }

        if pr.is_merged {
            let merged_day = epoch_to_date(pr.merged_at);
            if merged_day >= start_date && merged_day <= end_date {
                if let Some(row) = table.get_mut(&(pr.author_name.clone(), merged_day)) {
                    row.prs_merged += 1;
                    if !pr.feature.is_empty() {
                        row.features_merged += 1;
                    }
                }
            }
        }
    }

    table.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pr(author: &str, created: NaiveDate, merged: Option<NaiveDate>, high_risk: bool, feature: &str) -> PrRecord {
        PrRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: format!("{author}-{created}"),
            pr_number: 1,
            author_id: author.into(),
            author_name: author.into(),
            created_at: date_to_epoch(created),
            merged_at: merged.map(date_to_epoch).unwrap_or(0),
            is_merged: merged.is_some(),
            is_closed: false,
            status: "open".into(),
            title: String::new(),
            body: String::new(),
            pr_summary: String::new(),
            feature: feature.to_string(),
            labels_full: vec![],
            additions: 10,
            deletions: 5,
            changed_files: 1,
            risk_score: if high_risk { 8.0 } else { 1.0 },
            risk_band: prlens_core::RiskBand::Low,
            high_risk,
            risk_reasons: vec![],
            vector: vec![],
            files: vec![],
        }
    }

    #[test]
    fn zero_rows_prepopulated_across_range() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let prs = vec![pr("alice", start, None, false, "")];
        let rows = compute_daily_metrics("acme/widgets", &prs, start, end);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| r.prs_submitted == 0));
    }

    #[test]
    fn counts_submission_and_merge_separately() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mid = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let prs = vec![pr("alice", start, Some(mid), true, "Add widget")];
        let rows = compute_daily_metrics("acme/widgets", &prs, start, end);

        let submit_row = rows.iter().find(|r| r.day == date_to_epoch(start)).unwrap();
        assert_eq!(submit_row.prs_submitted, 1);
        assert_eq!(submit_row.high_risk_prs, 1);
        assert_eq!(submit_row.prs_merged, 0);

        let merge_row = rows.iter().find(|r| r.day == date_to_epoch(mid)).unwrap();
        assert_eq!(merge_row.prs_merged, 1);
        assert_eq!(merge_row.features_merged, 1);
    }
}
