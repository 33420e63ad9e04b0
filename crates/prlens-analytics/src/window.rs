//! Windowed per-author metrics, rolled up from daily rows (spec §4.6).

use prlens_storage::domain::mart::{AuthorMetricsDaily, AuthorMetricsWindow, ALL_TIME_WINDOW_DAYS, METRIC_WINDOWS};

/// Aggregates `daily` rows (already restricted to a single repo) into one
/// `AuthorMetricsWindow` row per `(author, window)` pair. `today` is the
/// anchor date in epoch seconds; for a window of N days the range is
/// `[today - N + 1, today]`, except the all-time window which spans the
/// full range present in `daily`.
pub fn compute_window_metrics(
    repo_name: &str,
    daily: &[AuthorMetricsDaily],
    today: i64,
) -> Vec<AuthorMetricsWindow> {
    const SECONDS_PER_DAY: i64 = 86_400;

    let authors: Vec<String> = {
        let mut set: Vec<String> = daily.iter().map(|d| d.username.clone()).collect();
        set.sort();
        set.dedup();
        set
    };

    let all_time_start = daily.iter().map(|d| d.day).min().unwrap_or(today);

    let mut rows = Vec::with_capacity(authors.len() * METRIC_WINDOWS.len());

    for author in &authors {
        let author_rows: Vec<&AuthorMetricsDaily> =
            daily.iter().filter(|d| d.username == *author).collect();

        for &window_days in METRIC_WINDOWS {
            let (start_date, end_date) = if window_days == ALL_TIME_WINDOW_DAYS {
                (all_time_start, today)
            } else {
                (today - (window_days as i64 - 1) * SECONDS_PER_DAY, today)
            };

            let in_range: Vec<&&AuthorMetricsDaily> = author_rows
                .iter()
                .filter(|d| d.day >= start_date && d.day <= end_date)
                .collect();

            let prs_submitted: u32 = in_range.iter().map(|d| d.prs_submitted).sum();
            let prs_merged: u32 = in_range.iter().map(|d| d.prs_merged).sum();
            let high_risk_prs: u32 = in_range.iter().map(|d| d.high_risk_prs).sum();
            let lines_changed: u64 = in_range.iter().map(|d| d.lines_changed).sum();

            let high_risk_rate = if prs_merged == 0 {
                0.0
            } else {
                100.0 * high_risk_prs as f64 / prs_merged as f64
            };

            rows.push(AuthorMetricsWindow {
                username: author.clone(),
                repo_name: repo_name.to_string(),
                window_days,
                start_date,
                end_date,
                prs_submitted,
                prs_merged,
                high_risk_prs,
                high_risk_rate,
                lines_changed,
                ownership_low_risk_prs: 0,
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily_row(username: &str, day: i64, prs_submitted: u32, prs_merged: u32, high_risk_prs: u32) -> AuthorMetricsDaily {
        AuthorMetricsDaily {
            username: username.into(),
            repo_name: "acme/widgets".into(),
            day,
            prs_submitted,
            prs_merged,
            lines_changed: 10,
            high_risk_prs,
            features_merged: 0,
        }
    }

    #[test]
    fn window_7_excludes_rows_outside_range() {
        const DAY: i64 = 86_400;
        let today = 100 * DAY;
        let daily = vec![
            daily_row("alice", today, 1, 1, 1),
            daily_row("alice", today - 10 * DAY, 1, 1, 1),
        ];
        let windows = compute_window_metrics("acme/widgets", &daily, today);
        let w7 = windows.iter().find(|w| w.window_days == 7).unwrap();
        assert_eq!(w7.prs_submitted, 1);
        assert_eq!(w7.start_date, today - 6 * DAY);
    }

    #[test]
    fn all_time_spans_full_range() {
        const DAY: i64 = 86_400;
        let today = 100 * DAY;
        let daily = vec![
            daily_row("alice", today, 1, 1, 0),
            daily_row("alice", today - 50 * DAY, 1, 1, 0),
        ];
        let windows = compute_window_metrics("acme/widgets", &daily, today);
        let all_time = windows.iter().find(|w| w.window_days == ALL_TIME_WINDOW_DAYS).unwrap();
        assert_eq!(all_time.prs_submitted, 2);
        assert_eq!(all_time.start_date, today - 50 * DAY);
    }

    #[test]
    fn high_risk_rate_zero_when_no_merges() {
        const DAY: i64 = 86_400;
        let today = 10 * DAY;
        let daily = vec![daily_row("alice", today, 1, 0, 0)];
        let windows = compute_window_metrics("acme/widgets", &daily, today);
        let w7 = windows.iter().find(|w| w.window_days == 7).unwrap();
        assert_eq!(w7.high_risk_rate, 0.0);
    }
}
