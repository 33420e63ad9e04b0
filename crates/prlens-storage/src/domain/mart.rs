//! Relational mart row types (spec §3 "Relational mart tables").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRow {
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// PK `(username, repo_name, day)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorMetricsDaily {
    pub username: String,
    pub repo_name: String,
    pub day: i64,
    pub prs_submitted: u32,
    pub prs_merged: u32,
    pub lines_changed: u64,
    pub high_risk_prs: u32,
    pub features_merged: u32,
}

/// PK `(username, repo_name, window_days, start_date, end_date)`.
/// `window_days ∈ {7,15,30,60,90,999}`, 999 denotes "all time".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorMetricsWindow {
    pub username: String,
    pub repo_name: String,
    pub window_days: u32,
    pub start_date: i64,
    pub end_date: i64,
    pub prs_submitted: u32,
    pub prs_merged: u32,
    pub high_risk_prs: u32,
    pub high_risk_rate: f64,
    pub lines_changed: u64,
    pub ownership_low_risk_prs: u32,
}

pub const ALL_TIME_WINDOW_DAYS: u32 = 999;
pub const METRIC_WINDOWS: &[u32] = &[7, 15, 30, 60, 90, ALL_TIME_WINDOW_DAYS];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorFileOwnership {
    pub username: String,
    pub repo_name: String,
    pub window_days: u32,
    pub start_date: i64,
    pub end_date: i64,
    pub file_id: String,
    pub file_path: String,
    pub ownership_pct: f64,
    pub author_lines: u64,
    pub total_lines: u64,
    pub last_touched: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorPrsWindow {
    pub username: String,
    pub repo_name: String,
    pub window_days: u32,
    pub start_date: i64,
    pub end_date: i64,
    pub pr_number: u64,
    pub title: String,
    pub pr_summary: String,
    pub merged_at: i64,
    pub risk_score: f32,
    pub high_risk: bool,
    pub feature_rule: String,
    pub feature_confidence: f32,
}

/// PK `(repo_name, pr_number)`. `top_risky_files` is a JSON array of
/// `{file_id, risk_score_file, lines_changed}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoPr {
    pub repo_name: String,
    pub pr_number: u64,
    pub title: String,
    pub pr_summary: String,
    pub author: String,
    pub created_at: i64,
    pub merged_at: i64,
    pub is_merged: bool,
    pub additions: u32,
    pub deletions: u32,
    pub changed_files: u32,
    pub labels_full: serde_json::Value,
    pub feature_rule: String,
    pub feature_confidence: f32,
    pub risk_score: f32,
    pub high_risk: bool,
    pub risk_reasons: Vec<String>,
    pub top_risky_files: serde_json::Value,
}
