//! Domain records for the two vector-store collections (spec §3: VS-PR,
//! VS-File) plus the supporting value types shared across crates.

use serde::{Deserialize, Serialize};

use crate::risk::{is_high_risk, RiskBand};

/// A label attached to a PR, carried verbatim in `labels_full` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Removed => "removed",
            FileStatus::Renamed => "renamed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "added" => FileStatus::Added,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }
}

/// Truncate a string to at most `max_chars` characters on a char boundary
/// (the body/patch truncation rule appears five separate times in spec §3;
/// centralized here so every caller truncates identically).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

/// Coerce a vector to exactly `dim` elements: zero-pad if shorter, truncate
/// if longer (spec §4.4 vector validation / invariant #2 in spec §8).
pub fn coerce_vector_dim(mut v: Vec<f32>, dim: usize) -> Vec<f32> {
    match v.len().cmp(&dim) {
        std::cmp::Ordering::Less => {
            v.resize(dim, 0.0);
            v
        }
        std::cmp::Ordering::Greater => {
            v.truncate(dim);
            v
        }
        std::cmp::Ordering::Equal => v,
    }
}

/// One (PR, file) change record — VS-File (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub repo_id: String,
    pub repo_name: String,
    pub pr_id: String,
    pub pr_number: u64,
    pub file_id: String,
    pub author_id: String,
    pub author_name: String,
    pub merged_at: i64,

    pub file_status: FileStatus,
    pub language: String,
    pub is_binary: bool,
    pub is_config_file: bool,
    pub is_documentation: bool,
    pub is_test_file: bool,
    pub is_source_code: bool,

    pub additions: u32,
    pub deletions: u32,
    pub patch: String,

    pub ai_summary: String,
    pub risk_score_file: f32,
    pub high_risk_flag: bool,
    pub file_risk_reasons: Vec<String>,

    pub vector: Vec<f32>,

    /// Set when content fetch for this file failed (NotFound error kind,
    /// spec §7); the file still carries its diff and is not dropped.
    pub content_error: Option<String>,
}

impl FileRecord {
    pub const PATCH_MAX_CHARS: usize = 32_000;

    pub fn lines_changed(&self) -> u32 {
        self.additions + self.deletions
    }

    /// Net test lines added, used by the PR risk rubric (spec §4.3).
    pub fn net_added(&self) -> i64 {
        self.additions as i64 - self.deletions as i64
    }

    pub fn set_patch(&mut self, patch: impl Into<String>) {
        self.patch = truncate_chars(&patch.into(), Self::PATCH_MAX_CHARS);
    }

    /// Apply a file-level risk assessment, keeping `high_risk_flag`
    /// consistent with the score (same invariant as the PR-level band).
    pub fn set_risk(&mut self, score: f32, reasons: Vec<String>) {
        self.risk_score_file = score.clamp(0.0, 10.0);
        self.high_risk_flag = is_high_risk(self.risk_score_file);
        self.file_risk_reasons = reasons;
    }

    pub fn set_vector(&mut self, raw: Vec<f32>, dim: usize) {
        self.vector = coerce_vector_dim(raw, dim);
    }

    /// Retrieval text composed for embedding (spec §3 VS-File.vector).
    pub fn embedding_text(&self, pr_title: &str) -> String {
        let text = format!(
            "PATH: {}\nPR #{} — {}\nFILE SUMMARY: {}\nDIFF (trimmed): {}",
            self.file_id, self.pr_number, pr_title, self.ai_summary, self.patch
        );
        truncate_chars(&text, 8000)
    }
}

/// One pull request — VS-PR (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    pub repo_id: String,
    pub repo_name: String,
    pub pr_id: String,
    pub pr_number: u64,

    pub author_id: String,
    pub author_name: String,

    pub created_at: i64,
    pub merged_at: i64,
    pub is_merged: bool,
    pub is_closed: bool,
    pub status: String,

    pub title: String,
    pub body: String,
    pub pr_summary: String,

    pub feature: String,
    pub labels_full: Vec<LabelInfo>,

    pub additions: u32,
    pub deletions: u32,
    pub changed_files: u32,

    pub risk_score: f32,
    pub risk_band: RiskBand,
    pub high_risk: bool,
    pub risk_reasons: Vec<String>,

    pub vector: Vec<f32>,

    /// Not persisted as a VS-PR column; carried through the ingest pipeline
    /// and the persisted JSON format (spec §6) so downstream stages (vector
    /// upsert, the projector's `top_risky_files`) don't need a second fetch.
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

impl PrRecord {
    pub const BODY_MAX_CHARS: usize = 8000;

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = truncate_chars(&body.into(), Self::BODY_MAX_CHARS);
    }

    /// Apply a PR-level risk score, keeping band and `high_risk` consistent
    /// (spec §3 invariants, testable property #1).
    pub fn set_risk(&mut self, score: f32, reasons: Vec<String>) {
        self.risk_score = score.clamp(0.0, 10.0);
        self.risk_band = RiskBand::for_score(self.risk_score);
        self.high_risk = is_high_risk(self.risk_score);
        self.risk_reasons = reasons;
    }

    pub fn set_vector(&mut self, raw: Vec<f32>, dim: usize) {
        self.vector = coerce_vector_dim(raw, dim);
    }

    /// `changed_files = len(files in VS-File for that PR)` after ingest.
    pub fn sync_changed_files(&mut self) {
        self.changed_files = self.files.len() as u32;
    }

    /// `is_closed ∧ ¬is_merged ⇒ status = "closed"`, enforced here rather
    /// than trusted from the forge response.
    pub fn sync_status(&mut self) {
        self.status = if self.is_merged {
            "merged".to_string()
        } else if self.is_closed {
            "closed".to_string()
        } else {
            "open".to_string()
        };
    }

    pub fn top_file_paths(&self, n: usize) -> Vec<String> {
        self.files.iter().take(n).map(|f| f.file_id.clone()).collect()
    }

    /// Retrieval text composed for embedding (spec §3 VS-PR.vector).
    pub fn embedding_text(&self) -> String {
        let body_head = truncate_chars(&self.body, 500);
        let top_files = self.top_file_paths(10).join(", ");
        let text = format!(
            "PR #{}: {}\n{}\nSummary: {}\nFiles: {}",
            self.pr_number, self.title, body_head, self.pr_summary, top_files
        );
        truncate_chars(&text, 8000)
    }

    /// Top 5 files by `(risk_score_file, lines_changed)` descending, keeping
    /// only positive scores (spec §4.6 `top_risky_files`).
    pub fn top_risky_files(&self) -> Vec<&FileRecord> {
        let mut positive: Vec<&FileRecord> =
            self.files.iter().filter(|f| f.risk_score_file > 0.0).collect();
        positive.sort_by(|a, b| {
            b.risk_score_file
                .partial_cmp(&a.risk_score_file)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.lines_changed().cmp(&a.lines_changed()))
        });
        positive.truncate(5);
        positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn set_risk_keeps_band_consistent() {
        let mut pr = base_pr();
        pr.set_risk(8.5, vec!["hot path".into()]);
        assert_eq!(pr.risk_band, RiskBand::High);
        assert!(pr.high_risk);
    }

    #[test]
    fn body_truncated_to_8000_chars() {
        let mut pr = base_pr();
        pr.set_body("x".repeat(9000));
        assert_eq!(pr.body.chars().count(), 8000);
    }

    #[test]
    fn vector_padded_and_truncated() {
        let mut pr = base_pr();
        pr.set_vector(vec![1.0, 2.0], 4);
        assert_eq!(pr.vector, vec![1.0, 2.0, 0.0, 0.0]);
        pr.set_vector(vec![1.0, 2.0, 3.0, 4.0, 5.0], 4);
        assert_eq!(pr.vector, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn status_sync_rules() {
        let mut pr = base_pr();
        pr.is_closed = true;
        pr.sync_status();
        assert_eq!(pr.status, "closed");
        pr.is_merged = true;
        pr.sync_status();
        assert_eq!(pr.status, "merged");
    }

    #[test]
    fn changed_files_tracks_file_vec_len() {
        let mut pr = base_pr();
        pr.files.push(FileRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: "pr-1".into(),
            pr_number: 1,
            file_id: "a.rs".into(),
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
            additions: 10,
            deletions: 2,
            patch: String::new(),
            ai_summary: String::new(),
            risk_score_file: 0.0,
            high_risk_flag: false,
            file_risk_reasons: vec![],
            vector: vec![],
            content_error: None,
        });
        pr.sync_changed_files();
        assert_eq!(pr.changed_files, 1);
    }

    #[test]
    fn top_risky_files_sorted_and_positive_only() {
        let mut pr = base_pr();
        let mut f = |id: &str, score: f32, add: u32| FileRecord {
            repo_id: "1".into(),
            repo_name: "acme/widgets".into(),
            pr_id: "pr-1".into(),
            pr_number: 1,
            file_id: id.into(),
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
            additions: add,
            deletions: 0,
            patch: String::new(),
            ai_summary: String::new(),
            risk_score_file: score,
            high_risk_flag: false,
            file_risk_reasons: vec![],
            vector: vec![],
            content_error: None,
        };
        pr.files.push(f("zero.rs", 0.0, 500));
        pr.files.push(f("a.rs", 9.0, 100));
        pr.files.push(f("b.rs", 9.0, 300));
        pr.files.push(f("c.rs", 3.0, 10));
        let top = pr.top_risky_files();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].file_id, "b.rs");
        assert_eq!(top[1].file_id, "a.rs");
        assert_eq!(top[2].file_id, "c.rs");
    }
}
