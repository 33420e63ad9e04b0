//! Wire types returned by the forge client, already shaped for consumption
//! by the enrichment engine (spec §3, §4.1).

use serde::Deserialize;

use prlens_core::{FileStatus, LabelInfo};

#[derive(Debug, Clone, Deserialize)]
pub struct GhUser {
    pub login: String,
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl From<GhLabel> for LabelInfo {
    fn from(l: GhLabel) -> Self {
        LabelInfo { name: l.name, color: l.color }
    }
}

/// A PR summary as returned by the list endpoint (spec §4.1 `ListPullRequests`).
#[derive(Debug, Clone, Deserialize)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    pub user: Option<GhUser>,
    pub labels: Vec<GhLabel>,
    pub created_at: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,
}

/// PR detail with counts and mergeability (spec §4.1 `GetPullRequest`).
#[derive(Debug, Clone, Deserialize)]
pub struct PrDetail {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    pub user: Option<GhUser>,
    pub labels: Vec<GhLabel>,
    pub created_at: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,
    pub merged: Option<bool>,
    pub mergeable: Option<bool>,
    pub comments: u32,
    pub commits: u32,
    pub additions: u32,
    pub deletions: u32,
    pub changed_files: u32,
}

/// A single changed file as returned by `ListFiles` (spec §4.1).
#[derive(Debug, Clone, Deserialize)]
pub struct PrFile {
    pub filename: String,
    pub status: String,
    pub additions: u32,
    pub deletions: u32,
    #[serde(default)]
    pub patch: String,
}

impl PrFile {
    pub fn file_status(&self) -> FileStatus {
        FileStatus::from_str(&self.status)
    }
}

/// `GetContents` response (spec §4.1): base64 content, or a distinguished
/// not-found handled at the error layer rather than encoded here.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse {
    pub content: String,
    pub encoding: String,
    pub sha: String,
    pub size: u64,
}

impl ContentResponse {
    /// Decode base64 content to a UTF-8 string, lossily for non-UTF8 blobs.
    pub fn decode_text(&self) -> String {
        if self.encoding != "base64" {
            return self.content.clone();
        }
        let cleaned: String = self.content.chars().filter(|c| !c.is_whitespace()).collect();
        match base64_decode(&cleaned) {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => String::new(),
        }
    }
}

/// `GetRepo` response (spec §4.1).
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub id: u64,
    pub full_name: String,
}

/// Minimal base64 decoder (standard alphabet, no external dependency needed
/// for this single call site).
fn base64_decode(input: &str) -> Option<Vec<u8>> {
    fn val(b: u8) -> Option<u8> {
        match b {
            b'A'..=b'Z' => Some(b - b'A'),
            b'a'..=b'z' => Some(b - b'a' + 26),
            b'0'..=b'9' => Some(b - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    let mut chunk = [0u8; 4];
    let mut chunk_len = 0;
    for &b in bytes {
        if b == b'=' {
            break;
        }
        let v = val(b)?;
        chunk[chunk_len] = v;
        chunk_len += 1;
        if chunk_len == 4 {
            out.push((chunk[0] << 2) | (chunk[1] >> 4));
            out.push((chunk[1] << 4) | (chunk[2] >> 2));
            out.push((chunk[2] << 6) | chunk[3]);
            chunk_len = 0;
        }
    }
    if chunk_len >= 2 {
        out.push((chunk[0] << 2) | (chunk[1] >> 4));
    }
    if chunk_len >= 3 {
        out.push((chunk[1] << 4) | (chunk[2] >> 2));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_simple_base64() {
        let resp = ContentResponse {
            content: "aGVsbG8=".to_string(),
            encoding: "base64".to_string(),
            sha: "x".to_string(),
            size: 5,
        };
        assert_eq!(resp.decode_text(), "hello");
    }
}
