//! REST client for the code-forge API (spec §4.1, §6). Stateless beyond the
//! auth token; rate-limit state lives in `Cell`s since every call takes
//! `&self`, never `&mut self` — mirroring the pack's GitHub extractor.

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{ForgeError, Result};
use crate::types::{ContentResponse, PrDetail, PrFile, PrSummary, RepoInfo};
use prlens_core::classify::is_binary_path;

const MAX_RETRIES: u32 = 5;
const RATE_LIMIT_PAUSE_THRESHOLD: u32 = 5;
const PAGE_SIZE: u32 = 100;
const MAX_FILES_PER_PR: usize = 100;
const INTER_REQUEST_PAUSE: Duration = Duration::from_millis(100);

/// Forge API client. One instance per ingest job; shared across a single
/// repository's worth of requests (spec §5 shared-resource policy).
#[derive(Debug)]
pub struct ForgeClient {
    base_url: String,
    token: Option<String>,
    client: Client,
    rate_remaining: Cell<u32>,
    rate_reset: Cell<u64>,
}

impl ForgeClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            client: Client::new(),
            rate_remaining: Cell::new(u32::MAX),
            rate_reset: Cell::new(0),
        }
    }

    pub fn github(token: Option<String>) -> Self {
        Self::new("https://api.github.com", token)
    }

    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<RepoInfo> {
        self.api_get(&format!("/repos/{owner}/{repo}")).await
    }

    /// `ListPullRequests` (spec §4.1): paginates at 100/page, ordered by
    /// created descending, stops when a page is short or `max` is reached.
    /// Materialized into a `Vec` rather than a true async-generator stream —
    /// the bound is enforced during accumulation, so callers never pay for
    /// more pages than `max` requires.
    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        max: usize,
    ) -> Result<Vec<PrSummary>> {
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let prs: Vec<PrSummary> = self
                .api_get(&format!(
                    "/repos/{owner}/{repo}/pulls?state={state}&per_page={PAGE_SIZE}&page={page}&sort=created&direction=desc"
                ))
                .await?;
            let page_len = prs.len();
            for pr in prs {
                out.push(pr);
                if out.len() >= max {
                    return Ok(out);
                }
            }
            if page_len < PAGE_SIZE as usize {
                break;
            }
            page += 1;
            tokio::time::sleep(INTER_REQUEST_PAUSE).await;
        }
        Ok(out)
    }

    pub async fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PrDetail> {
        self.api_get(&format!("/repos/{owner}/{repo}/pulls/{number}")).await
    }

    /// `ListFiles` (spec §4.1): capped at 100 entries, dropping the rest
    /// with a warning.
    pub async fn list_files(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<PrFile>> {
        let mut files: Vec<PrFile> = self
            .api_get(&format!("/repos/{owner}/{repo}/pulls/{number}/files?per_page={PAGE_SIZE}"))
            .await?;
        if files.len() > MAX_FILES_PER_PR {
            warn!(
                pr_number = number,
                total = files.len(),
                kept = MAX_FILES_PER_PR,
                "PR exceeds file cap, dropping remainder"
            );
            files.truncate(MAX_FILES_PER_PR);
        }
        Ok(files)
    }

    /// `GetContents` (spec §4.1, binary-content policy). Returns `Ok(None)`
    /// for paths classified binary by extension without making a request.
    pub async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Option<ContentResponse>> {
        if is_binary_path(path) {
            return Ok(None);
        }
        let url = format!("/repos/{owner}/{repo}/contents/{path}?ref={reference}");
        match self.api_get::<ContentResponse>(&url).await {
            Ok(resp) => Ok(Some(resp)),
            Err(ForgeError::Api { status: 404, .. }) => Err(ForgeError::NotFound {
                path: path.to_string(),
                reference: reference.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    // ── HTTP plumbing ───────────────────────────────────────────────

    async fn api_get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.base_url);

        self.wait_for_rate_reset().await;

        let mut delay = Duration::from_secs(1);

        for attempt in 0..=MAX_RETRIES {
            let mut req = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .header("User-Agent", "prlens/0.1");

            if let Some(token) = &self.token {
                req = req.header("Authorization", format!("Bearer {token}"));
            }

            debug!(url = %url, attempt, "forge request");

            let resp = req.send().await?;
            self.update_rate_limit(&resp);

            if resp.status().is_success() {
                tokio::time::sleep(INTER_REQUEST_PAUSE).await;
                return resp.json::<T>().await.map_err(ForgeError::Transport);
            }

            let status = resp.status().as_u16();
            if (status == 403 || status == 429) && attempt < MAX_RETRIES {
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map_or(delay, Duration::from_secs);
                warn!(attempt, status, wait_secs = wait.as_secs(), "rate limited, backing off");
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(Duration::from_secs(60));
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(ForgeError::Api { status, body });
        }

        Err(ForgeError::RateLimitExhausted { reset_at: self.rate_reset.get() })
    }

    fn update_rate_limit(&self, resp: &reqwest::Response) {
        if let Some(remaining) = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        {
            self.rate_remaining.set(remaining);
            if remaining < 10 {
                warn!(remaining, "forge rate limit low");
            }
        }
        if let Some(reset) = resp
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.rate_reset.set(reset);
        }
    }

    async fn wait_for_rate_reset(&self) {
        if self.rate_remaining.get() > RATE_LIMIT_PAUSE_THRESHOLD {
            return;
        }
        let reset_at = self.rate_reset.get();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        if reset_at > now {
            let wait = reset_at - now + 1;
            warn!(remaining = self.rate_remaining.get(), wait_secs = wait, "rate limit low, waiting for reset");
            tokio::time::sleep(Duration::from_secs(wait)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_client_has_unbounded_rate_state() {
        let client = ForgeClient::github(None);
        assert_eq!(client.rate_remaining.get(), u32::MAX);
        assert_eq!(client.rate_reset.get(), 0);
    }
}
