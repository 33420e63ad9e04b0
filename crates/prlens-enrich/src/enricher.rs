//! Per-PR enrichment orchestration (C3): classify, fetch content for merged
//! PRs, summarize and risk-score each file under bounded concurrency,
//! aggregate PR risk, classify feature (spec §4.3).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use prlens_core::{classify::classify_file, FileRecord, FileStatus, PrRecord};
use prlens_forge::types::{PrDetail, PrFile};
use prlens_forge::ForgeClient;
use prlens_llm::{LlmGateway, RiskParseOutcome};

use crate::feature::classify_feature;
use crate::risk_aggregate::{aggregate_pr_risk, FileRiskInput};

/// Extensions whose risk assessment is skipped even when non-binary and
/// under the size cap — generated/lockfile-style content the rubric can't
/// usefully evaluate (spec §4.3: "problematic extensions").
const PROBLEMATIC_EXTENSIONS: &[&str] = &["lock", "svg", "map", "snap"];

const MAX_RISK_CONTENT_BYTES: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub workers: usize,
    pub embed_dim: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        EnrichConfig { workers: 4, embed_dim: 1536 }
    }
}

pub struct PrEnricher {
    forge: Arc<ForgeClient>,
    llm: Arc<dyn LlmGateway>,
    owner: String,
    repo: String,
    repo_id: String,
    config: EnrichConfig,
}

impl PrEnricher {
    pub fn new(
        forge: Arc<ForgeClient>,
        llm: Arc<dyn LlmGateway>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        repo_id: impl Into<String>,
        config: EnrichConfig,
    ) -> Self {
        Self { forge, llm, owner: owner.into(), repo: repo.into(), repo_id: repo_id.into(), config }
    }

    /// Enriches one PR end to end. Returns `None` on a fatal per-PR error
    /// (forge 404 etc.) — the caller logs and skips (spec §4.3 failure
    /// policy, error kind IngestSkip).
    pub async fn enrich_pr(&self, number: u64) -> Option<PrRecord> {
        let detail = match self.forge.get_pull_request(&self.owner, &self.repo, number).await {
            Ok(d) => d,
            Err(e) => {
                warn!(pr_number = number, error = %e, "failed to fetch PR detail, skipping");
                return None;
            }
        };

        let raw_files = match self.forge.list_files(&self.owner, &self.repo, number).await {
            Ok(f) => f,
            Err(e) => {
                warn!(pr_number = number, error = %e, "failed to fetch PR files, skipping");
                return None;
            }
        };

        let is_merged = detail.merged.unwrap_or(detail.state == "closed" && detail.merged_at.is_some());

        let created_at = parse_epoch(Some(&detail.created_at)).unwrap_or(0);
        let merged_at = match (&detail.merged_at, is_merged) {
            (Some(ts), _) => parse_epoch(Some(ts)).unwrap_or(created_at),
            (None, true) => created_at,
            (None, false) => 0,
        };
        let merged_at_backfilled = is_merged && detail.merged_at.is_none();

        let sem = Arc::new(Semaphore::new(self.config.workers));

        let author_id = detail.user.as_ref().and_then(|u| u.id).map(|id| id.to_string()).unwrap_or_default();
        let author_name = detail.user.as_ref().map(|u| u.login.clone()).unwrap_or_default();

        let file_futures = raw_files.into_iter().map(|pf| {
            let sem = sem.clone();
            let forge = self.forge.clone();
            let llm = self.llm.clone();
            let owner = self.owner.clone();
            let repo = self.repo.clone();
            let repo_id = self.repo_id.clone();
            let repo_name = format!("{}/{}", self.owner, self.repo);
            let pr_number = number;
            let embed_dim = self.config.embed_dim;
            let pr_title = detail.title.clone();
            let author_id = author_id.clone();
            let author_name = author_name.clone();
            async move {
                let _permit = sem.acquire().await.expect("semaphore not closed");
                enrich_file(
                    &forge, &llm, &owner, &repo, &repo_id, &repo_name, pr_number, &pr_title, &author_id,
                    &author_name, merged_at, is_merged, embed_dim, pf,
                )
                .await
            }
        });

        let files: Vec<FileRecord> = futures::future::join_all(file_futures).await;

        let pr_summary = self.generate_pr_summary(&detail, &files, is_merged).await;

        let all_files_documentation = !files.is_empty() && files.iter().all(|f| f.is_documentation);
        let labels: Vec<_> = detail.labels.iter().cloned().map(prlens_core::LabelInfo::from).collect();
        let feature = classify_feature(&detail.title, &labels, is_merged, all_files_documentation);

        let mut pr = PrRecord {
            repo_id: self.repo_id.clone(),
            repo_name: format!("{}/{}", self.owner, self.repo),
            pr_id: format!("{}/{}#{}", self.owner, self.repo, number),
            pr_number: number,
            author_id: author_id.clone(),
            author_name: author_name.clone(),
            created_at,
            merged_at,
            is_merged,
            is_closed: detail.state == "closed",
            status: String::new(),
            title: detail.title.clone(),
            body: String::new(),
            pr_summary,
            feature,
            labels_full: labels,
            additions: detail.additions,
            deletions: detail.deletions,
            changed_files: detail.changed_files,
            risk_score: 0.0,
            risk_band: prlens_core::RiskBand::Low,
            high_risk: false,
            risk_reasons: vec![],
            vector: vec![],
            files,
        };
        pr.sync_status();
        pr.set_body(detail.body.clone().unwrap_or_default());
        pr.sync_changed_files();

        let inputs: Vec<FileRiskInput> = pr.files.iter().map(FileRiskInput::from).collect();
        let aggregated = aggregate_pr_risk(&inputs);
        let mut reasons = aggregated.reasons;
        if merged_at_backfilled {
            reasons.push("merged_at backfilled from created_at".to_string());
        }
        pr.set_risk(aggregated.score, reasons);

        let embed_text = pr.embedding_text();
        let vector = self.llm.embed(&embed_text, self.config.embed_dim).await;
        pr.set_vector(vector, self.config.embed_dim);

        info!(pr_number = number, risk_score = pr.risk_score, files = pr.files.len(), "enriched PR");
        Some(pr)
    }

    async fn generate_pr_summary(&self, detail: &PrDetail, files: &[FileRecord], is_merged: bool) -> String {
        let system = "Summarize this pull request in 1-2 sentences for an engineering changelog.";
        let user = if is_merged && !files.is_empty() {
            let summaries: Vec<String> =
                files.iter().take(20).map(|f| format!("- {}: {}", f.file_id, f.ai_summary)).collect();
            format!("PR #{}: {}\n\nFile summaries:\n{}", detail.number, detail.title, summaries.join("\n"))
        } else {
            format!(
                "PR #{}: {}\n\n{}",
                detail.number,
                detail.title,
                detail.body.clone().unwrap_or_default()
            )
        };
        match self.llm.chat(system, &user, 150, 0.3).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(pr_number = detail.number, error = %e, "PR summary generation failed");
                String::new()
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn enrich_file(
    forge: &ForgeClient,
    llm: &Arc<dyn LlmGateway>,
    owner: &str,
    repo: &str,
    repo_id: &str,
    repo_name: &str,
    pr_number: u64,
    pr_title: &str,
    author_id: &str,
    author_name: &str,
    merged_at: i64,
    is_merged: bool,
    embed_dim: usize,
    pf: PrFile,
) -> FileRecord {
    let classification = classify_file(&pf.filename);
    let file_status = pf.file_status();

    let mut content_error = None;
    let mut post_content = String::new();

    if is_merged && !classification.is_binary {
        let needs_pre = matches!(file_status, FileStatus::Removed | FileStatus::Modified | FileStatus::Renamed);
        let needs_post = matches!(file_status, FileStatus::Added | FileStatus::Modified | FileStatus::Renamed);

        if needs_post {
            match forge.get_contents(owner, repo, &pf.filename, "HEAD").await {
                Ok(Some(c)) => post_content = c.decode_text(),
                Ok(None) => {}
                Err(e) => content_error = Some(e.to_string()),
            }
        }
        // Pre-content is fetched only to enrich the prompt context; only the
        // post-content is retained in the record (spec §4.3 step 2).
        if needs_pre && content_error.is_none() {
            let _ = forge.get_contents(owner, repo, &pf.filename, "HEAD~1").await;
        }
    }

    let mut file = FileRecord {
        repo_id: repo_id.to_string(),
        repo_name: repo_name.to_string(),
        pr_id: format!("{repo_name}#{pr_number}"),
        pr_number,
        file_id: pf.filename.clone(),
        author_id: author_id.to_string(),
        author_name: author_name.to_string(),
        merged_at,
        file_status,
        language: classification.language,
        is_binary: classification.is_binary,
        is_config_file: classification.is_config_file,
        is_documentation: classification.is_documentation,
        is_test_file: classification.is_test_file,
        is_source_code: classification.is_source_code,
        additions: pf.additions,
        deletions: pf.deletions,
        patch: String::new(),
        ai_summary: String::new(),
        risk_score_file: 0.0,
        high_risk_flag: false,
        file_risk_reasons: vec![],
        vector: vec![],
        content_error,
    };
    file.set_patch(pf.patch);

    if file.is_binary {
        file.ai_summary = "binary file, not analyzed".to_string();
    } else {
        let diff_context = format!("Diff:\n{}\n\nContent (post-change):\n{}", file.patch, post_content);
        let summary_system = "Summarize this file change in one sentence for a code reviewer.";
        file.ai_summary = match llm.chat(summary_system, &diff_context, 120, 0.3).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(file = %file.file_id, error = %e, "file summary generation failed");
                String::new()
            }
        };

        let skip_risk = post_content.len() as u64 > MAX_RISK_CONTENT_BYTES
            || extension_is_problematic(&file.file_id);

        if skip_risk {
            file.set_risk(0.0, vec!["skipped: oversized or generated file".to_string()]);
        } else {
            match llm.assess_risk(&file.file_id, &diff_context).await {
                RiskParseOutcome::Ok(a) | RiskParseOutcome::Recovered { assessment: a, .. } => {
                    file.set_risk(a.risk_score_file, a.reasons);
                }
                RiskParseOutcome::Failed { assessment, error } => {
                    warn!(file = %file.file_id, error = %error, "risk assessment parse failed");
                    file.set_risk(assessment.risk_score_file, assessment.reasons);
                }
            }
        }
    }

    let text = file.embedding_text(pr_title);
    let vector = llm.embed(&text, embed_dim).await;
    file.set_vector(vector, embed_dim);

    file
}

fn extension_is_problematic(path: &str) -> bool {
    path.rsplit('.').next().map(|ext| PROBLEMATIC_EXTENSIONS.contains(&ext)).unwrap_or(false)
}

fn parse_epoch(ts: Option<&str>) -> Option<i64> {
    ts.and_then(|s| DateTime::parse_from_rfc3339(s).ok()).map(|dt| dt.with_timezone(&Utc).timestamp())
}
