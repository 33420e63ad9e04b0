//! The `LlmGateway` port (C2): embeddings and chat completions, plus the
//! risk-assessment sub-contract built on top of `Chat`.

use async_trait::async_trait;

use crate::error::Result;
use crate::risk::RiskParseOutcome;
use prlens_core::truncate_chars;

const EMBED_MAX_CHARS: usize = 8000;

/// Additive risk rubric embedded verbatim in every risk-scoring prompt
/// (spec §4.2: "enumerates an additive rubric").
pub const RISK_RUBRIC_PROMPT: &str = r#"You are a senior code reviewer scoring the risk of a single file change.
Score risk_score_file on a 0-10 scale by summing the following, then clamping to [0,10]:
  +2 if the change touches authentication, authorization, or secrets handling.
  +2 if the change touches payment, billing, or financial calculations.
  +2 if the change touches database migrations or schema.
  +1 if the change touches concurrency primitives (locks, channels, async tasks).
  +1 if the change removes or weakens existing tests.
  +1 if the diff is larger than 200 changed lines.
  +1 if the change touches error handling or retry logic on a critical path.
  -1 if the change is additive-only test code with no production-path edits.
Respond with JSON only, matching exactly:
{"file_path": "...", "risk_score_file": <number>, "high_risk_flag": <bool>, "reasons": ["..."], "confidence": <number 0-1>}
high_risk_flag must be true iff risk_score_file >= 7.0."#;

#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// `Embed(text) -> float vector of dim D` (spec §4.2). Input truncated
    /// to 8000 characters pre-call; returns the zero vector of dim D on
    /// failure rather than propagating an error.
    async fn embed(&self, text: &str, dim: usize) -> Vec<f32>;

    /// `Chat(system, user, max_tokens, temperature) -> string` (spec §4.2).
    async fn chat(&self, system: &str, user: &str, max_tokens: u32, temperature: f32) -> Result<String>;

    /// Runs the risk-assessment sub-contract: calls `Chat` with the rubric
    /// prompt, then applies the three-step JSON recovery algorithm.
    async fn assess_risk(&self, file_path: &str, diff_context: &str) -> RiskParseOutcome {
        let user = format!("File: {file_path}\n\n{diff_context}");
        match self.chat(RISK_RUBRIC_PROMPT, &user, 400, 0.1).await {
            Ok(raw) => crate::risk::parse_risk_assessment(file_path, &raw),
            Err(e) => RiskParseOutcome::Failed {
                error: e.to_string(),
                assessment: crate::risk::RiskAssessment::zero(file_path, format!("chat call failed: {e}")),
            },
        }
    }
}

/// Truncates embedding input to the contract's 8000-character cap.
pub fn prepare_embed_input(text: &str) -> String {
    truncate_chars(text, EMBED_MAX_CHARS)
}
