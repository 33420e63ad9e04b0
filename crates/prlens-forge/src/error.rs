//! Error kinds for the forge client (spec §7: TransientRemote, Quota/RateLimit,
//! NotFound — the only three that can originate at this layer; Parse and
//! SchemaViolation belong to the LLM gateway and storage adapters).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("forge request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("forge API {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rate limit exhausted, reset at {reset_at}")]
    RateLimitExhausted { reset_at: u64 },

    #[error("content not found: {path} @ {reference}")]
    NotFound { path: String, reference: String },

    #[error("failed to parse forge response: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;
