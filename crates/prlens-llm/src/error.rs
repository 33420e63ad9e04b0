use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM response missing expected field: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
