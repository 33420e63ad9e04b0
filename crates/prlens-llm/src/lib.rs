//! LLM gateway (C2): embeddings, chat completions, and risk-assessment
//! JSON-mode parsing with fence-strip/extract/fallback recovery.

pub mod error;
pub mod gateway;
pub mod openai;
pub mod risk;

pub use error::{LlmError, Result};
pub use gateway::LlmGateway;
pub use openai::OpenAiGateway;
pub use risk::{RiskAssessment, RiskParseOutcome};
