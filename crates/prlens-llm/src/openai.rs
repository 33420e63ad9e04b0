//! OpenAI-compatible implementation of `LlmGateway` (spec §6 wire surface:
//! embeddings + chat completions, bearer auth, JSON content-type).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::{LlmError, Result};
use crate::gateway::{prepare_embed_input, LlmGateway};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    base_url: String,
    api_key: String,
    embed_model: String,
    chat_model: String,
    client: Client,
}

impl OpenAiGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            embed_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            client: Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default(),
        }
    }

    pub fn with_models(mut self, embed_model: impl Into<String>, chat_model: impl Into<String>) -> Self {
        self.embed_model = embed_model.into();
        self.chat_model = chat_model.into();
        self
    }

    async fn embed_inner(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedDatum>,
        }
        #[derive(Deserialize)]
        struct EmbedDatum {
            embedding: Vec<f32>,
        }

        let body = json!({ "model": self.embed_model, "input": text });
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let parsed: EmbedResponse = resp.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::MalformedResponse("embeddings.data[0]".to_string()))
    }

    async fn chat_inner(&self, system: &str, user: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }
        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }
        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }

        let body = json!({
            "model": self.chat_model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("choices[0].message.content".to_string()))
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn embed(&self, text: &str, dim: usize) -> Vec<f32> {
        let input = prepare_embed_input(text);
        match self.embed_inner(&input).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "embedding call failed, returning zero vector");
                vec![0.0; dim]
            }
        }
    }

    /// One retry on transient failure, per spec §5 LLM timeout policy.
    async fn chat(&self, system: &str, user: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        match self.chat_inner(system, user, max_tokens, temperature).await {
            Ok(text) => Ok(text),
            Err(first_err) => {
                warn!(error = %first_err, "chat call failed, retrying once");
                self.chat_inner(system, user, max_tokens, temperature).await
            }
        }
    }
}
