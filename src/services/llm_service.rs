use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Per-call knobs for the completion service. `seed` is forwarded when the
/// caller asked for deterministic replay.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("provider response had no message content")]
    EmptyResponse,
}

/// Boundary to the external generation service. Production uses the
/// OpenAI-compatible client below; tests substitute scripted responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &CompletionConfig,
    ) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, client: Client) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &CompletionConfig,
    ) -> Result<String, LlmError> {
        let mut payload = serde_json::json!({
            "model": config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "response_format": { "type": "json_object" },
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
        });
        if let Some(seed) = config.seed {
            payload["seed"] = seed.into();
        }

        let res = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Provider { status, body });
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or(LlmError::EmptyResponse)
    }
}
