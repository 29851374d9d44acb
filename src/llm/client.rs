//! Minimal OpenAI-compatible chat completions client.

use super::ChatModel;
use crate::controller::ResearchConfig;
use crate::error::CollaboratorError;
use crate::steps::StepResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat client for OpenAI-compatible endpoints (OpenAI, Groq, Ollama, ...).
#[derive(Clone)]
pub struct OpenAiChat {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiChat {
    /// Create a client for `model` at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Build a client from the research config and an optional API key.
    pub fn from_config(config: &ResearchConfig, api_key: Option<String>) -> Self {
        let mut client = Self::new(&config.base_url, &config.model);
        client.api_key = api_key;
        client.temperature = config.temperature;
        client.max_tokens = config.max_tokens;
        client
    }

    /// Set the bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn send(&self, system: &str, user: &str) -> StepResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut builder = self
            .agent
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let mut response = builder.send_json(&request)?;
        let data: ChatResponse = response.body_mut().read_json()?;
        first_content(data)
    }
}

fn first_content(data: ChatResponse) -> StepResult<String> {
    data.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| CollaboratorError::InvalidResponse("no message in completion".to_string()))
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> StepResult<String> {
        debug!(model = %self.model, prompt_chars = user.len(), "chat completion request");
        let client = self.clone();
        let system = system.to_string();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || client.send(&system, &user)).await?
    }
}
