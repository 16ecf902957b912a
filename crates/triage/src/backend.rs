//! Reasoning backends.
//!
//! A backend is a single request/response text completion. Its output is
//! returned unmodified; interpreting it is the parser's job.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::{BackendConfig, BackendKind};
use crate::error::{TriageError, TriageResult};

/// OpenAI chat completions endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model used when none is configured for the OpenAI backend
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Anthropic messages endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used when none is configured for the Anthropic backend
const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Black-box text completion service.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Send one prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> TriageResult<String>;
}

/// Build the backend selected by configuration, reading its key from the
/// environment.
pub fn build_backend(config: &BackendConfig) -> Arc<dyn ReasoningBackend> {
    match config.provider {
        BackendKind::OpenAi => Arc::new(OpenAiBackend::from_env(config)),
        BackendKind::Anthropic => Arc::new(AnthropicBackend::from_env(config)),
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

/// Error body shared by both providers: `{"error": {"message": ...}}`
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// OpenAI-compatible chat completions backend.
///
/// The endpoint is configurable, so proxies and self-hosted compatible
/// servers work too. Without an API key no Authorization header is sent.
pub struct OpenAiBackend {
    client: Client,
    api_key: Option<String>,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiBackend {
    pub fn new(config: &BackendConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_API_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Create with the key from `OPENAI_API_KEY`.
    pub fn from_env(config: &BackendConfig) -> Self {
        Self::new(config, std::env::var("OPENAI_API_KEY").ok())
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> TriageResult<String> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(url = %self.url, model = %self.model, "Sending classification request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error("OpenAI", status, &body));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

/// Anthropic messages API backend.
pub struct AnthropicBackend {
    client: Client,
    api_key: Option<String>,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicBackend {
    pub fn new(config: &BackendConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            url: config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Create with the key from `ANTHROPIC_API_KEY`.
    pub fn from_env(config: &BackendConfig) -> Self {
        Self::new(config, std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

#[async_trait]
impl ReasoningBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str) -> TriageResult<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| TriageError::backend("ANTHROPIC_API_KEY not set"))?;

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(url = %self.url, model = %self.model, "Sending classification request");
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error("Anthropic", status, &body));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body)?;
        Ok(parsed
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

fn api_error(provider: &str, status: reqwest::StatusCode, body: &str) -> TriageError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) => TriageError::backend(format!("{provider} API error ({status}): {}", err.error.message)),
        Err(_) => TriageError::backend(format!("{provider} API error ({status}): {body}")),
    }
}
