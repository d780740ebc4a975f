//! Chat-completions client for an OpenAI-compatible HTTP endpoint.

use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// One failed chat call. Every variant is worth retrying.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A text-in, text-out chat backend.
pub trait ChatModel {
    fn name(&self) -> &str;

    fn chat(&self, system_prompt: Option<&str>, user_prompt: &str, max_tokens: u32)
        -> Result<String, ChatError>;
}

#[derive(Clone, Debug)]
pub struct RemoteModelConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub insecure: bool,
}

impl RemoteModelConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            insecure: false,
        }
    }
}

pub struct RemoteChatModel {
    cfg: RemoteModelConfig,
    client: Client,
}

impl RemoteChatModel {
    pub fn new(cfg: RemoteModelConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .danger_accept_invalid_certs(cfg.insecure)
            .build()
            .context("build http client")?;
        Ok(Self { cfg, client })
    }

    pub fn max_tokens(&self) -> u32 {
        self.cfg.max_tokens
    }
}

impl ChatModel for RemoteChatModel {
    fn name(&self) -> &str {
        &self.cfg.model
    }

    fn chat(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let body = build_request(&self.cfg.model, system_prompt, user_prompt, max_tokens, self.cfg.temperature);
        debug!(url = %self.cfg.url, model = %self.cfg.model, prompt_chars = user_prompt.chars().count(), "chat request");

        let resp = self
            .client
            .post(&self.cfg.url)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| ChatError::Transport(format!("read body: {e}")))?;
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: truncate_chars(&text, 300),
            });
        }
        parse_completion(&text)
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

pub fn build_request<'a>(
    model: &'a str,
    system_prompt: Option<&'a str>,
    user_prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
) -> ChatCompletionRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if let Some(s) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage {
            role: "system",
            content: s,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: user_prompt,
    });
    ChatCompletionRequest {
        model,
        messages,
        temperature,
        max_tokens,
        stream: false,
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts `choices[0].message.content` from a response body.
pub fn parse_completion(body: &str) -> Result<String, ChatError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::Malformed(format!("{e}: {}", truncate_chars(body, 300))))?;
    let choices = parsed
        .choices
        .ok_or_else(|| ChatError::Malformed(format!("no choices: {}", truncate_chars(body, 300))))?;
    let first = choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::Malformed("empty choices".to_string()))?;
    first
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ChatError::Malformed("choice without message content".to_string()))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
