//! OpenAI-compatible chat completions client (OpenAI, vLLM, Ollama, TGI)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::traits::{AgentError, CompletionBackend, CompletionRequest};

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 120_000;

pub struct ChatCompletionsClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
    retries: u32,
    retry_delay_ms: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatCompletionsClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, AgentError> {
        Self::with_timeout_ms(base_url, api_key, DEFAULT_HTTP_TIMEOUT_MS)
    }

    pub fn with_timeout_ms(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AgentError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            timeout_ms,
            retries: 3,
            retry_delay_ms: 200,
        })
    }

    pub fn with_retries(mut self, retries: u32, retry_delay_ms: u64) -> Self {
        self.retries = retries.max(1);
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<String, AgentError> {
        let mut req = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                AgentError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(AgentError::HttpStatus {
                status: status.as_u16(),
                body: truncate_snippet(&body_text, 500),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::ParseError(e.to_string()))?;
        extract_content(parsed)
    }
}

fn extract_content(parsed: ChatResponse) -> Result<String, AgentError> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .ok_or_else(|| AgentError::ParseError("response carried no message content".to_string()))
}

/// 4xx other than 408/429 will not get better on retry. A timed-out attempt has used
/// the whole per-call budget, so it is returned as is.
fn is_retryable(err: &AgentError) -> bool {
    match err {
        AgentError::HttpStatus { status, .. } => {
            *status >= 500 || *status == 408 || *status == 429
        }
        AgentError::Transport(_) => true,
        _ => false,
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        debug!(
            "Chat completion (model={}, chars={})",
            request.model,
            request.user.len()
        );

        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        };

        // Retry with simple exponential backoff
        let mut last_err: Option<AgentError> = None;
        for i in 0..self.retries {
            match self.send_once(&body).await {
                Ok(content) => return Ok(content),
                Err(e) if is_retryable(&e) && i + 1 < self.retries => {
                    debug!("Chat completion attempt {} failed: {}", i + 1, e);
                    last_err = Some(e);
                    let delay_ms = self.retry_delay_ms * (1u64 << i.min(6));
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| AgentError::Transport("Unknown chat completion error".to_string())))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

pub(crate) fn truncate_snippet(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let cut = (0..=max).rev().find(|&i| input.is_char_boundary(i)).unwrap_or(0);
    format!("{}...", &input[..cut])
}
