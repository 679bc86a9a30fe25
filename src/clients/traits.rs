use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One chat-style request to a text-completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("cli error: {0}")]
    CliError(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("stdin error: {0}")]
    StdinError(String),
    #[error("cli executable not found")]
    NotFound,
}

/// A text-completion backend (hosted model, local server, or local CLI)
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}
