//! Local CLI backend (e.g. `ollama run <model>`): one-shot, prompt on stdin

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::clients::chat::truncate_snippet;
use crate::clients::traits::{AgentError, CompletionBackend, CompletionRequest};

#[derive(Debug, Clone)]
pub struct CliClient {
    command: String,
    args: Vec<String>,
    timeout_ms: u64,
}

impl CliClient {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout_ms: 120_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Arguments with `{model}` substituted
    pub fn resolved_args(&self, model: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace("{model}", model))
            .collect()
    }

    pub async fn execute(&self, model: &str, prompt: &str) -> Result<String, AgentError> {
        let mut cmd = Command::new(&self.command);
        cmd.kill_on_drop(true)
            .args(self.resolved_args(model))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(map_spawn_err)?;
        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading stdin surfaces through its exit status
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(AgentError::StdinError(e.to_string()));
            }
            // Dropping stdin closes the pipe so the child sees EOF
        }

        let timeout = std::time::Duration::from_millis(self.timeout_ms);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| AgentError::Timeout {
                timeout_ms: self.timeout_ms,
            })?
            .map_err(|e| AgentError::CliError(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(AgentError::CliError(format!(
                "{} exit {}: {}",
                self.command,
                output.status,
                truncate_snippet(stderr.trim(), 500)
            )));
        }

        let response = stdout.trim().to_string();
        if response.is_empty() {
            return Err(AgentError::CliError(format!(
                "{} produced no stdout: {}",
                self.command,
                truncate_snippet(stderr.trim(), 500)
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for CliClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        // CLI runners take a single prompt; the system message leads it
        let prompt = format!("{}\n\n{}", request.system, request.user);
        self.execute(&request.model, &prompt).await
    }

    fn name(&self) -> &str {
        "cli"
    }
}

fn map_spawn_err(err: std::io::Error) -> AgentError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AgentError::NotFound
    } else {
        AgentError::CliError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_model_placeholder() {
        let client = CliClient::new("ollama", vec!["run".into(), "{model}".into()]);
        assert_eq!(client.resolved_args("llama3.1"), vec!["run", "llama3.1"]);
    }

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let client = CliClient::new("definitely-not-a-real-binary-4c1e", vec![]);
        let err = client.execute("m", "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::NotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echoes_stdin_through_cat() {
        let client = CliClient::new("cat", vec![]).with_timeout_ms(5_000);
        let out = client.execute("ignored", "  simplified text \n").await.unwrap();
        assert_eq!(out, "simplified text");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let client = CliClient::new("false", vec![]).with_timeout_ms(5_000);
        let err = client.execute("m", "x").await.unwrap_err();
        assert!(matches!(err, AgentError::CliError(_)));
    }
}
