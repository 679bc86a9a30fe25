pub mod chat;
pub mod cli;
pub mod traits;

use std::sync::Arc;

pub use chat::ChatCompletionsClient;
pub use cli::CliClient;
pub use traits::{AgentError, CompletionBackend, CompletionRequest};

use crate::config::{Config, ProviderKind};
use crate::error::{AnnotatorError, Result};

/// Build the completion backend for a model-backed provider
pub fn create_backend(
    config: &Config,
    provider: ProviderKind,
    timeout_ms: u64,
) -> Result<Arc<dyn CompletionBackend>> {
    match provider {
        ProviderKind::OpenAi => {
            let client = ChatCompletionsClient::with_timeout_ms(
                config.llm.base_url.clone(),
                config.runtime.api_key.clone(),
                timeout_ms,
            )?
            .with_retries(config.llm.retries, config.llm.retry_delay_ms);
            Ok(Arc::new(client))
        }
        ProviderKind::Cli => Ok(Arc::new(
            CliClient::new(config.llm.cli_command.clone(), config.llm.cli_args.clone())
                .with_timeout_ms(timeout_ms),
        )),
        ProviderKind::Glossary => Err(AnnotatorError::Config {
            message: "the glossary provider has no completion backend".to_string(),
        }),
    }
}
