//! The two external collaborator contracts and their model-backed implementations

use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::{CompletionBackend, CompletionRequest, create_backend};
use crate::config::{Config, ProviderKind};
use crate::error::{AnnotatorError, Result};
use crate::glossary::{GlossaryExtractor, GlossarySimplifier};
use crate::prompts;
use crate::schemas::TermMapping;

/// Produces candidate term -> difficulty mappings for a passage
#[async_trait]
pub trait TermExtractor: Send + Sync {
    async fn extract(&self, passage: &str) -> Result<TermMapping>;
}

/// Rewrites a passage given the validated terms
#[async_trait]
pub trait TextSimplifier: Send + Sync {
    async fn simplify(&self, passage: &str, terms: &TermMapping) -> Result<String>;
}

pub struct LlmTermExtractor {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    max_terms: usize,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl LlmTermExtractor {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            max_terms: 5,
            temperature: 0.6,
            top_p: 0.9,
            max_tokens: 200,
        }
    }

    pub fn from_config(backend: Arc<dyn CompletionBackend>, config: &Config) -> Self {
        let c = &config.extraction;
        Self {
            backend,
            model: c.model.clone(),
            max_terms: c.max_terms,
            temperature: c.temperature,
            top_p: c.top_p,
            max_tokens: c.max_tokens,
        }
    }
}

#[async_trait]
impl TermExtractor for LlmTermExtractor {
    async fn extract(&self, passage: &str) -> Result<TermMapping> {
        let request = CompletionRequest {
            system: prompts::extraction_system_message(self.max_terms),
            user: prompts::extraction_user_prompt(passage),
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };
        let reply = self.backend.complete(&request).await?;
        tracing::debug!("{} extraction reply: {}", self.backend.name(), reply);
        parse_terms_response(&reply)
    }
}

pub struct LlmTextSimplifier {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl LlmTextSimplifier {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: 0.2,
            top_p: 0.9,
            max_tokens: 600,
        }
    }

    pub fn from_config(backend: Arc<dyn CompletionBackend>, config: &Config) -> Self {
        let c = &config.simplification;
        Self {
            backend,
            model: c.model.clone(),
            temperature: c.temperature,
            top_p: c.top_p,
            max_tokens: c.max_tokens,
        }
    }
}

#[async_trait]
impl TextSimplifier for LlmTextSimplifier {
    async fn simplify(&self, passage: &str, terms: &TermMapping) -> Result<String> {
        let request = CompletionRequest {
            system: prompts::simplification_system_message(),
            user: prompts::simplification_user_prompt(passage, terms),
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };
        let reply = self.backend.complete(&request).await?;
        let text = strip_code_fences(&reply).trim();
        if text.is_empty() {
            return Err(AnnotatorError::InvalidResponse {
                message: "simplifier returned empty text".to_string(),
            });
        }
        Ok(text.to_string())
    }
}

/// Parse an extraction reply into a term mapping.
///
/// Accepts bare JSON, fenced JSON, or JSON surrounded by prose. An empty reply or the
/// no-terms sentinel yields an empty mapping. Anything else that is not an object of
/// easy|medium|hard labels is an `InvalidResponse`.
pub fn parse_terms_response(reply: &str) -> Result<TermMapping> {
    let text = strip_code_fences(reply).trim();
    if text.is_empty() || text.trim_end_matches('.') == prompts::NO_TERMS_SENTINEL {
        return Ok(TermMapping::new());
    }

    let json_str = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(AnnotatorError::InvalidResponse {
                message: format!("expected a JSON object of terms, got: {}", snippet(text)),
            });
        }
    };

    serde_json::from_str::<TermMapping>(json_str).map_err(|e| AnnotatorError::InvalidResponse {
        message: format!("term mapping did not match contract: {}", e),
    })
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body)
}

fn snippet(text: &str) -> String {
    text.chars().take(120).collect()
}

/// Build both collaborators from configuration
pub fn build_collaborators(
    config: &Config,
) -> Result<(Arc<dyn TermExtractor>, Arc<dyn TextSimplifier>)> {
    let extractor: Arc<dyn TermExtractor> = match config.extraction.provider {
        ProviderKind::Glossary => Arc::new(GlossaryExtractor::new(config.extraction.max_terms)),
        provider => {
            let backend = create_backend(config, provider, config.extraction.timeout_ms)?;
            Arc::new(LlmTermExtractor::from_config(backend, config))
        }
    };

    let simplifier: Arc<dyn TextSimplifier> = match config.simplification.provider {
        ProviderKind::Glossary => Arc::new(GlossarySimplifier::new()),
        provider => {
            let backend = create_backend(config, provider, config.simplification.timeout_ms)?;
            Arc::new(LlmTextSimplifier::from_config(backend, config))
        }
    };

    tracing::info!(
        "Collaborators ready: extraction={:?} ({}), simplification={:?} ({})",
        config.extraction.provider,
        config.extraction.model,
        config.simplification.provider,
        config.simplification.model
    );

    Ok((extractor, simplifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::AgentError;
    use crate::schemas::Difficulty;
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<String, AgentError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(AgentError::Transport)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain = parse_terms_response(r#"{"derivative": "hard", "sum": "easy"}"#).unwrap();
        assert_eq!(plain.get("derivative"), Some(&Difficulty::Hard));
        assert_eq!(plain.len(), 2);

        let fenced = parse_terms_response("```json\n{\"limit\": \"medium\"}\n```").unwrap();
        assert_eq!(fenced.get("limit"), Some(&Difficulty::Medium));

        let chatty =
            parse_terms_response("Here is:\n{\"integral\": \"hard\"}\nHope this helps").unwrap();
        assert_eq!(chatty.get("integral"), Some(&Difficulty::Hard));
    }

    #[test]
    fn empty_and_sentinel_replies_mean_no_terms() {
        assert!(parse_terms_response("").unwrap().is_empty());
        assert!(parse_terms_response("{}").unwrap().is_empty());
        assert!(parse_terms_response("No difficult terms found").unwrap().is_empty());
    }

    #[test]
    fn contract_violations_are_invalid_responses() {
        for bad in [
            r#"{"derivative": "impossible"}"#,
            r#"{"derivative": 3}"#,
            r#"["derivative"]"#,
            "derivative, integral",
        ] {
            let err = parse_terms_response(bad).unwrap_err();
            assert!(
                matches!(err, AnnotatorError::InvalidResponse { .. }),
                "{bad} should be rejected, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn llm_extractor_sends_passage_and_parses_reply() {
        let backend = ScriptedBackend::ok(r#"{"eigenvalue": "hard"}"#);
        let extractor = LlmTermExtractor::new(backend.clone(), "test-model");
        let terms = extractor.extract("Find each eigenvalue of $A$.").await.unwrap();
        assert_eq!(terms.get("eigenvalue"), Some(&Difficulty::Hard));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "test-model");
        assert!(seen[0].user.contains("Find each eigenvalue of $A$."));
        assert!(seen[0].system.contains("up to 5"));
    }

    #[tokio::test]
    async fn llm_simplifier_rejects_empty_reply() {
        let backend = ScriptedBackend::ok("```\n\n```");
        let simplifier = LlmTextSimplifier::new(backend, "m");
        let err = simplifier
            .simplify("passage", &TermMapping::new())
            .await
            .unwrap_err();
        assert!(err.is_collaborator_failure());
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_collaborator_error() {
        let backend = Arc::new(ScriptedBackend {
            reply: Err("connection refused".into()),
            seen: Mutex::new(Vec::new()),
        });
        let extractor = LlmTermExtractor::new(backend, "m");
        let err = extractor.extract("p").await.unwrap_err();
        assert!(matches!(err, AnnotatorError::Collaborator { .. }));
    }

    #[test]
    fn glossary_providers_build_without_backend() {
        let mut config = Config::default();
        config.extraction.provider = ProviderKind::Glossary;
        config.simplification.provider = ProviderKind::Glossary;
        assert!(build_collaborators(&config).is_ok());
    }
}
