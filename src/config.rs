use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "math_annotate.toml";
const DEFAULT_LOG_LEVEL: &str = "math_annotate=info";
const DEFAULT_STAGE_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_MAX_TERMS: usize = 5;

/// Main configuration loaded from math_annotate.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub simplification: SimplificationConfig,
    pub llm: LlmConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Which implementation backs a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAi,
    /// Local command reading the prompt on stdin
    Cli,
    /// Built-in vocabulary, no model involved
    Glossary,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "http" => Ok(ProviderKind::OpenAi),
            "cli" => Ok(ProviderKind::Cli),
            "glossary" | "offline" => Ok(ProviderKind::Glossary),
            other => Err(format!(
                "unknown provider '{}', expected openai|cli|glossary",
                other
            )),
        }
    }
}

/// Term extraction collaborator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// Upper bound on terms requested per passage
    pub max_terms: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            max_terms: DEFAULT_MAX_TERMS,
            temperature: 0.6,
            top_p: 0.9,
            max_tokens: 200,
            timeout_ms: DEFAULT_STAGE_TIMEOUT_MS,
        }
    }
}

/// Text simplification collaborator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimplificationConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for SimplificationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "meta-llama/Llama-3.1-8B-Instruct".to_string(),
            temperature: 0.2,
            top_p: 0.9,
            max_tokens: 600,
            timeout_ms: DEFAULT_STAGE_TIMEOUT_MS,
        }
    }
}

/// Shared model backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub cli_command: String,
    /// `{model}` is replaced with the stage's model name
    pub cli_args: Vec<String>,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            cli_command: "ollama".to_string(),
            cli_args: vec!["run".to_string(), "{model}".to_string()],
            retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            api_key: std::env::var("ANNOTATE_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .or_else(|_| std::env::var("HF_TOKEN"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses ANNOTATE_CONFIG or defaults to "math_annotate.toml".
    pub fn load() -> anyhow::Result<Self> {
        let path =
            std::env::var("ANNOTATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from an explicit TOML path, then apply env overrides
    pub fn load_from(config_path: &str) -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("ANNOTATE_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let mut config = if let Ok(content) = std::fs::read_to_string(config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.runtime = RuntimeConfig::load_from_env();
        config.validate();

        Ok(config)
    }

    /// Parse a TOML document; absent sections and keys take their defaults
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(url) = std::env::var("ANNOTATE_LLM_BASE_URL") {
            self.llm.base_url = url;
            tracing::debug!("ANNOTATE_LLM_BASE_URL env override applied");
        }
        if let Ok(p) = std::env::var("ANNOTATE_EXTRACT_PROVIDER") {
            self.extraction.provider = p.parse().map_err(anyhow::Error::msg)?;
        }
        if let Ok(p) = std::env::var("ANNOTATE_SIMPLIFY_PROVIDER") {
            self.simplification.provider = p.parse().map_err(anyhow::Error::msg)?;
        }
        if let Ok(model) = std::env::var("ANNOTATE_EXTRACT_MODEL") {
            self.extraction.model = model;
        }
        if let Ok(model) = std::env::var("ANNOTATE_SIMPLIFY_MODEL") {
            self.simplification.model = model;
        }
        if let Some(ms) = std::env::var("ANNOTATE_EXTRACT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.extraction.timeout_ms = ms;
        }
        if let Some(ms) = std::env::var("ANNOTATE_SIMPLIFY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.simplification.timeout_ms = ms;
        }
        if let Some(n) = std::env::var("ANNOTATE_MAX_TERMS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.extraction.max_terms = n;
        }
        Ok(())
    }

    /// Clamp out-of-range values and warn about suspicious ones
    pub fn validate(&mut self) {
        if self.llm.retries == 0 {
            self.llm.retries = 1;
        } else if self.llm.retries > 10 {
            tracing::warn!("retries {} exceeds max 10, clamping to 10", self.llm.retries);
            self.llm.retries = 10;
        }

        if self.extraction.timeout_ms == 0 {
            self.extraction.timeout_ms = DEFAULT_STAGE_TIMEOUT_MS;
        }
        if self.simplification.timeout_ms == 0 {
            self.simplification.timeout_ms = DEFAULT_STAGE_TIMEOUT_MS;
        }
        if self.extraction.max_terms == 0 {
            tracing::warn!("max_terms must be at least 1, using {}", DEFAULT_MAX_TERMS);
            self.extraction.max_terms = DEFAULT_MAX_TERMS;
        }

        let uses_http = self.extraction.provider == ProviderKind::OpenAi
            || self.simplification.provider == ProviderKind::OpenAi;
        if uses_http
            && !self.llm.base_url.starts_with("http://")
            && !self.llm.base_url.starts_with("https://")
        {
            tracing::warn!(
                "LLM base URL '{}' doesn't start with http:// or https://",
                self.llm.base_url
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [extraction]
            provider = "glossary"
            max_terms = 3

            [llm]
            base_url = "https://api.example.com/v1"
            "#,
        )
        .unwrap();
        assert_eq!(config.extraction.provider, ProviderKind::Glossary);
        assert_eq!(config.extraction.max_terms, 3);
        assert_eq!(config.extraction.max_tokens, 200);
        assert_eq!(config.simplification.provider, ProviderKind::OpenAi);
        assert_eq!(config.llm.base_url, "https://api.example.com/v1");
        assert_eq!(config.llm.cli_args, vec!["run", "{model}"]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let res = Config::from_toml_str("[simplification]\nprovider = \"carrier-pigeon\"\n");
        assert!(res.is_err());
        assert!("carrier-pigeon".parse::<ProviderKind>().is_err());
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
    }

    #[test]
    fn validate_clamps_values() {
        let mut config = Config::default();
        config.llm.retries = 50;
        config.extraction.timeout_ms = 0;
        config.extraction.max_terms = 0;
        config.validate();
        assert_eq!(config.llm.retries, 10);
        assert_eq!(config.extraction.timeout_ms, DEFAULT_STAGE_TIMEOUT_MS);
        assert_eq!(config.extraction.max_terms, DEFAULT_MAX_TERMS);

        config.llm.retries = 0;
        config.validate();
        assert_eq!(config.llm.retries, 1);
    }
}
