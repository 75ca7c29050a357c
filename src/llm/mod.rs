pub mod mock;
pub mod prompts;
pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Error types for LLM operations
#[derive(thiserror::Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{provider:?} API error {status}: {body}")]
    Api {
        provider: LLMProvider,
        status: u16,
        body: String,
    },

    #[error("No response text from model")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider not available: {0:?}")]
    ProviderUnavailable(LLMProvider),

    #[error("Mock failure: {0}")]
    Mock(String),
}

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProvider {
    Gemini,
    OpenAI,
    LMStudio,
}

impl std::str::FromStr for LLMProvider {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(LLMProvider::Gemini),
            "openai" => Ok(LLMProvider::OpenAI),
            "lmstudio" | "lm-studio" => Ok(LLMProvider::LMStudio),
            other => Err(LLMError::Configuration(format!("Unknown LLM provider: {}", other))),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM provider to use
    pub provider: LLMProvider,

    /// API base URL override (required for LMStudio, optional otherwise)
    pub endpoint: Option<String>,

    /// API key (for cloud providers)
    pub api_key: Option<String>,

    /// Model to use
    pub model: String,

    /// Maximum output tokens per call
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            endpoint: None,
            api_key: None,
            model: "gemini-1.5-pro".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
            timeout_seconds: 60,
        }
    }
}

impl LLMConfig {
    /// Generation options derived from this configuration
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_output_tokens: self.max_tokens,
        }
    }

    /// API key shortened for log output
    pub fn redacted_api_key(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}...", key.chars().take(5).collect::<String>()),
            None => "<none>".to_string(),
        }
    }
}

/// Per-call sampling options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        LLMConfig::default().generation_options()
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

impl LLMResponse {
    pub fn new(content: impl Into<String>, tokens_used: Option<u32>) -> Self {
        Self {
            content: content.into(),
            tokens_used,
        }
    }
}

/// Text-in, text-out generative model
#[async_trait]
pub trait LLM: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<LLMResponse>;
    async fn is_available(&self) -> bool;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    match config.provider {
        LLMProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
        LLMProvider::OpenAI | LLMProvider::LMStudio => Ok(Box::new(
            providers::OpenAICompatibleProvider::new(config.clone())?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_gemini_defaults() {
        let config = LLMConfig::default();
        assert_eq!(config.provider, LLMProvider::Gemini);
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.temperature, 0.7);

        let options = config.generation_options();
        assert_eq!(options.max_output_tokens, 2048);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<LLMProvider>().unwrap(), LLMProvider::Gemini);
        assert_eq!("lm-studio".parse::<LLMProvider>().unwrap(), LLMProvider::LMStudio);
        assert!("unknown-provider".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_redacted_api_key() {
        let mut config = LLMConfig::default();
        assert_eq!(config.redacted_api_key(), "<none>");

        config.api_key = Some("AIzaSyExample".to_string());
        assert_eq!(config.redacted_api_key(), "AIzaS...");
    }

    #[test]
    fn test_create_llm_requires_key_for_gemini() {
        let config = LLMConfig::default();
        assert!(create_llm(&config).is_err());

        let config = LLMConfig {
            api_key: Some("key".to_string()),
            ..LLMConfig::default()
        };
        let llm = create_llm(&config).unwrap();
        assert_eq!(llm.provider_type(), LLMProvider::Gemini);
    }
}
