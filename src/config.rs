use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheKeyScheme;
use crate::error::QaError;
use crate::llm::{LLMConfig, LLMProvider};

/// Configuration for the video Q&A service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model provider settings
    pub llm: LLMConfig,

    /// Question batch behavior
    pub batch: BatchConfig,

    /// Transcript chunking
    pub context: ContextConfig,

    /// Answer cache settings
    pub cache: CacheConfig,

    /// Transcript service settings
    pub transcript: TranscriptConfig,

    /// Logging
    pub output: OutputConfig,

    /// HTTP server
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Extra attempts per chunk after a failed model call
    pub max_retries: u32,

    /// First retry delay, doubled on each further attempt
    pub retry_base_delay_ms: u64,

    /// Pause between consecutive questions of a batch
    pub question_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
            question_delay_ms: 1000,
        }
    }
}

impl BatchConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn question_delay(&self) -> Duration {
        Duration::from_millis(self.question_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Target chunk length in characters
    pub max_context_length: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_length: 30000,
            chunk_overlap: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Answer lifetime in seconds
    pub ttl_seconds: u64,

    /// Maximum cached answers before eviction
    pub max_entries: usize,

    /// Which inputs make up a cache key
    pub key_scheme: CacheKeyScheme,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600, // 1 hour
            max_entries: 100,
            key_scheme: CacheKeyScheme::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Base URL of the video site
    pub base_url: String,

    /// Preferred caption languages, best first
    pub languages: Vec<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Keep fetched transcripts for the process lifetime
    pub cache_transcripts: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            languages: vec!["en".to_string()],
            timeout_seconds: 30,
            cache_transcripts: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log filter, e.g. `info` or `video_qa_rust=debug`
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Environment variables that may carry the model API key, in priority order
const API_KEY_VARS: [&str; 3] = ["GOOGLE_API_KEY", "google_api_key", "VIDEO_QA_API_KEY"];

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        for path in Self::search_paths() {
            if !path.exists() {
                continue;
            }
            match Self::read_file(&path) {
                Ok(loaded) => {
                    tracing::info!("📄 Loaded configuration from: {}", path.display());
                    config = loaded;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file {}: {:#}", path.display(), e);
                }
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::read_file(path)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        config.apply_env();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("video-qa.toml"),
            PathBuf::from("config/video-qa.toml"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(home).join(".config/video-qa/config.toml"));
        }
        paths
    }

    /// Override settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Override settings from `lookup`, which maps a variable name to its value
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = API_KEY_VARS.iter().find_map(|name| lookup(*name)) {
            self.llm.api_key = Some(api_key);
        }

        if let Some(provider) = lookup("VIDEO_QA_PROVIDER") {
            match LLMProvider::from_str(&provider) {
                Ok(provider) => self.llm.provider = provider,
                Err(e) => tracing::warn!("Ignoring VIDEO_QA_PROVIDER: {}", e),
            }
        }

        if let Some(model) = lookup("VIDEO_QA_MODEL") {
            self.llm.model = model;
        }

        if let Some(endpoint) = lookup("VIDEO_QA_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        if let Some(level) = lookup("VIDEO_QA_LOG_LEVEL") {
            self.output.log_level = level;
        }

        override_parsed(&lookup, "VIDEO_QA_MAX_TOKENS", &mut self.llm.max_tokens);
        override_parsed(&lookup, "VIDEO_QA_TEMPERATURE", &mut self.llm.temperature);
        override_parsed(&lookup, "VIDEO_QA_MAX_RETRIES", &mut self.batch.max_retries);
        override_parsed(
            &lookup,
            "VIDEO_QA_MAX_CONTEXT_LENGTH",
            &mut self.context.max_context_length,
        );
        override_parsed(&lookup, "VIDEO_QA_CHUNK_OVERLAP", &mut self.context.chunk_overlap);
        override_parsed(&lookup, "VIDEO_QA_CACHE_TTL", &mut self.cache.ttl_seconds);
        override_parsed(&lookup, "VIDEO_QA_PORT", &mut self.api.port);
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)
            .with_context(|| format!("Cannot write config file {}", path.display()))?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Check settings that would make chunking or caching meaningless
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.context.max_context_length == 0 {
            return Err(QaError::Config(
                "max_context_length must be greater than 0".to_string(),
            ));
        }

        if self.context.chunk_overlap >= self.context.max_context_length {
            return Err(QaError::Config(format!(
                "chunk_overlap ({}) must be smaller than max_context_length ({})",
                self.context.chunk_overlap, self.context.max_context_length
            )));
        }

        if self.cache.max_entries == 0 {
            return Err(QaError::Config("cache max_entries must be greater than 0".to_string()));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Check that the configured model provider can be reached with the
    /// credentials given
    pub fn validate_llm(&self) -> crate::error::Result<()> {
        match self.llm.provider {
            LLMProvider::Gemini | LLMProvider::OpenAI if self.llm.api_key.is_none() => {
                Err(QaError::Config(format!(
                    "API key required for {:?}; set one of {}",
                    self.llm.provider,
                    API_KEY_VARS.join(", ")
                )))
            }
            _ => Ok(()),
        }
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Q&A Configuration:\n\
            - LLM Provider: {:?}\n\
            - Model: {}\n\
            - API Key: {}\n\
            - Max Context Length: {}\n\
            - Chunk Overlap: {}\n\
            - Max Retries: {}\n\
            - Cache TTL: {}s ({} entries, {:?})",
            self.llm.provider,
            self.llm.model,
            self.llm.redacted_api_key(),
            self.context.max_context_length,
            self.context.chunk_overlap,
            self.batch.max_retries,
            self.cache.ttl_seconds,
            self.cache.max_entries,
            self.cache.key_scheme,
        )
    }
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut T) {
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring {}: cannot parse '{}'", name, raw),
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.llm.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.batch.max_retries = max_retries;
        self
    }

    pub fn with_delays(mut self, retry_base_delay_ms: u64, question_delay_ms: u64) -> Self {
        self.config.batch.retry_base_delay_ms = retry_base_delay_ms;
        self.config.batch.question_delay_ms = question_delay_ms;
        self
    }

    pub fn with_context(mut self, max_context_length: usize, chunk_overlap: usize) -> Self {
        self.config.context.max_context_length = max_context_length;
        self.config.context.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_cache_ttl(mut self, ttl_seconds: u64) -> Self {
        self.config.cache.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_key_scheme(mut self, scheme: CacheKeyScheme) -> Self {
        self.config.cache.key_scheme = scheme;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.batch.max_retries, 3);
        assert_eq!(config.context.max_context_length, 30000);
        assert_eq!(config.context.chunk_overlap, 500);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.key_scheme, CacheKeyScheme::QuestionAndContext);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_provider(LLMProvider::LMStudio)
            .with_context(1000, 100)
            .with_max_retries(0)
            .with_key_scheme(CacheKeyScheme::QuestionOnly)
            .build();

        assert_eq!(config.llm.provider, LLMProvider::LMStudio);
        assert_eq!(config.context.max_context_length, 1000);
        assert_eq!(config.batch.max_retries, 0);
        assert_eq!(config.cache.key_scheme, CacheKeyScheme::QuestionOnly);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let config = ConfigBuilder::new().with_context(500, 500).build();
        assert!(matches!(config.validate(), Err(QaError::Config(_))));

        let config = ConfigBuilder::new().with_context(0, 0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_llm_validation_requires_key_for_cloud_providers() {
        assert!(Config::default().validate_llm().is_err());
        assert!(ConfigBuilder::new().with_api_key("AIzaTest").build().validate_llm().is_ok());
        assert!(ConfigBuilder::new()
            .with_provider(LLMProvider::LMStudio)
            .build()
            .validate_llm()
            .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("google_api_key", "AIzaLowercase"),
            ("VIDEO_QA_API_KEY", "ignored-lower-priority"),
            ("VIDEO_QA_PROVIDER", "lmstudio"),
            ("VIDEO_QA_MAX_RETRIES", "5"),
            ("VIDEO_QA_CACHE_TTL", "60"),
            ("VIDEO_QA_TEMPERATURE", "not-a-number"),
        ]);

        let mut config = Config::default();
        config.apply_env_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("AIzaLowercase"));
        assert_eq!(config.llm.provider, LLMProvider::LMStudio);
        assert_eq!(config.batch.max_retries, 5);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.llm.temperature, 0.7);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [context]
            max_context_length = 8000

            [cache]
            key_scheme = "question_only"
            "#,
        )
        .unwrap();

        assert_eq!(config.context.max_context_length, 8000);
        assert_eq!(config.context.chunk_overlap, 500);
        assert_eq!(config.cache.key_scheme, CacheKeyScheme::QuestionOnly);
        assert_eq!(config.llm.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video-qa.toml");

        let config = ConfigBuilder::new()
            .with_model("gemini-1.5-flash")
            .with_cache_ttl(120)
            .build();
        config.save(&path).unwrap();

        let loaded = Config::read_file(&path).unwrap();
        assert_eq!(loaded.llm.model, "gemini-1.5-flash");
        assert_eq!(loaded.cache.ttl_seconds, 120);
    }

    #[test]
    fn test_summary_redacts_api_key() {
        let config = ConfigBuilder::new().with_api_key("AIzaSecretValue").build();
        let summary = config.summary();
        assert!(summary.contains("AIzaS..."));
        assert!(!summary.contains("SecretValue"));
    }
}
