use super::{GenerationOptions, LLMConfig, LLMError, LLMProvider, LLMResponse, Result, LLM};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

async fn api_error(provider: LLMProvider, response: reqwest::Response) -> LLMError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LLMError::Api {
        provider,
        status,
        body,
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(LLMError::Configuration("Gemini API key required".to_string()));
        }

        let client = build_client(&config)?;
        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| LLMError::Configuration("Gemini API key not configured".to_string()))
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<LLMResponse> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: options.max_output_tokens,
                temperature: options.temperature,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.config.model);

        debug!("Sending request to Gemini API ({} prompt chars)", prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(LLMProvider::Gemini, response).await);
        }

        let gemini_response: GeminiResponse = response.json().await?;

        // Blocked prompts come back with no candidates or no parts
        let content = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or(LLMError::EmptyResponse)?;

        let tokens_used = gemini_response
            .usage_metadata
            .map(|u| u.total_token_count);

        Ok(LLMResponse {
            content,
            tokens_used,
        })
    }

    async fn is_available(&self) -> bool {
        let Ok(api_key) = self.api_key() else {
            return false;
        };

        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}

/// Chat-completions provider for OpenAI and LM Studio
pub struct OpenAICompatibleProvider {
    config: LLMConfig,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl OpenAICompatibleProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let default_base = match config.provider {
            LLMProvider::OpenAI => {
                if config.api_key.is_none() {
                    return Err(LLMError::Configuration("OpenAI API key required".to_string()));
                }
                OPENAI_BASE_URL
            }
            LLMProvider::LMStudio => LMSTUDIO_BASE_URL,
            LLMProvider::Gemini => {
                return Err(LLMError::Configuration(
                    "Gemini is not a chat-completions provider".to_string(),
                ))
            }
        };

        let client = build_client(&config)?;
        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| default_base.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl LLM for OpenAICompatibleProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<LLMResponse> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending request to {:?} at {}", self.config.provider, url);

        let response = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(self.config.provider, response).await);
        }

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LLMError::EmptyResponse)?;

        let tokens_used = chat_response.usage.map(|u| u.total_tokens);

        Ok(LLMResponse {
            content,
            tokens_used,
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.base_url);

        match self.authorized(self.client.get(&url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        self.config.provider
    }
}
