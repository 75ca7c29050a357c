//! Scriptable model for tests and offline runs.
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt,
//! falling back to the default reply. Every prompt is recorded so tests can
//! assert on call counts and prompt contents.

use super::{GenerationOptions, LLMError, LLMProvider, LLMResponse, Result, LLM};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// Mock LLM provider
#[derive(Clone)]
pub struct MockLLM {
    rules: Vec<(String, MockReply)>,
    default_reply: MockReply,
    transient_failures: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockLLM {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLLM {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_reply: MockReply::Text("Mock response".to_string()),
            transient_failures: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply used when no rule matches
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_reply = MockReply::Text(response.into());
        self
    }

    /// Fail every call that matches no rule
    pub fn failing(mut self) -> Self {
        self.default_reply = MockReply::Fail("model unavailable".to_string());
        self
    }

    /// Reply with `response` whenever the prompt contains `needle`
    pub fn respond_when(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .push((needle.into(), MockReply::Text(response.into())));
        self
    }

    /// Fail whenever the prompt contains `needle`
    pub fn fail_when(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let reason = format!("scripted failure for '{}'", needle);
        self.rules.push((needle, MockReply::Fail(reason)));
        self
    }

    /// Fail the next `count` calls regardless of rules
    pub fn fail_next(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Prompts received so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LLM for MockLLM {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<LLMResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt.to_string());
        }

        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(LLMError::Mock("transient failure".to_string()));
        }

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.default_reply);

        match reply {
            MockReply::Text(text) => Ok(LLMResponse::new(text.clone(), Some(10))),
            MockReply::Fail(reason) => Err(LLMError::Mock(reason.clone())),
        }
    }

    async fn is_available(&self) -> bool {
        !matches!(self.default_reply, MockReply::Fail(_))
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_and_default() {
        let llm = MockLLM::new()
            .with_default_response("default")
            .respond_when("weather", "sunny")
            .fail_when("explode");
        let options = GenerationOptions::default();

        assert_eq!(llm.generate("how is the weather", &options).await.unwrap().content, "sunny");
        assert_eq!(llm.generate("anything else", &options).await.unwrap().content, "default");
        assert!(llm.generate("please explode", &options).await.is_err());
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transient_failures_run_out() {
        let llm = MockLLM::new().fail_next(2);
        let options = GenerationOptions::default();

        assert!(llm.generate("a", &options).await.is_err());
        assert!(llm.generate("b", &options).await.is_err());
        assert!(llm.generate("c", &options).await.is_ok());
        assert_eq!(llm.calls(), vec!["a", "b", "c"]);
    }
}
