use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::llm::{prompts, GenerationOptions, LLM};
use crate::text::clean;

const DEFAULT_QUESTIONS: [&str; 8] = [
    "What are the main topics discussed in this video?",
    "What are the key points or takeaways from this video?",
    "What are the main arguments or conclusions presented?",
    "What are the technical terms or concepts mentioned?",
    "What are the examples or case studies discussed?",
    "What are the challenges or problems addressed?",
    "What are the solutions or recommendations provided?",
    "What are the future implications or next steps mentioned?",
];

/// Generic questions that fit any video
pub fn default_questions() -> Vec<String> {
    DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

/// Turn a model reply into a question list.
///
/// One question per line; list numbering and bullets are stripped and lines
/// without any letter are dropped.
pub fn parse_questions(reply: &str, limit: usize) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | '•') || c.is_whitespace()
                })
                .trim()
        })
        .filter(|line| line.chars().any(char::is_alphabetic))
        .take(limit)
        .map(str::to_string)
        .collect()
}

/// Suggests questions for a transcript, optionally asking the model
pub struct QuestionSuggester {
    llm: Option<Arc<dyn LLM>>,
    options: GenerationOptions,
    max_context_length: usize,
}

impl QuestionSuggester {
    pub fn new(llm: Option<Arc<dyn LLM>>, config: &Config) -> Self {
        Self {
            llm,
            options: config.llm.generation_options(),
            max_context_length: config.context.max_context_length,
        }
    }

    /// Questions generated from the transcript; empty on any failure
    pub async fn generate_questions(&self, transcript: &str, limit: usize) -> Vec<String> {
        let Some(llm) = &self.llm else {
            debug!("No model configured, nothing generated");
            return Vec::new();
        };

        let context: String = clean(transcript)
            .chars()
            .take(self.max_context_length)
            .collect();
        let prompt = prompts::question_generation_prompt(&context, limit);

        match llm.generate(&prompt, &self.options).await {
            Ok(response) => {
                let questions = parse_questions(&response.content, limit);
                info!("💡 Generated {} suggested questions", questions.len());
                questions
            }
            Err(e) => {
                error!("Error generating questions: {}", e);
                Vec::new()
            }
        }
    }

    /// Generated questions when asked for and a model is available,
    /// otherwise the generic list
    pub async fn suggest(&self, transcript: &str, limit: usize, generate: bool) -> Vec<String> {
        if generate && self.llm.is_some() {
            return self.generate_questions(transcript, limit).await;
        }

        DEFAULT_QUESTIONS
            .iter()
            .take(limit)
            .map(|q| q.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::llm::mock::MockLLM;

    #[test]
    fn test_default_questions() {
        let questions = default_questions();
        assert_eq!(questions.len(), 8);
        assert!(questions.iter().all(|q| q.ends_with('?')));
    }

    #[test]
    fn test_parse_questions_strips_numbering() {
        let reply = "1. What is ownership?\n2) Why borrow?\n\n- How do lifetimes work?\n* What is a trait?\n---\n42.\n";
        let questions = parse_questions(reply, 10);

        assert_eq!(
            questions,
            vec![
                "What is ownership?",
                "Why borrow?",
                "How do lifetimes work?",
                "What is a trait?",
            ]
        );
    }

    #[test]
    fn test_parse_questions_respects_limit() {
        let reply = "1. One?\n2. Two?\n3. Three?";
        assert_eq!(parse_questions(reply, 2), vec!["One?", "Two?"]);
        assert!(parse_questions(reply, 0).is_empty());
    }

    #[tokio::test]
    async fn test_generate_questions_uses_truncated_context() {
        let config = ConfigBuilder::new().with_context(20, 0).build();
        let llm = MockLLM::new().with_default_response("1. First?\n2. Second?\n3. Third?");
        let suggester = QuestionSuggester::new(Some(Arc::new(llm.clone())), &config);

        let transcript = format!("{}{}", "k".repeat(20), "TAIL");
        let questions = suggester.generate_questions(&transcript, 2).await;

        assert_eq!(questions, vec!["First?", "Second?"]);
        let prompt = &llm.calls()[0];
        assert!(prompt.contains("generate 2 relevant and insightful questions"));
        assert!(!prompt.contains("TAIL"));
    }

    #[tokio::test]
    async fn test_generation_failure_gives_empty_list() {
        let llm = MockLLM::new().failing();
        let suggester = QuestionSuggester::new(Some(Arc::new(llm)), &Config::default());

        assert!(suggester.generate_questions("Transcript.", 5).await.is_empty());
        assert!(suggester.suggest("Transcript.", 5, true).await.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_falls_back_to_defaults() {
        let suggester = QuestionSuggester::new(None, &Config::default());

        let questions = suggester.suggest("Transcript.", 3, true).await;
        assert_eq!(questions, default_questions()[..3].to_vec());

        let llm = MockLLM::new();
        let suggester = QuestionSuggester::new(Some(Arc::new(llm.clone())), &Config::default());
        assert_eq!(suggester.suggest("Transcript.", 20, false).await.len(), 8);
        assert_eq!(llm.call_count(), 0);
    }
}
