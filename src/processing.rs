use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{ContextCache, ConversationId, Role};
use crate::config::Config;
use crate::error::{QaError, Result};
use crate::llm::{self, prompts, GenerationOptions, LLMError, LLM};
use crate::text::{clean, TextChunker};

/// Answer used when no chunk produced usable text
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Success,
    Error,
}

/// Outcome for a single question of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question: String,
    pub answer: String,
    pub status: AnswerStatus,
    /// Served from the answer cache without calling the model
    pub cached: bool,
    /// Chunks that produced a usable partial answer
    pub chunks_answered: usize,
    pub error: Option<String>,
}

impl QuestionResult {
    fn failed(question: &str, error: &QaError) -> Self {
        Self {
            question: question.to_string(),
            answer: format!("Error: {}", error),
            status: AnswerStatus::Error,
            cached: false,
            chunks_answered: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Overall batch results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub results: Vec<QuestionResult>,
}

struct Answer {
    text: String,
    cached: bool,
    chunks_answered: usize,
}

/// Answers batches of questions against a transcript, one conversation at a time
pub struct BatchProcessor {
    llm: Arc<dyn LLM>,
    cache: ContextCache,
    chunker: TextChunker,
    options: GenerationOptions,
    max_retries: u32,
    retry_base_delay: Duration,
    question_delay: Duration,
}

impl BatchProcessor {
    pub fn new(llm: Arc<dyn LLM>, cache: ContextCache, config: &Config) -> Self {
        info!(
            "🔧 Initializing BatchProcessor ({:?}, {} retries, chunks of {} chars)",
            llm.provider_type(),
            config.batch.max_retries,
            config.context.max_context_length
        );

        Self {
            llm,
            cache,
            chunker: TextChunker::from_config(&config.context),
            options: config.llm.generation_options(),
            max_retries: config.batch.max_retries,
            retry_base_delay: config.batch.retry_base_delay(),
            question_delay: config.batch.question_delay(),
        }
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    pub fn llm(&self) -> &Arc<dyn LLM> {
        &self.llm
    }

    /// Answer `questions` in order against `transcript`.
    ///
    /// Batches for the same conversation never interleave. A failing question
    /// is recorded with status `Error` and the rest of the batch continues.
    pub async fn process_questions(
        &self,
        conversation_id: &ConversationId,
        questions: &[String],
        transcript: &str,
    ) -> BatchResult {
        let start_time = Instant::now();
        let context = clean(transcript);
        let chunks = self.chunker.chunk(&context);

        info!(
            "🚀 Processing {} questions for conversation {} ({} chunks)",
            questions.len(),
            conversation_id,
            chunks.len()
        );

        let _guard = self.cache.conversations().lock(conversation_id).await;

        let mut results = Vec::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            let question = question.trim();
            if index > 0 && !self.question_delay.is_zero() {
                tokio::time::sleep(self.question_delay).await;
            }

            let result = match self
                .answer_question(conversation_id, question, &context, &chunks)
                .await
            {
                Ok(answer) => QuestionResult {
                    question: question.to_string(),
                    answer: answer.text,
                    status: AnswerStatus::Success,
                    cached: answer.cached,
                    chunks_answered: answer.chunks_answered,
                    error: None,
                },
                Err(e) => {
                    warn!("❌ Question {} failed: {}", index + 1, e);
                    QuestionResult::failed(question, &e)
                }
            };
            results.push(result);
        }

        let successful = results
            .iter()
            .filter(|r| r.status == AnswerStatus::Success)
            .count();
        let total_time = start_time.elapsed();

        info!(
            "✅ Batch complete: {}/{} answered in {:.2}s",
            successful,
            results.len(),
            total_time.as_secs_f64()
        );

        BatchResult {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_time,
            results,
        }
    }

    async fn answer_question(
        &self,
        conversation_id: &ConversationId,
        question: &str,
        context: &str,
        chunks: &[String],
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::EmptyQuestion);
        }

        let conversations = self.cache.conversations();

        if let Some(text) = self.cache.get_response(question, context).await {
            debug!("📚 Cache hit for question: {}", question);
            conversations.append(conversation_id, Role::User, question).await;
            conversations
                .append(conversation_id, Role::Assistant, text.clone())
                .await;
            return Ok(Answer {
                text,
                cached: true,
                chunks_answered: 0,
            });
        }

        let history = conversations.get(conversation_id).await;
        let mut partial_answers = Vec::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = prompts::answer_prompt(chunk, &history, question);
            match self.generate_with_retry(&prompt).await {
                Ok(text) if !text.trim().is_empty() => partial_answers.push(text.trim().to_string()),
                Ok(_) => warn!("Chunk {}/{} returned no text, skipping", index + 1, chunks.len()),
                Err(e) => warn!(
                    "Chunk {}/{} skipped: {}",
                    index + 1,
                    chunks.len(),
                    QaError::ModelCall(e)
                ),
            }
        }

        let chunks_answered = partial_answers.len();
        let text = match partial_answers.len() {
            0 => NO_RELEVANT_INFORMATION.to_string(),
            1 => partial_answers.remove(0),
            _ => match self.synthesize(question, &partial_answers).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("{}; joining {} chunk answers", e, chunks_answered);
                    partial_answers.join("\n")
                }
            },
        };

        self.cache.cache_response(question, context, text.clone()).await;
        conversations.append(conversation_id, Role::User, question).await;
        conversations
            .append(conversation_id, Role::Assistant, text.clone())
            .await;

        Ok(Answer {
            text,
            cached: false,
            chunks_answered,
        })
    }

    /// Merge per-chunk answers with one model call
    async fn synthesize(&self, question: &str, partial_answers: &[String]) -> Result<String> {
        let prompt = prompts::synthesis_prompt(question, partial_answers);
        let response = self
            .llm
            .generate(&prompt, &self.options)
            .await
            .map_err(QaError::SynthesisFailure)?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(QaError::SynthesisFailure(LLMError::EmptyResponse));
        }
        Ok(text.to_string())
    }

    /// Call the model, retrying failures with exponential backoff
    async fn generate_with_retry(&self, prompt: &str) -> llm::Result<String> {
        let mut attempt = 0;
        loop {
            match self.llm.generate(prompt, &self.options).await {
                Ok(response) => return Ok(response.content),
                Err(e) if attempt < self.max_retries => {
                    let delay = self
                        .retry_base_delay
                        .saturating_mul(2_u32.saturating_pow(attempt));
                    warn!(
                        "Model call attempt {} failed, retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
