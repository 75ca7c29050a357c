/// Video Q&A - Rust Implementation
///
/// Fetches YouTube transcripts and answers batches of questions about them with an LLM,
/// keeping a TTL answer cache and a per-session conversation history.

pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod processing;
pub mod suggest;
pub mod text;
pub mod youtube;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::cache::{ContextCache, ConversationId, ConversationMessage, Role};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{QaError, Result};
pub use crate::llm::{create_llm, LLMConfig, LLMProvider, LLM};
pub use crate::processing::{AnswerStatus, BatchProcessor, BatchResult, QuestionResult};
pub use crate::suggest::QuestionSuggester;
pub use crate::text::TextChunker;
pub use crate::youtube::{extract_video_id, TranscriptSource, VideoId};
