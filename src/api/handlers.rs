//! API request handlers

use serde_json::Value;
use tracing::info;

use super::models::{
    HistoryData, QuestionsRequest, SessionInfo, SuggestionsData, SuggestionsRequest,
    TranscriptData,
};
use super::server::AppState;
use crate::cache::ConversationId;
use crate::error::{QaError, Result};
use crate::processing::BatchResult;

/// Suggestions returned when the request gives no limit
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "video-qa",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": format!("{:?}", state.processor.llm().provider_type()),
        "cached_answers": state.processor.cache().responses().len().await,
        "conversations": state.processor.cache().conversations().conversation_count().await,
        "cached_transcripts": state.transcripts.cached_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Start a new conversation
pub fn create_session() -> SessionInfo {
    let id = ConversationId::new();
    info!("🆕 New session {}", id);
    SessionInfo {
        conversation_id: id.to_string(),
    }
}

pub async fn get_transcript(state: &AppState, url: &str) -> Result<TranscriptData> {
    let (video_id, transcript) = state.transcripts.get_transcript_for_url(url).await?;
    Ok(TranscriptData {
        video_id: video_id.to_string(),
        transcript,
    })
}

pub async fn suggest_questions(state: &AppState, request: &SuggestionsRequest) -> Result<SuggestionsData> {
    let (_, transcript) = state.transcripts.get_transcript_for_url(&request.url).await?;
    let limit = request.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    let questions = state
        .suggester
        .suggest(&transcript, limit, request.generate)
        .await;
    Ok(SuggestionsData { questions })
}

/// Answer a batch of questions within a conversation.
///
/// Blank entries are dropped; a request with no questions left is rejected.
pub async fn process_questions(
    state: &AppState,
    conversation_id: &str,
    request: &QuestionsRequest,
) -> Result<BatchResult> {
    let questions: Vec<String> = request
        .questions
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();

    if questions.is_empty() {
        return Err(QaError::EmptyQuestion);
    }

    let (_, transcript) = state.transcripts.get_transcript_for_url(&request.url).await?;
    let id = ConversationId::from(conversation_id);

    Ok(state
        .processor
        .process_questions(&id, &questions, &transcript)
        .await)
}

pub async fn get_history(state: &AppState, conversation_id: &str) -> HistoryData {
    let id = ConversationId::from(conversation_id);
    let messages = state.processor.cache().conversations().get(&id).await;
    HistoryData {
        conversation_id: id.to_string(),
        messages,
    }
}

pub async fn clear_history(state: &AppState, conversation_id: &str) {
    let id = ConversationId::from(conversation_id);
    state.processor.cache().conversations().clear(&id).await;
    info!("🧹 Cleared history for {}", id);
}

/// Drop every cached answer, conversation and transcript
pub async fn clear_cache(state: &AppState) {
    state.processor.cache().clear_all().await;
    state.transcripts.clear_cache().await;
    info!("🧹 Cleared all caches");
}
