//! API data models

use serde::{Deserialize, Serialize};

use crate::cache::ConversationMessage;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub conversation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptData {
    pub video_id: String,
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsRequest {
    pub url: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub generate: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsData {
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsRequest {
    pub url: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryData {
    pub conversation_id: String,
    pub messages: Vec<ConversationMessage>,
}
