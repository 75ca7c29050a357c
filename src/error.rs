//! Error taxonomy for the question answering pipeline

use crate::llm::LLMError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, QaError>;

/// Error types for pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum QaError {
    /// The URL does not match any known video URL shape
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    /// No captions, unknown video, or the transcript service failed
    #[error("Failed to get transcript for {video_id}: {reason}")]
    TranscriptUnavailable { video_id: String, reason: String },

    #[error("Model call failed: {0}")]
    ModelCall(#[from] LLMError),

    #[error("Answer synthesis failed: {0}")]
    SynthesisFailure(LLMError),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QaError {
    /// Whether the user can fix this by changing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            QaError::InvalidUrl(_) | QaError::TranscriptUnavailable { .. } | QaError::EmptyQuestion
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_unavailable_keeps_reason() {
        let err = QaError::TranscriptUnavailable {
            video_id: "abc123".to_string(),
            reason: "captions are disabled".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("abc123"));
        assert!(message.contains("captions are disabled"));
        assert!(err.is_user_correctable());
    }

    #[test]
    fn test_model_errors_are_not_user_correctable() {
        let err = QaError::from(LLMError::EmptyResponse);
        assert!(!err.is_user_correctable());
    }
}
