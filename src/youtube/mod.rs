//! YouTube URL handling and transcript retrieval

pub mod transcript;

pub use transcript::{
    TranscriptFetcher, TranscriptSegment, TranscriptSource, YouTubeTranscriptFetcher,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{QaError, Result};

/// URL shapes in priority order; group 1 is the video id
static VIDEO_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?]+)",
        r"youtube\.com/embed/([^&\n?]+)",
        r"youtube\.com/shorts/([^&\n?]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid video URL pattern"))
    .collect()
});

/// Canonical identifier of a video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an id that is already known to be canonical
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VideoId {
    type Err = QaError;

    fn from_str(url: &str) -> Result<Self> {
        extract_video_id(url)
    }
}

/// Extract the video id from a YouTube URL
pub fn extract_video_id(url: &str) -> Result<VideoId> {
    VIDEO_URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|id| VideoId(id.as_str().to_string()))
        .ok_or_else(|| QaError::InvalidUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link() {
        assert_eq!(extract_video_id("https://youtu.be/abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_watch_url_stops_at_ampersand() {
        let id = extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_embed_and_shorts() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/xyz789?autoplay=1").unwrap().as_str(),
            "xyz789"
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/short42").unwrap().as_str(),
            "short42"
        );
    }

    #[test]
    fn test_short_link_stops_at_query() {
        let id: VideoId = "https://youtu.be/abc123?si=tracking".parse().unwrap();
        assert_eq!(id.to_string(), "abc123");
    }

    #[test]
    fn test_invalid_url() {
        let err = extract_video_id("https://vimeo.com/12345").unwrap_err();
        assert!(matches!(err, QaError::InvalidUrl(url) if url == "https://vimeo.com/12345"));
        assert!(extract_video_id("").is_err());
    }
}
