use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{extract_video_id, VideoId};
use crate::config::TranscriptConfig;
use crate::error::{QaError, Result};

/// One caption line as returned by the transcript service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// External transcript service
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Caption segments in playback order
    async fn fetch_segments(&self, video_id: &VideoId) -> anyhow::Result<Vec<TranscriptSegment>>;
}

/// Fetches caption tracks from YouTube watch pages
pub struct YouTubeTranscriptFetcher {
    client: reqwest::Client,
    base_url: String,
    languages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode", default)]
    language_code: String,
}

#[derive(Debug, Deserialize)]
struct TimedTextResponse {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

impl YouTubeTranscriptFetcher {
    pub fn new(config: &TranscriptConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            languages: config.languages.clone(),
        })
    }

    async fn caption_tracks(&self, video_id: &VideoId) -> anyhow::Result<Vec<CaptionTrack>> {
        let url = format!("{}/watch", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("v", video_id.as_str())])
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .context("failed to load watch page")?;

        if !response.status().is_success() {
            return Err(anyhow!("video not found (HTTP {})", response.status()));
        }

        let html = response.text().await?;
        parse_caption_tracks(&html)
    }

    fn choose_track<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        self.languages
            .iter()
            .find_map(|lang| tracks.iter().find(|t| &t.language_code == lang))
            .or_else(|| tracks.first())
    }
}

/// Pull the `captionTracks` array out of a watch page
fn parse_caption_tracks(html: &str) -> anyhow::Result<Vec<CaptionTrack>> {
    const MARKER: &str = "\"captionTracks\":";

    let Some(position) = html.find(MARKER) else {
        if html.contains("\"playabilityStatus\":{\"status\":\"ERROR\"") {
            return Err(anyhow!("video is unavailable"));
        }
        return Err(anyhow!("transcripts are disabled for this video"));
    };

    let json = &html[position + MARKER.len()..];
    let tracks = serde_json::Deserializer::from_str(json)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .ok_or_else(|| anyhow!("caption track list is missing"))?
        .context("caption track list is malformed")?;

    if tracks.is_empty() {
        return Err(anyhow!("no caption tracks available"));
    }
    Ok(tracks)
}

#[async_trait]
impl TranscriptFetcher for YouTubeTranscriptFetcher {
    async fn fetch_segments(&self, video_id: &VideoId) -> anyhow::Result<Vec<TranscriptSegment>> {
        let tracks = self.caption_tracks(video_id).await?;
        let track = self
            .choose_track(&tracks)
            .ok_or_else(|| anyhow!("no caption tracks available"))?;

        debug!("Using caption track '{}' for {}", track.language_code, video_id);

        let mut url = url::Url::parse(&track.base_url).context("invalid caption track URL")?;
        url.query_pairs_mut().append_pair("fmt", "json3");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to download captions")?;

        if !response.status().is_success() {
            return Err(anyhow!("caption download failed (HTTP {})", response.status()));
        }

        let timed_text: TimedTextResponse = response
            .json()
            .await
            .context("caption payload is not valid JSON")?;

        let segments = timed_text
            .events
            .into_iter()
            .filter_map(|event| {
                let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(TranscriptSegment::new(
                    text,
                    event.start_ms as f64 / 1000.0,
                    event.duration_ms as f64 / 1000.0,
                ))
            })
            .collect();

        Ok(segments)
    }
}

/// Transcript lookup with a per-video cache for the process lifetime
#[derive(Clone)]
pub struct TranscriptSource {
    fetcher: Arc<dyn TranscriptFetcher>,
    cache: Arc<RwLock<HashMap<VideoId, String>>>,
    cache_enabled: bool,
}

impl TranscriptSource {
    pub fn new(fetcher: Arc<dyn TranscriptFetcher>) -> Self {
        Self {
            fetcher,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_enabled: true,
        }
    }

    /// Build the YouTube-backed source described by `config`
    pub fn from_config(config: &TranscriptConfig) -> anyhow::Result<Self> {
        let fetcher = YouTubeTranscriptFetcher::new(config)?;
        Ok(Self::new(Arc::new(fetcher)).with_cache(config.cache_transcripts))
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Full transcript text: segment texts joined with single spaces
    pub async fn get_transcript(&self, video_id: &VideoId) -> Result<String> {
        if self.cache_enabled {
            if let Some(transcript) = self.cache.read().await.get(video_id) {
                debug!("📚 Transcript cache hit for {}", video_id);
                return Ok(transcript.clone());
            }
        }

        let segments = self
            .fetcher
            .fetch_segments(video_id)
            .await
            .map_err(|e| QaError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: format!("{:#}", e),
            })?;

        if segments.is_empty() {
            return Err(QaError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "transcript service returned no segments".to_string(),
            });
        }

        let transcript = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        info!(
            "📜 Fetched transcript for {}: {} segments, {} characters",
            video_id,
            segments.len(),
            transcript.len()
        );

        if self.cache_enabled {
            self.cache
                .write()
                .await
                .insert(video_id.clone(), transcript.clone());
        }

        Ok(transcript)
    }

    /// Extract the id from `url` and fetch its transcript
    pub async fn get_transcript_for_url(&self, url: &str) -> Result<(VideoId, String)> {
        let video_id = extract_video_id(url)?;
        let transcript = self.get_transcript(&video_id).await?;
        Ok((video_id, transcript))
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}
