use crate::error::{Error, Result};
use async_trait::async_trait;
use derive_more::Display;
use std::sync::Arc;
use yt_transcript_rs::api::YouTubeTranscriptApi;
use yt_transcript_rs::errors::{CouldNotRetrieveTranscript, CouldNotRetrieveTranscriptReason};

pub const DEFAULT_LANGUAGES: &[&str] = &["en"];

/// One caption line as delivered by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSnippet {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Captions of a single video plus their flattened text.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTranscript {
    video_id: String,
    snippets: Vec<CaptionSnippet>,
    text: String,
}

impl VideoTranscript {
    pub fn new(video_id: impl Into<String>, snippets: Vec<CaptionSnippet>) -> Self {
        let text = snippets
            .iter()
            .map(|snippet| snippet.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            video_id: video_id.into(),
            snippets,
            text,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn snippets(&self) -> &[CaptionSnippet] {
        &self.snippets
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caption lines prefixed with their time window, e.g. `[00:01.500 - 00:03.000] hi`.
    pub fn timed_lines(&self) -> Vec<String> {
        self.snippets
            .iter()
            .map(|snippet| {
                let start = format_timestamp(snippet.start);
                let end = format_timestamp(snippet.start + snippet.duration);
                format!("[{start} - {end}] {}", snippet.text.trim())
            })
            .collect()
    }
}

/// Why a transcript could not be obtained.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum TranscriptError {
    #[display("No transcript found for video {video_id} in languages: {languages:?}")]
    NoTranscriptFound {
        video_id: String,
        languages: Vec<String>,
    },

    #[display("Video {video_id} is unavailable")]
    VideoUnavailable { video_id: String },

    #[display("Invalid video ID: {video_id}")]
    InvalidVideoId { video_id: String },

    #[display("Transcripts are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[display("Could not retrieve transcript: {cause}")]
    RetrievalFailed { video_id: String, cause: String },

    #[display("An unexpected error occurred: {cause}")]
    UnknownFailure { video_id: String, cause: String },
}

impl TranscriptError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoTranscriptFound { .. } => "no_transcript_found",
            Self::VideoUnavailable { .. } => "video_unavailable",
            Self::InvalidVideoId { .. } => "invalid_video_id",
            Self::TranscriptsDisabled { .. } => "transcripts_disabled",
            Self::RetrievalFailed { .. } => "retrieval_failed",
            Self::UnknownFailure { .. } => "unknown_failure",
        }
    }
}

/// Source of caption tracks.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch snippets in the first available language of `languages`.
    async fn fetch_snippets(
        &self,
        video_id: &str,
        languages: &[&str],
    ) -> core::result::Result<Vec<CaptionSnippet>, TranscriptError>;
}

/// Caption tracks straight from YouTube.
#[derive(Clone)]
pub struct YouTubeTranscriptProvider {
    api: YouTubeTranscriptApi,
}

impl YouTubeTranscriptProvider {
    pub fn new() -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::custom(format!("Failed to initialise transcript client: {e}")))?;
        Ok(Self { api })
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeTranscriptProvider {
    async fn fetch_snippets(
        &self,
        video_id: &str,
        languages: &[&str],
    ) -> core::result::Result<Vec<CaptionSnippet>, TranscriptError> {
        let fetched = self
            .api
            .fetch_transcript(video_id, languages, false)
            .await
            .map_err(|e| classify_failure(video_id, languages, &e))?;

        Ok(fetched
            .snippets
            .into_iter()
            .map(|snippet| CaptionSnippet {
                text: snippet.text,
                start: snippet.start,
                duration: snippet.duration,
            })
            .collect())
    }
}

fn classify_failure(
    video_id: &str,
    languages: &[&str],
    error: &CouldNotRetrieveTranscript,
) -> TranscriptError {
    let video_id = video_id.to_string();
    match &error.reason {
        Some(CouldNotRetrieveTranscriptReason::NoTranscriptFound { .. }) => {
            TranscriptError::NoTranscriptFound {
                video_id,
                languages: languages.iter().map(|l| l.to_string()).collect(),
            }
        }
        Some(CouldNotRetrieveTranscriptReason::VideoUnavailable) => {
            TranscriptError::VideoUnavailable { video_id }
        }
        Some(CouldNotRetrieveTranscriptReason::InvalidVideoId) => {
            TranscriptError::InvalidVideoId { video_id }
        }
        Some(CouldNotRetrieveTranscriptReason::TranscriptsDisabled) => {
            TranscriptError::TranscriptsDisabled { video_id }
        }
        Some(_) => TranscriptError::RetrievalFailed {
            video_id,
            cause: error.to_string(),
        },
        None => TranscriptError::UnknownFailure {
            video_id,
            cause: error.to_string(),
        },
    }
}

#[derive(Clone)]
pub struct TranscriptService {
    provider: Arc<dyn TranscriptProvider>,
}

impl TranscriptService {
    pub fn new(provider: Arc<dyn TranscriptProvider>) -> Self {
        Self { provider }
    }

    /// Fetch and flatten the transcript of `video_id`. The id is opaque: only
    /// an empty one is rejected here, everything else is up to the provider.
    /// Failures are returned as-is; nothing is retried here.
    pub async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<VideoTranscript> {
        let video_id = require_video_id(video_id)?;
        let languages: Vec<&str> = if languages.is_empty() {
            DEFAULT_LANGUAGES.to_vec()
        } else {
            languages.iter().map(|s| s.as_str()).collect()
        };

        tracing::info!(%video_id, ?languages, "retrieving transcript");

        let snippets = self
            .provider
            .fetch_snippets(&video_id, &languages)
            .await
            .inspect_err(|e| {
                tracing::warn!(%video_id, kind = e.kind(), "transcript retrieval failed: {e}")
            })?;

        let transcript = VideoTranscript::new(video_id, snippets);
        tracing::info!(
            video_id = transcript.video_id(),
            snippets = transcript.snippets().len(),
            chars = transcript.text().len(),
            "transcript retrieved"
        );
        Ok(transcript)
    }
}

fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1_000;
    let millis = total_millis % 1_000;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
    } else {
        format!("{minutes:02}:{secs:02}.{millis:03}")
    }
}

/// Reduce a YouTube URL (or a bare id) to the video id.
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    let raw_id = if let Some(v_param) = input.split("v=").nth(1) {
        v_param.split('&').next().unwrap_or(v_param)
    } else if let Some(youtu_be) = input.split("youtu.be/").nth(1) {
        youtu_be.split('?').next().unwrap_or(youtu_be)
    } else if let Some(shorts) = input.split("/shorts/").nth(1) {
        shorts.split('?').next().unwrap_or(shorts)
    } else {
        input
    };

    require_video_id(raw_id)
}

fn require_video_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingVideoId);
    }
    Ok(trimmed.to_string())
}
