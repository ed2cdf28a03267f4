use crate::core::transcript::TranscriptError;
use derive_more::{Display, From};
use serde::Serialize;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    #[from]
    Transcript(TranscriptError),

    #[display("Content generation failed for {platform}: {cause}")]
    GenerationFailed { platform: String, cause: String },

    #[display("Agent output could not be decoded: {_0}")]
    MalformedOutput(String),

    #[display("Please select at least one social media platform")]
    NoPlatformSelected,

    #[display("Please enter a YouTube Video ID")]
    MissingVideoId,

    #[display("Generation did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[display("Agent exceeded its budget of {steps} tool calls")]
    AgentStepLimit { steps: usize },

    #[display("Agent requested an unknown tool: {_0}")]
    UnknownTool(String),

    #[display("Web search failed: {_0}")]
    SearchFailed(String),

    #[display("Invalid configuration: {_0}")]
    Config(String),

    #[display("{_0}")]
    Custom(String),

    #[display("OpenAI error: {_0}")]
    #[from]
    OpenAI(async_openai::error::OpenAIError),

    #[display("HTTP error: {_0}")]
    #[from]
    Http(reqwest::Error),

    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),

    #[display("IO error: {_0}")]
    #[from]
    Io(std::io::Error),
}

impl Error {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Stable, machine-readable code for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transcript(e) => e.kind(),
            Self::GenerationFailed { .. } => "generation_failed",
            Self::MalformedOutput(_) => "malformed_output",
            Self::NoPlatformSelected => "no_platform_selected",
            Self::MissingVideoId => "missing_video_id",
            Self::Timeout { .. } => "timeout",
            Self::AgentStepLimit { .. } => "agent_step_limit",
            Self::UnknownTool(_) => "unknown_tool",
            Self::SearchFailed(_) => "search_failed",
            Self::Config(_) => "invalid_config",
            Self::Custom(_) => "custom",
            Self::OpenAI(_) => "openai",
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl std::error::Error for Error {}

/// Structured form of an [`Error`] for shells that want more than a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_errors_keep_their_kind() {
        let err: Error = TranscriptError::NoTranscriptFound {
            video_id: "abc".into(),
            languages: vec!["en".into()],
        }
        .into();

        assert_eq!(err.kind(), "no_transcript_found");
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn report_carries_readable_message() {
        let report = Error::NoPlatformSelected.report();
        assert_eq!(report.kind, "no_platform_selected");
        assert_eq!(
            report.message,
            "Please select at least one social media platform"
        );
    }
}
