use crate::core::llm::{ChatMessage, LanguageModel};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2500;

/// Writes one post for one platform.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, transcript: &str, platform: &str) -> Result<String>;
}

/// Single bounded model call per post. Not retried, not idempotent.
#[derive(Clone)]
pub struct ModelContentGenerator {
    model: Arc<dyn LanguageModel>,
    max_output_tokens: u32,
}

impl ModelContentGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, max_output_tokens: u32) -> Self {
        Self { model, max_output_tokens }
    }
}

#[async_trait]
impl ContentGenerator for ModelContentGenerator {
    async fn generate(&self, transcript: &str, platform: &str) -> Result<String> {
        tracing::info!(platform, "generating content");

        let prompt = generation_prompt(transcript, platform);
        let content = self
            .model
            .complete(&[ChatMessage::user(prompt)], self.max_output_tokens)
            .await
            .map_err(|e| Error::GenerationFailed {
                platform: platform.to_string(),
                cause: e.to_string(),
            })?;

        if content.trim().is_empty() {
            return Err(Error::GenerationFailed {
                platform: platform.to_string(),
                cause: "model returned no text".to_string(),
            });
        }

        Ok(content)
    }
}

fn generation_prompt(transcript: &str, platform: &str) -> String {
    format!(
        "Here is a new video transcript: \n{transcript}\n\n\
         Generate a social media post on my {platform} based on my provided video transcript. \n"
    )
}
