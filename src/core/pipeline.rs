use crate::config::{Config, PlannerKind};
use crate::core::agent::{Agent, ModelPlanner, Planner, SequentialPlanner};
use crate::core::decode::{Post, decode};
use crate::core::generation::ModelContentGenerator;
use crate::core::llm::{LanguageModel, OpenAiModel};
use crate::core::prompt::{PlatformRequest, compose};
use crate::core::search::{BraveSearch, WebSearch};
use crate::core::transcript::{TranscriptService, YouTubeTranscriptProvider, extract_video_id};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Transcript in, posts out.
pub struct Pipeline {
    transcripts: TranscriptService,
    agent: Agent,
    languages: Vec<String>,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(
        transcripts: TranscriptService,
        agent: Agent,
        languages: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transcripts,
            agent,
            languages,
            timeout,
        }
    }

    /// Wire up the YouTube, OpenAI and (optional) Brave Search clients.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let provider = YouTubeTranscriptProvider::new()?;
        let generation_model: Arc<dyn LanguageModel> =
            Arc::new(OpenAiModel::new(config, config.generation_model.as_str()));
        let generator = Arc::new(ModelContentGenerator::new(
            generation_model,
            config.max_output_tokens,
        ));

        let planner: Arc<dyn Planner> = match config.planner {
            PlannerKind::Model => Arc::new(ModelPlanner::new(
                Arc::new(OpenAiModel::new(config, config.agent_model.as_str())),
                config.agent_max_output_tokens,
            )),
            PlannerKind::Sequential => Arc::new(SequentialPlanner),
        };

        let search: Option<Arc<dyn WebSearch>> = config
            .search
            .as_ref()
            .map(|search| Arc::new(BraveSearch::new(search)) as Arc<dyn WebSearch>);

        let agent = Agent::new(planner, generator, search, config.max_agent_steps);

        Ok(Self::new(
            TranscriptService::new(Arc::new(provider)),
            agent,
            config.languages.clone(),
            config.timeout,
        ))
    }

    /// Generate one post per requested platform for `video_id` (an id or a
    /// YouTube URL). Inputs are validated before anything leaves the process,
    /// and the whole run is bounded by the configured timeout.
    pub async fn run<I, S>(
        &self,
        video_id: &str,
        query: Option<&str>,
        platforms: I,
    ) -> Result<Vec<Post>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let video_id = extract_video_id(video_id)?;
        let platforms = PlatformRequest::new(platforms)?;

        let work = self.generate(&video_id, query, &platforms);
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(%video_id, timeout = ?self.timeout, "generation timed out");
                Err(Error::Timeout {
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    async fn generate(
        &self,
        video_id: &str,
        query: Option<&str>,
        platforms: &PlatformRequest,
    ) -> Result<Vec<Post>> {
        let transcript = self.transcripts.fetch(video_id, &self.languages).await?;
        let instruction = compose(transcript.text(), query, platforms);

        tracing::info!(%video_id, platforms = %platforms.conjunction(), "running content agent");
        let raw = self
            .agent
            .run(&instruction, transcript.text(), platforms)
            .await?;

        let posts = decode(&raw)?;
        if posts.len() != platforms.len() {
            tracing::warn!(
                requested = platforms.len(),
                produced = posts.len(),
                "agent returned a different number of posts than requested"
            );
        }
        Ok(posts)
    }
}
