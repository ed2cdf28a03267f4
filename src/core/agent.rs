//! Tool-calling loop that turns a generation instruction into the
//! `{"response": [...]}` payload consumed by [`crate::core::decode`].
//!
//! What to call, how often, and in which order is left to a [`Planner`].
//! [`ModelPlanner`] asks a language model and is not reproducible;
//! [`SequentialPlanner`] is deterministic and never leaves the process.

use crate::core::generation::ContentGenerator;
use crate::core::llm::{ChatMessage, LanguageModel};
use crate::core::prompt::{GenerationInstruction, PlatformRequest};
use crate::core::search::{SearchResult, WebSearch};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_MAX_AGENT_STEPS: usize = 16;

const AGENT_INSTRUCTIONS: &str = "You are a content writer for a social media platform.
You will be given a video transcript and a social media platform.
You will generate a social media post based on the video transcript and social media platform.
You may search the web for up-to-date information on the topic and fill in some useful information.";

/// A single tool call chosen by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ToolInvocation {
    GenerateContent { platform: String },
    WebSearch { query: String },
}

impl ToolInvocation {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::GenerateContent { .. } => "generate_content",
            Self::WebSearch { .. } => "web_search",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedStep {
    Invoke(ToolInvocation),
    /// Raw `{"response": [...]}` payload.
    Finish { output: String },
    Abort { reason: String },
}

/// What a tool call produced, as fed back to the planner.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Content { platform: String, content: String },
    SearchResults { query: String, results: Vec<SearchResult> },
    Failed { tool: &'static str, message: String },
}

impl Observation {
    fn render(&self) -> String {
        match self {
            Self::Content { platform, content } => {
                format!("generate_content for {platform} returned:\n{content}")
            }
            Self::SearchResults { query, results } if results.is_empty() => {
                format!("web_search for {query:?} returned no results")
            }
            Self::SearchResults { query, results } => {
                let lines: Vec<String> = results
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}. {} - {} ({})", i + 1, r.title, r.snippet, r.source))
                    .collect();
                format!("web_search for {query:?} returned:\n{}", lines.join("\n"))
            }
            Self::Failed { tool, message } => format!("{tool} failed: {message}"),
        }
    }
}

/// Everything a planner may look at when choosing its next step.
pub struct AgentSession {
    instruction: GenerationInstruction,
    platforms: PlatformRequest,
    search_enabled: bool,
    history: Vec<(ToolInvocation, Observation)>,
}

impl AgentSession {
    fn new(
        instruction: GenerationInstruction,
        platforms: PlatformRequest,
        search_enabled: bool,
    ) -> Self {
        Self {
            instruction,
            platforms,
            search_enabled,
            history: Vec::new(),
        }
    }

    pub fn instruction(&self) -> &GenerationInstruction {
        &self.instruction
    }

    pub fn platforms(&self) -> &PlatformRequest {
        &self.platforms
    }

    pub fn search_enabled(&self) -> bool {
        self.search_enabled
    }

    pub fn history(&self) -> &[(ToolInvocation, Observation)] {
        &self.history
    }

    /// Posts produced so far, one per platform, latest attempt winning.
    pub fn generated(&self) -> Vec<(String, String)> {
        let mut posts: Vec<(String, String)> = Vec::new();
        for (_, observation) in &self.history {
            if let Observation::Content { platform, content } = observation {
                match posts.iter_mut().find(|(p, _)| p.eq_ignore_ascii_case(platform)) {
                    Some(slot) => slot.1 = content.clone(),
                    None => posts.push((platform.clone(), content.clone())),
                }
            }
        }
        posts
    }
}

/// Chooses the agent's next step from the session so far.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_step(&self, session: &AgentSession) -> Result<PlannedStep>;
}

pub struct Agent {
    planner: Arc<dyn Planner>,
    generator: Arc<dyn ContentGenerator>,
    search: Option<Arc<dyn WebSearch>>,
    max_steps: usize,
}

impl Agent {
    pub fn new(
        planner: Arc<dyn Planner>,
        generator: Arc<dyn ContentGenerator>,
        search: Option<Arc<dyn WebSearch>>,
        max_steps: usize,
    ) -> Self {
        Self {
            planner,
            generator,
            search,
            max_steps,
        }
    }

    /// Drive the planner until it finishes or aborts. Returns the raw payload.
    pub async fn run(
        &self,
        instruction: &GenerationInstruction,
        transcript: &str,
        platforms: &PlatformRequest,
    ) -> Result<String> {
        let mut session =
            AgentSession::new(instruction.clone(), platforms.clone(), self.search.is_some());
        let mut last_failure: Option<Error> = None;

        loop {
            match self.planner.next_step(&session).await? {
                PlannedStep::Finish { output } => {
                    tracing::info!(tool_calls = session.history.len(), "agent finished");
                    return Ok(output);
                }
                PlannedStep::Abort { reason } => {
                    tracing::warn!(%reason, "agent aborted");
                    return Err(last_failure
                        .unwrap_or_else(|| Error::custom(format!("Agent aborted: {reason}"))));
                }
                PlannedStep::Invoke(invocation) => {
                    if session.history.len() >= self.max_steps {
                        return Err(Error::AgentStepLimit {
                            steps: self.max_steps,
                        });
                    }
                    let observation = match self.dispatch(&invocation, transcript).await {
                        Ok(observation) => observation,
                        Err(error) => {
                            tracing::warn!(
                                tool = invocation.tool_name(),
                                "tool call failed: {error}"
                            );
                            let observation = Observation::Failed {
                                tool: invocation.tool_name(),
                                message: error.to_string(),
                            };
                            last_failure = Some(error);
                            observation
                        }
                    };
                    session.history.push((invocation, observation));
                }
            }
        }
    }

    async fn dispatch(&self, invocation: &ToolInvocation, transcript: &str) -> Result<Observation> {
        tracing::debug!(tool = invocation.tool_name(), "dispatching tool call");

        match invocation {
            ToolInvocation::GenerateContent { platform } => self
                .generator
                .generate(transcript, platform)
                .await
                .map(|content| Observation::Content {
                    platform: platform.clone(),
                    content,
                }),
            ToolInvocation::WebSearch { query } => match &self.search {
                Some(search) => search.search(query).await.map(|results| {
                    Observation::SearchResults {
                        query: query.clone(),
                        results,
                    }
                }),
                None => Err(Error::UnknownTool(invocation.tool_name().to_string())),
            },
        }
    }
}

/// Planner that generates every requested platform once, in order, and
/// finishes with whatever succeeded. Never searches.
#[derive(Debug, Default, Clone)]
pub struct SequentialPlanner;

#[async_trait]
impl Planner for SequentialPlanner {
    async fn next_step(&self, session: &AgentSession) -> Result<PlannedStep> {
        let attempted = |platform: &str| {
            session.history().iter().any(|(invocation, _)| match invocation {
                ToolInvocation::GenerateContent { platform: p } => p.eq_ignore_ascii_case(platform),
                ToolInvocation::WebSearch { .. } => false,
            })
        };

        if let Some(next) = session
            .platforms()
            .as_slice()
            .iter()
            .find(|p| !attempted(p.as_str()))
        {
            return Ok(PlannedStep::Invoke(ToolInvocation::GenerateContent {
                platform: next.clone(),
            }));
        }

        let posts = session.generated();
        if posts.is_empty() {
            return Ok(PlannedStep::Abort {
                reason: "no platform could be generated".to_string(),
            });
        }
        Ok(PlannedStep::Finish {
            output: response_payload(&posts),
        })
    }
}

fn response_payload(posts: &[(String, String)]) -> String {
    let response: Vec<Value> = posts
        .iter()
        .map(|(platform, content)| serde_json::json!({ "platform": platform, "content": content }))
        .collect();
    serde_json::json!({ "response": response }).to_string()
}

/// Wire form of the planner model's replies.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum PlannerReply {
    GenerateContent { platform: String },
    WebSearch { query: String },
    Finish { response: Value },
    Abort { reason: String },
}

/// Planner backed by a language model speaking a small JSON step protocol.
pub struct ModelPlanner {
    model: Arc<dyn LanguageModel>,
    max_output_tokens: u32,
}

impl ModelPlanner {
    pub fn new(model: Arc<dyn LanguageModel>, max_output_tokens: u32) -> Self {
        Self {
            model,
            max_output_tokens,
        }
    }

    fn system_prompt(search_enabled: bool) -> String {
        let search = if search_enabled {
            r#"- {"action": "web_search", "query": "<query>"} looks up current facts on the web."#
        } else {
            "- web_search is not available for this request."
        };

        format!(
            r#"{AGENT_INSTRUCTIONS}

You work by calling tools. Reply with exactly one JSON object per turn and nothing else.
Available actions:
- {{"action": "generate_content", "platform": "<platform>"}} writes a post for one platform from the video transcript. The transcript is supplied for you.
{search}
- {{"action": "finish", "response": [{{"platform": "<platform>", "content": "<post>"}}]}} returns the final posts, one per requested platform.
- {{"action": "abort", "reason": "<why>"}} gives up when no post can be produced.

Call generate_content at least once for every platform named in the request before finishing."#
        )
    }

    fn conversation(session: &AgentSession) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(Self::system_prompt(session.search_enabled())),
            ChatMessage::user(session.instruction().as_str()),
        ];
        for (invocation, observation) in session.history() {
            let call = serde_json::to_string(invocation).unwrap_or_default();
            messages.push(ChatMessage::assistant(call));
            messages.push(ChatMessage::user(format!(
                "Observation: {}",
                observation.render()
            )));
        }
        messages
    }
}

#[async_trait]
impl Planner for ModelPlanner {
    async fn next_step(&self, session: &AgentSession) -> Result<PlannedStep> {
        let mut messages = Self::conversation(session);

        let reply = self.model.complete(&messages, self.max_output_tokens).await?;
        let parsed = match parse_reply(&reply) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("planner reply was not a valid step ({e}), asking again");
                messages.push(ChatMessage::assistant(reply));
                messages.push(ChatMessage::user(format!(
                    "That reply could not be parsed ({e}). Answer with a single JSON object using one of the listed actions."
                )));
                let retry = self.model.complete(&messages, self.max_output_tokens).await?;
                parse_reply(&retry).map_err(|e| {
                    Error::MalformedOutput(format!("planner reply is not a valid step: {e}"))
                })?
            }
        };

        Ok(match parsed {
            PlannerReply::GenerateContent { platform } => {
                PlannedStep::Invoke(ToolInvocation::GenerateContent { platform })
            }
            PlannerReply::WebSearch { query } => {
                PlannedStep::Invoke(ToolInvocation::WebSearch { query })
            }
            PlannerReply::Finish { response } => PlannedStep::Finish {
                output: serde_json::json!({ "response": response }).to_string(),
            },
            PlannerReply::Abort { reason } => PlannedStep::Abort { reason },
        })
    }
}

fn parse_reply(reply: &str) -> core::result::Result<PlannerReply, serde_json::Error> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decode::{decode, Post};
    use crate::core::llm::tests::ScriptedModel;
    use crate::core::llm::ChatRole;
    use crate::core::prompt::compose;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Writes "<platform> post about <transcript>", failing for listed platforms.
    #[derive(Default)]
    struct EchoGenerator {
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentGenerator for EchoGenerator {
        async fn generate(&self, transcript: &str, platform: &str) -> Result<String> {
            self.calls.lock().unwrap().push(platform.to_string());
            if self.failing.iter().any(|p| p == platform) {
                return Err(Error::GenerationFailed {
                    platform: platform.to_string(),
                    cause: "model unavailable".to_string(),
                });
            }
            Ok(format!("{platform} post about {transcript}"))
        }
    }

    struct FixedSearch;

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
            Ok(vec![SearchResult {
                title: format!("About {query}"),
                snippet: "fresh fact".into(),
                source: "https://example.com".into(),
            }])
        }
    }

    /// Replays a fixed list of steps.
    struct ScriptedPlanner {
        steps: Mutex<VecDeque<PlannedStep>>,
    }

    impl ScriptedPlanner {
        fn new(steps: Vec<PlannedStep>) -> Self {
            Self { steps: Mutex::new(steps.into()) }
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn next_step(&self, _session: &AgentSession) -> Result<PlannedStep> {
            Ok(self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(PlannedStep::Abort { reason: "script exhausted".into() }))
        }
    }

    fn platforms(names: &[&str]) -> PlatformRequest {
        PlatformRequest::new(names.iter().copied()).unwrap()
    }

    fn agent(
        planner: impl Planner + 'static,
        generator: Arc<EchoGenerator>,
        search: bool,
    ) -> Agent {
        let search: Option<Arc<dyn WebSearch>> = if search {
            Some(Arc::new(FixedSearch))
        } else {
            None
        };
        Agent::new(Arc::new(planner), generator, search, DEFAULT_MAX_AGENT_STEPS)
    }

    #[tokio::test]
    async fn sequential_planner_covers_each_platform_in_order() {
        let generator = Arc::new(EchoGenerator::default());
        let platforms = platforms(&["LinkedIn", "Twitter"]);
        let instruction = compose("rust", None, &platforms);

        let raw = agent(SequentialPlanner, generator.clone(), false)
            .run(&instruction, "rust", &platforms)
            .await
            .unwrap();

        assert_eq!(*generator.calls.lock().unwrap(), ["LinkedIn", "Twitter"]);
        assert_eq!(
            decode(&raw).unwrap(),
            vec![
                Post::new("LinkedIn", "LinkedIn post about rust"),
                Post::new("Twitter", "Twitter post about rust"),
            ]
        );
    }

    #[tokio::test]
    async fn sequential_planner_omits_failed_platforms() {
        let generator = Arc::new(EchoGenerator {
            failing: vec!["Instagram".into()],
            ..Default::default()
        });
        let platforms = platforms(&["Instagram", "LinkedIn"]);
        let instruction = compose("t", None, &platforms);

        let raw = agent(SequentialPlanner, generator, false)
            .run(&instruction, "t", &platforms)
            .await
            .unwrap();

        let posts = decode(&raw).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].platform, "LinkedIn");
    }

    #[tokio::test]
    async fn abort_surfaces_the_tool_failure() {
        let generator = Arc::new(EchoGenerator {
            failing: vec!["Twitter".into()],
            ..Default::default()
        });
        let platforms = platforms(&["Twitter"]);
        let instruction = compose("t", None, &platforms);

        let err = agent(SequentialPlanner, generator, false)
            .run(&instruction, "t", &platforms)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationFailed { ref platform, .. } if platform == "Twitter"));
    }

    #[tokio::test]
    async fn step_limit_stops_runaway_planners() {
        let steps = (0..10)
            .map(|i| PlannedStep::Invoke(ToolInvocation::WebSearch { query: format!("q{i}") }))
            .collect();
        let platforms = platforms(&["LinkedIn"]);
        let instruction = compose("t", None, &platforms);
        let agent = Agent::new(
            Arc::new(ScriptedPlanner::new(steps)),
            Arc::new(EchoGenerator::default()),
            Some(Arc::new(FixedSearch)),
            3,
        );

        let err = agent.run(&instruction, "t", &platforms).await.unwrap_err();
        assert!(matches!(err, Error::AgentStepLimit { steps: 3 }));
    }

    #[tokio::test]
    async fn search_without_provider_is_reported_to_planner() {
        let planner = ScriptedPlanner::new(vec![
            PlannedStep::Invoke(ToolInvocation::WebSearch { query: "news".into() }),
            PlannedStep::Abort { reason: "no search".into() },
        ]);
        let platforms = platforms(&["LinkedIn"]);
        let instruction = compose("t", None, &platforms);

        let err = agent(planner, Arc::new(EchoGenerator::default()), false)
            .run(&instruction, "t", &platforms)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_tool");
    }

    #[tokio::test]
    async fn model_planner_feeds_observations_back() {
        let model = Arc::new(ScriptedModel::replying([
            r#"{"action":"web_search","query":"rust 2026"}"#,
            "```json\n{\"action\":\"generate_content\",\"platform\":\"LinkedIn\"}\n```",
            r#"{"action":"finish","response":[{"platform":"LinkedIn","content":"Final post"}]}"#,
        ]));
        let generator = Arc::new(EchoGenerator::default());
        let platforms = platforms(&["LinkedIn"]);
        let instruction = compose("transcript text", None, &platforms);

        let raw = agent(ModelPlanner::new(model.clone(), 4096), generator.clone(), true)
            .run(&instruction, "transcript text", &platforms)
            .await
            .unwrap();

        assert_eq!(decode(&raw).unwrap(), vec![Post::new("LinkedIn", "Final post")]);
        assert_eq!(*generator.calls.lock().unwrap(), ["LinkedIn"]);

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        let first = &requests[0].0;
        assert_eq!(first[0].role, ChatRole::System);
        assert!(first[0].content.contains("web_search"));
        assert_eq!(first[1].content, instruction.as_str());

        let last = &requests[2].0;
        assert_eq!(last.len(), 6);
        assert!(last[3].content.contains("About rust 2026"));
        assert!(last[5].content.contains("LinkedIn post about transcript text"));
    }

    #[tokio::test]
    async fn model_planner_gets_one_correction() {
        let model = Arc::new(ScriptedModel::replying([
            "Sure! Here are your posts.",
            r#"{"action":"finish","response":[]}"#,
        ]));
        let platforms = platforms(&["LinkedIn"]);
        let instruction = compose("t", None, &platforms);

        let planner = ModelPlanner::new(model.clone(), 4096);
        let raw = agent(planner, Arc::new(EchoGenerator::default()), false)
            .run(&instruction, "t", &platforms)
            .await
            .unwrap();
        assert_eq!(raw, r#"{"response":[]}"#);

        let requests = model.requests.lock().unwrap();
        let retry = &requests[1].0;
        assert_eq!(retry[retry.len() - 2].content, "Sure! Here are your posts.");
        assert!(requests[0].0[0].content.contains("web_search is not available"));
    }

    #[tokio::test]
    async fn model_planner_gives_up_after_second_bad_reply() {
        let model = Arc::new(ScriptedModel::replying(["nope", "still nope"]));
        let platforms = platforms(&["LinkedIn"]);
        let instruction = compose("t", None, &platforms);

        let planner = ModelPlanner::new(model, 4096);
        let err = agent(planner, Arc::new(EchoGenerator::default()), false)
            .run(&instruction, "t", &platforms)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedOutput(_)));
    }

    #[test]
    fn latest_generation_wins_per_platform() {
        let mut session = AgentSession::new(
            compose("t", None, &platforms(&["LinkedIn"])),
            platforms(&["LinkedIn"]),
            false,
        );
        for content in ["first", "second"] {
            session.history.push((
                ToolInvocation::GenerateContent { platform: "LinkedIn".into() },
                Observation::Content { platform: "LinkedIn".into(), content: content.into() },
            ));
        }
        assert_eq!(session.generated(), vec![("LinkedIn".to_string(), "second".to_string())]);
    }
}
