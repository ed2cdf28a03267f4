use crate::core::agent::DEFAULT_MAX_AGENT_STEPS;
use crate::core::generation::DEFAULT_MAX_OUTPUT_TOKENS;
use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

pub const OPENAI_OPT_IN_ENV: &str = "SOCIALGEN_ALLOW_OPENAI";
pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o";
pub const DEFAULT_AGENT_MAX_OUTPUT_TOKENS: u32 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const BRAVE_SEARCH_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// How the agent decides on its tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PlannerKind {
    /// Let the agent model choose (may search the web).
    #[default]
    Model,
    /// One generation per platform, in order.
    Sequential,
}

#[derive(Clone, PartialEq)]
pub struct SearchConfig {
    pub api_key: String,
    pub endpoint: String,
    pub max_results: usize,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Process-wide settings, built once at startup and handed to each component.
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub agent_model: String,
    pub generation_model: String,
    pub max_output_tokens: u32,
    pub agent_max_output_tokens: u32,
    pub languages: Vec<String>,
    pub timeout: Duration,
    pub max_agent_steps: usize,
    pub planner: PlannerKind,
    pub search: Option<SearchConfig>,
    /// Transcripts are only sent to OpenAI when this is set.
    pub allow_openai: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: None,
            agent_model: DEFAULT_AGENT_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            agent_max_output_tokens: DEFAULT_AGENT_MAX_OUTPUT_TOKENS,
            languages: vec!["en".to_string()],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_agent_steps: DEFAULT_MAX_AGENT_STEPS,
            planner: PlannerKind::Model,
            search: None,
            allow_openai: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("agent_model", &self.agent_model)
            .field("generation_model", &self.generation_model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("agent_max_output_tokens", &self.agent_max_output_tokens)
            .field("languages", &self.languages)
            .field("timeout", &self.timeout)
            .field("max_agent_steps", &self.max_agent_steps)
            .field("planner", &self.planner)
            .field("search", &self.search)
            .field("allow_openai", &self.allow_openai)
            .finish()
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.max_output_tokens == 0 || self.agent_max_output_tokens == 0 {
            return Err(Error::Config("output token budgets must be positive".into()));
        }
        if self.max_agent_steps == 0 {
            return Err(Error::Config("the agent needs at least one tool call".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".into()));
        }
        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(Error::Config("at least one transcript language is required".into()));
        }
        if self.agent_model.trim().is_empty() || self.generation_model.trim().is_empty() {
            return Err(Error::Config("model names cannot be empty".into()));
        }
        if let Some(search) = &self.search
            && (search.api_key.trim().is_empty() || search.max_results == 0)
        {
            return Err(Error::Config(
                "web search needs an API key and a positive result count".into(),
            ));
        }
        Ok(())
    }
}

/// `1`, `true` or `yes`, case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
