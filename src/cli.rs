use clap::{Args, Parser, Subcommand};
use socialgen::config::{
    BRAVE_SEARCH_ENDPOINT, Config, DEFAULT_AGENT_MAX_OUTPUT_TOKENS, DEFAULT_AGENT_MODEL,
    DEFAULT_GENERATION_MODEL, DEFAULT_TIMEOUT_SECS, OPENAI_OPT_IN_ENV, PlannerKind, SearchConfig,
    is_truthy,
};
use socialgen::core::agent::DEFAULT_MAX_AGENT_STEPS;
use socialgen::core::generation::DEFAULT_MAX_OUTPUT_TOKENS;
use socialgen::error::{Error, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "socialgen")]
#[command(about = "Generate social media posts from YouTube video transcripts")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate posts for one video
    Generate {
        /// YouTube video URL or video ID
        video_id: String,

        /// What you want written, e.g. "Write an upbeat announcement"
        #[arg(short, long)]
        query: Option<String>,

        /// Target platform (repeatable)
        #[arg(short, long = "platform", default_values = ["LinkedIn", "Instagram"])]
        platforms: Vec<String>,

        /// Save each post as `{platform}_post.txt` in this directory
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print the result (or error) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch and print a video's transcript
    Transcript {
        /// YouTube video URL or video ID
        video_id: String,

        /// Prefix each caption line with its time window
        #[arg(long)]
        timestamps: bool,
    },

    /// List the platforms the generator knows about
    Platforms,
}

#[derive(Args)]
pub struct Settings {
    /// OpenAI API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Alternative OpenAI-compatible endpoint
    #[arg(long, global = true, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Model that plans tool calls
    #[arg(long, global = true, env = "SOCIALGEN_AGENT_MODEL", default_value = DEFAULT_AGENT_MODEL)]
    pub agent_model: String,

    /// Model that writes each post
    #[arg(long, global = true, env = "SOCIALGEN_GENERATION_MODEL", default_value = DEFAULT_GENERATION_MODEL)]
    pub generation_model: String,

    /// Output token budget per post
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    pub max_output_tokens: u32,

    /// Output token budget per planning turn
    #[arg(long, global = true, default_value_t = DEFAULT_AGENT_MAX_OUTPUT_TOKENS)]
    pub agent_max_output_tokens: u32,

    /// Preferred transcript languages (comma-separated)
    #[arg(short, long, global = true, value_delimiter = ',', default_value = "en")]
    pub languages: Vec<String>,

    /// Overall time budget in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Maximum number of tool calls per request
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_AGENT_STEPS)]
    pub max_agent_steps: usize,

    /// How tool calls are planned
    #[arg(long, global = true, value_enum, default_value_t = PlannerKind::Model)]
    pub planner: PlannerKind,

    /// Brave Search API key; web search is off without it
    #[arg(long, global = true, env = "BRAVE_SEARCH_API_KEY", hide_env_values = true)]
    pub search_api_key: Option<String>,

    /// Web search endpoint
    #[arg(long, global = true, env = "SOCIALGEN_SEARCH_ENDPOINT", default_value = BRAVE_SEARCH_ENDPOINT)]
    pub search_endpoint: String,

    /// Results per web search
    #[arg(long, global = true, default_value_t = 5)]
    pub search_results: usize,

    /// Allow transcripts to be sent to OpenAI (same as SOCIALGEN_ALLOW_OPENAI=1)
    #[arg(long, global = true)]
    pub allow_openai: bool,
}

impl Settings {
    pub fn config(&self) -> Result<Config> {
        let languages: Vec<String> = self
            .languages
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let search = self
            .search_api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .map(|key| SearchConfig {
                api_key: key.clone(),
                endpoint: self.search_endpoint.clone(),
                max_results: self.search_results,
            });

        let config = Config {
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            agent_model: self.agent_model.clone(),
            generation_model: self.generation_model.clone(),
            max_output_tokens: self.max_output_tokens,
            agent_max_output_tokens: self.agent_max_output_tokens,
            languages,
            timeout: Duration::from_secs(self.timeout),
            max_agent_steps: self.max_agent_steps,
            planner: self.planner,
            search,
            allow_openai: self.allow_openai
                || env::var(OPENAI_OPT_IN_ENV).is_ok_and(|v| is_truthy(&v)),
        };

        config
            .validate()
            .map_err(|e| Error::Config(format!("{e} (check the command-line flags)")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_defaults_match_the_form() {
        let cli = Cli::try_parse_from(["socialgen", "generate", "OZ5OZZZ2cvk"]).unwrap();
        match cli.command {
            Commands::Generate { video_id, query, platforms, out_dir, json } => {
                assert_eq!(video_id, "OZ5OZZZ2cvk");
                assert_eq!(query, None);
                assert_eq!(platforms, ["LinkedIn", "Instagram"]);
                assert!(out_dir.is_none());
                assert!(!json);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn settings_become_config() {
        let cli = Cli::try_parse_from([
            "socialgen",
            "generate",
            "abc",
            "-p",
            "Twitter",
            "--languages",
            "de, en",
            "--planner",
            "sequential",
            "--search-api-key",
            "k",
            "--timeout",
            "60",
        ])
        .unwrap();

        let config = cli.settings.config().unwrap();
        assert_eq!(config.languages, ["de", "en"]);
        assert_eq!(config.planner, PlannerKind::Sequential);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.search.as_ref().map(|s| s.max_results), Some(5));

        let Commands::Generate { platforms, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(platforms, ["Twitter"]);
    }

    #[test]
    fn invalid_limits_are_config_errors() {
        let cli = Cli::try_parse_from(["socialgen", "platforms", "--max-agent-steps", "0"]).unwrap();
        assert_eq!(cli.settings.config().unwrap_err().kind(), "invalid_config");
    }
}
