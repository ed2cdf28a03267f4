pub mod agent;
pub mod artifact;
pub mod decode;
pub mod generation;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;
pub mod transcript;

pub use agent::{Agent, ModelPlanner, Planner, SequentialPlanner};
pub use artifact::save_posts;
pub use decode::{Post, decode};
pub use generation::{ContentGenerator, ModelContentGenerator};
pub use llm::{LanguageModel, OpenAiModel};
pub use pipeline::Pipeline;
pub use prompt::{GenerationInstruction, PlatformRequest, compose};
pub use search::{BraveSearch, SearchResult, WebSearch};
pub use transcript::{
    TranscriptError, TranscriptService, VideoTranscript, YouTubeTranscriptProvider,
};
