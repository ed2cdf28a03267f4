use crate::config::{Config, OPENAI_OPT_IN_ENV};
use crate::error::{Error, Result};
use async_openai::{
    self,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, Role,
    },
};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A text-in, text-out model endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion over `messages`, capped at `max_output_tokens`.
    async fn complete(&self, messages: &[ChatMessage], max_output_tokens: u32) -> Result<String>;
}

/// [`LanguageModel`] backed by the OpenAI Responses API.
#[derive(Clone)]
pub struct OpenAiModel {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    allow_upload: bool,
}

impl OpenAiModel {
    pub fn new(config: &Config, model: impl Into<String>) -> Self {
        let mut openai = OpenAIConfig::new();
        if let Some(key) = &config.openai_api_key {
            openai = openai.with_api_key(key);
        }
        if let Some(base) = &config.openai_base_url {
            openai = openai.with_api_base(base);
        }

        Self {
            client: async_openai::Client::with_config(openai),
            model: model.into(),
            allow_upload: config.allow_openai,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, messages: &[ChatMessage], max_output_tokens: u32) -> Result<String> {
        enforce_openai_opt_in(self.allow_upload)?;

        let mut items = Vec::with_capacity(messages.len());
        for message in messages {
            let role = match message.role {
                ChatRole::System => Role::System,
                ChatRole::User => Role::User,
                ChatRole::Assistant => Role::Assistant,
            };
            items.push(InputItem::EasyMessage(
                EasyInputMessageArgs::default()
                    .role(role)
                    .content(message.content.as_str())
                    .build()?,
            ));
        }

        let request = CreateResponseArgs::default()
            .max_output_tokens(max_output_tokens)
            .model(self.model.as_str())
            .input(InputParam::Items(items))
            .build()?;

        tracing::debug!(model = %self.model, max_output_tokens, "sending model request");
        let response = self.client.responses().create(request).await?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    match c {
                        OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                        other => {
                            tracing::warn!("Unexpected content type: {other:?}");
                            continue;
                        }
                    }
                }
            }
        }

        Ok(content)
    }
}

fn enforce_openai_opt_in(allowed: bool) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Generation requires explicit opt-in. Set {OPENAI_OPT_IN_ENV}=1 (or pass --allow-openai) to enable uploads to OpenAI."
        )))
    }
}
