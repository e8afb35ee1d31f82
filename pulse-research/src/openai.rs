use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use pulse_core::{PulseError, PulseResult};
use tracing::{debug, instrument};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a senior financial journalist writing for retail investors. \
You write accurate, engaging, plain-text articles grounded only in the facts you are given. \
You never invent prices, quotes or figures, and you never give personalised investment advice.";

/// Text generation capability used for drafting, rewriting and metadata
///
/// The model is opaque: callers only rely on getting text back or an error.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32)
        -> PulseResult<String>;
}

/// Chat-completion backed [`TextGenerator`]
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    pub fn new() -> PulseResult<Self> {
        // async-openai reads OPENAI_API_KEY from env automatically
        let config = OpenAIConfig::default();
        Ok(Self {
            client: Client::with_config(config),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_api_key(api_key: &str) -> PulseResult<Self> {
        if api_key.trim().is_empty() {
            return Err(PulseError::config("OpenAI API key is empty"));
        }
        let config = OpenAIConfig::new().with_api_key(api_key);
        Ok(Self {
            client: Client::with_config(config),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> PulseResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| PulseError::internal(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| PulseError::internal(e.to_string()))?
                    .into(),
            ])
            .temperature(temperature)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| PulseError::internal(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PulseError::api(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PulseError::parse("No response from OpenAI"))?;

        debug!(chars = content.len(), "Generation complete");
        Ok(content)
    }
}
