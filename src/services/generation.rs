use crate::feedback::prompt::GenerationRequest;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation service unavailable: {0}")]
    Unavailable(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Timeout(_) => "timeout",
            GenerationError::Unavailable(_) => "unavailable",
        }
    }
}

/// A text generation backend.
///
/// `complete` makes exactly one outbound call and never retries.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        instruction: &str,
        content: &str,
        max_tokens: u16,
    ) -> Result<String, GenerationError>;

    /// Runs `complete` under a deadline. A call that misses the deadline is
    /// dropped and none of its output is used.
    async fn generate(
        &self,
        request: &GenerationRequest,
        limit: Duration,
    ) -> Result<String, GenerationError> {
        let call = self.complete(&request.instruction, &request.content, request.max_tokens);
        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GenerationError::Timeout(limit)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    /// Overrides the OpenAI endpoint, e.g. for a proxy.
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub presence_penalty: f32,
}

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    presence_penalty: f32,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(settings.api_key);
        if let Some(base) = settings.api_base {
            config = config.with_api_base(base);
        }
        // The client retries 429 and 5xx on its own unless the backoff has no time budget.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(config).with_backoff(no_retry);
        Self {
            client,
            model: settings.model,
            temperature: settings.temperature,
            presence_penalty: settings.presence_penalty,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(
        &self,
        instruction: &str,
        content: &str,
        max_tokens: u16,
    ) -> Result<String, GenerationError> {
        let unavailable = |e: async_openai::error::OpenAIError| GenerationError::Unavailable(e.to_string());

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(instruction)
                .build()
                .map_err(unavailable)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(unavailable)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(max_tokens)
            .top_p(1.0)
            .frequency_penalty(0.0)
            .presence_penalty(self.presence_penalty)
            .build()
            .map_err(unavailable)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::warn!("OpenAI chat completion failed: {}", e);
            unavailable(e)
        })?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| GenerationError::Unavailable("response carried no text".to_string()))
    }
}
