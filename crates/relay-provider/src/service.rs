use anyhow::Result;
use async_openai::{config::OpenAIConfig, Client};
use relay_types::{ChatMessage, Provider as ProviderType, Role};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Provider service for interacting with LLM providers
pub struct ProviderService {
    provider: ProviderType,
}

impl ProviderService {
    /// Create a new provider service
    #[must_use]
    pub fn new(provider: ProviderType) -> Self {
        info!("Provider service initialized with model '{}'", provider.model());
        Self { provider }
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderType {
        &self.provider
    }

    fn client(&self) -> Client<OpenAIConfig> {
        match &self.provider {
            ProviderType::OpenAI {
                api_key, base_url, ..
            } => {
                let mut config = OpenAIConfig::new();
                if let Some(key) = api_key {
                    config = config.with_api_key(key);
                }
                if let Some(url) = base_url {
                    config = config.with_api_base(url);
                }
                Client::with_config(config)
            }
            ProviderType::Ollama { base_url, .. } => {
                Client::with_config(OpenAIConfig::new().with_api_base(base_url))
            }
        }
    }

    /// Complete a conversation using the configured provider
    ///
    /// # Errors
    /// Returns an error when a message cannot be built or the request fails
    pub async fn complete(&self, history: &[ChatMessage], prompt: &str) -> Result<String> {
        use async_openai::types::chat::{
            ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
            ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
            CreateChatCompletionRequestArgs,
        };

        // Build conversation history
        let mut chat_messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()?
                .into(),
        ];

        for msg in history {
            let Some(content) = msg.content.clone() else {
                continue;
            };
            let message: ChatCompletionRequestMessage = match msg.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(content)
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(content)
                    .build()?
                    .into(),
                Role::User | Role::Tool => ChatCompletionRequestUserMessageArgs::default()
                    .content(content)
                    .build()?
                    .into(),
            };
            chat_messages.push(message);
        }

        // Add current prompt
        chat_messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.provider.model())
            .messages(chat_messages)
            .build()?;

        let response = self.client().chat().create(request).await?;

        if let Some(choice) = response.choices.first() {
            Ok(choice.message.content.clone().unwrap_or_default())
        } else {
            warn!("Model '{}' returned no choices", self.provider.model());
            Ok("I couldn't generate a response.".to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_service_keeps_provider() {
        let service = ProviderService::new(ProviderType::ollama("llama3.2", "http://localhost:11434/v1"));
        assert_eq!(service.provider().model(), "llama3.2");
        assert!(matches!(service.provider(), ProviderType::Ollama { .. }));
    }

    #[tokio::test]
    #[ignore] // Needs OPENAI_API_KEY
    async fn test_openai_completion() {
        let service = ProviderService::new(ProviderType::openai_full(
            "gpt-4.1-nano",
            std::env::var("OPENAI_API_KEY").ok(),
            None,
        ));
        let answer = service
            .complete(&[], "What is the capital of Australia?")
            .await
            .unwrap();
        assert!(answer.contains("Canberra"));
    }
}
