//! Hosted chat completion endpoints
//!
//! Any OpenAI-compatible `/chat/completions` endpoint works; the default is
//! the Hugging Face inference router.

use crate::error::Result;
use crate::http::{build_client, post_json};
use relay_types::{ChatMessage, CompletionResponse, Tool};
use serde::{Deserialize, Serialize};

/// Hugging Face router endpoint for chat completions
pub const HF_CHAT_COMPLETIONS_URL: &str = "https://router.huggingface.co/nebius/v1/chat/completions";

/// Chat completion request body
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

impl ChatCompletionRequest {
    /// `{messages, max_tokens, model}` for a single user question
    pub fn ask(question: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            messages: vec![ChatMessage::user(question)],
            max_tokens: Some(max_tokens),
            model: Some(model.into()),
            tools: None,
        }
    }

    /// `{messages, tools}` letting the model pick a function
    #[must_use]
    pub fn with_tools(messages: Vec<ChatMessage>, tools: Vec<Tool>) -> Self {
        Self {
            messages,
            max_tokens: None,
            model: None,
            tools: Some(tools),
        }
    }
}

/// One choice of a chat completion
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Chat completion response body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletion {
    /// Message of the first choice
    #[must_use]
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|choice| &choice.message)
    }

    /// First choice as text or tool calls
    #[must_use]
    pub fn into_completion(self) -> Option<CompletionResponse> {
        let choice = self.choices.into_iter().next()?;
        let finish_reason = choice.finish_reason.unwrap_or_else(|| "stop".to_string());
        Some(CompletionResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish_reason,
        })
    }
}

/// Client for a hosted chat completion endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    /// Client for `endpoint`, authenticating with `api_key` as a bearer token
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: build_client(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Client for the Hugging Face router
    #[must_use]
    pub fn hugging_face(api_key: Option<String>) -> Self {
        Self::new(HF_CHAT_COMPLETIONS_URL, api_key)
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a chat completion request
    ///
    /// # Errors
    /// Returns an error for transport failures, non-success statuses, or a
    /// body that is not a chat completion
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        post_json(
            &self.client,
            "chat completion",
            &self.endpoint,
            self.api_key.as_deref(),
            request,
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use relay_types::Role;
    use serde_json::json;

    #[test]
    fn test_ask_body() {
        let request = ChatCompletionRequest::ask(
            "What is the capital of Australia?",
            "microsoft/phi-4",
            512,
        );
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["model"], "microsoft/phi-4");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_tools_body_omits_model() {
        let tool = Tool::function("add", "Add numbers", json!({ "type": "object" }));
        let messages = vec![
            ChatMessage::system("Use the tools."),
            ChatMessage::user("1+1"),
            ChatMessage::assistant("Calling add"),
        ];
        let request = ChatCompletionRequest::with_tools(messages, vec![tool]);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("model").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["tools"][0]["function"]["name"], "add");
    }

    #[test]
    fn test_first_message_and_completion() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "model": "microsoft/phi-4",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Canberra" }, "finish_reason": "stop" }
            ]
        }))
        .unwrap();

        let message = completion.first_message().unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content.as_deref(), Some("Canberra"));

        let response = completion.into_completion().unwrap();
        assert!(!response.has_tool_calls());
        assert_eq!(response.content.as_deref(), Some("Canberra"));
    }

    #[test]
    fn test_tool_call_completion() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "add", "arguments": "{\"a\":1}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let response = completion.into_completion().unwrap();
        assert!(response.has_tool_calls());
        assert_eq!(response.finish_reason, "tool_calls");
        assert_eq!(response.tool_calls[0].function.name, "add");
    }

    #[test]
    fn test_empty_choices() {
        let completion: ChatCompletion = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(completion.first_message().is_none());
        assert!(completion.into_completion().is_none());
    }
}
