//! OpenAI Responses API
//!
//! Only the parts the query loop uses are modelled: a user input, strict
//! function tools, and the `message` / `function_call` output items. The
//! records travel through `async-openai`'s Responses endpoint as its
//! bring-your-own-types request and response.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use relay_types::chat::strict_parameters;
use relay_types::{McpFunctionTool, McpItem};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// An input message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseInput {
    pub role: String,
    pub content: String,
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
    pub strict: bool,
}

impl From<&McpFunctionTool> for FunctionTool {
    fn from(tool: &McpFunctionTool) -> Self {
        Self {
            kind: "function".to_string(),
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: strict_parameters(tool),
            strict: true,
        }
    }
}

/// Responses API request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<ResponseInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<FunctionTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl ResponsesRequest {
    /// The item's query as a single user message, with the item's sampling options
    #[must_use]
    pub fn for_item(item: &McpItem) -> Self {
        Self {
            model: item.model.clone(),
            input: vec![ResponseInput {
                role: "user".to_string(),
                content: item.query.clone(),
            }],
            tools: Vec::new(),
            max_output_tokens: item.max_output_tokens,
            temperature: item.temperature,
            top_p: item.top_p,
        }
    }

    /// Offer function tools to the model
    #[must_use]
    pub fn with_tools<'a>(mut self, tools: impl IntoIterator<Item = &'a McpFunctionTool>) -> Self {
        self.tools = tools.into_iter().map(FunctionTool::from).collect();
        self
    }
}

/// Content part of an output message
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum OutputContent {
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(other)]
    Other,
}

/// Item of the `output` array
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum OutputItem {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    #[serde(rename = "function_call")]
    FunctionCall {
        #[serde(default)]
        call_id: Option<String>,
        name: String,
        /// JSON-encoded arguments
        arguments: String,
    },
    #[serde(other)]
    Other,
}

/// A `function_call` output item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionCallRef<'a> {
    pub name: &'a str,
    pub arguments: &'a str,
}

/// Responses API response body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

impl ResponsesResponse {
    /// Concatenated text of every output message
    #[must_use]
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message { content } => Some(content),
                _ => None,
            })
            .flatten()
            .filter_map(|content| match content {
                OutputContent::OutputText { text } => Some(text.as_str()),
                OutputContent::Other => None,
            })
            .collect()
    }

    /// `function_call` items, in output order
    pub fn function_calls(&self) -> impl Iterator<Item = FunctionCallRef<'_>> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::FunctionCall {
                name, arguments, ..
            } => Some(FunctionCallRef { name, arguments }),
            _ => None,
        })
    }
}

/// Model seam of the query loop
#[async_trait]
pub trait ResponsesBackend: Send + Sync {
    /// Create a model response
    async fn create(&self, request: &ResponsesRequest) -> Result<ResponsesResponse>;
}

/// Client for the OpenAI Responses API
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    client: Client<OpenAIConfig>,
}

impl ResponsesClient {
    /// Client for `base_url` (for example [`OPENAI_BASE_URL`])
    ///
    /// Without `api_key` the key comes from `OPENAI_API_KEY`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into();
        let mut config = OpenAIConfig::new().with_api_base(base_url.trim_end_matches('/'));
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl ResponsesBackend for ResponsesClient {
    async fn create(&self, request: &ResponsesRequest) -> Result<ResponsesResponse> {
        debug!(
            "Creating response with '{}' ({} tool(s))",
            request.model,
            request.tools.len()
        );
        let response: ResponsesResponse = self.client.responses().create_byot(request).await?;
        Ok(response)
    }
}
