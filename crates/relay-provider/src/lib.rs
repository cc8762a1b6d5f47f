//! Relay provider library
//!
//! - [`ProviderService`]: chat with OpenAI or Ollama through `async-openai`
//! - [`ChatCompletionClient`]: hosted `/chat/completions` endpoints
//! - [`ResponsesClient`]: the OpenAI Responses API behind [`ResponsesBackend`]
//! - [`execute_provider`] / [`execute_query`] / [`execute_chat`]: let a model
//!   call MCP host tools

pub mod chat_completion;
pub mod error;
pub mod executor;
mod http;
pub mod responses;
pub mod service;

pub use chat_completion::{
    ChatChoice, ChatCompletion, ChatCompletionClient, ChatCompletionRequest,
    HF_CHAT_COMPLETIONS_URL,
};
pub use error::ProviderError;
pub use executor::{execute_chat, execute_provider, execute_query, QueryOutcome};
pub use responses::{
    FunctionTool, ResponsesBackend, ResponsesClient, ResponsesRequest, ResponsesResponse,
    OPENAI_BASE_URL,
};
pub use service::ProviderService;
