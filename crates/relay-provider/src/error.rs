//! Provider errors

use thiserror::Error;

/// Errors raised while talking to a hosted model
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// OpenAI SDK failure (transport, API error or undecodable body)
    #[error("OpenAI request failed: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    /// The endpoint answered with a non-success status
    #[error("{provider} returned HTTP {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// The endpoint answered with a body of the wrong shape
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    /// A function tool call could not be dispatched
    #[error(transparent)]
    Mcp(#[from] relay_mcp::McpError),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
