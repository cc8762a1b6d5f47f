//! Relay Types - shared records for the relay workspace
//!
//! MCP capability descriptors mirror the fields the MCP wire format uses
//! (`inputSchema`, `mimeType`, ...), so SDK records can be converted into
//! them with a plain serde round trip. The chat types follow the
//! OpenAI-compatible function calling schema.

pub mod chat;
pub mod mcp;
pub mod provider;

pub use chat::{
    ChatMessage, CompletionResponse, FunctionCall, FunctionDef, Role, Tool, ToolCall,
};
pub use mcp::{
    McpFunctionTool, McpItem, McpPrompt, McpPromptArgument, McpPromptHelper, McpResource,
    McpTool, McpToolParameters,
};
pub use provider::Provider;

/// Errors raised while converting between records
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// A record could not be encoded or decoded
    #[error("conversion failed: {0}")]
    Conversion(#[from] serde_json::Error),
}

/// Re-encode a serializable value as another type sharing its JSON shape
///
/// # Errors
/// Returns an error when the JSON produced by `value` does not fit `U`
pub fn convert<T, U>(value: &T) -> Result<U, TypesError>
where
    T: serde::Serialize + ?Sized,
    U: serde::de::DeserializeOwned,
{
    let json = serde_json::to_value(value)?;
    Ok(serde_json::from_value(json)?)
}
