//! Error types for MCP client and server operations

use std::time::Duration;
use thiserror::Error;

/// MCP errors
#[derive(Debug, Error)]
pub enum McpError {
    /// Transport-level error (connection, I/O)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server failed to start
    #[error("Server '{server}' failed to start: {reason}")]
    StartupFailed {
        /// Server name
        server: String,
        /// Failure reason
        reason: String,
    },

    /// Startup timeout exceeded
    #[error("Server '{server}' timeout after {timeout:?}")]
    StartupTimeout {
        /// Server name
        server: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// Stdio server script is neither Python nor JavaScript
    #[error("Server script must be a .py or .js file: {0}")]
    InvalidScript(String),

    /// Tool not found
    #[error("Tool '{tool}' not found on '{owner}'")]
    ToolNotFound {
        /// Client, server or host id
        owner: String,
        /// Tool name
        tool: String,
    },

    /// Prompt not found
    #[error("Prompt '{prompt}' not found on '{owner}'")]
    PromptNotFound {
        /// Client or server name
        owner: String,
        /// Prompt name
        prompt: String,
    },

    /// Resource not found
    #[error("Resource '{resource}' not found on '{owner}'")]
    ResourceNotFound {
        /// Client or server name
        owner: String,
        /// Resource name or URI
        resource: String,
    },

    /// Tool execution failed
    #[error("Tool '{tool}' failed on '{owner}': {reason}")]
    ToolExecution {
        /// Client or server name
        owner: String,
        /// Tool name
        tool: String,
        /// Failure reason
        reason: String,
    },

    /// Server already started
    #[error("Server '{0}' already started")]
    AlreadyStarted(String),

    /// Protocol-level error reported by the SDK
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid response from server
    #[error("Invalid response from '{server}': {details}")]
    InvalidResponse {
        /// Server name
        server: String,
        /// Error details
        details: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record conversion error
    #[error(transparent)]
    Types(#[from] relay_types::TypesError),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, McpError>;
