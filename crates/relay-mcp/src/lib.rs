//! Relay MCP library
//!
//! Thin wrappers over the rmcp SDK for the three MCP roles the relay plays:
//!
//! - [`McpClient`]: connect to a server over stdio or Streamable HTTP and
//!   call its tools, prompts and resources
//! - [`McpServerBase`]: register callbacks and serve them in-process, over
//!   stdio or over Streamable HTTP
//! - [`McpHost`]: keep clients and servers under ids and publish their tools
//!   as function tools for a model

#![deny(unsafe_code, dead_code, unused_imports, unused_variables)]

pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod host;
pub mod http_client;
pub mod server;

pub use client::McpClient;
pub use config::{McpConfig, McpServerConfig, TransportConfig, TransportType};
pub use error::McpError;
pub use events::{EventCallback, EventSink, EventType, McpEvent};
pub use host::{HostEntry, McpHost, SharedClient};
pub use server::{
    prompt_callback, resource_callback, tool_callback, McpHttpTransport, McpServerBase,
    PromptCallback, PromptConfig, ResourceCallback, ResourceConfig, ToolCallback, ToolConfig,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{McpClient, McpConfig, McpError, McpHost, McpServerBase, McpServerConfig};
}
