//! MCP servers built on [`McpServerBase`](relay_mcp::McpServerBase)

pub mod math;

pub use math::math_server;
