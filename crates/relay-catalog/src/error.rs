//! Catalog errors

use thiserror::Error;

/// Errors raised by the catalog servers and clients
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Nothing to evaluate
    #[error("empty expression")]
    EmptyExpression,

    /// The evaluator rejected the expression
    #[error("cannot evaluate '{expression}': {reason}")]
    Evaluation { expression: String, reason: String },

    /// A server capability could not be registered
    #[error("failed to register {kind} '{name}'")]
    Registration { kind: &'static str, name: String },

    /// MCP error
    #[error(transparent)]
    Mcp(#[from] relay_mcp::McpError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
