//! Relay catalog
//!
//! Concrete MCP capabilities: a fend-backed math expression evaluator, the
//! `MathExpression` server serving it, and typed clients for known servers.

pub mod clients;
pub mod error;
pub mod expr;
pub mod servers;

pub use clients::{MathJsMath, MicrosoftLearn, SymPyMath, MICROSOFT_LEARN_URL};
pub use error::{CatalogError, Result};
pub use expr::{evaluate, evaluate_text};
pub use servers::math_server;
