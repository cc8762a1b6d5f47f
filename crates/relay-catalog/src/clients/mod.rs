//! Typed clients for known MCP servers
//!
//! Each wraps an [`McpClient`](relay_mcp::McpClient) under a fixed client
//! name and version and adds calls named after the server's capabilities.

/// Accessors shared by the wrappers
macro_rules! client_accessors {
    ($wrapper:ty) => {
        impl $wrapper {
            /// The wrapped client
            #[must_use]
            pub fn client(&self) -> &relay_mcp::McpClient {
                &self.client
            }

            pub fn client_mut(&mut self) -> &mut relay_mcp::McpClient {
                &mut self.client
            }

            /// Unwrap, e.g. to hand the client to an `McpHost`
            #[must_use]
            pub fn into_client(self) -> relay_mcp::McpClient {
                self.client
            }
        }

        impl std::ops::Deref for $wrapper {
            type Target = relay_mcp::McpClient;

            fn deref(&self) -> &Self::Target {
                &self.client
            }
        }

        impl std::ops::DerefMut for $wrapper {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.client
            }
        }

        impl Default for $wrapper {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

pub(crate) use client_accessors;

mod mathjs_math;
mod microsoft_learn;
mod sympy_math;

pub use mathjs_math::MathJsMath;
pub use microsoft_learn::{MicrosoftLearn, MICROSOFT_LEARN_URL};
pub use sympy_math::SymPyMath;
