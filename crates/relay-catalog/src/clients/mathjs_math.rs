use super::client_accessors;
use crate::error::Result;
use crate::servers::math::TOOL_EVALUATOR;
use relay_mcp::McpClient;
use rmcp::model::CallToolResult;
use serde_json::json;

/// Client for a math.js expression server
pub struct MathJsMath {
    client: McpClient,
}

client_accessors!(MathJsMath);

impl MathJsMath {
    pub const NAME: &'static str = "MathJsMathExpressionEvaluator";
    pub const VERSION: &'static str = "1.0.1";

    #[must_use]
    pub fn new() -> Self {
        Self {
            client: McpClient::new(Self::NAME, Self::VERSION),
        }
    }

    /// Evaluate `expression` with the server's evaluator tool
    ///
    /// # Errors
    /// Returns an error when the server rejects the call
    pub async fn call_math_expression_evaluator_tool(
        &self,
        expression: &str,
    ) -> Result<Option<CallToolResult>> {
        Ok(self
            .client
            .call_tool(TOOL_EVALUATOR, json!({ "expression": expression }))
            .await?)
    }
}
