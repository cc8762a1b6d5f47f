use super::client_accessors;
use crate::error::Result;
use crate::servers::math::{PROMPT_EVALUATOR, PROMPT_RESULT, TOOL_EVALUATOR};
use relay_mcp::McpClient;
use rmcp::model::{CallToolResult, GetPromptResult, ReadResourceResult};
use serde_json::json;
use std::collections::HashMap;

/// Client for a SymPy math expression server
pub struct SymPyMath {
    client: McpClient,
}

client_accessors!(SymPyMath);

impl SymPyMath {
    pub const NAME: &'static str = "SymPyMathExpressionEvaluator";
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

    /// # Errors
    /// Returns an error when the server rejects the request
    pub async fn call_math_expression_evaluator_prompt(
        &self,
        expression: &str,
    ) -> Result<Option<GetPromptResult>> {
        let args = HashMap::from([("expression".to_string(), expression.to_string())]);
        Ok(self.client.call_prompt(PROMPT_EVALUATOR, args).await?)
    }

    /// # Errors
    /// Returns an error when the server rejects the request
    pub async fn call_math_expression_result_prompt(
        &self,
        result: &str,
    ) -> Result<Option<GetPromptResult>> {
        let args = HashMap::from([("result".to_string(), result.to_string())]);
        Ok(self.client.call_prompt(PROMPT_RESULT, args).await?)
    }

    /// Read the documentation URL resource
    ///
    /// # Errors
    /// Returns an error when the server rejects the request
    pub async fn call_sympy_docs_url_resource(&self) -> Result<Option<ReadResourceResult>> {
        Ok(self.client.call_resource("sympy://{version}").await?)
    }

    /// Read the number documentation for `version`
    ///
    /// # Errors
    /// Returns an error when the server rejects the request
    pub async fn call_sympy_docs_url_version_resource(
        &self,
        version: &str,
    ) -> Result<Option<ReadResourceResult>> {
        Ok(self
            .client
            .call_resource(&format!("sympy://doc/{version}/num"))
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_client_returns_none() {
        let sympy = SymPyMath::new();
        assert_eq!(sympy.client().name(), SymPyMath::NAME);
        assert!(sympy.call_math_expression_evaluator_tool("1+1").await.unwrap().is_none());
        assert!(sympy.call_math_expression_result_prompt("2").await.unwrap().is_none());
        assert!(sympy.call_sympy_docs_url_version_resource("1.14").await.unwrap().is_none());
    }
}
