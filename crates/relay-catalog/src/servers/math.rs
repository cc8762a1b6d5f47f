//! Math expression MCP server
//!
//! Serves the fend evaluator as the `MathExpressionEvaluator` tool, two
//! prompts wrapping an expression or a result, and documentation links.

use crate::error::{CatalogError, Result};
use crate::expr::evaluate_text;
use relay_mcp::{
    prompt_callback, resource_callback, tool_callback, McpError, McpServerBase, PromptConfig,
    ResourceConfig, ToolConfig,
};
use relay_types::McpPromptArgument;
use rmcp::model::{CallToolResult, Content, GetPromptResult, ReadResourceResult};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const SERVER_NAME: &str = "MathExpression";
pub const SERVER_VERSION: &str = "1.0.1";

pub const TOOL_EVALUATOR: &str = "MathExpressionEvaluator";
pub const PROMPT_EVALUATOR: &str = "MathExpressionEvaluator";
pub const PROMPT_RESULT: &str = "MathExpressionResult";
pub const RESOURCE_DOCS: &str = "MathDocsUrl";
pub const RESOURCE_DOCS_VERSION: &str = "MathDocsVersionUrl";

pub const DOCS_URI: &str = "math://docs";
pub const DOCS_VERSION_TEMPLATE: &str = "math://doc/{version}/num";

const DOCS_URL: &str = "https://printfn.github.io/fend/documentation/";

/// Create the server with every tool, prompt and resource registered
///
/// # Errors
/// Returns an error when a registration is rejected
pub fn math_server() -> Result<McpServerBase> {
    let server = McpServerBase::new(
        SERVER_NAME,
        SERVER_VERSION,
        Some("Math expression evaluator".to_string()),
        None,
    );

    let registrations: [(&'static str, &str, fn(&McpServerBase) -> bool); 5] = [
        ("tool", TOOL_EVALUATOR, register_tool_math_expression_evaluator),
        ("prompt", PROMPT_EVALUATOR, register_prompt_math_expression_evaluator),
        ("prompt", PROMPT_RESULT, register_prompt_math_expression_result),
        ("resource", RESOURCE_DOCS, register_resource_docs),
        ("resource template", RESOURCE_DOCS_VERSION, register_resource_docs_version),
    ];
    for (kind, name, register) in registrations {
        if !register(&server) {
            return Err(CatalogError::Registration {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(server)
}

fn user_prompt(description: &str, text: String) -> relay_mcp::error::Result<GetPromptResult> {
    Ok(serde_json::from_value(json!({
        "description": description,
        "messages": [ { "role": "user", "content": { "type": "text", "text": text } } ]
    }))?)
}

fn text_resource(uri: String, text: String) -> relay_mcp::error::Result<ReadResourceResult> {
    Ok(serde_json::from_value(json!({
        "contents": [ { "uri": uri, "mimeType": "text/plain", "text": text } ]
    }))?)
}

/// Register the evaluator tool; evaluation errors come back as `error: ...` text
pub fn register_tool_math_expression_evaluator(server: &McpServerBase) -> bool {
    server.register_tool(
        TOOL_EVALUATOR,
        ToolConfig {
            title: Some("Math expression evaluator".to_string()),
            description: Some("Use fend to execute mathematical expressions".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "expression": { "type": "string", "description": "Expression to evaluate" }
                },
                "required": ["expression"]
            }),
            annotations: Some(json!({ "readOnlyHint": true, "openWorldHint": false })),
            ..Default::default()
        },
        tool_callback(|args: Value| async move {
            let text = match args.get("expression").and_then(Value::as_str) {
                Some(expression) => evaluate_text(expression),
                None => "error: missing 'expression'".to_string(),
            };
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }),
    )
}

pub fn register_prompt_math_expression_evaluator(server: &McpServerBase) -> bool {
    server.register_prompt(
        PROMPT_EVALUATOR,
        PromptConfig {
            title: Some("Evaluate an expression".to_string()),
            description: Some("Ask for a math expression to be evaluated".to_string()),
            arguments: vec![McpPromptArgument::required(
                "expression",
                "Math expression to evaluate",
            )],
        },
        prompt_callback(|args: HashMap<String, String>| async move {
            let expression = args.get("expression").ok_or_else(|| McpError::Protocol(
                "missing prompt argument 'expression'".to_string(),
            ))?;
            user_prompt(
                "Evaluate a math expression",
                format!("Evaluate the math expression: {expression}"),
            )
        }),
    )
}

pub fn register_prompt_math_expression_result(server: &McpServerBase) -> bool {
    server.register_prompt(
        PROMPT_RESULT,
        PromptConfig {
            title: Some("Explain a result".to_string()),
            description: Some("Ask for a math expression result to be explained".to_string()),
            arguments: vec![McpPromptArgument::required("result", "Math expression result")],
        },
        prompt_callback(|args: HashMap<String, String>| async move {
            let result = args.get("result").ok_or_else(|| McpError::Protocol(
                "missing prompt argument 'result'".to_string(),
            ))?;
            user_prompt(
                "Explain a math expression result",
                format!("Explain the math expression result: {result}"),
            )
        }),
    )
}

pub fn register_resource_docs(server: &McpServerBase) -> bool {
    server.register_resource(
        RESOURCE_DOCS,
        DOCS_URI,
        ResourceConfig {
            title: Some("Evaluator documentation".to_string()),
            description: Some("Documentation URL of the expression syntax".to_string()),
            mime_type: Some("text/plain".to_string()),
        },
        resource_callback(|uri: String, _vars: HashMap<String, String>| async move {
            text_resource(uri, DOCS_URL.to_string())
        }),
    )
}

pub fn register_resource_docs_version(server: &McpServerBase) -> bool {
    server.register_resource_template(
        RESOURCE_DOCS_VERSION,
        DOCS_VERSION_TEMPLATE,
        ResourceConfig {
            title: Some("Versioned number documentation".to_string()),
            description: Some("Documentation URL of number syntax for a version".to_string()),
            mime_type: Some("text/plain".to_string()),
        },
        resource_callback(|uri: String, vars: HashMap<String, String>| async move {
            let version = vars.get("version").map_or("latest", String::as_str);
            text_resource(uri, format!("{DOCS_URL}#numbers (fend {version})"))
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use relay_mcp::content::{prompt_texts, resource_texts, tool_text};

    #[tokio::test]
    async fn test_tool_evaluates() {
        let server = math_server().unwrap();
        let result = server
            .call_tool(TOOL_EVALUATOR, json!({ "expression": "2 * (3 + 4)" }))
            .await
            .unwrap();
        assert_eq!(tool_text(&result).as_deref(), Some("14"));
    }

    #[tokio::test]
    async fn test_tool_reports_errors_as_text() {
        let server = math_server().unwrap();
        let result = server
            .call_tool(TOOL_EVALUATOR, json!({ "expression": "qqq" }))
            .await
            .unwrap();
        assert!(tool_text(&result).unwrap().starts_with("error: "));

        let result = server.call_tool(TOOL_EVALUATOR, json!({})).await.unwrap();
        assert_eq!(tool_text(&result).as_deref(), Some("error: missing 'expression'"));
    }

    #[tokio::test]
    async fn test_prompts() {
        let server = math_server().unwrap();
        let mut args = HashMap::new();
        args.insert("expression".to_string(), "sqrt(2)".to_string());
        let prompt = server.call_prompt(PROMPT_EVALUATOR, args).await.unwrap();
        assert_eq!(prompt_texts(&prompt), vec!["Evaluate the math expression: sqrt(2)"]);

        assert!(server.call_prompt(PROMPT_RESULT, HashMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_resources() {
        let server = math_server().unwrap();
        let docs = server.call_resource(RESOURCE_DOCS, "").await.unwrap();
        assert_eq!(resource_texts(&docs), vec![DOCS_URL]);

        let versioned = server
            .call_resource(RESOURCE_DOCS_VERSION, "math://doc/1.5/num")
            .await
            .unwrap();
        assert!(resource_texts(&versioned)[0].ends_with("(fend 1.5)"));
    }

    #[test]
    fn test_registration_is_complete() {
        let server = math_server().unwrap();
        assert_eq!(server.tools().len(), 1);
        assert_eq!(server.prompts().len(), 2);
        assert_eq!(server.resources().len(), 2);
        assert!(!register_tool_math_expression_evaluator(&server));
    }
}
